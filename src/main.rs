/// drawcalc - run one formula pass and print what it drew
use drawcalc::{DrawCalc, DrawCalcConfig, ListingRenderer};
use std::env;
use std::fs;
use std::io::{self, Read, Write};
use std::path::Path;
use std::process;
use std::time::Duration;
use tracing::Level;

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// How long to wait for the worker before giving up
const DEFAULT_TIMEOUT_MS: u64 = 5000;

fn print_usage() {
    eprintln!("drawcalc v{}", VERSION);
    eprintln!();
    eprintln!("USAGE:");
    eprintln!("    drawcalc [OPTIONS] <INPUT>");
    eprintln!();
    eprintln!("OPTIONS:");
    eprintln!("    -h, --help            Print this help message");
    eprintln!("    -v, --version         Print version information");
    eprintln!("    -c, --config <FILE>   Load settings from a TOML file");
    eprintln!("    -o, --output <FILE>   Write the symbol listing to FILE (default: stdout)");
    eprintln!("    --angle <V>           Set the angle input");
    eprintln!("    --time <V>            Set the time input");
    eprintln!("    --param <I=V>         Set parameter k<I> (repeatable)");
    eprintln!("    --timeout <MS>        Give up on the pass after MS milliseconds");
    eprintln!("    --decompile           Print the compiled bytecode before the symbols");
    eprintln!("    --verbose             Log worker activity to stderr");
    eprintln!();
    eprintln!("ARGUMENTS:");
    eprintln!("    <INPUT>               Formula file (use '-' for stdin)");
    eprintln!();
    eprintln!("EXAMPLES:");
    eprintln!("    drawcalc spiral.calc");
    eprintln!("    drawcalc --angle 0.5 --param 0=3 spiral.calc");
    eprintln!("    echo 'circle(0, 0, 1)' | drawcalc -");
}

fn print_version() {
    println!("drawcalc {}", VERSION);
}

struct Options {
    input: Option<String>,
    output: Option<String>,
    config: Option<String>,
    angle: Option<f64>,
    time: Option<f64>,
    params: Vec<(usize, f64)>,
    timeout: Duration,
    decompile: bool,
    verbose: bool,
}

fn parse_number(flag: &str, text: &str) -> Result<f64, String> {
    text.parse()
        .map_err(|_| format!("Invalid number for {}: {}", flag, text))
}

fn parse_param(text: &str) -> Result<(usize, f64), String> {
    let (index, value) = text
        .split_once('=')
        .ok_or_else(|| format!("Expected I=V for --param, got {}", text))?;
    let index = index
        .trim()
        .parse()
        .map_err(|_| format!("Invalid parameter index: {}", index))?;
    Ok((index, parse_number("--param", value.trim())?))
}

fn parse_args() -> Result<Options, String> {
    let args: Vec<String> = env::args().collect();

    let mut options = Options {
        input: None,
        output: None,
        config: None,
        angle: None,
        time: None,
        params: Vec::new(),
        timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
        decompile: false,
        verbose: false,
    };
    let mut i = 1;

    let value = |i: usize, flag: &str| -> Result<String, String> {
        args.get(i)
            .cloned()
            .ok_or_else(|| format!("Missing value after {}", flag))
    };

    while i < args.len() {
        match args[i].as_str() {
            "-h" | "--help" => {
                print_usage();
                process::exit(0);
            }
            "-v" | "--version" => {
                print_version();
                process::exit(0);
            }
            "-c" | "--config" => {
                i += 1;
                options.config = Some(value(i, "--config")?);
            }
            "-o" | "--output" => {
                i += 1;
                options.output = Some(value(i, "--output")?);
            }
            "--angle" => {
                i += 1;
                options.angle = Some(parse_number("--angle", &value(i, "--angle")?)?);
            }
            "--time" => {
                i += 1;
                options.time = Some(parse_number("--time", &value(i, "--time")?)?);
            }
            "--param" => {
                i += 1;
                options.params.push(parse_param(&value(i, "--param")?)?);
            }
            "--timeout" => {
                i += 1;
                let ms = value(i, "--timeout")?;
                let ms: u64 = ms
                    .parse()
                    .map_err(|_| format!("Invalid timeout: {}", ms))?;
                options.timeout = Duration::from_millis(ms);
            }
            "--decompile" => options.decompile = true,
            "--verbose" => options.verbose = true,
            arg if arg.starts_with('-') && arg != "-" => {
                return Err(format!("Unknown option: {}", arg));
            }
            arg => {
                if options.input.is_some() {
                    return Err("Multiple input files specified".to_string());
                }
                options.input = Some(arg.to_string());
            }
        }
        i += 1;
    }

    Ok(options)
}

fn read_input(input: &str) -> Result<String, String> {
    if input == "-" {
        let mut buffer = String::new();
        io::stdin()
            .read_to_string(&mut buffer)
            .map_err(|e| format!("Failed to read from stdin: {}", e))?;
        Ok(buffer)
    } else {
        let path = Path::new(input);
        if !path.exists() {
            return Err(format!("Input file not found: {}", input));
        }
        fs::read_to_string(path).map_err(|e| format!("Failed to read file '{}': {}", input, e))
    }
}

fn write_output(output: Option<&str>, content: &str) -> Result<(), String> {
    match output {
        Some(path) => {
            let mut file = fs::File::create(path)
                .map_err(|e| format!("Failed to create output file '{}': {}", path, e))?;
            file.write_all(content.as_bytes())
                .map_err(|e| format!("Failed to write to output file '{}': {}", path, e))?;
            Ok(())
        }
        None => {
            print!("{}", content);
            Ok(())
        }
    }
}

fn run_formula(formula: &str, options: &Options) -> Result<String, String> {
    let config = match &options.config {
        Some(path) => DrawCalcConfig::load(Path::new(path)).map_err(|e| e.to_string())?,
        None => DrawCalcConfig::default(),
    };
    let mut calc = DrawCalc::with_default_engine(config).map_err(|e| e.to_string())?;

    if let Some(angle) = options.angle {
        calc.set_angle(angle);
    }
    if let Some(time) = options.time {
        calc.set_time(time);
    }
    for &(index, value) in &options.params {
        calc.set_param(index, value).map_err(|e| e.to_string())?;
    }
    // A one-shot run never animates
    calc.set_animation(false);

    calc.commit_formula(formula);
    calc.tick().map_err(|e| e.to_string())?;
    if !calc.wait_for_pass_completion(options.timeout) {
        calc.shutdown();
        return Err(format!(
            "Formula did not finish within {} ms",
            options.timeout.as_millis()
        ));
    }
    calc.tick().map_err(|e| e.to_string())?;

    if !calc.compile_log().is_empty() {
        eprintln!("{}", calc.compile_log());
    }
    if let Some(fault) = calc.last_fault() {
        eprintln!("Runtime fault: {}", fault);
    }
    if calc.cap_hits() > 0 {
        eprintln!(
            "Element limit of {} reached",
            calc.config().limits.element_limit
        );
    }

    let mut output = String::new();
    if options.decompile {
        output.push_str(calc.decompiled());
        output.push('\n');
    }
    let mut listing = ListingRenderer::new();
    calc.render_published(&mut listing);
    output.push_str(listing.as_str());
    calc.shutdown();
    Ok(output)
}

fn main() {
    let options = match parse_args() {
        Ok(opts) => opts,
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!();
            print_usage();
            process::exit(1);
        }
    };

    let level = if options.verbose { Level::DEBUG } else { Level::WARN };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(io::stderr)
        .init();

    let Some(input) = options.input.as_deref() else {
        eprintln!("Error: Missing input file");
        eprintln!();
        print_usage();
        process::exit(1);
    };

    let formula = match read_input(input) {
        Ok(content) => content,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };

    let output = match run_formula(&formula, &options) {
        Ok(output) => output,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };

    if let Err(e) = write_output(options.output.as_deref(), &output) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}
