//! Shared helpers for drawcalc integration tests
//!
//! - `settle`: drive a context until its worker has finished one run
//! - `ScriptedEngine`: a minimal expression engine whose "formula" is a
//!   command, for exercising the worker machinery without the formula
//!   language

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use drawcalc::{
    CancelToken, CompileLog, DrawCalc, DrawCalcConfig, ExecOutcome, ExpressionEngine, HostTable,
    Symbol, TickReport,
};

pub const SETTLE_TIMEOUT: Duration = Duration::from_secs(5);

/// Tick, wait for the worker to leave `Running`, tick again to collect
pub fn settle<E: ExpressionEngine>(calc: &mut DrawCalc<E>) -> TickReport {
    calc.tick().expect("tick");
    assert!(
        calc.wait_for_pass_completion(SETTLE_TIMEOUT),
        "worker did not finish in time"
    );
    calc.tick().expect("tick")
}

/// Context on the built-in formula engine with `formula` committed and settled
pub fn run_formula(formula: &str) -> DrawCalc {
    run_formula_with(formula, DrawCalcConfig::default())
}

pub fn run_formula_with(formula: &str, config: DrawCalcConfig) -> DrawCalc {
    let mut calc = DrawCalc::with_default_engine(config).expect("context");
    calc.commit_formula(formula);
    settle(&mut calc);
    calc
}

pub fn circle_radii(symbols: &[Symbol]) -> Vec<f64> {
    symbols
        .iter()
        .filter_map(|s| match s {
            Symbol::Circle { radius, .. } => Some(*radius),
            _ => None,
        })
        .collect()
}

/// Commands understood by [`ScriptedEngine`]
#[derive(Debug, Clone, PartialEq)]
pub enum Script {
    /// Emit `n` circles of radius `k0`, polling cancellation between them
    Circles(usize),
    /// Spin until cancelled
    Spin,
    /// Fail at runtime with this reason
    Fault(String),
    /// Nothing; produced for unparseable text
    Empty,
}

impl Script {
    fn parse(source: &str) -> Result<Self, String> {
        let mut words = source.split_whitespace();
        match (words.next(), words.next()) {
            (Some("circles"), Some(n)) => n
                .parse()
                .map(Script::Circles)
                .map_err(|_| format!("bad count '{}'", n)),
            (Some("spin"), None) => Ok(Script::Spin),
            (Some("fault"), reason) => Ok(Script::Fault(reason.unwrap_or("fault").to_string())),
            _ => Err(format!("unknown script '{}'", source.trim())),
        }
    }
}

pub struct ScriptedProgram {
    table: Arc<HostTable>,
    script: Script,
}

/// Engine counting its compiles and executions
#[derive(Default)]
pub struct ScriptedEngine {
    pub compiles: Arc<AtomicUsize>,
    pub executions: Arc<AtomicUsize>,
}

impl ScriptedEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Counters that stay readable after the engine moves into a context
    pub fn counters(&self) -> (Arc<AtomicUsize>, Arc<AtomicUsize>) {
        (self.compiles.clone(), self.executions.clone())
    }
}

impl ExpressionEngine for ScriptedEngine {
    type Program = ScriptedProgram;

    fn compile(&self, source: &str, table: Arc<HostTable>) -> (ScriptedProgram, Option<CompileLog>) {
        self.compiles.fetch_add(1, Ordering::SeqCst);
        match Script::parse(source) {
            Ok(script) => (ScriptedProgram { table, script }, None),
            Err(message) => {
                let mut log = CompileLog::new();
                log.push(1, 1, message);
                (
                    ScriptedProgram {
                        table,
                        script: Script::Empty,
                    },
                    Some(log),
                )
            }
        }
    }

    fn execute(&self, program: &mut ScriptedProgram, cancel: &CancelToken) -> ExecOutcome {
        self.executions.fetch_add(1, Ordering::SeqCst);
        match &program.script {
            Script::Circles(n) => {
                let circle = program.table.get_id("circle").expect("circle");
                let k0 = program.table.get_id("k0").expect("k0");
                let r = program.table.read_var(k0).expect("k0 value");
                for i in 0..*n {
                    if cancel.is_cancelled() {
                        return ExecOutcome::Cancelled;
                    }
                    program
                        .table
                        .call(circle, &[i as f64, 0.0, r])
                        .expect("circle call");
                }
                ExecOutcome::Completed
            }
            Script::Spin => {
                while !cancel.is_cancelled() {
                    std::thread::sleep(Duration::from_micros(100));
                }
                ExecOutcome::Cancelled
            }
            Script::Fault(reason) => ExecOutcome::Fault(reason.clone()),
            Script::Empty => ExecOutcome::Completed,
        }
    }

    fn decompile(&self, program: &ScriptedProgram) -> String {
        format!("{:?}", program.script)
    }
}
