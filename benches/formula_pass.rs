//! Benchmarks for the formula language
//!
//! - compile: lexing, parsing and bytecode generation
//! - execute: one VM pass with host calls into the scratch buffer
//! - pure arithmetic loops without emission, for dispatch overhead

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use drawcalc::backend::bindings::drawcalc_host_table;
use drawcalc::backend::inputs::WorkingVars;
use drawcalc::backend::symbol_buffer::ScratchBuffer;
use drawcalc::formula::compile;
use drawcalc::{CancelToken, ExpressionEngine, FormulaEngine, RunFlag, ValueStore};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

const SPIRAL: &str = r#"
    # polar spiral of dots
    n = 0;
    while n < count {
        a = n * 0.1 + angle;
        r = 0.01 * n;
        colour(0.5 + 0.5 * sin(a), 0.5, 0.5 + 0.5 * cos(a));
        circle(r * cos(a), r * sin(a), 0.02);
        n = n + 1
    }
"#;

fn spiral(count: usize) -> String {
    format!("count = {};\n{}", count, SPIRAL)
}

fn host_table() -> (drawcalc::HostTable, Arc<Mutex<ScratchBuffer>>) {
    let run = RunFlag::new();
    run.start();
    let scratch = Arc::new(Mutex::new(ScratchBuffer::new(1 << 20, 1.4, run)));
    let vars = WorkingVars::new();
    let table = drawcalc_host_table(scratch.clone(), Arc::new(ValueStore::default()), &vars);
    (table, scratch)
}

fn bench_compile(c: &mut Criterion) {
    let (table, _) = host_table();
    let source = spiral(1000);
    c.bench_function("compile_spiral", |b| {
        b.iter(|| black_box(compile(black_box(&source), &table)))
    });
}

fn bench_spiral_pass(c: &mut Criterion) {
    let mut group = c.benchmark_group("spiral_pass");
    group.measurement_time(Duration::from_secs(10));

    let engine = FormulaEngine::default();
    for &count in &[100usize, 1_000, 10_000] {
        let (table, scratch) = host_table();
        let (mut program, log) = engine.compile(&spiral(count), Arc::new(table));
        assert!(log.is_none(), "{:?}", log);
        let cancel = CancelToken::detached();

        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, _| {
            b.iter(|| {
                scratch.lock().begin_pass();
                black_box(engine.execute(&mut program, &cancel))
            })
        });
    }

    group.finish();
}

fn bench_arithmetic_loop(c: &mut Criterion) {
    let engine = FormulaEngine::default();
    let (table, _) = host_table();
    let source = "s = 0; i = 0; while i < 10000 { s = s + i * i % 7; i = i + 1 }";
    let (mut program, _) = engine.compile(source, Arc::new(table));
    let cancel = CancelToken::detached();

    c.bench_function("arithmetic_loop_10k", |b| {
        b.iter(|| black_box(engine.execute(&mut program, &cancel)))
    });
}

criterion_group!(benches, bench_compile, bench_spiral_pass, bench_arithmetic_loop);

criterion_main!(benches);
