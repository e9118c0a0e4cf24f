//! Element cap guard through the whole pipeline
//!
//! A breached cap publishes two symbols: the warning line followed by the
//! "Limit reached" label. Readers expecting a single warning line should note
//! that the label is part of the warning visual, not a leftover element.

mod common;

use common::{circle_radii, run_formula_with, settle, ScriptedEngine};
use drawcalc::backend::symbol_buffer::WARNING_LABEL;
use drawcalc::{unpack_text, DrawCalc, DrawCalcConfig, RunState, Symbol};

const LOOP: &str = "i = 0; while i < k0 { circle(i, 0, 1); i = i + 1 }";

fn limited(limit: usize) -> DrawCalcConfig {
    let mut config = DrawCalcConfig::default();
    config.limits.element_limit = limit;
    config
}

fn context_with_count(limit: usize, count: f64) -> DrawCalc {
    let mut calc = DrawCalc::with_default_engine(limited(limit)).unwrap();
    calc.set_param(0, count).unwrap();
    calc.commit_formula(LOOP);
    settle(&mut calc);
    calc
}

fn assert_warning_visual(symbols: &[Symbol]) {
    assert_eq!(symbols.len(), 2, "{:?}", symbols);
    assert!(matches!(symbols[0], Symbol::Line { .. }));
    match symbols[1] {
        Symbol::Text { payload, .. } => {
            assert_eq!(payload, WARNING_LABEL);
            assert_eq!(unpack_text(&payload), "Limit reached");
        }
        ref other => panic!("expected warning label, got {:?}", other),
    }
}

#[test]
fn test_exactly_limit_elements_fit() {
    let calc = context_with_count(10, 10.0);
    assert_eq!(calc.published_snapshot().len(), 10);
    assert_eq!(calc.cap_hits(), 0);
    assert_eq!(calc.run_state(), RunState::FinishedConsumed);
}

#[test]
fn test_one_over_limit_publishes_warning() {
    let calc = context_with_count(10, 11.0);
    assert_warning_visual(&calc.published_snapshot());
    assert_eq!(calc.cap_hits(), 1);
    assert_eq!(calc.run_state(), RunState::Stopped);
}

#[test]
fn test_endless_emitter_is_stopped() {
    let calc = run_formula_with("while 1 { circle(0, 0, 1) }", limited(100));
    assert_warning_visual(&calc.published_snapshot());
    assert_eq!(calc.run_state(), RunState::Stopped);
}

#[test]
fn test_capped_context_waits_for_a_change() {
    let mut calc = context_with_count(10, 50.0);
    assert_eq!(calc.workers_spawned(), 1);

    let report = calc.tick().unwrap();
    assert!(!report.restarted);
    assert!(!report.finished);
    assert_eq!(calc.workers_spawned(), 1);

    calc.set_param(0, 4.0).unwrap();
    settle(&mut calc);
    assert_eq!(circle_radii(&calc.published_snapshot()), vec![1.0; 4]);
    assert_eq!(calc.run_state(), RunState::FinishedConsumed);
    assert_eq!(calc.cap_hits(), 1);
}

#[test]
fn test_cap_applies_to_any_engine() {
    let mut calc = DrawCalc::new(ScriptedEngine::new(), limited(3)).unwrap();
    calc.commit_formula("circles 4");
    settle(&mut calc);
    assert_warning_visual(&calc.published_snapshot());
    assert_eq!(calc.cap_hits(), 1);
}
