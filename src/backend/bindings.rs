//! The drawcalc host table
//!
//! Builds the fixed set of names a formula may use: the symbol emitters, the
//! value store, the per-pass input variables and a handful of math helpers.
//! A fresh table is built for every compile; the emitters share the worker's
//! scratch buffer and the store outlives every table.

use std::f64::consts::{PI, TAU};
use std::sync::Arc;

use parking_lot::Mutex;

use super::host_table::HostTable;
use super::inputs::WorkingVars;
use super::store::ValueStore;
use super::symbol::Point;
use super::symbol_buffer::ScratchBuffer;

/// Value returned by every emitter
const EMITTED: f64 = 0.0;

/// Saturating truncation used for ids, indices and bit operations (NaN gives 0)
#[inline]
fn trunc(v: f64) -> i64 {
    v as i64
}

/// Build the host table bound to one worker's scratch buffer and inputs
pub fn drawcalc_host_table(
    scratch: Arc<Mutex<ScratchBuffer>>,
    store: Arc<ValueStore>,
    vars: &WorkingVars,
) -> HostTable {
    let mut table = HostTable::new();
    register_emitters(&mut table, scratch);
    register_store(&mut table, store);
    register_inputs(&mut table, vars);
    register_math(&mut table);
    table
}

fn register_emitters(table: &mut HostTable, scratch: Arc<Mutex<ScratchBuffer>>) {
    let buf = scratch.clone();
    table.register_fn("colour", 3, move |a| {
        buf.lock().set_rgb(a[0], a[1], a[2]);
        EMITTED
    });

    // A capped pass ignores emissions; the error is already reported by the guard
    let buf = scratch.clone();
    table.register_fn("line", 5, move |a| {
        let _ = buf.lock().line(a[0], a[1], a[2], a[3], a[4]);
        EMITTED
    });

    let buf = scratch.clone();
    table.register_fn("rect", 6, move |a| {
        let _ = buf.lock().rect(a[0], a[1], a[2], a[3], a[4], a[5]);
        EMITTED
    });

    let buf = scratch.clone();
    table.register_fn("quad", 9, move |a| {
        let points = [
            Point::new(a[0], a[1]),
            Point::new(a[2], a[3]),
            Point::new(a[4], a[5]),
            Point::new(a[6], a[7]),
        ];
        let _ = buf.lock().quad(points, a[8]);
        EMITTED
    });

    let buf = scratch.clone();
    table.register_fn("circle", 3, move |a| {
        let _ = buf.lock().circle(a[0], a[1], a[2]);
        EMITTED
    });

    let buf = scratch.clone();
    table.register_fn("number", 6, move |a| {
        let _ = buf.lock().number(a[0], a[1], a[2], a[3], a[4], a[5]);
        EMITTED
    });

    let buf = scratch;
    table.register_fn("text", 6, move |a| {
        let _ = buf.lock().text(a[0], a[1], a[2], a[3], a[4], a[5]);
        EMITTED
    });
}

fn register_store(table: &mut HostTable, store: Arc<ValueStore>) {
    let s = store.clone();
    table.register_fn("store_clear", 0, move |_| {
        s.clear();
        0.0
    });

    let s = store.clone();
    table.register_fn("store", 3, move |a| {
        s.store_sentinel(trunc(a[0]), trunc(a[1]), a[2])
    });

    let s = store;
    table.register_fn("load", 2, move |a| s.retrieve(trunc(a[0]), trunc(a[1])));
}

fn register_inputs(table: &mut HostTable, vars: &WorkingVars) {
    table.register_var("angle", vars.angle.clone());
    table.register_var("time", vars.time.clone());
    for (i, cell) in vars.k.iter().enumerate() {
        table.register_var(&format!("k{}", i), cell.clone());
    }
}

fn register_math(table: &mut HostTable) {
    table.register_fn("sqrt", 1, |a| a[0].sqrt());
    table.register_fn("sin", 1, |a| a[0].sin());
    table.register_fn("cos", 1, |a| a[0].cos());
    table.register_fn("tan", 1, |a| a[0].tan());
    table.register_fn("asin", 1, |a| a[0].asin());
    table.register_fn("acos", 1, |a| a[0].acos());
    table.register_fn("atan", 1, |a| a[0].atan());
    table.register_fn("atan2", 2, |a| a[0].atan2(a[1]));
    table.register_fn("exp", 1, |a| a[0].exp());
    table.register_fn("ln", 1, |a| a[0].ln());
    table.register_fn("log10", 1, |a| a[0].log10());
    table.register_fn("abs", 1, |a| a[0].abs());
    table.register_fn("floor", 1, |a| a[0].floor());
    table.register_fn("ceil", 1, |a| a[0].ceil());
    table.register_fn("round", 1, |a| a[0].round());
    table.register_fn("min", 2, |a| a[0].min(a[1]));
    table.register_fn("max", 2, |a| a[0].max(a[1]));
    table.register_fn("pi", 0, |_| PI);
    table.register_fn("xor", 2, |a| (trunc(a[0]) ^ trunc(a[1])) as f64);
    // Cosine of an angle given in turns
    table.register_fn("cos_tr_d2", 1, |a| (a[0] * TAU).cos());
}
