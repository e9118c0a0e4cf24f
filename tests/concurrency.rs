//! Publication consistency under concurrent input changes
//!
//! The renderer side must only ever see a buffer produced by one complete
//! pass: every circle drawn by `LOOP` carries the count it was drawn with as
//! its radius, so a mixed or partial buffer shows up as mismatched radii.

mod common;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use common::{circle_radii, settle};
use drawcalc::backend::publish::PublishedBuffer;
use drawcalc::{Colour, DrawCalc, DrawCalcConfig, Point, Symbol};

const LOOP: &str = "i = 0; while i < k0 { circle(i, 0, k0); i = i + 1 }";

fn assert_consistent(symbols: &[Symbol]) {
    let radii = circle_radii(symbols);
    assert_eq!(radii.len(), symbols.len());
    if let Some(&r) = radii.first() {
        assert_eq!(radii.len() as f64, r, "buffer mixes passes: {:?}", radii);
        assert!(radii.iter().all(|&x| x == r), "buffer mixes passes: {:?}", radii);
    }
}

#[test]
fn test_published_buffer_is_never_mixed() {
    let mut calc = DrawCalc::with_default_engine(DrawCalcConfig::default()).unwrap();
    calc.commit_formula(LOOP);

    for step in 0..300u32 {
        let count = f64::from(step % 97 + 1) * 10.0;
        calc.set_param(0, count).unwrap();
        calc.tick().unwrap();
        calc.with_published(assert_consistent);
        if step % 7 == 0 {
            thread::sleep(Duration::from_micros(200));
        }
    }

    calc.set_param(0, 25.0).unwrap();
    settle(&mut calc);
    // A change landing just as the worker exits restarts it on the settling tick
    settle(&mut calc);
    let symbols = calc.published_snapshot();
    assert_consistent(&symbols);
    assert_eq!(symbols.len(), 25);
}

#[test]
fn test_reader_thread_sees_whole_passes() {
    let published = Arc::new(PublishedBuffer::new());
    let done = Arc::new(AtomicBool::new(false));

    let reader = {
        let published = published.clone();
        let done = done.clone();
        thread::spawn(move || {
            let mut reads = 0u64;
            loop {
                published.with_published(assert_consistent);
                reads += 1;
                if done.load(Ordering::Acquire) {
                    return reads;
                }
            }
        })
    };

    // Writer publishes passes of varying size, as a worker would
    for count in 1..=200usize {
        let pass: Vec<Symbol> = (0..count)
            .map(|i| Symbol::Circle {
                colour: Colour::opaque(1.0, 1.0, 1.0),
                centre: Point::new(i as f64, 0.0),
                radius: count as f64,
            })
            .collect();
        published.publish(&pass);
    }
    done.store(true, Ordering::Release);

    assert!(reader.join().unwrap() > 0);
    assert_eq!(published.len(), 200);
    assert_eq!(published.generation(), 200);
}

#[test]
fn test_rapid_recommits_end_on_last_formula() {
    let mut calc = DrawCalc::with_default_engine(DrawCalcConfig::default()).unwrap();
    for n in 1..=50 {
        calc.commit_formula(&format!("i = 0; while i < {n} {{ circle(i, 0, {n}); i = i + 1 }}"));
        calc.tick().unwrap();
    }
    settle(&mut calc);

    let symbols = calc.published_snapshot();
    assert_eq!(symbols.len(), 50);
    assert_consistent(&symbols);
    assert_eq!(calc.workers_spawned(), 50);
}
