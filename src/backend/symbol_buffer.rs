//! Scratch symbol buffer and element cap guard
//!
//! The scratch buffer is filled by exactly one writer, the execution worker,
//! during one pass. Its logical length resets at the start of every pass while
//! the backing capacity is kept. Capacity grows geometrically up to the
//! element limit.
//!
//! When a pass asks for one element more than the limit, the cap guard fires:
//! the run flag is stopped, the backing allocation is released, and the
//! buffer is replaced by a fixed warning visual. Every later emission in the
//! same pass is ignored.

use std::fmt;

use tracing::warn;

use super::growth::grown_len;
use super::run_state::RunFlag;
use super::symbol::{Colour, Symbol};

/// Colour register value at the start of every pass
pub const PASS_START_COLOUR: Colour = Colour::new(3.0, -1.0, 2.0, 1.0);

/// Packed "Limit reached" label of the warning visual
pub const WARNING_LABEL: [u64; 2] = [245911947980, 3589306291512];

/// The pass exceeded the element limit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ElementCapExceeded {
    pub limit: usize,
}

impl fmt::Display for ElementCapExceeded {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "element limit of {} symbols exceeded", self.limit)
    }
}

impl std::error::Error for ElementCapExceeded {}

/// Per-pass symbol buffer with its colour register
#[derive(Debug)]
pub struct ScratchBuffer {
    symbols: Vec<Symbol>,
    pub(crate) colour: Colour,
    limit: usize,
    growth: f64,
    capped: bool,
    run: RunFlag,
}

impl ScratchBuffer {
    pub fn new(limit: usize, growth: f64, run: RunFlag) -> Self {
        Self {
            symbols: Vec::new(),
            colour: PASS_START_COLOUR,
            limit,
            growth,
            capped: false,
            run,
        }
    }

    /// Reset for a new pass; capacity is retained
    pub fn begin_pass(&mut self) {
        self.symbols.clear();
        self.colour = PASS_START_COLOUR;
        self.capped = false;
    }

    /// Symbols emitted so far in this pass
    pub fn symbols(&self) -> &[Symbol] {
        &self.symbols
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Backing capacity
    pub fn capacity(&self) -> usize {
        self.symbols.capacity()
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// True once the cap guard fired in this pass
    pub fn is_capped(&self) -> bool {
        self.capped
    }

    /// Current colour register
    pub fn colour(&self) -> Colour {
        self.colour
    }

    pub fn set_colour(&mut self, colour: Colour) {
        self.colour = colour;
    }

    /// Reserve the next scratch index.
    ///
    /// The limit check comes before any growth, so capacity never exceeds
    /// the limit.
    pub fn allocate(&mut self) -> Result<usize, ElementCapExceeded> {
        if self.capped {
            return Err(ElementCapExceeded { limit: self.limit });
        }

        let index = self.symbols.len();
        if index >= self.limit {
            self.trip_cap_guard();
            return Err(ElementCapExceeded { limit: self.limit });
        }

        let capacity = self.symbols.capacity();
        let wanted = grown_len(capacity, index + 1, self.growth, self.limit);
        if wanted > capacity {
            self.symbols.reserve_exact(wanted - index);
        }

        Ok(index)
    }

    /// Append one symbol through the cap guard
    pub fn emit(&mut self, symbol: Symbol) -> Result<usize, ElementCapExceeded> {
        let index = self.allocate()?;
        self.symbols.push(symbol);
        Ok(index)
    }

    fn trip_cap_guard(&mut self) {
        warn!(
            target: "drawcalc::cap_guard",
            limit = self.limit,
            "Element limit reached, abandoning pass"
        );

        self.run.stop();
        self.symbols = Vec::new();
        self.capped = true;

        // The warning bypasses allocate() so it always fits
        self.colour = Colour::opaque(1.0, 0.05, 0.0);
        let line = self.line_symbol(-7.0, 0.0, 7.0, 0.0, 1.5);
        self.colour = Colour::opaque(1.0, 0.7, 0.0);
        let label = self.text_symbol(0.0, 0.0, 1.5, 9.0, WARNING_LABEL);
        self.symbols = vec![line, label];
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::run_state::RunState;
    use crate::backend::symbol::Point;
    use crate::backend::text_codec::unpack_text;

    fn running_buffer(limit: usize) -> (ScratchBuffer, RunFlag) {
        let run = RunFlag::new();
        run.start();
        (ScratchBuffer::new(limit, 1.4, run.clone()), run)
    }

    fn dot(r: f64) -> Symbol {
        Symbol::Circle {
            colour: PASS_START_COLOUR,
            centre: Point::default(),
            radius: r,
        }
    }

    #[test]
    fn test_allocate_sequential_indices() {
        let (mut buf, _) = running_buffer(100);
        assert_eq!(buf.emit(dot(1.0)).unwrap(), 0);
        assert_eq!(buf.emit(dot(2.0)).unwrap(), 1);
        assert_eq!(buf.len(), 2);
    }

    #[test]
    fn test_capacity_grows_geometrically_and_is_retained() {
        let (mut buf, _) = running_buffer(1000);
        buf.emit(dot(0.0)).unwrap();
        let first = buf.capacity();
        assert!(first >= 1);

        for i in 0..50 {
            buf.emit(dot(i as f64)).unwrap();
        }
        let grown = buf.capacity();
        assert!(grown >= 51);
        assert!(grown <= 1000);

        buf.begin_pass();
        assert!(buf.is_empty());
        assert_eq!(buf.capacity(), grown);
        assert_eq!(buf.colour(), PASS_START_COLOUR);
    }

    #[test]
    fn test_exactly_limit_elements_fit() {
        let (mut buf, run) = running_buffer(10);
        for i in 0..10 {
            buf.emit(dot(i as f64)).unwrap();
        }
        assert_eq!(buf.len(), 10);
        assert!(!buf.is_capped());
        assert!(run.is_running());
    }

    #[test]
    fn test_cap_guard_fires_on_limit_plus_one() {
        let (mut buf, run) = running_buffer(4);
        for i in 0..4 {
            buf.emit(dot(i as f64)).unwrap();
        }
        assert!(run.is_running());

        let err = buf.emit(dot(99.0)).unwrap_err();
        assert_eq!(err, ElementCapExceeded { limit: 4 });
        assert!(buf.is_capped());
        assert_eq!(run.state(), RunState::Stopped);

        let symbols = buf.symbols();
        assert_eq!(symbols.len(), 2);
        match symbols[0] {
            Symbol::Line { p0, p1, blur, colour } => {
                assert_eq!(p0, Point::new(-7.0, 0.0));
                assert_eq!(p1, Point::new(7.0, 0.0));
                assert_eq!(blur, 1.5);
                assert_eq!(colour, Colour::opaque(1.0, 0.05, 0.0));
            }
            other => panic!("expected warning line, got {:?}", other),
        }
        match symbols[1] {
            Symbol::Text { payload, .. } => assert_eq!(unpack_text(&payload), "Limit reached"),
            other => panic!("expected warning label, got {:?}", other),
        }
    }

    #[test]
    fn test_emissions_ignored_after_cap() {
        let (mut buf, _) = running_buffer(1);
        buf.emit(dot(0.0)).unwrap();
        assert!(buf.emit(dot(1.0)).is_err());
        assert!(buf.emit(dot(2.0)).is_err());
        assert_eq!(buf.len(), 2, "only the warning visual remains");
    }

    #[test]
    fn test_begin_pass_clears_cap() {
        let (mut buf, _) = running_buffer(1);
        buf.emit(dot(0.0)).unwrap();
        let _ = buf.emit(dot(1.0));
        buf.begin_pass();
        assert!(!buf.is_capped());
        assert!(buf.emit(dot(3.0)).is_ok());
    }
}
