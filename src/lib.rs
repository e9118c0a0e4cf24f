//! drawcalc - live-recompiling drawing formula engine
//!
//! A formula is compiled against a fixed table of host functions and run on
//! a background worker. Each pass emits drawing symbols (lines, rectangles,
//! quads, circles, numbers, text) into a scratch buffer which is published
//! atomically for the renderer once the pass ends.
//!
//! # Architecture
//!
//! 1. **Formula language** (`formula` module)
//!    - Lexer and recursive-descent parser with per-statement error recovery
//!    - Compiler to stack bytecode, resolving names against the host table
//!    - VM that polls a cancel token at a bounded instruction cadence
//!
//! 2. **Backend** (`backend` module)
//!    - Host function table and the drawing, store and math bindings
//!    - Scratch symbol buffer with an element cap, published by swap
//!    - Execution worker, its lifecycle controller and the compilation manager
//!    - Persistent value store shared across passes and recompiles
//!    - Base-98 text codec used by the `text` emitter
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use drawcalc::{DrawCalc, DrawCalcConfig, ListingRenderer};
//!
//! let mut calc = DrawCalc::with_default_engine(DrawCalcConfig::default())?;
//! calc.commit_formula("line(0, 0, angle, 1, 0)");
//! calc.set_angle(0.5);
//! calc.tick()?;
//! calc.wait_for_pass_completion(Duration::from_secs(1));
//! calc.tick()?;
//!
//! let mut listing = ListingRenderer::new();
//! calc.render_published(&mut listing);
//! print!("{}", listing.as_str());
//! # Ok::<(), drawcalc::DrawCalcError>(())
//! ```

pub mod backend;
pub mod formula;

pub use backend::{
    pack_text, render, unpack_text, CancelToken, Colour, CompileLog, ConfigError, DrawCalc,
    DrawCalcConfig, DrawCalcError, ExecOutcome, ExpressionEngine, HostTable, InputValues,
    ListingRenderer, Point, RectArea, RunFlag, RunState, Symbol, SymbolRenderer, TickReport, ValueStore,
};
pub use formula::{FormulaEngine, FormulaProgram};
