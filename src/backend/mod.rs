//! Live formula backend
//!
//! The pieces of the compile/execute/publish pipeline, leaves first:
//! - `store`, `host_table`, `bindings`: what a formula can call
//! - `symbol_buffer`, `emitter`, `publish`: where its output goes
//! - `worker`, `lifecycle`, `manager`: who runs it and when
//! - `context`: the object that owns all of it

pub mod bindings;
pub mod config;
pub mod context;
pub mod diagnostics;
pub mod emitter;
pub mod engine;
pub mod growth;
pub mod host_table;
pub mod inputs;
pub mod lifecycle;
pub mod manager;
pub mod publish;
pub mod render;
pub mod run_state;
pub mod store;
pub mod symbol;
pub mod symbol_buffer;
pub mod text_codec;
pub mod worker;

pub use config::{ConfigError, DrawCalcConfig};
pub use context::{DrawCalc, DrawCalcError};
pub use engine::{CompileLog, CompileMessage, ExecOutcome, ExpressionEngine};
pub use host_table::{HostBinding, HostError, HostTable, VarCell};
pub use inputs::{InputError, InputValues};
pub use manager::TickReport;
pub use render::{render, ListingRenderer, SymbolRenderer};
pub use run_state::{CancelToken, RunFlag, RunState};
pub use store::{StoreError, ValueStore};
pub use symbol::{Colour, Point, RectArea, Symbol};
pub use symbol_buffer::ElementCapExceeded;
pub use text_codec::{pack_text, unpack_text, TextCodecError};
