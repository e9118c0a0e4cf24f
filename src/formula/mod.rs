//! Built-in formula language
//!
//! A small imperative expression language compiled to stack bytecode:
//!
//! ```text
//! r = 0.2 + 0.1 * k0;
//! i = 0;
//! while i < 12 {
//!     a = angle + i * pi() / 6;
//!     circle(cos(a), sin(a), r);
//!     i = i + 1
//! }
//! ```
//!
//! Identifiers resolve against the [`HostTable`] at compile time. Names not
//! bound by the host become locals, which start at zero on every pass.

pub mod chunk;
pub mod compiler;
pub mod opcodes;
pub mod syntax;
pub mod vm;

use std::sync::Arc;

use tracing::trace;

use crate::backend::config::DEFAULT_POLL_INTERVAL;
use crate::backend::engine::{CompileLog, ExecOutcome, ExpressionEngine};
use crate::backend::host_table::HostTable;
use crate::backend::run_state::CancelToken;

pub use chunk::{Chunk, ChunkBuilder};
pub use compiler::compile;
pub use opcodes::Opcode;
pub use vm::{VmError, VmExit, VmState};

/// Bytecode engine for the built-in formula language
#[derive(Debug, Clone, Copy)]
pub struct FormulaEngine {
    poll_interval: u32,
}

impl FormulaEngine {
    /// Engine that polls for cancellation every `poll_interval` instructions
    pub fn new(poll_interval: u32) -> Self {
        Self {
            poll_interval: poll_interval.max(1),
        }
    }

    pub fn poll_interval(&self) -> u32 {
        self.poll_interval
    }
}

impl Default for FormulaEngine {
    fn default() -> Self {
        Self::new(DEFAULT_POLL_INTERVAL)
    }
}

/// A compiled formula bound to the table it was resolved against
#[derive(Debug)]
pub struct FormulaProgram {
    chunk: Chunk,
    host: Arc<HostTable>,
    state: VmState,
}

impl FormulaProgram {
    pub fn new(chunk: Chunk, host: Arc<HostTable>) -> Self {
        Self {
            chunk,
            host,
            state: VmState::new(),
        }
    }

    pub fn chunk(&self) -> &Chunk {
        &self.chunk
    }

    pub fn host(&self) -> &HostTable {
        &self.host
    }

    /// Instructions executed by the last pass
    pub fn executed(&self) -> u64 {
        self.state.executed()
    }
}

impl ExpressionEngine for FormulaEngine {
    type Program = FormulaProgram;

    fn compile(&self, source: &str, table: Arc<HostTable>) -> (FormulaProgram, Option<CompileLog>) {
        match compile(source, &table) {
            Ok(chunk) => (FormulaProgram::new(chunk, table), None),
            // A failed compile still yields a runnable program that draws nothing
            Err(log) => (FormulaProgram::new(Chunk::noop(), table), Some(log)),
        }
    }

    fn execute(&self, program: &mut FormulaProgram, cancel: &CancelToken) -> ExecOutcome {
        let result = vm::run(
            &program.chunk,
            &program.host,
            &mut program.state,
            cancel,
            self.poll_interval,
        );
        trace!(
            target: "drawcalc::formula",
            executed = program.state.executed(),
            "pass finished"
        );
        match result {
            Ok(VmExit::Halted) => ExecOutcome::Completed,
            Ok(VmExit::Cancelled) => ExecOutcome::Cancelled,
            Err(e) => ExecOutcome::Fault(e.to_string()),
        }
    }

    fn decompile(&self, program: &FormulaProgram) -> String {
        program.chunk.disassemble(Some(&program.host))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::host_table::VarCell;

    fn table() -> (Arc<HostTable>, VarCell) {
        let out = VarCell::default();
        let mut host = HostTable::new();
        host.register_var("out", out.clone());
        (Arc::new(host), out)
    }

    #[test]
    fn test_compile_and_execute() {
        let engine = FormulaEngine::default();
        let (host, out) = table();
        let (mut program, log) = engine.compile("out = 6 * 7", host);
        assert!(log.is_none());
        assert_eq!(engine.execute(&mut program, &CancelToken::detached()), ExecOutcome::Completed);
        assert_eq!(out.get(), 42.0);
        assert!(program.executed() > 0);
    }

    #[test]
    fn test_failed_compile_runs_as_noop() {
        let engine = FormulaEngine::default();
        let (host, out) = table();
        let (mut program, log) = engine.compile("out = nope", host);
        let log = log.unwrap();
        assert!(log.to_string().contains("unknown variable 'nope'"));
        assert_eq!(engine.execute(&mut program, &CancelToken::detached()), ExecOutcome::Completed);
        assert_eq!(out.get(), 0.0);
    }

    #[test]
    fn test_decompile_names_host_entries() {
        let engine = FormulaEngine::default();
        let (host, _) = table();
        let (program, _) = engine.compile("x = 2.5; out = x", host);
        let listing = engine.decompile(&program);
        assert!(listing.contains("locals: 1 [x]"));
        assert!(listing.contains("store_host out"));
        assert!(listing.contains("halt"));
    }

    #[test]
    fn test_zero_poll_interval_clamped() {
        assert_eq!(FormulaEngine::new(0).poll_interval(), 1);
    }
}
