//! Expression Engine interface
//!
//! The worker drives any engine through this trait: compile a formula
//! against a host table, execute the resulting program once per pass, and
//! decompile it for display. Dropping a program frees it.
//!
//! An engine never fails to produce a program. On compile errors it returns
//! a usable (possibly no-op) program together with a [`CompileLog`].

use std::fmt;
use std::sync::Arc;

use itertools::Itertools;

use super::host_table::HostTable;
use super::run_state::CancelToken;

/// One compile diagnostic with its source position (1-based)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileMessage {
    pub line: u32,
    pub column: u32,
    pub message: String,
}

impl fmt::Display for CompileMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, column {}: {}", self.line, self.column, self.message)
    }
}

/// Compile log; one message per line when displayed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompileLog {
    pub messages: Vec<CompileMessage>,
}

impl CompileLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, line: u32, column: u32, message: impl Into<String>) {
        self.messages.push(CompileMessage {
            line,
            column,
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }
}

impl fmt::Display for CompileLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.messages.iter().join("\n"))
    }
}

/// How one execution of a program ended
#[derive(Debug, Clone, PartialEq)]
pub enum ExecOutcome {
    /// The program ran to its end
    Completed,
    /// The cancel token was observed and execution stopped early
    Cancelled,
    /// The program could not continue
    Fault(String),
}

/// A formula compiler and executor
pub trait ExpressionEngine: Send + Sync + 'static {
    /// Compiled artifact; owned by one worker at a time
    type Program: Send + 'static;

    /// Compile `source`, resolving identifiers against `table`
    fn compile(&self, source: &str, table: Arc<HostTable>) -> (Self::Program, Option<CompileLog>);

    /// Run one pass of `program`, polling `cancel` at a bounded cadence
    fn execute(&self, program: &mut Self::Program, cancel: &CancelToken) -> ExecOutcome;

    /// Human-readable listing of `program`
    fn decompile(&self, program: &Self::Program) -> String;
}
