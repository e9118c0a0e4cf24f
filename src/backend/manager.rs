//! Compilation manager
//!
//! Owns the committed formula text and decides, once per external tick,
//! whether the worker has to be restarted. It also observes worker exits and
//! collects the worker's diagnostics for display.

use std::io;
use std::sync::Arc;

use tracing::{debug, info};

use super::diagnostics::{Diagnostic, DiagnosticsSource};
use super::engine::ExpressionEngine;
use super::lifecycle::LifecycleController;
use super::run_state::RunState;
use super::worker::WorkerShared;

/// What one tick did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    /// A new worker was started
    pub restarted: bool,
    /// A worker exit was observed for the first time
    pub finished: bool,
}

pub struct CompilationManager<E: ExpressionEngine> {
    controller: LifecycleController<E>,
    shared: Arc<WorkerShared>,
    diagnostics: DiagnosticsSource,
    formula: String,
    draft: Option<String>,
    recalc: bool,
    compile_log: String,
    decompiled: String,
    last_fault: Option<String>,
    cap_hits: u64,
}

impl<E: ExpressionEngine> CompilationManager<E> {
    pub fn new(engine: Arc<E>, shared: Arc<WorkerShared>, diagnostics: DiagnosticsSource) -> Self {
        Self {
            controller: LifecycleController::new(engine, shared.clone()),
            shared,
            diagnostics,
            formula: String::new(),
            draft: None,
            recalc: false,
            compile_log: String::new(),
            decompiled: String::new(),
            last_fault: None,
            cap_hits: 0,
        }
    }

    /// Record an edit without recompiling
    pub fn set_formula(&mut self, text: &str) {
        self.draft = Some(text.to_owned());
    }

    /// Make `text` the committed formula and request a recompile
    pub fn commit_formula(&mut self, text: &str) {
        self.formula = text.to_owned();
        self.draft = None;
        self.recalc = true;
    }

    /// Commit the pending edit, if there is one
    pub fn commit_draft(&mut self) -> bool {
        match self.draft.take() {
            Some(text) => {
                self.formula = text;
                self.recalc = true;
                true
            }
            None => false,
        }
    }

    pub fn formula(&self) -> &str {
        &self.formula
    }

    pub fn draft(&self) -> Option<&str> {
        self.draft.as_deref()
    }

    /// Once-per-tick poll.
    ///
    /// Input changes only restart a worker that is not running; a running
    /// worker picks them up through its own changed flag.
    pub fn tick(&mut self) -> io::Result<TickReport> {
        let mut report = TickReport::default();

        if self.shared.run.consume() {
            report.finished = true;
        }

        if self.shared.inputs.is_changed() && self.shared.run.state() != RunState::Running {
            self.recalc = true;
        }

        if self.recalc {
            // The new worker's first pass latches every input
            self.shared.inputs.take_changed();
            self.controller.restart(&self.formula)?;
            self.recalc = false;
            report.restarted = true;
            debug!(target: "drawcalc::manager", "Recompile requested");
        }

        self.collect_diagnostics();
        Ok(report)
    }

    fn collect_diagnostics(&mut self) {
        for diagnostic in self.diagnostics.drain() {
            match diagnostic {
                Diagnostic::CompileLog(text) => self.compile_log = text,
                Diagnostic::Decompiled(text) => self.decompiled = text,
                Diagnostic::Fault(reason) => self.last_fault = Some(reason),
                Diagnostic::CapExceeded { limit } => {
                    self.cap_hits += 1;
                    info!(target: "drawcalc::manager", limit, "Pass hit the element limit");
                }
            }
        }
    }

    /// Log of the most recent compile; empty on success
    pub fn compile_log(&self) -> &str {
        &self.compile_log
    }

    pub fn decompiled(&self) -> &str {
        &self.decompiled
    }

    pub fn last_fault(&self) -> Option<&str> {
        self.last_fault.as_deref()
    }

    /// Number of passes that hit the element limit
    pub fn cap_hits(&self) -> u64 {
        self.cap_hits
    }

    pub fn workers_spawned(&self) -> u64 {
        self.controller.spawned()
    }

    /// Stop and join the current worker
    pub fn shutdown(&mut self) {
        self.controller.stop();
        self.collect_diagnostics();
    }
}
