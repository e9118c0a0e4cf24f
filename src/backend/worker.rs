//! Execution worker
//!
//! One worker owns one compiled program for its whole life. It compiles the
//! formula text it was started with, reports the compile log and listing,
//! then runs passes until nothing asks for another one or the run flag
//! leaves `Running`.
//!
//! A pass: reset the scratch buffer, latch the inputs, execute the program
//! once, publish. Inputs changed during a pass trigger exactly one more
//! pass; animation keeps the loop going on its own.

use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;
use tracing::{debug, trace, warn};

use super::bindings::drawcalc_host_table;
use super::diagnostics::{Diagnostic, DiagnosticsSink};
use super::engine::{ExecOutcome, ExpressionEngine};
use super::inputs::{AnimationClock, SharedInputs, WorkingVars};
use super::publish::PublishedBuffer;
use super::run_state::{CancelToken, RunFlag};
use super::store::ValueStore;
use super::symbol_buffer::ScratchBuffer;

/// State shared by every worker of one context
#[derive(Debug)]
pub struct WorkerShared {
    pub run: RunFlag,
    pub scratch: Arc<Mutex<ScratchBuffer>>,
    pub published: Arc<PublishedBuffer>,
    pub store: Arc<ValueStore>,
    pub inputs: Arc<SharedInputs>,
    /// Survives restarts so a recompile does not reset the animation epoch
    pub clock: Mutex<AnimationClock>,
    pub diagnostics: DiagnosticsSink,
}

/// What happened in one pass
#[derive(Debug, Clone, PartialEq)]
pub struct PassReport {
    pub outcome: ExecOutcome,
    pub capped: bool,
    pub published: bool,
    pub animating: bool,
}

/// A worker bound to one formula text
pub struct ExecutionWorker<E: ExpressionEngine> {
    engine: Arc<E>,
    shared: Arc<WorkerShared>,
    source: String,
}

impl<E: ExpressionEngine> ExecutionWorker<E> {
    pub fn new(engine: Arc<E>, shared: Arc<WorkerShared>, source: String) -> Self {
        Self {
            engine,
            shared,
            source,
        }
    }

    /// Thread body: compile, loop passes, then record the exit
    pub fn run(self) {
        let run = self.shared.run.clone();
        let vars = WorkingVars::new();
        let table = Arc::new(drawcalc_host_table(
            self.shared.scratch.clone(),
            self.shared.store.clone(),
            &vars,
        ));

        let (mut program, log) = self.engine.compile(&self.source, table);
        let log_text = log.map(|l| l.to_string()).unwrap_or_default();
        if !log_text.is_empty() {
            warn!(target: "drawcalc::worker", log = %log_text, "Formula compiled with errors");
        }
        self.shared.diagnostics.send(Diagnostic::CompileLog(log_text));
        self.shared
            .diagnostics
            .send(Diagnostic::Decompiled(self.engine.decompile(&program)));

        let cancel = CancelToken::new(run.clone());
        let mut passes: u64 = 0;

        while run.is_running() {
            let report = self.pass(&mut program, &vars, &cancel);
            passes += 1;

            // Read-and-clear first so a change is never lost between the check and the exit
            let changed = self.shared.inputs.take_changed();
            if !(changed || report.animating) {
                break;
            }
        }

        drop(program);
        let finished = run.finish();
        debug!(
            target: "drawcalc::worker",
            passes,
            finished,
            "Worker exiting"
        );
    }

    /// Run exactly one pass of `program`
    pub fn pass(&self, program: &mut E::Program, vars: &WorkingVars, cancel: &CancelToken) -> PassReport {
        self.shared.scratch.lock().begin_pass();

        let mut values = self.shared.inputs.snapshot();
        let time = self.shared.clock.lock().advance(
            Instant::now(),
            values.time,
            values.time_rate,
            values.animation,
        );
        if values.animation {
            values.time = time;
            self.shared.inputs.store_animated_time(time);
        }
        vars.latch(&values);

        let outcome = self.engine.execute(program, cancel);

        let scratch = self.shared.scratch.lock();
        let capped = scratch.is_capped();

        if capped {
            self.shared.diagnostics.send(Diagnostic::CapExceeded {
                limit: scratch.limit(),
            });
        }
        if let ExecOutcome::Fault(reason) = &outcome {
            warn!(target: "drawcalc::worker", reason = %reason, "Program faulted");
            self.shared.diagnostics.send(Diagnostic::Fault(reason.clone()));
        }

        let published = capped || outcome != ExecOutcome::Cancelled;
        if published {
            self.shared.published.publish(scratch.symbols());
        }
        trace!(
            target: "drawcalc::worker",
            symbols = scratch.len(),
            published,
            "Pass done"
        );

        PassReport {
            outcome,
            capped,
            published,
            animating: values.animation,
        }
    }
}
