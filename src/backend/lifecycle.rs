//! Thread lifecycle controller
//!
//! A single-slot supervisor: at most one worker thread exists. Restarting
//! stops the run flag, waits for the current worker to return on its own,
//! then spawns the next one. There is no timeout; a program that never polls
//! its cancel token can hold up a restart.

use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use tracing::{debug, error, warn};

use super::engine::ExpressionEngine;
use super::worker::{ExecutionWorker, WorkerShared};

/// Name given to every worker thread
pub const WORKER_THREAD_NAME: &str = "drawcalc-worker";

pub struct LifecycleController<E: ExpressionEngine> {
    engine: Arc<E>,
    shared: Arc<WorkerShared>,
    handle: Option<JoinHandle<()>>,
    spawned: u64,
}

impl<E: ExpressionEngine> LifecycleController<E> {
    pub fn new(engine: Arc<E>, shared: Arc<WorkerShared>) -> Self {
        Self {
            engine,
            shared,
            handle: None,
            spawned: 0,
        }
    }

    /// Replace the current worker with one running `source`
    pub fn restart(&mut self, source: &str) -> io::Result<()> {
        self.stop();

        self.shared.run.start();
        let worker = ExecutionWorker::new(self.engine.clone(), self.shared.clone(), source.to_owned());

        let spawned = thread::Builder::new()
            .name(WORKER_THREAD_NAME.to_string())
            .spawn(move || worker.run());

        match spawned {
            Ok(handle) => {
                self.handle = Some(handle);
                self.spawned += 1;
                debug!(target: "drawcalc::lifecycle", generation = self.spawned, "Worker started");
                Ok(())
            }
            Err(e) => {
                self.shared.run.stop();
                error!(target: "drawcalc::lifecycle", error = %e, "Failed to spawn worker");
                Err(e)
            }
        }
    }

    /// Cancel the current worker, if any, and wait for it to return
    pub fn stop(&mut self) {
        self.shared.run.stop();
        self.join();
    }

    fn join(&mut self) {
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!(target: "drawcalc::lifecycle", "Worker thread panicked");
            }
        }
    }

    /// True while a worker thread has been spawned and not joined
    pub fn has_worker(&self) -> bool {
        self.handle.is_some()
    }

    /// Number of workers spawned so far
    pub fn spawned(&self) -> u64 {
        self.spawned
    }
}

impl<E: ExpressionEngine> Drop for LifecycleController<E> {
    fn drop(&mut self) {
        self.stop();
    }
}
