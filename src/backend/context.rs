//! The drawcalc context
//!
//! [`DrawCalc`] owns every piece of one live formula: the committed text,
//! the worker supervisor, the published buffer, the inputs and the value
//! store. Build one, pass it around by reference, call [`DrawCalc::tick`]
//! once per frame.
//!
//! ```no_run
//! use std::time::Duration;
//! use drawcalc::{DrawCalc, DrawCalcConfig};
//!
//! let mut calc = DrawCalc::with_default_engine(DrawCalcConfig::default())?;
//! calc.commit_formula("circle(0, 0, 1 + k0)");
//! calc.set_param(0, 2.0)?;
//! calc.tick()?;
//! calc.wait_for_pass_completion(Duration::from_secs(1));
//! calc.tick()?;
//! assert_eq!(calc.published_snapshot().len(), 1);
//! # Ok::<(), drawcalc::DrawCalcError>(())
//! ```

use std::fmt;
use std::io;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use super::config::{ConfigError, DrawCalcConfig};
use super::diagnostics;
use super::engine::ExpressionEngine;
use super::inputs::{AnimationClock, InputError, InputValues, SharedInputs};
use super::manager::{CompilationManager, TickReport};
use super::publish::PublishedBuffer;
use super::render::{render, SymbolRenderer};
use super::run_state::{RunFlag, RunState};
use super::store::ValueStore;
use super::symbol::Symbol;
use super::symbol_buffer::ScratchBuffer;
use super::worker::WorkerShared;
use crate::formula::FormulaEngine;

/// Interval between run-state polls while waiting for a pass
const WAIT_POLL: Duration = Duration::from_millis(1);

/// Error type for context operations
#[derive(Debug)]
pub enum DrawCalcError {
    /// The worker thread could not be spawned
    Spawn(io::Error),
    /// Configuration rejected
    Config(ConfigError),
    /// Invalid input request
    Input(InputError),
}

impl fmt::Display for DrawCalcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Spawn(e) => write!(f, "failed to spawn worker thread: {}", e),
            Self::Config(e) => write!(f, "{}", e),
            Self::Input(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for DrawCalcError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Spawn(e) => Some(e),
            Self::Config(e) => Some(e),
            Self::Input(e) => Some(e),
        }
    }
}

impl From<io::Error> for DrawCalcError {
    fn from(e: io::Error) -> Self {
        Self::Spawn(e)
    }
}

impl From<ConfigError> for DrawCalcError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

impl From<InputError> for DrawCalcError {
    fn from(e: InputError) -> Self {
        Self::Input(e)
    }
}

/// One live formula with its worker and outputs
pub struct DrawCalc<E: ExpressionEngine = FormulaEngine> {
    config: DrawCalcConfig,
    shared: Arc<WorkerShared>,
    manager: CompilationManager<E>,
}

impl DrawCalc<FormulaEngine> {
    /// Context using the built-in formula language
    pub fn with_default_engine(config: DrawCalcConfig) -> Result<Self, DrawCalcError> {
        let engine = FormulaEngine::new(config.engine.poll_interval);
        Self::new(engine, config)
    }
}

impl<E: ExpressionEngine> DrawCalc<E> {
    pub fn new(engine: E, config: DrawCalcConfig) -> Result<Self, DrawCalcError> {
        config.validate()?;

        let run = RunFlag::new();
        let (sink, source) = diagnostics::channel();
        let scratch = ScratchBuffer::new(
            config.limits.element_limit,
            config.limits.scratch_growth,
            run.clone(),
        );

        let shared = Arc::new(WorkerShared {
            run,
            scratch: Arc::new(Mutex::new(scratch)),
            published: Arc::new(PublishedBuffer::new()),
            store: Arc::new(ValueStore::new(config.store)),
            inputs: Arc::new(SharedInputs::new(InputValues::from(config.inputs))),
            clock: Mutex::new(AnimationClock::new()),
            diagnostics: sink,
        });

        let manager = CompilationManager::new(Arc::new(engine), shared.clone(), source);

        Ok(Self {
            config,
            shared,
            manager,
        })
    }

    pub fn config(&self) -> &DrawCalcConfig {
        &self.config
    }

    /// Replace the formula and recompile on the next tick
    pub fn commit_formula(&mut self, text: &str) {
        self.manager.commit_formula(text);
    }

    /// Record an edit without recompiling
    pub fn set_formula(&mut self, text: &str) {
        self.manager.set_formula(text);
    }

    /// Commit the last [`set_formula`](Self::set_formula) edit, if any
    pub fn commit_draft(&mut self) -> bool {
        self.manager.commit_draft()
    }

    pub fn formula(&self) -> &str {
        self.manager.formula()
    }

    pub fn set_angle(&self, angle: f64) {
        self.shared.inputs.set_angle(angle);
    }

    pub fn set_time(&self, time: f64) {
        self.shared.inputs.set_time(time);
    }

    pub fn set_time_rate(&self, rate: f64) {
        self.shared.inputs.set_time_rate(rate);
    }

    /// Set generic parameter `k{index}`
    pub fn set_param(&self, index: usize, value: f64) -> Result<(), DrawCalcError> {
        Ok(self.shared.inputs.set_param(index, value)?)
    }

    pub fn set_animation(&self, on: bool) {
        self.shared.inputs.set_animation(on);
    }

    /// Current input values
    pub fn inputs(&self) -> InputValues {
        self.shared.inputs.snapshot()
    }

    /// Once-per-frame poll: restart the worker if needed, collect diagnostics
    pub fn tick(&mut self) -> Result<TickReport, DrawCalcError> {
        Ok(self.manager.tick()?)
    }

    /// Render the published buffer while holding its lock
    pub fn render_published<R: SymbolRenderer + ?Sized>(&self, renderer: &mut R) {
        self.shared
            .published
            .with_published(|symbols| render(symbols, renderer));
    }

    /// Run `f` over the published buffer while holding its lock
    pub fn with_published<T>(&self, f: impl FnOnce(&[Symbol]) -> T) -> T {
        self.shared.published.with_published(f)
    }

    pub fn published_snapshot(&self) -> Vec<Symbol> {
        self.shared.published.snapshot()
    }

    /// Number of publishes so far
    pub fn publish_generation(&self) -> u64 {
        self.shared.published.generation()
    }

    /// Log of the most recent compile; empty on success
    pub fn compile_log(&self) -> &str {
        self.manager.compile_log()
    }

    pub fn decompiled(&self) -> &str {
        self.manager.decompiled()
    }

    /// Reason of the most recent runtime fault
    pub fn last_fault(&self) -> Option<&str> {
        self.manager.last_fault()
    }

    /// Number of passes that hit the element limit
    pub fn cap_hits(&self) -> u64 {
        self.manager.cap_hits()
    }

    /// Number of worker threads started so far
    pub fn workers_spawned(&self) -> u64 {
        self.manager.workers_spawned()
    }

    pub fn run_state(&self) -> RunState {
        self.shared.run.state()
    }

    pub fn store(&self) -> &ValueStore {
        &self.shared.store
    }

    /// Block until the worker leaves `Running` or `timeout` passes.
    ///
    /// Returns false on timeout. An animating worker never leaves `Running`
    /// by itself.
    pub fn wait_for_pass_completion(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while self.shared.run.is_running() {
            if Instant::now() >= deadline {
                return false;
            }
            thread::sleep(WAIT_POLL);
        }
        true
    }

    /// Stop and join the worker
    pub fn shutdown(&mut self) {
        self.manager.shutdown();
    }
}
