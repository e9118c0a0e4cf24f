//! Host inputs: angle, time, five generic parameters, animation
//!
//! The control surface writes into [`SharedInputs`]; the worker takes one
//! snapshot per pass and copies it into the [`WorkingVars`] bound in the
//! host table. A change made mid-pass is therefore seen by the next pass,
//! never halfway through one.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use parking_lot::Mutex;

use super::config::InputsConfig;
use super::host_table::VarCell;

/// Number of generic parameters (`k0`..`k4`)
pub const PARAM_COUNT: usize = 5;

/// Wall-clock gap after which animation restarts its epoch instead of jumping
pub const MAX_ANIMATION_GAP_SECS: f64 = 1.0;

/// Invalid input request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputError {
    /// Parameter index not in `0..PARAM_COUNT`
    ParamOutOfRange(usize),
}

impl fmt::Display for InputError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ParamOutOfRange(i) => {
                write!(f, "parameter k{} does not exist (0..{})", i, PARAM_COUNT)
            }
        }
    }
}

impl std::error::Error for InputError {}

/// Values set by the control surface
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InputValues {
    pub angle: f64,
    pub time: f64,
    pub time_rate: f64,
    pub k: [f64; PARAM_COUNT],
    pub animation: bool,
}

impl From<InputsConfig> for InputValues {
    fn from(c: InputsConfig) -> Self {
        Self {
            angle: c.angle,
            time: c.time,
            time_rate: c.time_rate,
            k: c.k,
            animation: c.animation,
        }
    }
}

impl Default for InputValues {
    fn default() -> Self {
        InputsConfig::default().into()
    }
}

/// Inputs shared between the control surface and the worker
#[derive(Debug, Default)]
pub struct SharedInputs {
    values: Mutex<InputValues>,
    changed: AtomicBool,
}

impl SharedInputs {
    pub fn new(values: InputValues) -> Self {
        Self {
            values: Mutex::new(values),
            changed: AtomicBool::new(false),
        }
    }

    /// One consistent copy of every input
    pub fn snapshot(&self) -> InputValues {
        *self.values.lock()
    }

    pub fn set_angle(&self, angle: f64) {
        self.values.lock().angle = angle;
        self.mark_changed();
    }

    pub fn set_time(&self, time: f64) {
        self.values.lock().time = time;
        self.mark_changed();
    }

    /// Rate only matters while animating, so it does not trigger a pass
    pub fn set_time_rate(&self, rate: f64) {
        self.values.lock().time_rate = rate;
    }

    pub fn set_param(&self, index: usize, value: f64) -> Result<(), InputError> {
        let mut values = self.values.lock();
        let slot = values
            .k
            .get_mut(index)
            .ok_or(InputError::ParamOutOfRange(index))?;
        *slot = value;
        drop(values);
        self.mark_changed();
        Ok(())
    }

    /// Switching animation on requests passes; switching it off lets the worker finish
    pub fn set_animation(&self, on: bool) {
        self.values.lock().animation = on;
        if on {
            self.mark_changed();
        }
    }

    /// Write back the animated time; not a user change
    pub(crate) fn store_animated_time(&self, time: f64) {
        self.values.lock().time = time;
    }

    pub fn mark_changed(&self) {
        self.changed.store(true, Ordering::Release);
    }

    pub fn is_changed(&self) -> bool {
        self.changed.load(Ordering::Acquire)
    }

    /// Atomically read and clear the change flag
    pub fn take_changed(&self) -> bool {
        self.changed.swap(false, Ordering::AcqRel)
    }
}

/// Per-pass working values bound into the host table
#[derive(Debug, Clone, Default)]
pub struct WorkingVars {
    pub angle: VarCell,
    pub time: VarCell,
    pub k: [VarCell; PARAM_COUNT],
}

impl WorkingVars {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy a snapshot into the working cells
    pub fn latch(&self, values: &InputValues) {
        self.angle.set(values.angle);
        self.time.set(values.time);
        for (cell, &v) in self.k.iter().zip(values.k.iter()) {
            cell.set(v);
        }
    }
}

/// Wall-clock sampler for animation.
///
/// Sampled once per pass whether or not animation is on, so switching
/// animation on later does not integrate the idle time.
#[derive(Debug, Default)]
pub struct AnimationClock {
    last: Option<Instant>,
}

impl AnimationClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take a sample at `now` and return the animated time.
    ///
    /// When animating, `time` advances by the elapsed wall-clock seconds
    /// times `rate`. A first sample, or a gap above one second, starts a new
    /// epoch and adds nothing.
    pub fn advance(&mut self, now: Instant, time: f64, rate: f64, animate: bool) -> f64 {
        let mut next = time;

        if animate {
            let elapsed = match self.last {
                Some(last) => now.saturating_duration_since(last).as_secs_f64(),
                None => 0.0,
            };
            if elapsed <= MAX_ANIMATION_GAP_SECS {
                next += elapsed * rate;
            }
        }

        self.last = Some(now);
        next
    }
}
