//! Formula stack VM
//!
//! Executes one [`Chunk`] from the top to `halt`. All values are `f64`;
//! comparisons and logic produce 1.0 or 0.0, and any non-zero value
//! (including NaN) is true.
//!
//! The cancel token is polled every `poll_interval` instructions and on
//! every backward jump, so a loop that never emits still stops promptly.

use std::fmt;

use smallvec::SmallVec;

use super::chunk::Chunk;
use super::opcodes::Opcode;
use crate::backend::host_table::{HostError, HostTable};
use crate::backend::run_state::CancelToken;

/// Inline capacity for host call arguments (the widest host function takes 9)
const INLINE_ARGS: usize = 9;

/// Runtime failure; ends the pass
#[derive(Debug, Clone, PartialEq)]
pub enum VmError {
    InvalidOpcode { offset: usize, byte: u8 },
    /// Operand bytes run past the end of the code
    Truncated { offset: usize },
    /// Execution ran off the end without `halt`
    MissingHalt,
    StackUnderflow { offset: usize },
    BadConstant { offset: usize, index: u16 },
    BadLocal { offset: usize, slot: u8 },
    JumpOutOfRange { offset: usize, target: isize },
    Host { offset: usize, error: HostError },
}

impl fmt::Display for VmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidOpcode { offset, byte } => {
                write!(f, "invalid opcode 0x{:02x} at {:04x}", byte, offset)
            }
            Self::Truncated { offset } => write!(f, "truncated instruction at {:04x}", offset),
            Self::MissingHalt => write!(f, "program ended without halt"),
            Self::StackUnderflow { offset } => write!(f, "stack underflow at {:04x}", offset),
            Self::BadConstant { offset, index } => {
                write!(f, "constant #{} out of range at {:04x}", index, offset)
            }
            Self::BadLocal { offset, slot } => {
                write!(f, "local slot {} out of range at {:04x}", slot, offset)
            }
            Self::JumpOutOfRange { offset, target } => {
                write!(f, "jump from {:04x} to {} is outside the program", offset, target)
            }
            Self::Host { offset, error } => write!(f, "host call at {:04x} failed: {}", offset, error),
        }
    }
}

impl std::error::Error for VmError {}

/// How a run ended without error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VmExit {
    Halted,
    Cancelled,
}

/// Stack and locals, reused between runs so steady-state passes do not allocate
#[derive(Debug, Default)]
pub struct VmState {
    stack: Vec<f64>,
    locals: Vec<f64>,
    executed: u64,
}

impl VmState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Instructions executed by the most recent run
    pub fn executed(&self) -> u64 {
        self.executed
    }

    fn reset(&mut self, local_count: usize) {
        self.stack.clear();
        self.locals.clear();
        self.locals.resize(local_count, 0.0);
        self.executed = 0;
    }

    #[inline]
    fn push(&mut self, v: f64) {
        self.stack.push(v);
    }

    #[inline]
    fn pop(&mut self, offset: usize) -> Result<f64, VmError> {
        self.stack.pop().ok_or(VmError::StackUnderflow { offset })
    }

    #[inline]
    fn pop2(&mut self, offset: usize) -> Result<(f64, f64), VmError> {
        let b = self.pop(offset)?;
        let a = self.pop(offset)?;
        Ok((a, b))
    }
}

#[inline]
fn flag(b: bool) -> f64 {
    if b {
        1.0
    } else {
        0.0
    }
}

/// Execute `chunk` once.
///
/// Locals start at zero on every run. `poll_interval` is clamped to at least 1.
pub fn run(
    chunk: &Chunk,
    host: &HostTable,
    state: &mut VmState,
    cancel: &CancelToken,
    poll_interval: u32,
) -> Result<VmExit, VmError> {
    let interval = poll_interval.max(1);
    let mut budget = interval;
    let mut ip = 0usize;
    state.reset(chunk.local_count());

    loop {
        budget -= 1;
        if budget == 0 {
            budget = interval;
            if cancel.is_cancelled() {
                return Ok(VmExit::Cancelled);
            }
        }

        let at = ip;
        let byte = chunk.read_byte(at).ok_or(VmError::MissingHalt)?;
        let op = Opcode::from_byte(byte).ok_or(VmError::InvalidOpcode { offset: at, byte })?;
        ip = at + 1 + op.immediate_size();
        if ip > chunk.len() {
            return Err(VmError::Truncated { offset: at });
        }
        state.executed += 1;

        match op {
            Opcode::Nop => {}
            Opcode::Pop => {
                state.pop(at)?;
            }
            Opcode::Dup => {
                let v = *state.stack.last().ok_or(VmError::StackUnderflow { offset: at })?;
                state.push(v);
            }

            Opcode::PushConst => {
                let index = chunk.read_u16(at + 1).ok_or(VmError::Truncated { offset: at })?;
                let v = chunk
                    .constant(index)
                    .ok_or(VmError::BadConstant { offset: at, index })?;
                state.push(v);
            }
            Opcode::PushZero => state.push(0.0),
            Opcode::PushOne => state.push(1.0),

            Opcode::LoadLocal => {
                let slot = chunk.read_byte(at + 1).ok_or(VmError::Truncated { offset: at })?;
                let v = *state
                    .locals
                    .get(slot as usize)
                    .ok_or(VmError::BadLocal { offset: at, slot })?;
                state.push(v);
            }
            Opcode::StoreLocal => {
                let slot = chunk.read_byte(at + 1).ok_or(VmError::Truncated { offset: at })?;
                let v = state.pop(at)?;
                *state
                    .locals
                    .get_mut(slot as usize)
                    .ok_or(VmError::BadLocal { offset: at, slot })? = v;
            }
            Opcode::LoadHost => {
                let id = chunk.read_u16(at + 1).ok_or(VmError::Truncated { offset: at })?;
                let v = host
                    .read_var(id)
                    .map_err(|error| VmError::Host { offset: at, error })?;
                state.push(v);
            }
            Opcode::StoreHost => {
                let id = chunk.read_u16(at + 1).ok_or(VmError::Truncated { offset: at })?;
                let v = state.pop(at)?;
                host.write_var(id, v)
                    .map_err(|error| VmError::Host { offset: at, error })?;
            }

            Opcode::Add => {
                let (a, b) = state.pop2(at)?;
                state.push(a + b);
            }
            Opcode::Sub => {
                let (a, b) = state.pop2(at)?;
                state.push(a - b);
            }
            Opcode::Mul => {
                let (a, b) = state.pop2(at)?;
                state.push(a * b);
            }
            Opcode::Div => {
                let (a, b) = state.pop2(at)?;
                state.push(a / b);
            }
            Opcode::Mod => {
                let (a, b) = state.pop2(at)?;
                state.push(a % b);
            }
            Opcode::Pow => {
                let (a, b) = state.pop2(at)?;
                state.push(a.powf(b));
            }
            Opcode::Neg => {
                let a = state.pop(at)?;
                state.push(-a);
            }

            Opcode::Lt => {
                let (a, b) = state.pop2(at)?;
                state.push(flag(a < b));
            }
            Opcode::Le => {
                let (a, b) = state.pop2(at)?;
                state.push(flag(a <= b));
            }
            Opcode::Gt => {
                let (a, b) = state.pop2(at)?;
                state.push(flag(a > b));
            }
            Opcode::Ge => {
                let (a, b) = state.pop2(at)?;
                state.push(flag(a >= b));
            }
            Opcode::Eq => {
                let (a, b) = state.pop2(at)?;
                state.push(flag(a == b));
            }
            Opcode::Ne => {
                let (a, b) = state.pop2(at)?;
                state.push(flag(a != b));
            }
            Opcode::Not => {
                let a = state.pop(at)?;
                state.push(flag(a == 0.0));
            }
            Opcode::Truth => {
                let a = state.pop(at)?;
                state.push(flag(a != 0.0));
            }

            Opcode::Jump | Opcode::JumpIfFalse | Opcode::JumpIfTrue => {
                let rel = chunk.read_i16(at + 1).ok_or(VmError::Truncated { offset: at })?;
                let taken = match op {
                    Opcode::Jump => true,
                    Opcode::JumpIfFalse => state.pop(at)? == 0.0,
                    _ => state.pop(at)? != 0.0,
                };
                if taken {
                    let target = ip as isize + rel as isize;
                    if target < 0 || target as usize > chunk.len() {
                        return Err(VmError::JumpOutOfRange { offset: at, target });
                    }
                    if rel < 0 && cancel.is_cancelled() {
                        return Ok(VmExit::Cancelled);
                    }
                    ip = target as usize;
                }
            }

            Opcode::CallHost => {
                let id = chunk.read_u16(at + 1).ok_or(VmError::Truncated { offset: at })?;
                let argc = chunk.read_byte(at + 3).ok_or(VmError::Truncated { offset: at })? as usize;
                let base = state
                    .stack
                    .len()
                    .checked_sub(argc)
                    .ok_or(VmError::StackUnderflow { offset: at })?;
                let args: SmallVec<[f64; INLINE_ARGS]> = SmallVec::from_slice(&state.stack[base..]);
                state.stack.truncate(base);
                let v = host
                    .call(id, &args)
                    .map_err(|error| VmError::Host { offset: at, error })?;
                state.push(v);
            }

            Opcode::Halt => return Ok(VmExit::Halted),
        }
    }
}
