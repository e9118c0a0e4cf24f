//! Worker diagnostics channel
//!
//! The worker never touches UI state. It sends what it learns (compile log,
//! decompiled listing, runtime faults, cap breaches) down an unbounded
//! channel and the manager drains it on its next tick.

use crossbeam_channel::{unbounded, Receiver, Sender, TryRecvError};

/// One message from the worker
#[derive(Debug, Clone, PartialEq)]
pub enum Diagnostic {
    /// Compile log text; empty when compilation succeeded
    CompileLog(String),
    /// Decompiled program listing
    Decompiled(String),
    /// The program faulted during a pass
    Fault(String),
    /// The element cap fired during a pass
    CapExceeded { limit: usize },
}

/// Sending half, owned by the worker
#[derive(Debug, Clone)]
pub struct DiagnosticsSink {
    tx: Sender<Diagnostic>,
}

impl DiagnosticsSink {
    /// Send a diagnostic; a dropped receiver is ignored
    pub fn send(&self, diagnostic: Diagnostic) {
        let _ = self.tx.send(diagnostic);
    }
}

/// Receiving half, owned by the manager
#[derive(Debug)]
pub struct DiagnosticsSource {
    rx: Receiver<Diagnostic>,
}

impl DiagnosticsSource {
    /// Everything received so far, without blocking
    pub fn drain(&self) -> Vec<Diagnostic> {
        let mut out = Vec::new();
        loop {
            match self.rx.try_recv() {
                Ok(d) => out.push(d),
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        out
    }
}

/// Create a connected sink/source pair
pub fn channel() -> (DiagnosticsSink, DiagnosticsSource) {
    let (tx, rx) = unbounded();
    (DiagnosticsSink { tx }, DiagnosticsSource { rx })
}
