//! Process events and the observer seam.

use tokio::sync::mpsc::UnboundedSender;

/// Identifier assigned to every submitted request, starting at 1.
pub type ProcessId = u64;

/// Which channel a chunk of output arrived on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputStream {
    /// stdout and stderr interleaved into one channel.
    Merged,
    /// stdout only (separate mode).
    Stdout,
    /// stderr only (separate mode).
    Stderr,
}

/// Event emitted by the supervisor for a single process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessEvent {
    /// A decoded chunk of output.
    Output {
        /// Process that produced the output.
        id: ProcessId,
        /// Channel the chunk arrived on.
        stream: OutputStream,
        /// Newly arrived text.
        chunk: String,
    },
    /// The process exited. Non-zero codes are ordinary completions.
    Completed {
        /// Process that exited.
        id: ProcessId,
        /// Exit code, or `128 + signal` when killed by a signal.
        code: i32,
    },
    /// The process could not be started or waited on.
    Failed {
        /// Process that failed.
        id: ProcessId,
        /// Synthetic non-zero status.
        code: i32,
        /// Human-readable reason.
        message: String,
    },
}

impl ProcessEvent {
    /// Process this event belongs to.
    #[must_use]
    pub fn id(&self) -> ProcessId {
        match self {
            ProcessEvent::Output { id, .. }
            | ProcessEvent::Completed { id, .. }
            | ProcessEvent::Failed { id, .. } => *id,
        }
    }

    /// Whether this is the single terminal event of its process.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ProcessEvent::Output { .. })
    }
}

/// Receives output and lifecycle callbacks from the supervisor.
///
/// Callbacks run on the supervisor's I/O tasks, so implementations should
/// hand work off rather than block.
pub trait ProcessObserver: Send + Sync {
    /// A chunk of output arrived.
    fn on_output(&self, _id: ProcessId, _stream: OutputStream, _chunk: &str) {}

    /// The process exited with `code`.
    fn on_completed(&self, _id: ProcessId, _code: i32) {}

    /// The process failed to start or could not be waited on.
    fn on_failed(&self, _id: ProcessId, _code: i32, _message: &str) {}
}

/// Forward every callback as a [`ProcessEvent`] into a single-consumer queue.
impl ProcessObserver for UnboundedSender<ProcessEvent> {
    fn on_output(&self, id: ProcessId, stream: OutputStream, chunk: &str) {
        let _ = self.send(ProcessEvent::Output {
            id,
            stream,
            chunk: chunk.to_string(),
        });
    }

    fn on_completed(&self, id: ProcessId, code: i32) {
        let _ = self.send(ProcessEvent::Completed { id, code });
    }

    fn on_failed(&self, id: ProcessId, code: i32, message: &str) {
        let _ = self.send(ProcessEvent::Failed {
            id,
            code,
            message: message.to_string(),
        });
    }
}
