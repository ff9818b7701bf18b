//! Handle to a supervised process.

use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::event::{OutputStream, ProcessId};
use super::request::ProcessRequest;

/// Lifecycle state of a supervised process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessState {
    /// Submitted and not yet finished.
    Running,
    /// Exited; exit code recorded.
    Completed,
    /// Could not be started or waited on; error recorded.
    Failed,
}

#[derive(Debug)]
struct HandleInner {
    state: ProcessState,
    pid: Option<u32>,
    stdout: String,
    stderr: String,
    exit_code: Option<i32>,
    error: Option<String>,
}

/// Shared view of one supervised process.
///
/// Owned by the supervisor; callers receive an `Arc` reference. All
/// mutation goes through crate-private methods used by the I/O tasks.
#[derive(Debug)]
pub struct ProcessHandle {
    id: ProcessId,
    request: ProcessRequest,
    created_at: DateTime<Utc>,
    inner: Mutex<HandleInner>,
}

impl ProcessHandle {
    pub(crate) fn new(id: ProcessId, request: ProcessRequest) -> Self {
        Self {
            id,
            request,
            created_at: Utc::now(),
            inner: Mutex::new(HandleInner {
                state: ProcessState::Running,
                pid: None,
                stdout: String::new(),
                stderr: String::new(),
                exit_code: None,
                error: None,
            }),
        }
    }

    /// Identifier assigned at submission.
    #[must_use]
    pub fn id(&self) -> ProcessId {
        self.id
    }

    /// The request this handle was created from.
    #[must_use]
    pub fn request(&self) -> &ProcessRequest {
        &self.request
    }

    /// Submission time.
    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> ProcessState {
        self.lock().state
    }

    /// Whether the process has not reached a terminal state.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.state() == ProcessState::Running
    }

    /// OS pid, once spawned.
    #[must_use]
    pub fn pid(&self) -> Option<u32> {
        self.lock().pid
    }

    /// Accumulated stdout (or merged output).
    #[must_use]
    pub fn stdout(&self) -> String {
        self.lock().stdout.clone()
    }

    /// Accumulated stderr (separate mode only).
    #[must_use]
    pub fn stderr(&self) -> String {
        self.lock().stderr.clone()
    }

    /// Exit code; `None` while running.
    #[must_use]
    pub fn exit_code(&self) -> Option<i32> {
        self.lock().exit_code
    }

    /// Failure description for `Failed` handles.
    #[must_use]
    pub fn error(&self) -> Option<String> {
        self.lock().error.clone()
    }

    pub(crate) fn set_pid(&self, pid: u32) {
        self.lock().pid = Some(pid);
    }

    pub(crate) fn append(&self, stream: OutputStream, chunk: &str) {
        let mut inner = self.lock();
        match stream {
            OutputStream::Merged | OutputStream::Stdout => inner.stdout.push_str(chunk),
            OutputStream::Stderr => inner.stderr.push_str(chunk),
        }
    }

    /// Transition to `Completed`. Returns false if already terminal.
    pub(crate) fn complete(&self, code: i32) -> bool {
        let mut inner = self.lock();
        if inner.state != ProcessState::Running {
            return false;
        }
        inner.state = ProcessState::Completed;
        inner.exit_code = Some(code);
        true
    }

    /// Transition to `Failed`. Returns false if already terminal.
    pub(crate) fn fail(&self, code: i32, message: impl Into<String>) -> bool {
        let mut inner = self.lock();
        if inner.state != ProcessState::Running {
            return false;
        }
        inner.state = ProcessState::Failed;
        inner.exit_code = Some(code);
        inner.error = Some(message.into());
        true
    }

    fn lock(&self) -> MutexGuard<'_, HandleInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
