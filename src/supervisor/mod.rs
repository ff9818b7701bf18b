//! Process supervision for external capture and injection tools.
//!
//! Every command the attack loop needs (mode switches, scans, channel
//! changes, deauthentication bursts) runs through [`ProcessSupervisor`].
//! The supervisor spawns the command, optionally nested in a privilege
//! elevation wrapper, streams its output to a [`ProcessObserver`] and fires
//! exactly one terminal callback once the process has exited and all of its
//! output has been delivered.
//!
//! # Usage
//!
//! ```ignore
//! use std::sync::Arc;
//! use deauther::supervisor::{ProcessRequest, ProcessSupervisor, ProcessEvent};
//!
//! let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<ProcessEvent>();
//! let supervisor = ProcessSupervisor::new();
//! let handle = supervisor.run(ProcessRequest::new("echo hello"), Arc::new(tx));
//!
//! while let Some(event) = rx.recv().await {
//!     if event.is_terminal() {
//!         break;
//!     }
//! }
//! println!("{}", handle.stdout());
//! ```
//!
//! The supervisor has no timeout concept. Long-running tools are time-boxed
//! by wrapping their command line in an external kill timer.

mod error;
mod event;
mod handle;
mod invocation;
mod process;
mod request;

pub use error::SupervisorError;
pub use event::{OutputStream, ProcessEvent, ProcessId, ProcessObserver};
pub use handle::{ProcessHandle, ProcessState};
pub use invocation::Invocation;
pub use process::{ProcessSupervisor, SPAWN_FAILURE_CODE};
pub use request::{ElevationMethod, OutputMode, ProcessRequest};
