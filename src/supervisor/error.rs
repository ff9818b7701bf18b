//! Supervisor error types.

use thiserror::Error;

/// Errors raised while turning a request into a running process.
///
/// These never escape [`ProcessSupervisor::run`](super::ProcessSupervisor::run);
/// they are reported through the observer's failure callback instead.
#[derive(Debug, Error)]
pub enum SupervisorError {
    /// The request carried no command text.
    #[error("Empty command")]
    EmptyCommand,

    /// The command could not be split into words (unbalanced quoting).
    #[error("Failed to split command '{0}': unbalanced quotes or trailing escape")]
    Split(String),

    /// Creating the merged output pipe failed.
    #[error("Failed to create output pipe: {0}")]
    Pipe(#[source] std::io::Error),

    /// The program could not be started.
    #[error("Failed to spawn '{program}': {source}")]
    Spawn {
        /// Program that failed to start.
        program: String,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Waiting on the child failed.
    #[error("Failed to wait for process: {0}")]
    Wait(#[source] std::io::Error),
}

impl From<nix::errno::Errno> for SupervisorError {
    fn from(errno: nix::errno::Errno) -> Self {
        SupervisorError::Pipe(std::io::Error::from(errno))
    }
}
