//! Immutable description of a command to run.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// How an elevated command obtains its privileges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElevationMethod {
    /// Run as the current user.
    #[default]
    None,
    /// Interactive agent (`pkexec`), prompts through a system dialog.
    Pkexec,
    /// `sudo`, optionally fed a password on stdin.
    Sudo,
}

impl fmt::Display for ElevationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ElevationMethod::None => write!(f, "none"),
            ElevationMethod::Pkexec => write!(f, "pkexec"),
            ElevationMethod::Sudo => write!(f, "sudo"),
        }
    }
}

/// How stdout and stderr are delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputMode {
    /// Both streams share one pipe, one buffer and one callback channel.
    #[default]
    Merged,
    /// Each stream has its own buffer and callback channel.
    Separate,
}

/// A command submitted to the supervisor.
///
/// Built with the chained setters below, then handed to
/// [`ProcessSupervisor::run`](super::ProcessSupervisor::run), after which it
/// is never modified.
#[derive(Clone, PartialEq, Eq)]
pub struct ProcessRequest {
    command: String,
    elevation: ElevationMethod,
    credential: Option<String>,
    shell: bool,
    cwd: Option<PathBuf>,
    env: BTreeMap<String, String>,
    output_mode: OutputMode,
}

impl ProcessRequest {
    /// Create a shell-wrapped, unelevated request with merged output.
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            elevation: ElevationMethod::None,
            credential: None,
            shell: true,
            cwd: None,
            env: BTreeMap::new(),
            output_mode: OutputMode::Merged,
        }
    }

    /// Elevate the command with `method`.
    pub fn elevate(mut self, method: ElevationMethod) -> Self {
        self.elevation = method;
        self
    }

    /// Credential piped to `sudo -S`. Ignored by other methods.
    pub fn credential(mut self, secret: impl Into<String>) -> Self {
        self.credential = Some(secret.into());
        self
    }

    /// Run through `bash -lc` (default) or split into argv directly.
    pub fn shell(mut self, shell: bool) -> Self {
        self.shell = shell;
        self
    }

    /// Working directory for the child.
    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    /// Add an environment override.
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Choose merged or separate output channels.
    pub fn output_mode(mut self, mode: OutputMode) -> Self {
        self.output_mode = mode;
        self
    }

    /// Command text as submitted.
    #[must_use]
    pub fn command(&self) -> &str {
        &self.command
    }

    /// Elevation method (`None` when unelevated).
    #[must_use]
    pub fn elevation(&self) -> ElevationMethod {
        self.elevation
    }

    /// Whether the command runs inside an elevation wrapper.
    #[must_use]
    pub fn is_elevated(&self) -> bool {
        self.elevation != ElevationMethod::None
    }

    /// Credential for password-pipe elevation, if any.
    #[must_use]
    pub fn secret(&self) -> Option<&str> {
        self.credential.as_deref()
    }

    /// Whether the command is wrapped in a login shell.
    #[must_use]
    pub fn is_shell(&self) -> bool {
        self.shell
    }

    /// Working directory, if overridden.
    #[must_use]
    pub fn cwd(&self) -> Option<&Path> {
        self.cwd.as_deref()
    }

    /// Environment overrides.
    #[must_use]
    pub fn envs(&self) -> &BTreeMap<String, String> {
        &self.env
    }

    /// Output channel mode.
    #[must_use]
    pub fn mode(&self) -> OutputMode {
        self.output_mode
    }
}

impl fmt::Debug for ProcessRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessRequest")
            .field("command", &self.command)
            .field("elevation", &self.elevation)
            .field("credential", &self.credential.as_ref().map(|_| "<redacted>"))
            .field("shell", &self.shell)
            .field("cwd", &self.cwd)
            .field("env", &self.env)
            .field("output_mode", &self.output_mode)
            .finish()
    }
}
