//! Inbound commands and outbound status events.
//!
//! Status events serialize as `{"command": "...", "data": ...}` so a
//! front-end can consume them as JSON lines.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::state::WifiMode;

/// Commands accepted from the operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InboundCommand {
    /// Start a scan/attack cycle.
    Scan,
    /// Cancel the cycle and restore managed mode.
    StopAttack,
    /// Reload settings.
    Settings,
    /// Show the whitelist.
    Whitelist,
}

/// An inbound line that names no known command.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown command: {0}")]
pub struct UnknownCommand(pub String);

#[derive(Deserialize)]
struct Payload {
    command: String,
}

impl InboundCommand {
    /// Parse a plain word (`scan`) or a JSON payload (`{"command":"scan"}`).
    pub fn parse_line(line: &str) -> Result<Self, UnknownCommand> {
        let line = line.trim();
        if line.starts_with('{') {
            let payload: Payload =
                serde_json::from_str(line).map_err(|_| UnknownCommand(line.to_string()))?;
            return payload.command.parse();
        }
        line.parse()
    }
}

impl FromStr for InboundCommand {
    type Err = UnknownCommand;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "scan" => Ok(InboundCommand::Scan),
            "stop_attack" | "stopattack" | "stop" => Ok(InboundCommand::StopAttack),
            "settings" => Ok(InboundCommand::Settings),
            "whitelist" => Ok(InboundCommand::Whitelist),
            other => Err(UnknownCommand(other.to_string())),
        }
    }
}

/// Progress narration: one line or a list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum TypeOut {
    /// A single message.
    Line(String),
    /// Several related messages.
    Lines(Vec<String>),
}

impl TypeOut {
    /// Messages as individual lines.
    #[must_use]
    pub fn lines(&self) -> Vec<&str> {
        match self {
            TypeOut::Line(line) => vec![line.as_str()],
            TypeOut::Lines(lines) => lines.iter().map(String::as_str).collect(),
        }
    }
}

impl From<String> for TypeOut {
    fn from(line: String) -> Self {
        TypeOut::Line(line)
    }
}

impl From<&str> for TypeOut {
    fn from(line: &str) -> Self {
        TypeOut::Line(line.to_string())
    }
}

impl From<Vec<String>> for TypeOut {
    fn from(lines: Vec<String>) -> Self {
        TypeOut::Lines(lines)
    }
}

/// Events published to the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "command", content = "data", rename_all = "camelCase")]
pub enum StatusEvent {
    /// Capture tool started or stopped.
    ScannerState(bool),
    /// Interface mode changed.
    ModeState(WifiMode),
    /// Cycle started or ended.
    AttackState(bool),
    /// Progress narration.
    TypeOut(TypeOut),
}

impl StatusEvent {
    /// Shorthand for a single-line `typeOut`.
    pub fn type_out(message: impl Into<String>) -> Self {
        StatusEvent::TypeOut(TypeOut::Line(message.into()))
    }
}

impl fmt::Display for StatusEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let on_off = |b: bool| if b { "on" } else { "off" };
        match self {
            StatusEvent::ScannerState(b) => write!(f, "[scanner] {}", on_off(*b)),
            StatusEvent::ModeState(mode) => write!(f, "[mode] {}", mode),
            StatusEvent::AttackState(b) => write!(f, "[attack] {}", on_off(*b)),
            StatusEvent::TypeOut(out) => write!(f, "{}", out.lines().join("\n")),
        }
    }
}
