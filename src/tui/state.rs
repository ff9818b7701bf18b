//! TUI application state definitions.

use std::fmt;

use chrono::{DateTime, Local};

/// Maximum number of log entries to keep in memory.
pub const MAX_LOG_ENTRIES: usize = 1000;

/// Which panel has focus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FocusPanel {
    /// Scan HUD.
    #[default]
    Hud,
    /// Attack narration.
    Logs,
}

impl FocusPanel {
    /// Cycle to the next panel.
    #[must_use]
    pub fn next(self) -> Self {
        match self {
            FocusPanel::Hud => FocusPanel::Logs,
            FocusPanel::Logs => FocusPanel::Hud,
        }
    }

    /// Cycle to the previous panel.
    #[must_use]
    pub fn prev(self) -> Self {
        self.next()
    }
}

/// Where a log line came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogCategory {
    /// Attack loop narration.
    Attack,
    /// Scanner, mode or cycle state change.
    State,
    /// Something the operator did.
    Operator,
}

impl fmt::Display for LogCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogCategory::Attack => f.write_str("attack"),
            LogCategory::State => f.write_str("state"),
            LogCategory::Operator => f.write_str("you"),
        }
    }
}

/// A log entry for display.
#[derive(Debug, Clone)]
pub struct LogEntry {
    /// Source.
    pub category: LogCategory,
    /// The log message.
    pub message: String,
    /// When it arrived.
    pub timestamp: DateTime<Local>,
}
