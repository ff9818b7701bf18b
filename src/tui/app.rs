//! TUI application state machine.
//!
//! The `TuiApp` holds everything the screen shows:
//! - the latest scan HUD frame
//! - attack narration and state changes as log lines
//! - the cycle phase, interface mode and scanner state
//! - UI focus and scroll state

use std::collections::VecDeque;

use chrono::Local;
use tracing::debug;

use crate::attack::{AttackPhase, InboundCommand, StatusEvent, WifiMode};
use crate::session::SessionHandle;

use super::state::{FocusPanel, LogCategory, LogEntry, MAX_LOG_ENTRIES};

/// The TUI application state.
pub struct TuiApp {
    /// Channels to the session.
    session: SessionHandle,
    /// Interface under control, for the title.
    wifi_card: String,
    /// Most recent HUD frame.
    hud_frame: String,
    /// Lines scrolled off the top of the HUD.
    hud_scroll: u16,
    /// Log entries (newest first).
    logs: VecDeque<LogEntry>,
    /// Which panel currently has focus.
    focus: FocusPanel,
    /// Selected index in logs list.
    log_selection: usize,
    /// Last phase seen.
    phase: AttackPhase,
    /// Last confirmed interface mode.
    mode: WifiMode,
    /// Capture tool running.
    scanner_on: bool,
    /// Whether the app should quit.
    should_quit: bool,
    /// Status message to display.
    status_message: Option<String>,
}

impl TuiApp {
    /// Create a TUI bound to a session.
    pub fn new(session: SessionHandle, wifi_card: impl Into<String>) -> Self {
        let phase = *session.phase.borrow();
        let mut app = Self {
            session,
            wifi_card: wifi_card.into(),
            hud_frame: String::new(),
            hud_scroll: 0,
            logs: VecDeque::with_capacity(MAX_LOG_ENTRIES),
            focus: FocusPanel::Hud,
            log_selection: 0,
            phase,
            mode: WifiMode::Managed,
            scanner_on: false,
            should_quit: false,
            status_message: None,
        };
        app.add_log(
            LogCategory::Operator,
            "Press [s] to scan and attack, [x] to stop".to_string(),
        );
        app
    }

    /// Get the current focus panel.
    #[must_use]
    pub fn focus(&self) -> FocusPanel {
        self.focus
    }

    /// Latest HUD frame.
    #[must_use]
    pub fn hud_frame(&self) -> &str {
        &self.hud_frame
    }

    /// HUD scroll offset.
    #[must_use]
    pub fn hud_scroll(&self) -> u16 {
        self.hud_scroll
    }

    /// Get log entries.
    #[must_use]
    pub fn logs(&self) -> &VecDeque<LogEntry> {
        &self.logs
    }

    /// Get current log selection index.
    #[must_use]
    pub fn log_selection(&self) -> usize {
        self.log_selection
    }

    /// Interface name.
    #[must_use]
    pub fn wifi_card(&self) -> &str {
        &self.wifi_card
    }

    /// Current cycle phase.
    #[must_use]
    pub fn phase(&self) -> AttackPhase {
        self.phase
    }

    /// Last confirmed interface mode.
    #[must_use]
    pub fn mode(&self) -> WifiMode {
        self.mode
    }

    /// Whether the capture tool is running.
    #[must_use]
    pub fn scanner_on(&self) -> bool {
        self.scanner_on
    }

    /// Check if app should quit.
    #[must_use]
    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    /// Get the current status message.
    #[must_use]
    pub fn status_message(&self) -> Option<&str> {
        self.status_message.as_deref()
    }

    /// Set the quit flag.
    pub fn quit(&mut self) {
        self.should_quit = true;
    }

    /// Cycle focus to the next panel.
    pub fn focus_next(&mut self) {
        self.focus = self.focus.next();
    }

    /// Cycle focus to the previous panel.
    pub fn focus_prev(&mut self) {
        self.focus = self.focus.prev();
    }

    /// Move selection up in the focused panel.
    pub fn select_up(&mut self) {
        match self.focus {
            FocusPanel::Hud => self.hud_scroll = self.hud_scroll.saturating_sub(1),
            FocusPanel::Logs => {
                if self.log_selection > 0 {
                    self.log_selection -= 1;
                }
            }
        }
    }

    /// Move selection down in the focused panel.
    pub fn select_down(&mut self) {
        match self.focus {
            FocusPanel::Hud => {
                let lines = u16::try_from(self.hud_frame.lines().count()).unwrap_or(u16::MAX);
                if self.hud_scroll + 1 < lines {
                    self.hud_scroll += 1;
                }
            }
            FocusPanel::Logs => {
                if !self.logs.is_empty() && self.log_selection < self.logs.len() - 1 {
                    self.log_selection += 1;
                }
            }
        }
    }

    /// Send a command to the session.
    pub fn send(&mut self, command: InboundCommand) {
        let label = match command {
            InboundCommand::Scan => "Scan requested",
            InboundCommand::StopAttack => "Stop requested",
            InboundCommand::Settings => "Settings reload requested",
            InboundCommand::Whitelist => "Whitelist requested",
        };
        if self.session.commands.send(command).is_ok() {
            self.add_log(LogCategory::Operator, label.to_string());
            self.status_message = None;
        } else {
            self.status_message = Some("Session has ended".to_string());
        }
    }

    /// Drain everything the session has published. Returns whether anything
    /// changed.
    pub fn process_updates(&mut self) -> bool {
        let mut changed = false;

        while let Ok(event) = self.session.status.try_recv() {
            self.handle_status(event);
            changed = true;
        }

        if let Some(ref mut hud) = self.session.hud {
            let mut latest = None;
            while let Ok(frame) = hud.try_recv() {
                latest = Some(frame);
            }
            if let Some(frame) = latest {
                self.hud_frame = frame;
                changed = true;
            }
        }

        if self.session.phase.has_changed().unwrap_or(false) {
            self.phase = *self.session.phase.borrow_and_update();
            changed = true;
        }

        changed
    }

    /// Whether the session is gone.
    pub fn check_shutdown(&mut self) -> bool {
        if self.session.commands.is_closed() {
            self.should_quit = true;
            return true;
        }
        false
    }

    fn handle_status(&mut self, event: StatusEvent) {
        debug!("Status event: {:?}", event);
        match event {
            StatusEvent::ScannerState(on) => {
                self.scanner_on = on;
                let message = if on { "Scanner started" } else { "Scanner stopped" };
                self.add_log(LogCategory::State, message.to_string());
            }
            StatusEvent::ModeState(mode) => {
                self.mode = mode;
                self.add_log(LogCategory::State, format!("Interface in {} mode", mode));
            }
            StatusEvent::AttackState(on) => {
                let message = if on { "Attack started" } else { "Attack ended" };
                self.add_log(LogCategory::State, message.to_string());
            }
            StatusEvent::TypeOut(out) => {
                for line in out.lines() {
                    self.add_log(LogCategory::Attack, line.to_string());
                }
            }
        }
    }

    fn add_log(&mut self, category: LogCategory, message: String) {
        self.logs.push_front(LogEntry {
            category,
            message,
            timestamp: Local::now(),
        });
        while self.logs.len() > MAX_LOG_ENTRIES {
            self.logs.pop_back();
        }
    }
}
