//! TUI layout definitions.
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │                                         │
//! │           Scan HUD (airodump)           │
//! │                                         │
//! ├─────────────────────────────────────────┤
//! │                 Logs                    │
//! ├─────────────────────────────────────────┤
//! │ Status Bar: phase, mode, keybindings    │
//! └─────────────────────────────────────────┘
//! ```

use ratatui::layout::{Constraint, Direction, Layout, Rect};

/// Layout constraints for the TUI.
#[derive(Debug, Clone)]
pub struct TuiLayout {
    /// Area for the scan HUD.
    pub hud: Rect,
    /// Area for logs panel.
    pub logs: Rect,
    /// Area for status bar.
    pub status: Rect,
}

impl TuiLayout {
    /// Compute the layout for a given terminal area.
    pub fn compute(area: Rect) -> Self {
        let vertical = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Percentage(60), // HUD
                Constraint::Min(5),         // Logs (fill remaining)
                Constraint::Length(1),      // Status bar
            ])
            .split(area);

        Self {
            hud: vertical[0],
            logs: vertical[1],
            status: vertical[2],
        }
    }
}
