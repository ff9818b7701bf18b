//! Status bar widget.

use crate::attack::{AttackPhase, WifiMode};
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Paragraph, Widget},
};

/// Widget for displaying the status bar with keybindings.
pub struct StatusWidget {
    /// Current cycle phase.
    phase: AttackPhase,
    /// Interface mode.
    mode: WifiMode,
    /// Optional status message.
    message: Option<String>,
}

impl StatusWidget {
    /// Create a new status widget.
    pub fn new(phase: AttackPhase, mode: WifiMode) -> Self {
        Self {
            phase,
            mode,
            message: None,
        }
    }

    /// Set a status message.
    pub fn with_message(mut self, message: Option<String>) -> Self {
        self.message = message;
        self
    }

    fn phase_style(&self) -> Style {
        let color = match self.phase {
            AttackPhase::Idle => Color::Gray,
            AttackPhase::Stopped | AttackPhase::SettingManagedMode => Color::Yellow,
            _ => Color::Red,
        };
        Style::default().fg(color).add_modifier(Modifier::BOLD)
    }
}

impl Widget for StatusWidget {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let key_style = Style::default()
            .fg(Color::Black)
            .bg(Color::Cyan)
            .add_modifier(Modifier::BOLD);
        let action_style = Style::default().fg(Color::White);
        let sep_style = Style::default().fg(Color::DarkGray);

        let mut spans = vec![
            Span::styled(format!(" {} ", self.phase), self.phase_style()),
            Span::styled("|", sep_style),
            Span::styled(format!(" {} ", self.mode), action_style),
            Span::styled("|", sep_style),
        ];

        if self.phase.is_active() {
            spans.extend_from_slice(&[
                Span::styled(" x ", key_style),
                Span::styled("Stop ", action_style),
            ]);
        } else {
            spans.extend_from_slice(&[
                Span::styled(" s ", key_style),
                Span::styled("Scan ", action_style),
            ]);
        }

        spans.extend_from_slice(&[
            Span::styled(" w ", key_style),
            Span::styled("Whitelist ", action_style),
            Span::styled(" r ", key_style),
            Span::styled("Reload ", action_style),
            Span::styled(" Tab ", key_style),
            Span::styled("Switch Panel ", action_style),
            Span::styled(" q ", key_style),
            Span::styled("Quit ", action_style),
        ]);

        if let Some(msg) = self.message {
            spans.extend_from_slice(&[
                Span::styled("|", sep_style),
                Span::styled(format!(" {} ", msg), Style::default().fg(Color::Green)),
            ]);
        }

        let line = Line::from(spans);
        let paragraph = Paragraph::new(line).style(Style::default().bg(Color::DarkGray));

        paragraph.render(area, buf);
    }
}
