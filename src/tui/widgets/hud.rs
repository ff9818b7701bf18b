//! Scan HUD widget.

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Style},
    widgets::{Block, Borders, Paragraph, Widget},
};

use crate::tui::FocusPanel;

/// Shows the capture tool's screen as of the last frame.
pub struct HudWidget<'a> {
    frame: &'a str,
    title: String,
    scroll: u16,
    focused: bool,
}

impl<'a> HudWidget<'a> {
    /// Create a HUD widget for `frame`.
    pub fn new(frame: &'a str, wifi_card: &str, scanner_on: bool, focus: FocusPanel) -> Self {
        let state = if scanner_on { "scanning" } else { "idle" };
        Self {
            frame,
            title: format!(" Scan: {} ({}) ", wifi_card, state),
            scroll: 0,
            focused: focus == FocusPanel::Hud,
        }
    }

    /// Scroll offset in lines.
    pub fn scroll(mut self, scroll: u16) -> Self {
        self.scroll = scroll;
        self
    }
}

impl Widget for HudWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let border_style = if self.focused {
            Style::default().fg(Color::Yellow)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        let block = Block::default()
            .title(self.title)
            .borders(Borders::ALL)
            .border_style(border_style);

        let body = if self.frame.is_empty() {
            "No scan output yet"
        } else {
            self.frame
        };

        Paragraph::new(body)
            .block(block)
            .style(Style::default().fg(Color::Green))
            .scroll((self.scroll, 0))
            .render(area, buf);
    }
}
