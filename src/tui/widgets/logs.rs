//! Log stream widget.

use crate::tui::{FocusPanel, LogCategory, LogEntry};
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, StatefulWidget, Widget},
};
use std::collections::VecDeque;

/// Widget for displaying log messages.
pub struct LogsWidget<'a> {
    /// The log entries to display.
    logs: &'a VecDeque<LogEntry>,
    /// Whether this panel has focus.
    focused: bool,
    /// Selected index.
    selected: usize,
}

impl<'a> LogsWidget<'a> {
    /// Create a new logs widget.
    pub fn new(logs: &'a VecDeque<LogEntry>, focus: FocusPanel, selected: usize) -> Self {
        Self {
            logs,
            focused: focus == FocusPanel::Logs,
            selected,
        }
    }

    /// Get the color for a category.
    fn category_color(category: LogCategory) -> Color {
        match category {
            LogCategory::Attack => Color::Red,
            LogCategory::State => Color::Blue,
            LogCategory::Operator => Color::Magenta,
        }
    }
}

impl Widget for LogsWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let items: Vec<ListItem> = self
            .logs
            .iter()
            .enumerate()
            .map(|(i, entry)| {
                let is_selected = i == self.selected && self.focused;
                let msg_style = if is_selected {
                    Style::default().fg(Color::White).add_modifier(Modifier::BOLD)
                } else {
                    Style::default()
                };

                let line = Line::from(vec![
                    Span::styled(
                        entry.timestamp.format("%H:%M:%S").to_string(),
                        Style::default().fg(Color::DarkGray),
                    ),
                    Span::raw(" "),
                    Span::styled(
                        format!("[{}]", entry.category),
                        Style::default().fg(Self::category_color(entry.category)),
                    ),
                    Span::raw(" "),
                    Span::styled(entry.message.as_str(), msg_style),
                ]);

                ListItem::new(line)
            })
            .collect();

        let title = format!(" Logs ({}) ", self.logs.len());
        let border_style = if self.focused {
            Style::default().fg(Color::Yellow)
        } else {
            Style::default().fg(Color::DarkGray)
        };

        let block = Block::default()
            .title(title)
            .borders(Borders::ALL)
            .border_style(border_style);

        let mut state = ListState::default();
        if self.focused && !self.logs.is_empty() {
            state.select(Some(self.selected));
        }

        let list = List::new(items)
            .block(block)
            .highlight_style(
                Style::default()
                    .bg(Color::DarkGray)
                    .add_modifier(Modifier::BOLD),
            );

        StatefulWidget::render(list, area, buf, &mut state);
    }
}
