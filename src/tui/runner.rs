//! TUI event loop runner.
//!
//! This module provides the main event loop that:
//! - Processes terminal events (keyboard, resize)
//! - Drains session updates
//! - Renders the UI

use super::app::TuiApp;
use super::input::{handle_event, InputResult};
use super::layout::TuiLayout;
use super::widgets::{HudWidget, LogsWidget, StatusWidget};
use crossterm::{
    event,
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Frame, Terminal};
use std::io::{self, Stdout};
use std::panic;
use std::time::Duration;
use tracing::{debug, error, info};

/// How long to wait for a key before redrawing.
const TICK_RATE: Duration = Duration::from_millis(50);

/// TUI runner that manages the terminal and event loop.
pub struct TuiRunner {
    /// The terminal backend.
    terminal: Terminal<CrosstermBackend<Stdout>>,
}

impl TuiRunner {
    /// Initialize the terminal for TUI mode.
    ///
    /// This enables raw mode and enters an alternate screen.
    pub fn new() -> io::Result<Self> {
        // Restore the terminal before the panic message is printed.
        let original_hook = panic::take_hook();
        panic::set_hook(Box::new(move |panic_info| {
            let _ = disable_raw_mode();
            let _ = execute!(io::stdout(), LeaveAlternateScreen);
            original_hook(panic_info);
        }));

        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;

        let backend = CrosstermBackend::new(stdout);
        let terminal = Terminal::new(backend)?;

        info!("TUI initialized");

        Ok(Self { terminal })
    }

    /// Restore the terminal to normal mode.
    pub fn restore(&mut self) -> io::Result<()> {
        disable_raw_mode()?;
        execute!(self.terminal.backend_mut(), LeaveAlternateScreen)?;
        self.terminal.show_cursor()?;

        info!("TUI restored");

        Ok(())
    }

    /// Run the TUI event loop until the operator quits or the session ends.
    ///
    /// Blocks the calling thread; run it outside the async runtime.
    pub fn run(&mut self, app: &mut TuiApp) -> io::Result<()> {
        let mut dirty = true;

        loop {
            if app.check_shutdown() {
                debug!("Session closed; leaving TUI");
                break;
            }

            dirty |= app.process_updates();
            if dirty {
                self.terminal.draw(|frame| render_ui(frame, app))?;
                dirty = false;
            }

            if app.should_quit() {
                break;
            }

            if event::poll(TICK_RATE)? {
                let event = event::read()?;
                if handle_event(app, event) == InputResult::Quit {
                    break;
                }
                dirty = true;
            }
        }

        Ok(())
    }
}

impl Drop for TuiRunner {
    fn drop(&mut self) {
        if let Err(e) = self.restore() {
            error!("Failed to restore terminal: {}", e);
        }
    }
}

/// Render the complete UI.
fn render_ui(frame: &mut Frame, app: &TuiApp) {
    let layout = TuiLayout::compute(frame.area());

    let hud = HudWidget::new(app.hud_frame(), app.wifi_card(), app.scanner_on(), app.focus())
        .scroll(app.hud_scroll());
    frame.render_widget(hud, layout.hud);

    let logs = LogsWidget::new(app.logs(), app.focus(), app.log_selection());
    frame.render_widget(logs, layout.logs);

    let status = StatusWidget::new(app.phase(), app.mode())
        .with_message(app.status_message().map(String::from));
    frame.render_widget(status, layout.status);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tui::app::tests::create_test_app;
    use ratatui::backend::TestBackend;

    #[test]
    fn test_render_ui_on_test_backend() {
        let (app, _peer) = create_test_app();
        let mut terminal = Terminal::new(TestBackend::new(80, 24)).unwrap();
        terminal.draw(|frame| render_ui(frame, &app)).unwrap();

        let buffer = terminal.backend().buffer();
        let text: String = buffer.content().iter().map(|c| c.symbol()).collect();
        assert!(text.contains("Scan: wlan0"));
        assert!(text.contains("No scan output yet"));
        assert!(text.contains("idle"));
    }
}
