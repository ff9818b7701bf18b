//! Keyboard input handling for TUI.
//!
//! # Keybindings
//!
//! | Key | Action |
//! |-----|--------|
//! | `s` | Scan and attack |
//! | `x` | Stop the attack, restore managed mode |
//! | `w` | Show the whitelist |
//! | `r` | Reload settings |
//! | `j` / Down | Scroll down |
//! | `k` / Up | Scroll up |
//! | Tab | Cycle focus between panels |
//! | Shift+Tab | Cycle focus backwards |
//! | `q` / Esc | Exit |

use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use crate::attack::InboundCommand;
use crate::tui::TuiApp;

/// Result of handling an input event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputResult {
    /// Event was handled, continue running.
    Handled,
    /// Event was not handled (unknown key).
    NotHandled,
    /// User requested quit.
    Quit,
}

/// Handle a crossterm event.
pub fn handle_event(app: &mut TuiApp, event: Event) -> InputResult {
    match event {
        Event::Key(key) if key.kind != KeyEventKind::Release => handle_key(app, key),
        Event::Resize(_, _) => InputResult::Handled, // Terminal resized, just redraw
        _ => InputResult::NotHandled,
    }
}

/// Handle a key event.
fn handle_key(app: &mut TuiApp, key: KeyEvent) -> InputResult {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.quit();
        return InputResult::Quit;
    }

    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => {
            app.quit();
            InputResult::Quit
        }
        KeyCode::Tab | KeyCode::BackTab => {
            if key.code == KeyCode::BackTab || key.modifiers.contains(KeyModifiers::SHIFT) {
                app.focus_prev();
            } else {
                app.focus_next();
            }
            InputResult::Handled
        }
        KeyCode::Char('j') | KeyCode::Down => {
            app.select_down();
            InputResult::Handled
        }
        KeyCode::Char('k') | KeyCode::Up => {
            app.select_up();
            InputResult::Handled
        }
        KeyCode::Char('s') => {
            app.send(InboundCommand::Scan);
            InputResult::Handled
        }
        KeyCode::Char('x') => {
            app.send(InboundCommand::StopAttack);
            InputResult::Handled
        }
        KeyCode::Char('w') => {
            app.send(InboundCommand::Whitelist);
            InputResult::Handled
        }
        KeyCode::Char('r') => {
            app.send(InboundCommand::Settings);
            InputResult::Handled
        }
        _ => InputResult::NotHandled,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tui::app::tests::create_test_app;
    use crate::tui::FocusPanel;
    use crossterm::event::KeyEventState;

    fn make_key_event(code: KeyCode) -> KeyEvent {
        KeyEvent {
            code,
            modifiers: KeyModifiers::empty(),
            kind: KeyEventKind::Press,
            state: KeyEventState::empty(),
        }
    }

    fn make_key_event_with_modifiers(code: KeyCode, modifiers: KeyModifiers) -> KeyEvent {
        KeyEvent {
            code,
            modifiers,
            kind: KeyEventKind::Press,
            state: KeyEventState::empty(),
        }
    }

    #[test]
    fn test_quit_keys() {
        let (mut app, _peer) = create_test_app();

        let result = handle_key(&mut app, make_key_event(KeyCode::Char('q')));
        assert_eq!(result, InputResult::Quit);
        assert!(app.should_quit());
    }

    #[test]
    fn test_esc_and_ctrl_c_quit() {
        let (mut app, _peer) = create_test_app();
        assert_eq!(handle_key(&mut app, make_key_event(KeyCode::Esc)), InputResult::Quit);

        let (mut app, _peer) = create_test_app();
        let ctrl_c = make_key_event_with_modifiers(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert_eq!(handle_key(&mut app, ctrl_c), InputResult::Quit);
    }

    #[test]
    fn test_tab_navigation() {
        let (mut app, _peer) = create_test_app();

        assert_eq!(app.focus(), FocusPanel::Hud);
        handle_key(&mut app, make_key_event(KeyCode::Tab));
        assert_eq!(app.focus(), FocusPanel::Logs);
        handle_key(&mut app, make_key_event(KeyCode::BackTab));
        assert_eq!(app.focus(), FocusPanel::Hud);
    }

    #[test]
    fn test_command_keys() {
        let (mut app, mut peer) = create_test_app();

        for (key, expected) in [
            ('s', InboundCommand::Scan),
            ('x', InboundCommand::StopAttack),
            ('w', InboundCommand::Whitelist),
            ('r', InboundCommand::Settings),
        ] {
            let result = handle_key(&mut app, make_key_event(KeyCode::Char(key)));
            assert_eq!(result, InputResult::Handled);
            assert_eq!(peer.commands.try_recv().unwrap(), expected);
        }
    }

    #[test]
    fn test_release_ignored() {
        let (mut app, mut peer) = create_test_app();
        let mut key = make_key_event(KeyCode::Char('s'));
        key.kind = KeyEventKind::Release;
        assert_eq!(handle_event(&mut app, Event::Key(key)), InputResult::NotHandled);
        assert!(peer.commands.try_recv().is_err());
    }

    #[test]
    fn test_unknown_key() {
        let (mut app, _peer) = create_test_app();
        assert_eq!(
            handle_key(&mut app, make_key_event(KeyCode::Char('z'))),
            InputResult::NotHandled
        );
    }
}
