//! Terminal user interface.
//!
//! A ratatui front-end for one attack session:
//! - Scan HUD showing the capture tool's latest frame
//! - Attack narration and state changes
//! - Status bar with phase, interface mode and keybindings
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │                                         │
//! │   Scan HUD                              │
//! │   CH  6 ][ Elapsed: 12 s ][ ...         │
//! │                                         │
//! ├─────────────────────────────────────────┤
//! │   Logs                                  │
//! │   12:00:01 [attack] Setting channel 6   │
//! ├─────────────────────────────────────────┤
//! │ scanning | monitor | [x] stop | [q] quit│
//! └─────────────────────────────────────────┘
//! ```

pub mod app;
pub mod input;
pub mod layout;
pub mod runner;
pub mod state;
pub mod widgets;

pub use app::TuiApp;
pub use input::{handle_event, InputResult};
pub use layout::TuiLayout;
pub use runner::TuiRunner;
pub use state::{FocusPanel, LogCategory, LogEntry, MAX_LOG_ENTRIES};
pub use widgets::{HudWidget, LogsWidget, StatusWidget};
