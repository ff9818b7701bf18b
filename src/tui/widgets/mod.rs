//! TUI widgets for rendering panels.
//!
//! - `HudWidget` - Latest scan frame
//! - `LogsWidget` - Attack narration and state changes
//! - `StatusWidget` - Phase, mode and keybindings

pub mod hud;
pub mod logs;
pub mod status;

pub use hud::HudWidget;
pub use logs::LogsWidget;
pub use status::StatusWidget;
