//! Configuration system for deauther.
//!
//! TOML layers are merged into a [`Config`], then validated into
//! [`Settings`]: numbers and booleans are cast, command templates are
//! parsed into typed slots, and any template referencing a slot its command
//! cannot supply is rejected here rather than when the command is issued.
//!
//! # Configuration Hierarchy
//!
//! 1. Embedded defaults (`config/default.toml`)
//! 2. System config: `/etc/deauther/config.toml`
//! 3. User config: `~/.config/deauther/config.toml`
//! 4. Additional config file (via `--config` flag)
//! 5. CLI flags (`--interface`, `--auto`)
//!
//! # Example
//!
//! ```toml
//! [attack]
//! wifi_card = "wlan1"
//! deauth_count = "5"
//! fast_mode = "yes"
//!
//! [commands]
//! set_channel_cmd = "iw {wifi_card} set channel {channel}"
//! ```

mod error;
mod loader;
mod schema;
mod settings;
mod template;

pub use error::ConfigError;
pub use loader::{ConfigLoader, Overrides, SettingsSource, EMBEDDED_DEFAULTS, SYSTEM_CONFIG_PATH};
pub use schema::{
    AttackConfig, CommandsConfig, Config, HudConfig, PrivilegeConfig, Scalar, StorageConfig,
};
pub use settings::{CommandTemplates, HudSettings, Settings, MAX_ATTACK_LOOP};
pub use template::{CommandKind, CommandTemplate, Slot, SlotValues, TemplateError};
