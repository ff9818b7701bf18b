//! Configuration schema definitions.
//!
//! These structs mirror one TOML layer. Every field is optional so that a
//! later layer only overrides what it actually sets; [`Settings`] is the
//! resolved, validated view the rest of the crate consumes.
//!
//! [`Settings`]: super::Settings

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::supervisor::ElevationMethod;

use super::error::ConfigError;

/// A scalar that may be written as a TOML bool, integer or string.
///
/// Settings edited by hand tend to carry `"10"` or `"yes"`; values are cast
/// when read rather than rejected at parse time.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum Scalar {
    /// `true` / `false`.
    Bool(bool),
    /// A bare integer.
    Int(i64),
    /// Anything quoted.
    Text(String),
}

impl Scalar {
    /// Cast to bool: `1|true|yes|y|on` (case-insensitive) or non-zero.
    #[must_use]
    pub fn as_bool(&self) -> bool {
        match self {
            Scalar::Bool(b) => *b,
            Scalar::Int(i) => *i != 0,
            Scalar::Text(s) => matches!(
                s.trim().to_ascii_lowercase().as_str(),
                "1" | "true" | "yes" | "y" | "on"
            ),
        }
    }

    /// Cast to a non-negative integer, naming `field` on failure.
    pub fn as_u64(&self, field: &str) -> Result<u64, ConfigError> {
        let invalid = |message: String| ConfigError::InvalidValue {
            field: field.to_string(),
            message,
        };
        match self {
            Scalar::Int(i) => u64::try_from(*i).map_err(|_| invalid(format!("{} is negative", i))),
            Scalar::Text(s) => s
                .trim()
                .parse::<u64>()
                .map_err(|_| invalid(format!("'{}' is not a non-negative integer", s))),
            Scalar::Bool(b) => Err(invalid(format!("expected a number, got {}", b))),
        }
    }
}

/// Top-level configuration structure (one layer).
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    /// Attack loop policy.
    #[serde(default)]
    pub attack: AttackConfig,

    /// Command templates.
    #[serde(default)]
    pub commands: CommandsConfig,

    /// Privilege elevation.
    #[serde(default)]
    pub privilege: PrivilegeConfig,

    /// Result database and capture files.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Scan HUD aggregation.
    #[serde(default)]
    pub hud: HudConfig,
}

impl Config {
    /// Merge another layer into this one. Set values override.
    pub fn merge(&mut self, other: Config) {
        self.attack.merge(other.attack);
        self.commands.merge(other.commands);
        self.privilege.merge(other.privilege);
        self.storage.merge(other.storage);
        self.hud.merge(other.hud);
    }
}

fn override_with<T>(slot: &mut Option<T>, other: Option<T>) {
    if other.is_some() {
        *slot = other;
    }
}

/// `[attack]` section.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AttackConfig {
    /// Wireless interface name.
    pub wifi_card: Option<String>,

    /// Scan wall-clock limit in seconds.
    pub scan_time: Option<Scalar>,

    /// Deauthentication burst count.
    pub deauth_count: Option<Scalar>,

    /// Full passes over the network list before re-scanning.
    pub max_attack_loop: Option<Scalar>,

    /// Broadcast only, skip per-client attacks.
    pub fast_mode: Option<Scalar>,

    /// Start scanning as soon as the session starts.
    pub automatic_turn_on: Option<Scalar>,
}

impl AttackConfig {
    fn merge(&mut self, other: AttackConfig) {
        override_with(&mut self.wifi_card, other.wifi_card);
        override_with(&mut self.scan_time, other.scan_time);
        override_with(&mut self.deauth_count, other.deauth_count);
        override_with(&mut self.max_attack_loop, other.max_attack_loop);
        override_with(&mut self.fast_mode, other.fast_mode);
        override_with(&mut self.automatic_turn_on, other.automatic_turn_on);
    }
}

/// `[commands]` section.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct CommandsConfig {
    /// Monitor-mode enable commands.
    pub enable_monitor_cmds: Option<String>,

    /// Monitor-mode disable commands.
    pub disable_monitor_cmds: Option<String>,

    /// Channel-set command.
    pub set_channel_cmd: Option<String>,

    /// Capture tool command.
    pub scan_cmd: Option<String>,

    /// Broadcast deauthentication command.
    pub deauth_broadcast_cmd: Option<String>,

    /// Client deauthentication command.
    pub deauth_client_cmd: Option<String>,

    /// Tool names rewritten to absolute paths. Replaced, not appended.
    pub elevated_tools: Option<Vec<String>>,
}

impl CommandsConfig {
    fn merge(&mut self, other: CommandsConfig) {
        override_with(&mut self.enable_monitor_cmds, other.enable_monitor_cmds);
        override_with(&mut self.disable_monitor_cmds, other.disable_monitor_cmds);
        override_with(&mut self.set_channel_cmd, other.set_channel_cmd);
        override_with(&mut self.scan_cmd, other.scan_cmd);
        override_with(&mut self.deauth_broadcast_cmd, other.deauth_broadcast_cmd);
        override_with(&mut self.deauth_client_cmd, other.deauth_client_cmd);
        override_with(&mut self.elevated_tools, other.elevated_tools);
    }
}

/// `[privilege]` section.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct PrivilegeConfig {
    /// `none`, `pkexec` or `sudo`.
    pub method: Option<ElevationMethod>,

    /// Password piped to `sudo -S`.
    pub password: Option<String>,
}

impl PrivilegeConfig {
    fn merge(&mut self, other: PrivilegeConfig) {
        override_with(&mut self.method, other.method);
        override_with(&mut self.password, other.password);
    }
}

/// `[storage]` section.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct StorageConfig {
    /// SQLite database path.
    pub database: Option<PathBuf>,

    /// Capture prefix passed to the scanner (`-w`).
    pub capture_prefix: Option<String>,
}

impl StorageConfig {
    fn merge(&mut self, other: StorageConfig) {
        override_with(&mut self.database, other.database);
        override_with(&mut self.capture_prefix, other.capture_prefix);
    }
}

/// `[hud]` section.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct HudConfig {
    /// Lines retained by the aggregator.
    pub max_lines: Option<Scalar>,

    /// Emission interval in milliseconds.
    pub interval_ms: Option<Scalar>,

    /// Frame-start marker.
    pub frame_marker: Option<String>,
}

impl HudConfig {
    fn merge(&mut self, other: HudConfig) {
        override_with(&mut self.max_lines, other.max_lines);
        override_with(&mut self.interval_ms, other.interval_ms);
        override_with(&mut self.frame_marker, other.frame_marker);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_toml_parses() {
        let toml_content = include_str!("../../config/default.toml");
        let config: Config =
            toml::from_str(toml_content).expect("default.toml should parse as Config");

        assert_eq!(config.attack.wifi_card.as_deref(), Some("wlan0"));
        assert_eq!(config.attack.scan_time, Some(Scalar::Int(20)));
        assert_eq!(config.privilege.method, Some(ElevationMethod::Pkexec));
        assert!(config.commands.scan_cmd.unwrap().contains("{capture_prefix}"));
        assert_eq!(config.hud.frame_marker.as_deref(), Some("CH "));
    }

    #[test]
    fn test_scalar_accepts_mixed_types() {
        let config: Config = toml::from_str(
            r#"
            [attack]
            scan_time = "30"
            deauth_count = 7
            fast_mode = "Yes"
            automatic_turn_on = 0
            "#,
        )
        .unwrap();

        assert_eq!(config.attack.scan_time.unwrap().as_u64("scan_time").unwrap(), 30);
        assert_eq!(config.attack.deauth_count.unwrap().as_u64("deauth_count").unwrap(), 7);
        assert!(config.attack.fast_mode.unwrap().as_bool());
        assert!(!config.attack.automatic_turn_on.unwrap().as_bool());
    }

    #[test]
    fn test_scalar_bool_cast() {
        for yes in ["1", "true", "YES", "y", " on "] {
            assert!(Scalar::Text(yes.into()).as_bool(), "{yes}");
        }
        for no in ["0", "false", "nope", ""] {
            assert!(!Scalar::Text(no.into()).as_bool(), "{no}");
        }
        assert!(Scalar::Int(2).as_bool());
        assert!(Scalar::Bool(true).as_bool());
    }

    #[test]
    fn test_scalar_rejects_non_numeric() {
        assert!(matches!(
            Scalar::Text("ten".into()).as_u64("deauth_count"),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert!(Scalar::Int(-1).as_u64("scan_time").is_err());
        assert!(Scalar::Bool(true).as_u64("scan_time").is_err());
    }

    #[test]
    fn test_merge_overrides_only_set_values() {
        let mut base: Config = toml::from_str(
            r#"
            [attack]
            wifi_card = "wlan0"
            scan_time = 20
            [commands]
            elevated_tools = ["iw", "aireplay-ng"]
            "#,
        )
        .unwrap();
        let layer: Config = toml::from_str(
            r#"
            [attack]
            scan_time = 45
            [commands]
            elevated_tools = ["airodump-ng"]
            "#,
        )
        .unwrap();

        base.merge(layer);
        assert_eq!(base.attack.wifi_card.as_deref(), Some("wlan0"));
        assert_eq!(base.attack.scan_time, Some(Scalar::Int(45)));
        assert_eq!(
            base.commands.elevated_tools,
            Some(vec!["airodump-ng".to_string()])
        );
    }
}
