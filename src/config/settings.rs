//! Resolved, validated settings.

use std::path::PathBuf;
use std::time::Duration;

use serde::Serialize;

use crate::stream::AggregatorConfig;
use crate::supervisor::ElevationMethod;

use super::error::ConfigError;
use super::loader::EMBEDDED_DEFAULTS;
use super::schema::{Config, Scalar};
use super::template::{CommandKind, CommandTemplate};

/// Shortest accepted HUD refresh interval.
const MIN_HUD_INTERVAL_MS: u64 = 10;

/// Largest accepted number of attack loops between scans.
pub const MAX_ATTACK_LOOP: u32 = 1000;

/// One template per [`CommandKind`], each checked against the slots its
/// kind can supply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandTemplates {
    /// Monitor-mode enable.
    pub enable_monitor: CommandTemplate,
    /// Monitor-mode disable.
    pub disable_monitor: CommandTemplate,
    /// Channel set.
    pub set_channel: CommandTemplate,
    /// Capture tool.
    pub scan: CommandTemplate,
    /// Broadcast deauthentication.
    pub deauth_broadcast: CommandTemplate,
    /// Client deauthentication.
    pub deauth_client: CommandTemplate,
}

impl CommandTemplates {
    /// Template for `kind`.
    #[must_use]
    pub fn get(&self, kind: CommandKind) -> &CommandTemplate {
        match kind {
            CommandKind::EnableMonitor => &self.enable_monitor,
            CommandKind::DisableMonitor => &self.disable_monitor,
            CommandKind::SetChannel => &self.set_channel,
            CommandKind::Scan => &self.scan,
            CommandKind::DeauthBroadcast => &self.deauth_broadcast,
            CommandKind::DeauthClient => &self.deauth_client,
        }
    }
}

/// Scan HUD tuning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HudSettings {
    /// Lines retained.
    pub max_lines: usize,
    /// Emission interval in milliseconds.
    pub interval_ms: u64,
    /// Frame-start marker.
    pub frame_marker: String,
}

impl HudSettings {
    /// Aggregator configuration for these settings.
    #[must_use]
    pub fn aggregator_config(&self) -> AggregatorConfig {
        AggregatorConfig {
            max_lines: self.max_lines,
            interval: Duration::from_millis(self.interval_ms),
            frame_marker: self.frame_marker.clone(),
        }
    }
}

/// Everything the attack loop and session need, fully typed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Settings {
    /// Wireless interface.
    pub wifi_card: String,
    /// Scan wall-clock limit, seconds.
    pub scan_time: u64,
    /// Deauthentication burst count.
    pub deauth_count: u64,
    /// Passes over the network list before re-scanning (at least 1).
    pub max_attack_loop: u32,
    /// Broadcast only.
    pub fast_mode: bool,
    /// Scan on session start.
    pub automatic_turn_on: bool,
    /// Command templates.
    pub templates: CommandTemplates,
    /// Tool names rewritten to absolute paths.
    pub elevated_tools: Vec<String>,
    /// Elevation method for every issued command.
    pub elevation: ElevationMethod,
    /// Password for `sudo -S`.
    #[serde(skip)]
    pub credential: Option<String>,
    /// SQLite database.
    pub database: PathBuf,
    /// Capture prefix handed to the scanner.
    pub capture_prefix: String,
    /// Scan HUD tuning.
    pub hud: HudSettings,
}

impl Settings {
    /// Settings from the embedded defaults alone.
    pub fn embedded() -> Result<Self, ConfigError> {
        let config: Config =
            toml::from_str(EMBEDDED_DEFAULTS).map_err(|e| ConfigError::ParseError {
                path: PathBuf::from("<embedded:default.toml>"),
                source: e,
            })?;
        Self::resolve(&config)
    }

    /// Validate a merged configuration.
    pub fn resolve(config: &Config) -> Result<Self, ConfigError> {
        let attack = &config.attack;
        let commands = &config.commands;

        let wifi_card = required(attack.wifi_card.as_ref(), "attack.wifi_card")?.trim();
        if wifi_card.is_empty() {
            return Err(invalid("attack.wifi_card", "must not be empty"));
        }

        let scan_time = number(attack.scan_time.as_ref(), "attack.scan_time")?;
        if scan_time == 0 {
            return Err(invalid("attack.scan_time", "must be at least 1 second"));
        }
        let deauth_count = number(attack.deauth_count.as_ref(), "attack.deauth_count")?;
        let max_attack_loop = number(attack.max_attack_loop.as_ref(), "attack.max_attack_loop")?;
        let max_attack_loop = u32::try_from(max_attack_loop)
            .ok()
            .filter(|n| (1..=MAX_ATTACK_LOOP).contains(n))
            .ok_or_else(|| {
                invalid(
                    "attack.max_attack_loop",
                    &format!("must be between 1 and {}", MAX_ATTACK_LOOP),
                )
            })?;

        let templates = CommandTemplates {
            enable_monitor: template(CommandKind::EnableMonitor, commands.enable_monitor_cmds.as_ref())?,
            disable_monitor: template(CommandKind::DisableMonitor, commands.disable_monitor_cmds.as_ref())?,
            set_channel: template(CommandKind::SetChannel, commands.set_channel_cmd.as_ref())?,
            scan: template(CommandKind::Scan, commands.scan_cmd.as_ref())?,
            deauth_broadcast: template(CommandKind::DeauthBroadcast, commands.deauth_broadcast_cmd.as_ref())?,
            deauth_client: template(CommandKind::DeauthClient, commands.deauth_client_cmd.as_ref())?,
        };

        let capture_prefix =
            required(config.storage.capture_prefix.as_ref(), "storage.capture_prefix")?.clone();
        if capture_prefix.trim().is_empty() {
            return Err(invalid("storage.capture_prefix", "must not be empty"));
        }

        let max_lines = number(config.hud.max_lines.as_ref(), "hud.max_lines")?;
        let interval_ms = number(config.hud.interval_ms.as_ref(), "hud.interval_ms")?;
        if interval_ms < MIN_HUD_INTERVAL_MS {
            return Err(invalid(
                "hud.interval_ms",
                &format!("must be at least {}", MIN_HUD_INTERVAL_MS),
            ));
        }

        Ok(Self {
            wifi_card: wifi_card.to_string(),
            scan_time,
            deauth_count,
            max_attack_loop,
            fast_mode: attack.fast_mode.as_ref().is_some_and(Scalar::as_bool),
            automatic_turn_on: attack.automatic_turn_on.as_ref().is_some_and(Scalar::as_bool),
            templates,
            elevated_tools: commands
                .elevated_tools
                .iter()
                .flatten()
                .map(|tool| tool.trim().to_string())
                .filter(|tool| !tool.is_empty())
                .collect(),
            elevation: config.privilege.method.unwrap_or_default(),
            credential: config.privilege.password.clone().filter(|p| !p.is_empty()),
            database: required(config.storage.database.as_ref(), "storage.database")?.clone(),
            capture_prefix,
            hud: HudSettings {
                max_lines: usize::try_from(max_lines.max(1)).unwrap_or(usize::MAX),
                interval_ms,
                frame_marker: config.hud.frame_marker.clone().unwrap_or_default(),
            },
        })
    }

    /// Render as TOML for display.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }
}

fn required<'a, T>(value: Option<&'a T>, field: &str) -> Result<&'a T, ConfigError> {
    value.ok_or_else(|| ConfigError::MissingValue(field.to_string()))
}

fn number(value: Option<&Scalar>, field: &str) -> Result<u64, ConfigError> {
    required(value, field)?.as_u64(field)
}

fn invalid(field: &str, message: &str) -> ConfigError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        message: message.to_string(),
    }
}

fn template(kind: CommandKind, source: Option<&String>) -> Result<CommandTemplate, ConfigError> {
    let field = format!("commands.{}", kind.key());
    let source = required(source, &field)?;
    CommandTemplate::parse_for(kind, source).map_err(|source| ConfigError::Template { field, source })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::config::template::TemplateError;

    pub(crate) fn default_config() -> Config {
        toml::from_str(include_str!("../../config/default.toml")).unwrap()
    }

    #[test]
    fn test_embedded_matches_defaults() {
        assert_eq!(
            Settings::embedded().unwrap(),
            Settings::resolve(&default_config()).unwrap()
        );
    }

    #[test]
    fn test_resolve_defaults() {
        let settings = Settings::resolve(&default_config()).unwrap();
        assert_eq!(settings.wifi_card, "wlan0");
        assert_eq!(settings.scan_time, 20);
        assert_eq!(settings.deauth_count, 10);
        assert_eq!(settings.max_attack_loop, 10);
        assert!(!settings.fast_mode);
        assert!(!settings.automatic_turn_on);
        assert_eq!(settings.elevation, ElevationMethod::Pkexec);
        assert_eq!(settings.database, PathBuf::from("db/wifi.sqlite"));
        assert_eq!(settings.hud.max_lines, 1500);
        assert_eq!(settings.hud.aggregator_config().interval, Duration::from_millis(75));
        assert!(settings.elevated_tools.contains(&"aireplay-ng".to_string()));
    }

    #[test]
    fn test_resolve_rejects_unknown_slot() {
        let mut config = default_config();
        config.commands.set_channel_cmd = Some("iw {iface} set channel {channel}".into());
        let err = Settings::resolve(&config).unwrap_err();
        match err {
            ConfigError::Template { field, source } => {
                assert_eq!(field, "commands.set_channel_cmd");
                assert!(matches!(source, TemplateError::UnknownSlot { .. }));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_resolve_rejects_slot_kind_cannot_supply() {
        let mut config = default_config();
        config.commands.deauth_broadcast_cmd =
            Some("aireplay-ng -0 {deauth_count} -a {bssid} -c {client_mac} {wifi_card}".into());
        assert!(matches!(
            Settings::resolve(&config),
            Err(ConfigError::Template { .. })
        ));
    }

    #[test]
    fn test_resolve_rejects_non_numeric_count() {
        let mut config = default_config();
        config.attack.deauth_count = Some(Scalar::Text("lots".into()));
        assert!(matches!(
            Settings::resolve(&config),
            Err(ConfigError::InvalidValue { field, .. }) if field == "attack.deauth_count"
        ));
    }

    #[test]
    fn test_resolve_rejects_zero_loop() {
        let mut config = default_config();
        config.attack.max_attack_loop = Some(Scalar::Int(0));
        assert!(Settings::resolve(&config).is_err());
    }

    #[test]
    fn test_resolve_caps_attack_loops() {
        let mut config = default_config();
        config.attack.max_attack_loop = Some(Scalar::Int(i64::from(MAX_ATTACK_LOOP)));
        assert_eq!(
            Settings::resolve(&config).unwrap().max_attack_loop,
            MAX_ATTACK_LOOP
        );

        config.attack.max_attack_loop = Some(Scalar::Int(i64::from(MAX_ATTACK_LOOP) + 1));
        let err = Settings::resolve(&config).unwrap_err();
        assert!(err.to_string().contains("max_attack_loop"));
    }

    #[test]
    fn test_missing_template_reported() {
        let mut config = default_config();
        config.commands.scan_cmd = None;
        assert!(matches!(
            Settings::resolve(&config),
            Err(ConfigError::MissingValue(field)) if field == "commands.scan_cmd"
        ));
    }

    #[test]
    fn test_credential_not_serialized() {
        let mut config = default_config();
        config.privilege.method = Some(ElevationMethod::Sudo);
        config.privilege.password = Some("hunter2".into());
        let settings = Settings::resolve(&config).unwrap();
        assert_eq!(settings.credential.as_deref(), Some("hunter2"));
        let rendered = settings.to_toml().unwrap();
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("wifi_card = \"wlan0\""));
    }
}
