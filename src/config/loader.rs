//! Configuration loading with hierarchy merging.
//!
//! Configuration is loaded from multiple sources and merged in order:
//!
//! 1. Embedded defaults (compiled into binary)
//! 2. System config: `/etc/deauther/config.toml`
//! 3. User config: `~/.config/deauther/config.toml`
//! 4. Additional config file (via `--config` flag)
//! 5. CLI flags (highest priority)
//!
//! Scalars set in a later layer override earlier ones.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use super::error::ConfigError;
use super::schema::{Config, Scalar};
use super::settings::Settings;
use crate::cli::Cli;

/// Defaults shipped with the binary.
pub const EMBEDDED_DEFAULTS: &str = include_str!("../../config/default.toml");

/// System-wide configuration path.
pub const SYSTEM_CONFIG_PATH: &str = "/etc/deauther/config.toml";

/// User configuration directory name.
pub const USER_CONFIG_DIR: &str = "deauther";

/// User configuration filename.
pub const USER_CONFIG_FILE: &str = "config.toml";

/// Values taken from the command line, applied last.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Overrides {
    /// `--config PATH`; must exist when given.
    pub config_file: Option<PathBuf>,
    /// `--interface NAME`.
    pub wifi_card: Option<String>,
    /// `--auto`.
    pub automatic_turn_on: bool,
}

impl Overrides {
    /// Collect overrides from parsed CLI arguments.
    #[must_use]
    pub fn from_cli(cli: &Cli) -> Self {
        Self {
            config_file: cli.config.clone(),
            wifi_card: cli.interface.clone(),
            automatic_turn_on: cli.auto,
        }
    }
}

/// Anything that can produce fresh settings on demand.
///
/// The attack loop re-reads settings when the operator asks for it.
pub trait SettingsSource: Send {
    /// Load and validate settings.
    fn load_settings(&self) -> Result<Settings, ConfigError>;
}

/// Configuration loader with support for hierarchy merging.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    /// Path to system-wide configuration.
    system_path: PathBuf,
    /// Path to user configuration.
    user_path: PathBuf,
    /// CLI-level overrides.
    overrides: Overrides,
}

impl ConfigLoader {
    /// Create a new ConfigLoader with default paths.
    #[must_use]
    pub fn new() -> Self {
        let user_config_dir = dirs::config_dir()
            .map(|p| p.join(USER_CONFIG_DIR))
            .unwrap_or_else(|| PathBuf::from(".config").join(USER_CONFIG_DIR));

        Self {
            system_path: PathBuf::from(SYSTEM_CONFIG_PATH),
            user_path: user_config_dir.join(USER_CONFIG_FILE),
            overrides: Overrides::default(),
        }
    }

    /// Create a ConfigLoader with custom paths (for testing).
    #[must_use]
    pub fn with_paths(system_path: PathBuf, user_path: PathBuf) -> Self {
        Self {
            system_path,
            user_path,
            overrides: Overrides::default(),
        }
    }

    /// Apply CLI overrides on every load.
    #[must_use]
    pub fn with_overrides(mut self, overrides: Overrides) -> Self {
        self.overrides = overrides;
        self
    }

    /// Path of the user configuration file.
    #[must_use]
    pub fn user_path(&self) -> &Path {
        &self.user_path
    }

    /// Load and merge configuration from all sources.
    ///
    /// Missing system and user files are skipped. Invalid TOML is an error,
    /// as is a `--config` file that does not exist.
    pub fn load(&self) -> Result<Config, ConfigError> {
        // Start with embedded defaults
        let mut config: Config =
            toml::from_str(EMBEDDED_DEFAULTS).map_err(|e| ConfigError::ParseError {
                path: PathBuf::from("<embedded:default.toml>"),
                source: e,
            })?;
        debug!("Loaded embedded default configuration");

        for (label, path) in [("system", &self.system_path), ("user", &self.user_path)] {
            if let Some(layer) = self.load_file(path)? {
                config.merge(layer);
                debug!("Loaded {} config from {:?}", label, path);
            } else {
                debug!("No {} config found at {:?}", label, path);
            }
        }

        if let Some(ref cli_config_path) = self.overrides.config_file {
            match self.load_file(cli_config_path)? {
                Some(cli_config) => {
                    config.merge(cli_config);
                    debug!("Loaded additional config from {:?}", cli_config_path);
                }
                None => {
                    // Unlike system/user config, a missing CLI-specified config is an error
                    return Err(ConfigError::ReadError {
                        path: cli_config_path.clone(),
                        source: std::io::Error::new(
                            std::io::ErrorKind::NotFound,
                            "Specified config file not found",
                        ),
                    });
                }
            }
        }

        // Apply CLI flags (highest priority)
        if let Some(ref card) = self.overrides.wifi_card {
            config.attack.wifi_card = Some(card.clone());
            debug!("Interface overridden from CLI: {}", card);
        }
        if self.overrides.automatic_turn_on {
            config.attack.automatic_turn_on = Some(Scalar::Bool(true));
        }

        Ok(config)
    }

    /// Load a single config file. `Ok(None)` if it does not exist.
    fn load_file(&self, path: &Path) -> Result<Option<Config>, ConfigError> {
        match fs::read_to_string(path) {
            Ok(contents) => {
                let config = toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
                    path: path.to_path_buf(),
                    source: e,
                })?;
                Ok(Some(config))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(ConfigError::ReadError {
                path: path.to_path_buf(),
                source: e,
            }),
        }
    }
}

impl SettingsSource for ConfigLoader {
    fn load_settings(&self) -> Result<Settings, ConfigError> {
        Settings::resolve(&self.load()?)
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn isolated_loader(dir: &Path) -> ConfigLoader {
        ConfigLoader::with_paths(
            dir.join("nonexistent_system.toml"),
            dir.join("nonexistent_user.toml"),
        )
    }

    #[test]
    fn test_missing_files_use_defaults() {
        let dir = tempdir().unwrap();
        let settings = isolated_loader(dir.path()).load_settings().unwrap();
        assert_eq!(settings.wifi_card, "wlan0");
        assert_eq!(settings.scan_time, 20);
    }

    #[test]
    fn test_user_overrides_system() {
        let dir = tempdir().unwrap();
        let system = dir.path().join("system.toml");
        let user = dir.path().join("user.toml");
        fs::write(&system, "[attack]\nwifi_card = \"wlan1\"\nscan_time = 30\n").unwrap();
        fs::write(&user, "[attack]\nscan_time = \"45\"\n").unwrap();

        let settings = ConfigLoader::with_paths(system, user).load_settings().unwrap();
        assert_eq!(settings.wifi_card, "wlan1");
        assert_eq!(settings.scan_time, 45);
    }

    #[test]
    fn test_cli_overrides_win() {
        let dir = tempdir().unwrap();
        let extra = dir.path().join("extra.toml");
        fs::write(&extra, "[attack]\nwifi_card = \"wlan2\"\ndeauth_count = 3\n").unwrap();

        let loader = isolated_loader(dir.path()).with_overrides(Overrides {
            config_file: Some(extra),
            wifi_card: Some("wlan9".into()),
            automatic_turn_on: true,
        });
        let settings = loader.load_settings().unwrap();
        assert_eq!(settings.wifi_card, "wlan9");
        assert_eq!(settings.deauth_count, 3);
        assert!(settings.automatic_turn_on);
    }

    #[test]
    fn test_missing_cli_config_is_error() {
        let dir = tempdir().unwrap();
        let loader = isolated_loader(dir.path()).with_overrides(Overrides {
            config_file: Some(dir.path().join("missing.toml")),
            ..Default::default()
        });
        assert!(matches!(loader.load(), Err(ConfigError::ReadError { .. })));
    }

    #[test]
    fn test_invalid_toml_is_error() {
        let dir = tempdir().unwrap();
        let user = dir.path().join("user.toml");
        fs::write(&user, "[attack\nwifi_card = ").unwrap();
        let loader = ConfigLoader::with_paths(dir.path().join("none.toml"), user);
        assert!(matches!(loader.load(), Err(ConfigError::ParseError { .. })));
    }

    #[test]
    fn test_bad_template_fails_at_load() {
        let dir = tempdir().unwrap();
        let user = dir.path().join("user.toml");
        fs::write(&user, "[commands]\nscan_cmd = \"airodump-ng {wifi_card} -c {channel}\"\n")
            .unwrap();
        let loader = ConfigLoader::with_paths(dir.path().join("none.toml"), user);
        assert!(matches!(
            loader.load_settings(),
            Err(ConfigError::Template { .. })
        ));
    }
}
