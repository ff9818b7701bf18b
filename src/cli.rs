//! Command-line interface definitions for deauther.
//!
//! Uses clap's derive API for type-safe argument parsing.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Wi-Fi scan and deauthentication controller.
///
/// deauther puts a wireless interface into monitor mode, scans for access
/// points and stations, and cycles deauthentication bursts across every
/// target that is not whitelisted.
#[derive(Parser, Debug)]
#[command(name = "deauther")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to run (or omit to start an interactive session).
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Path to additional config file.
    ///
    /// Merged on top of system and user configs, giving it the highest
    /// priority except for CLI flags.
    #[arg(short = 'c', long = "config", value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Wireless interface to use, overriding the configured one.
    #[arg(short = 'i', long = "interface", value_name = "IFACE")]
    pub interface: Option<String>,

    /// Start scanning immediately.
    #[arg(long = "auto")]
    pub auto: bool,

    /// Run without TUI: commands on stdin, status on stdout.
    #[arg(long = "headless")]
    pub headless: bool,

    /// Print status events as JSON lines (headless only).
    #[arg(long = "json", requires = "headless")]
    pub json: bool,

    /// Write debug logs to this file instead of stderr.
    ///
    /// The TUI owns the terminal, so without this only warnings are kept
    /// and they are discarded.
    #[arg(long = "log-file", value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Increase log verbosity.
    ///
    /// Can be specified multiple times:
    /// -v    = info level
    /// -vv   = debug level
    /// -vvv  = trace level
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    pub verbose: u8,
}

/// Subcommands for deauther.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Import an airodump-ng CSV into the result store.
    Import {
        /// Capture file to import.
        #[arg(required = true)]
        csv: PathBuf,
    },

    /// List attackable targets from the last scan.
    Targets,

    /// Manage access points that are never attacked.
    Whitelist {
        /// What to do with the whitelist.
        #[command(subcommand)]
        action: WhitelistAction,
    },

    /// Print the resolved settings as TOML.
    Settings,
}

/// Whitelist operations.
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum WhitelistAction {
    /// Show every entry.
    List,
    /// Add an access point.
    Add {
        /// BSSID, e.g. AA:BB:CC:DD:EE:FF.
        mac: String,
    },
    /// Remove an access point.
    Remove {
        /// BSSID to remove.
        mac: String,
    },
    /// Remove every entry.
    Clear,
}

impl Cli {
    /// Whether the interactive TUI will own the terminal.
    #[must_use]
    pub fn uses_tui(&self) -> bool {
        self.command.is_none() && !self.headless
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse_basic() {
        let cli = Cli::parse_from(["deauther"]);
        assert!(cli.command.is_none());
        assert!(!cli.headless);
        assert!(!cli.auto);
        assert_eq!(cli.verbose, 0);
        assert!(cli.uses_tui());
    }

    #[test]
    fn test_cli_parse_with_options() {
        let cli = Cli::parse_from([
            "deauther",
            "-i",
            "wlan1",
            "--auto",
            "--headless",
            "--json",
            "-vv",
            "--config",
            "/tmp/extra.toml",
        ]);

        assert_eq!(cli.interface.as_deref(), Some("wlan1"));
        assert!(cli.auto);
        assert!(cli.headless);
        assert!(cli.json);
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/extra.toml")));
        assert!(!cli.uses_tui());
    }

    #[test]
    fn test_json_requires_headless() {
        assert!(Cli::try_parse_from(["deauther", "--json"]).is_err());
    }

    #[test]
    fn test_import_command() {
        let cli = Cli::parse_from(["deauther", "import", "/tmp/scan-01.csv"]);
        assert!(!cli.uses_tui());
        match cli.command {
            Some(Commands::Import { csv }) => assert_eq!(csv, PathBuf::from("/tmp/scan-01.csv")),
            _ => panic!("Expected Import command"),
        }
    }

    #[test]
    fn test_whitelist_commands() {
        let cli = Cli::parse_from(["deauther", "whitelist", "add", "aa:bb:cc:dd:ee:ff"]);
        match cli.command {
            Some(Commands::Whitelist { action }) => assert_eq!(
                action,
                WhitelistAction::Add {
                    mac: "aa:bb:cc:dd:ee:ff".to_string()
                }
            ),
            _ => panic!("Expected Whitelist command"),
        }

        let cli = Cli::parse_from(["deauther", "whitelist", "clear"]);
        assert!(matches!(
            cli.command,
            Some(Commands::Whitelist {
                action: WhitelistAction::Clear
            })
        ));
    }
}
