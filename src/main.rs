//! deauther: Wi-Fi scan and deauthentication controller
//!
//! Entry point: parses the CLI, loads layered configuration, then either
//! runs a one-shot subcommand or starts a session with the TUI or the
//! headless front-end.
//!
//! # I/O Architecture
//!
//! - **Audit logging**: syslog, one JSON event per radio-affecting action
//! - **Debug logging**: stderr, or `--log-file` when the TUI owns the
//!   terminal
//! - **Status**: the TUI, or stdout in headless mode

use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use deauther::{
    cli::Cli,
    cli_handler::handle_command,
    config::{ConfigLoader, Overrides, SettingsSource},
    session::run_session,
    telemetry::{self, AuditEvent},
};
use tracing::{debug, info, warn};

fn main() -> Result<()> {
    // Parse CLI arguments first (before any other initialization)
    let mut cli = Cli::parse();

    init_tracing(cli.verbose, cli.log_file.as_deref(), cli.uses_tui())?;

    debug!("Parsed CLI arguments: {:?}", cli);

    // Load configuration with hierarchy merging
    let loader = ConfigLoader::new().with_overrides(Overrides::from_cli(&cli));
    let settings = loader
        .load_settings()
        .context("Failed to load configuration")?;

    debug!(
        "Loaded settings: interface {}, elevation {}, database {:?}",
        settings.wifi_card, settings.elevation, settings.database
    );

    if let Some(command) = cli.command.take() {
        return handle_command(command, &settings);
    }

    // Audit logging is best effort.
    if let Err(e) = telemetry::init_logger() {
        warn!("Audit logging disabled: {}", e);
    }

    info!("Controlling interface {}", settings.wifi_card);
    let started = Instant::now();
    telemetry::record(AuditEvent::SessionStart {
        user: whoami(),
        wifi_card: settings.wifi_card.clone(),
        pid: std::process::id(),
    });

    let result = run_session(&cli, settings, loader);

    telemetry::record(AuditEvent::SessionEnd {
        user: whoami(),
        duration_sec: started.elapsed().as_secs(),
    });

    result
}

/// Initialize the tracing subscriber for debug/development logging.
///
/// This is separate from the audit telemetry which goes to syslog.
///
/// # Verbosity Levels
/// - 0 (default): Only warnings and errors
/// - 1 (-v): Info level
/// - 2 (-vv): Debug level
/// - 3+ (-vvv): Trace level
fn init_tracing(verbose: u8, log_file: Option<&Path>, tui: bool) -> Result<()> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    let registry = tracing_subscriber::registry().with(filter);

    match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {:?}", path))?;
            registry
                .with(fmt::layer().with_writer(Mutex::new(file)).with_ansi(false))
                .try_init()
        }
        // Writing to stderr would tear the TUI.
        None if tui => registry.try_init(),
        None => registry
            .with(fmt::layer().with_writer(std::io::stderr))
            .try_init(),
    }
    .context("Failed to initialize tracing subscriber")?;

    Ok(())
}

/// Get the current username for audit logging.
fn whoami() -> String {
    std::env::var("USER")
        .or_else(|_| std::env::var("LOGNAME"))
        .unwrap_or_else(|_| "unknown".to_string())
}
