//! deauther: Wi-Fi scan and deauthentication controller
//!
//! This crate drives external wireless tools (interface mode switching,
//! airodump-ng, aireplay-ng) through a supervised process layer and
//! sequences them into a continuous scan/attack loop.
//!
//! # Safety Model
//!
//! Whitelisted access points are never attacked, and any failure to read
//! the whitelist or the scan results yields no target rather than a guess.
//! Stopping always tries to return the interface to managed mode.
//!
//! # Architecture
//!
//! - **Supervisor**: Spawns commands in their own process groups and
//!   streams their output as UTF-8 chunks
//! - **Stream**: Aggregates the scanner's redraws into throttled HUD frames
//! - **Attack**: The scan/attack state machine and its command templates
//! - **Store**: Scan results, capture import and the whitelist (SQLite)
//! - **Config**: Hierarchical TOML configuration with typed templates
//! - **Telemetry**: Syslog audit trail of every attack
//! - **Session/TUI**: Event loop wiring and the terminal front-end

#![warn(clippy::all)]
#![warn(missing_docs)]

pub mod attack;
pub mod cli;
pub mod cli_handler;
pub mod config;
pub mod session;
pub mod store;
pub mod stream;
pub mod supervisor;
pub mod telemetry;
pub mod tui;
