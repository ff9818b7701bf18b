//! Audit logging for attack activity.
//!
//! Every command that changes the radio environment is recorded to syslog
//! with the `DEAUTHER` tag, one JSON object per event.
//!
//! - **Audit logging** (syslog): what was attacked, when and on which channel
//! - **Debug logging** (tracing): operational detail, stderr or `--log-file`
//!
//! # Usage
//!
//! ```ignore
//! use deauther::telemetry::{self, AuditEvent};
//!
//! telemetry::init_logger()?;
//!
//! telemetry::record(AuditEvent::ChannelSet { channel: 6 });
//! ```
//!
//! # Event Format
//!
//! ```json
//! {"ts":"2026-01-07T14:32:01Z","event":"deauth_broadcast","bssid":"AA:BB:CC:DD:EE:FF","channel":6,"count":10}
//! ```

mod error;
mod events;
mod syslog;

pub use error::TelemetryError;
pub use events::{AuditEvent, StopReason};
pub use syslog::{init_logger, record, try_audit, AuditLogger, SYSLOG_TAG};
