//! Audit event types.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Audit events, serialized with an `event` tag.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum AuditEvent {
    /// The program started.
    SessionStart {
        /// Operator username.
        user: String,
        /// Interface under control.
        wifi_card: String,
        /// Our process id.
        pid: u32,
    },

    /// The program exited.
    SessionEnd {
        /// Operator username.
        user: String,
        /// Wall time in seconds.
        duration_sec: u64,
    },

    /// A scan/attack cycle began.
    CycleStart {
        /// Interface put into monitor mode.
        wifi_card: String,
        /// Passes over the target list before rescanning.
        max_attack_loop: u32,
    },

    /// Scan results were imported.
    ScanComplete {
        /// Networks parsed.
        networks: usize,
        /// Clients parsed.
        clients: usize,
    },

    /// The interface was retuned.
    ChannelSet {
        /// New channel.
        channel: i32,
    },

    /// Broadcast deauthentication against an access point.
    DeauthBroadcast {
        /// Target access point.
        bssid: String,
        /// Channel it was attacked on.
        channel: i32,
        /// Burst count.
        count: u64,
    },

    /// Targeted deauthentication of one station.
    DeauthClient {
        /// Access point the station is associated with.
        bssid: String,
        /// Station MAC.
        client: String,
        /// Burst count.
        count: u64,
    },

    /// The cycle was cancelled.
    AttackStop {
        /// Who asked.
        reason: StopReason,
    },
}

/// Why an attack was stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// `stop_attack` from the operator.
    Operator,
    /// Program shutdown.
    Shutdown,
}

/// Wrapper for serializing events with timestamp.
#[derive(Debug, Clone, Serialize)]
pub struct TimestampedEvent<'a> {
    /// ISO8601 timestamp.
    #[serde(rename = "ts")]
    pub timestamp: DateTime<Utc>,

    /// The actual event (flattened into this struct).
    #[serde(flatten)]
    pub event: &'a AuditEvent,
}

impl AuditEvent {
    /// Wrap this event with a timestamp for serialization.
    pub fn with_timestamp(&self) -> TimestampedEvent<'_> {
        TimestampedEvent {
            timestamp: Utc::now(),
            event: self,
        }
    }
}
