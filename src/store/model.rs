//! Rows exchanged with the result store.

use serde::Serialize;

/// A discovered access point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Network {
    /// Network name; may be empty for hidden networks.
    pub ssid: String,
    /// Uppercase colon-separated MAC.
    pub bssid: String,
    /// Channel; `None` or non-positive when unknown.
    pub channel: Option<i32>,
}

impl Network {
    /// Build a network row, normalizing the bssid.
    pub fn new(ssid: impl Into<String>, bssid: &str, channel: Option<i32>) -> Self {
        Self {
            ssid: ssid.into(),
            bssid: bssid.trim().to_uppercase(),
            channel,
        }
    }

    /// Channel if it is usable for an attack.
    #[must_use]
    pub fn attack_channel(&self) -> Option<i32> {
        self.channel.filter(|c| *c > 0)
    }
}

/// A discovered station.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Client {
    /// Station MAC, uppercase.
    pub client_bssid: String,
    /// Associated access point; `None` when unassociated.
    pub associated_network: Option<String>,
}

impl Client {
    /// Build a client row, normalizing both MACs.
    pub fn new(client_bssid: &str, associated_network: Option<&str>) -> Self {
        Self {
            client_bssid: client_bssid.trim().to_uppercase(),
            associated_network: associated_network
                .map(|b| b.trim().to_uppercase())
                .filter(|b| !b.is_empty()),
        }
    }
}

/// Rows parsed from one capture.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    /// Networks parsed.
    pub networks: usize,
    /// Clients parsed.
    pub clients: usize,
}

/// Rows currently stored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StoreCounts {
    /// Network rows.
    pub networks: usize,
    /// Client rows.
    pub clients: usize,
}
