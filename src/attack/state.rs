//! Attack loop state.

use std::fmt;

use serde::Serialize;

use crate::store::Network;
use crate::supervisor::ProcessId;

/// Interface mode as last confirmed by a completed mode-set command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WifiMode {
    /// Normal station mode.
    #[default]
    Managed,
    /// Capture/injection mode.
    Monitor,
}

impl fmt::Display for WifiMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WifiMode::Managed => f.write_str("managed"),
            WifiMode::Monitor => f.write_str("monitor"),
        }
    }
}

/// Where the attack loop is. Every phase except `Idle` and `Stopped` has
/// exactly one command pending or is resolving synchronously.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AttackPhase {
    /// Waiting for a scan command.
    #[default]
    Idle,
    /// Monitor-mode enable pending.
    SettingMonitorMode,
    /// Capture tool running.
    Scanning,
    /// Loading the capture into the result store.
    ImportingResults,
    /// Choosing the next network.
    SelectingNetwork,
    /// Channel-set pending.
    SettingChannel,
    /// Broadcast deauthentication pending.
    AttackingBroadcast,
    /// Choosing the next client of the current network.
    SelectingClient,
    /// Client deauthentication pending.
    AttackingClient,
    /// Managed-mode restore pending.
    SettingManagedMode,
    /// Cycle cancelled.
    Stopped,
}

impl AttackPhase {
    /// Whether a cycle is in progress.
    #[must_use]
    pub fn is_active(self) -> bool {
        !matches!(self, AttackPhase::Idle | AttackPhase::Stopped)
    }

    /// Short label for status displays.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            AttackPhase::Idle => "idle",
            AttackPhase::SettingMonitorMode => "monitor mode",
            AttackPhase::Scanning => "scanning",
            AttackPhase::ImportingResults => "importing",
            AttackPhase::SelectingNetwork => "selecting network",
            AttackPhase::SettingChannel => "setting channel",
            AttackPhase::AttackingBroadcast => "broadcast deauth",
            AttackPhase::SelectingClient => "selecting client",
            AttackPhase::AttackingClient => "client deauth",
            AttackPhase::SettingManagedMode => "managed mode",
            AttackPhase::Stopped => "stopped",
        }
    }
}

impl fmt::Display for AttackPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Mutable loop bookkeeping, owned by the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttackState {
    /// Offset into the ordered, filtered network list.
    pub current_network_index: usize,
    /// Offset into the current network's clients.
    pub current_client_index: usize,
    /// Pass over the network list, starting at 1 after each scan.
    pub attack_loop_count: u32,
    /// Passes before a re-scan.
    pub max_attack_loop: u32,
    /// Channel confirmed by the last completed channel-set.
    pub last_channel: Option<i32>,
    /// Confirmed interface mode.
    pub wifi_mode: WifiMode,
    /// Set by `stop_attack`, cleared by `scan`.
    pub cancel_requested: bool,
    /// The running scan, if any.
    pub active_scan: Option<ProcessId>,
    /// Network under attack.
    pub target: Option<Network>,
}

impl AttackState {
    /// Fresh state for a loop of `max_attack_loop` passes (at least 1).
    #[must_use]
    pub fn new(max_attack_loop: u32) -> Self {
        Self {
            current_network_index: 0,
            current_client_index: 0,
            attack_loop_count: 1,
            max_attack_loop: max_attack_loop.max(1),
            last_channel: None,
            wifi_mode: WifiMode::Managed,
            cancel_requested: false,
            active_scan: None,
            target: None,
        }
    }
}
