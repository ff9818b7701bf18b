//! The scan/attack loop.
//!
//! [`AttackOrchestrator`] is a single-threaded state machine. It receives
//! operator [`InboundCommand`]s and supervisor
//! [`ProcessEvent`](crate::supervisor::ProcessEvent)s, keeps exactly one
//! external command outstanding, and publishes [`StatusEvent`]s.
//!
//! ```text
//! Idle -> SettingMonitorMode -> Scanning -> ImportingResults
//!      -> SelectingNetwork -> SettingChannel -> AttackingBroadcast
//!      -> SelectingClient -> AttackingClient -> SelectingClient ...
//!      -> SelectingNetwork (next network, next loop, or a fresh scan)
//! stop_attack: any phase -> SettingManagedMode -> Stopped
//! ```

mod commands;
mod events;
mod executor;
mod machine;
mod state;

pub use commands::{CommandBuilder, ATTACK_TIMEOUT_FLOOR_SECS};
pub use events::{InboundCommand, StatusEvent, TypeOut, UnknownCommand};
pub use executor::{CommandExecutor, SupervisorExecutor};
pub use machine::AttackOrchestrator;
pub use state::{AttackPhase, AttackState, WifiMode};
