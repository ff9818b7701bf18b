//! Scan results, capture import and the target whitelist.
//!
//! The attack loop only talks to the traits defined here:
//!
//! - [`ResultStore`]: networks and clients discovered by the last scan,
//!   queried one row at a time with ordered offset/limit selects
//! - [`ScanImporter`]: turns the capture tool's output file into store rows
//! - [`WhitelistProvider`]: access points that must never be attacked
//!
//! [`SqliteStore`], [`AirodumpImporter`] and [`WhitelistStore`] are the
//! on-disk implementations; [`MemoryStore`] backs tests and dry runs.

mod error;
mod importer;
mod memory;
mod model;
mod sqlite;
mod whitelist;

pub use error::StoreError;
pub use importer::{parse_airodump_csv, AirodumpImporter, ParsedCapture};
pub use memory::MemoryStore;
pub use model::{Client, ImportSummary, Network, StoreCounts};
pub use sqlite::SqliteStore;
pub use whitelist::{is_valid_mac, normalize_mac, WhitelistStore};

/// Relational view of the last scan.
///
/// Implementations open, query and close per call; nothing is held across
/// the attack loop's asynchronous boundaries.
pub trait ResultStore: Send {
    /// Delete every network and client.
    fn clear(&self) -> Result<(), StoreError>;

    /// Insert or update rows by primary key.
    fn upsert(&self, networks: &[Network], clients: &[Client]) -> Result<(), StoreError>;

    /// The `offset`-th attackable network: positive channel, bssid not in
    /// `whitelist` (case-insensitive), ordered by `(channel, bssid)`.
    fn network_at(&self, whitelist: &[String], offset: usize)
    -> Result<Option<Network>, StoreError>;

    /// The `offset`-th client associated with `network`, ordered by mac.
    fn client_at(&self, network: &str, offset: usize) -> Result<Option<Client>, StoreError>;

    /// Row counts.
    fn counts(&self) -> Result<StoreCounts, StoreError>;
}

/// Moves capture-tool output into a [`ResultStore`].
pub trait ScanImporter: Send {
    /// Remove stale capture files so the next scan writes a fresh one.
    fn prepare(&self) -> Result<(), StoreError>;

    /// Parse the newest capture and upsert it into `store`.
    fn import(&self, store: &dyn ResultStore) -> Result<ImportSummary, StoreError>;
}

/// Read-only source of excluded access points.
pub trait WhitelistProvider: Send {
    /// Excluded bssids, uppercase.
    fn whitelist(&self) -> Result<Vec<String>, StoreError>;
}
