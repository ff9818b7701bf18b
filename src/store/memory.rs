//! In-memory result store and whitelist.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::error::StoreError;
use super::model::{Client, Network, StoreCounts};
use super::{ResultStore, WhitelistProvider};

#[derive(Debug, Default)]
struct Tables {
    networks: BTreeMap<String, Network>,
    clients: BTreeMap<String, Client>,
    whitelist: Vec<String>,
}

/// Result store and whitelist held in memory.
///
/// Clones share the same tables, so a test can keep one clone while the
/// attack loop owns another.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
}

impl MemoryStore {
    /// Empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-filled with rows.
    pub fn with_rows(networks: Vec<Network>, clients: Vec<Client>) -> Self {
        let store = Self::new();
        {
            let mut tables = store.lock();
            tables.networks = networks.into_iter().map(|n| (n.bssid.clone(), n)).collect();
            tables.clients = clients
                .into_iter()
                .map(|c| (c.client_bssid.clone(), c))
                .collect();
        }
        store
    }

    /// Replace the whitelist.
    pub fn set_whitelist<I, S>(&self, macs: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.lock().whitelist = macs
            .into_iter()
            .map(|m| m.as_ref().trim().to_uppercase())
            .collect();
    }

    fn lock(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ResultStore for MemoryStore {
    fn clear(&self) -> Result<(), StoreError> {
        let mut tables = self.lock();
        tables.networks.clear();
        tables.clients.clear();
        Ok(())
    }

    fn upsert(&self, networks: &[Network], clients: &[Client]) -> Result<(), StoreError> {
        let mut tables = self.lock();
        for network in networks {
            tables.networks.insert(network.bssid.clone(), network.clone());
        }
        for client in clients {
            tables
                .clients
                .insert(client.client_bssid.clone(), client.clone());
        }
        Ok(())
    }

    fn network_at(
        &self,
        whitelist: &[String],
        offset: usize,
    ) -> Result<Option<Network>, StoreError> {
        let excluded: Vec<String> = whitelist.iter().map(|m| m.trim().to_uppercase()).collect();
        let tables = self.lock();
        let mut candidates: Vec<&Network> = tables
            .networks
            .values()
            .filter(|n| n.attack_channel().is_some())
            .filter(|n| !excluded.contains(&n.bssid.to_uppercase()))
            .collect();
        candidates.sort_by(|a, b| (a.channel, &a.bssid).cmp(&(b.channel, &b.bssid)));
        Ok(candidates.get(offset).map(|n| (*n).clone()))
    }

    fn client_at(&self, network: &str, offset: usize) -> Result<Option<Client>, StoreError> {
        let network = network.trim().to_uppercase();
        let tables = self.lock();
        Ok(tables
            .clients
            .values()
            .filter(|c| c.associated_network.as_deref() == Some(network.as_str()))
            .nth(offset)
            .cloned())
    }

    fn counts(&self) -> Result<StoreCounts, StoreError> {
        let tables = self.lock();
        Ok(StoreCounts {
            networks: tables.networks.len(),
            clients: tables.clients.len(),
        })
    }
}

impl WhitelistProvider for MemoryStore {
    fn whitelist(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.lock().whitelist.clone())
    }
}
