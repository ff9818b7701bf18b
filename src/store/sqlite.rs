//! SQLite-backed result store.

use std::path::{Path, PathBuf};

use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use tracing::debug;

use super::error::StoreError;
use super::model::{Client, Network, StoreCounts};
use super::ResultStore;

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS networks (
        bssid TEXT PRIMARY KEY,
        ssid TEXT,
        channel INTEGER
    );
    CREATE INDEX IF NOT EXISTS idx_networks_ssid ON networks(ssid);
    CREATE INDEX IF NOT EXISTS idx_networks_channel ON networks(channel);

    CREATE TABLE IF NOT EXISTS clients (
        client_bssid TEXT PRIMARY KEY,
        associated_network TEXT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_clients_assoc ON clients(associated_network);
"#;

/// Result store in a SQLite file.
///
/// Each operation opens its own connection and closes it on return.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    path: PathBuf,
}

impl SqliteStore {
    /// Open (creating if needed) the database at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| StoreError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let store = Self { path };
        store.connect()?;
        debug!("Result store ready at {:?}", store.path);
        Ok(store)
    }

    /// Database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Every network, ordered by `(channel, bssid)`.
    pub fn networks(&self) -> Result<Vec<Network>, StoreError> {
        let conn = self.connect()?;
        let mut stmt =
            conn.prepare("SELECT ssid, bssid, channel FROM networks ORDER BY channel, bssid")?;
        let rows = stmt.query_map([], |row| {
            Ok(Network {
                ssid: row.get::<_, Option<String>>(0)?.unwrap_or_default(),
                bssid: row.get(1)?,
                channel: row.get(2)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Every client, ordered by mac.
    pub fn clients(&self) -> Result<Vec<Client>, StoreError> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(
            "SELECT client_bssid, associated_network FROM clients ORDER BY client_bssid",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(Client {
                client_bssid: row.get(0)?,
                associated_network: row.get(1)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    fn connect(&self) -> Result<Connection, StoreError> {
        let conn = Connection::open(&self.path)?;
        conn.execute_batch(SCHEMA)?;
        Ok(conn)
    }
}

fn offset_param(offset: usize) -> i64 {
    i64::try_from(offset).unwrap_or(i64::MAX)
}

impl ResultStore for SqliteStore {
    fn clear(&self) -> Result<(), StoreError> {
        let conn = self.connect()?;
        conn.execute_batch("DELETE FROM networks; DELETE FROM clients;")?;
        Ok(())
    }

    fn upsert(&self, networks: &[Network], clients: &[Client]) -> Result<(), StoreError> {
        let mut conn = self.connect()?;
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO networks(bssid, ssid, channel) VALUES (?1, ?2, ?3)
                 ON CONFLICT(bssid) DO UPDATE SET ssid = excluded.ssid, channel = excluded.channel",
            )?;
            for network in networks {
                stmt.execute(params![network.bssid, network.ssid, network.channel])?;
            }

            let mut stmt = tx.prepare(
                "INSERT INTO clients(client_bssid, associated_network) VALUES (?1, ?2)
                 ON CONFLICT(client_bssid) DO UPDATE SET associated_network = excluded.associated_network",
            )?;
            for client in clients {
                stmt.execute(params![client.client_bssid, client.associated_network])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn network_at(
        &self,
        whitelist: &[String],
        offset: usize,
    ) -> Result<Option<Network>, StoreError> {
        let conn = self.connect()?;
        let excluded: Vec<String> = whitelist.iter().map(|m| m.trim().to_uppercase()).collect();

        let filter = if excluded.is_empty() {
            String::new()
        } else {
            let marks = vec!["?"; excluded.len()].join(", ");
            format!(" AND UPPER(bssid) NOT IN ({})", marks)
        };
        let sql = format!(
            "SELECT ssid, bssid, channel FROM networks \
             WHERE channel > 0{} ORDER BY channel ASC, bssid ASC LIMIT 1 OFFSET ?",
            filter
        );

        let mut values: Vec<rusqlite::types::Value> =
            excluded.into_iter().map(rusqlite::types::Value::from).collect();
        values.push(rusqlite::types::Value::from(offset_param(offset)));

        let network = conn
            .query_row(&sql, params_from_iter(values), |row| {
                Ok(Network {
                    ssid: row.get::<_, Option<String>>(0)?.unwrap_or_default(),
                    bssid: row.get(1)?,
                    channel: row.get(2)?,
                })
            })
            .optional()?;
        Ok(network)
    }

    fn client_at(&self, network: &str, offset: usize) -> Result<Option<Client>, StoreError> {
        let conn = self.connect()?;
        let client = conn
            .query_row(
                "SELECT client_bssid, associated_network FROM clients \
                 WHERE associated_network = ?1 ORDER BY client_bssid ASC LIMIT 1 OFFSET ?2",
                params![network.trim().to_uppercase(), offset_param(offset)],
                |row| {
                    Ok(Client {
                        client_bssid: row.get(0)?,
                        associated_network: row.get(1)?,
                    })
                },
            )
            .optional()?;
        Ok(client)
    }

    fn counts(&self) -> Result<StoreCounts, StoreError> {
        let conn = self.connect()?;
        let networks: i64 = conn.query_row("SELECT COUNT(*) FROM networks", [], |row| row.get(0))?;
        let clients: i64 = conn.query_row("SELECT COUNT(*) FROM clients", [], |row| row.get(0))?;
        Ok(StoreCounts {
            networks: usize::try_from(networks).unwrap_or_default(),
            clients: usize::try_from(clients).unwrap_or_default(),
        })
    }
}
