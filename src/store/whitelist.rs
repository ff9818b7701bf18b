//! Persistent whitelist of access points that are never attacked.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use rusqlite::{params, Connection};
use tracing::debug;

use super::error::StoreError;
use super::WhitelistProvider;

static MAC_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([0-9A-Fa-f]{2}:){5}[0-9A-Fa-f]{2}$").expect("valid MAC regex")
});

/// Whether `mac` is six colon-separated hex octets.
#[must_use]
pub fn is_valid_mac(mac: &str) -> bool {
    MAC_PATTERN.is_match(mac.trim())
}

/// Canonical form: dashes become colons, single-digit octets are
/// zero-padded, hex is uppercased.
///
/// Input that does not have six octets is only trimmed and uppercased.
#[must_use]
pub fn normalize_mac(mac: &str) -> String {
    let mac = mac.trim().replace('-', ":");
    let parts: Vec<&str> = mac.split(':').collect();
    if parts.len() == 6 && parts.iter().all(|p| (1..=2).contains(&p.len())) {
        parts
            .iter()
            .map(|p| format!("{:0>2}", p))
            .collect::<Vec<_>>()
            .join(":")
            .to_uppercase()
    } else {
        mac.to_uppercase()
    }
}

/// Whitelist in the `whitelist` table of a SQLite database.
#[derive(Debug, Clone)]
pub struct WhitelistStore {
    path: PathBuf,
}

impl WhitelistStore {
    /// Use the database at `path`, creating the table if needed.
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
        Ok(store)
    }

    /// All entries, sorted case-insensitively.
    pub fn load_all(&self) -> Result<Vec<String>, StoreError> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare("SELECT mac FROM whitelist ORDER BY mac COLLATE NOCASE")?;
        let macs = stmt.query_map([], |row| row.get::<_, String>(0))?;
        Ok(macs.collect::<Result<Vec<_>, _>>()?)
    }

    /// Add a MAC. Returns false if it was already present.
    pub fn add(&self, mac: &str) -> Result<bool, StoreError> {
        let mac = validated(mac)?;
        let conn = self.connect()?;
        let inserted = conn.execute(
            "INSERT OR IGNORE INTO whitelist(mac) VALUES (?1)",
            params![mac],
        )?;
        debug!("Whitelist add {}: {}", mac, inserted > 0);
        Ok(inserted > 0)
    }

    /// Remove a MAC. Returns false if it was not present.
    pub fn remove(&self, mac: &str) -> Result<bool, StoreError> {
        let mac = normalize_mac(mac);
        let conn = self.connect()?;
        let removed = conn.execute("DELETE FROM whitelist WHERE mac = ?1", params![mac])?;
        Ok(removed > 0)
    }

    /// Replace every entry. Duplicates are collapsed keeping first order.
    pub fn replace_all<S: AsRef<str>>(&self, macs: &[S]) -> Result<usize, StoreError> {
        let mut unique: Vec<String> = Vec::with_capacity(macs.len());
        for mac in macs {
            let mac = validated(mac.as_ref())?;
            if !unique.contains(&mac) {
                unique.push(mac);
            }
        }

        let mut conn = self.connect()?;
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM whitelist", [])?;
        {
            let mut stmt = tx.prepare("INSERT INTO whitelist(mac) VALUES (?1)")?;
            for mac in &unique {
                stmt.execute(params![mac])?;
            }
        }
        tx.commit()?;
        Ok(unique.len())
    }

    /// Remove every entry.
    pub fn clear(&self) -> Result<(), StoreError> {
        self.connect()?.execute("DELETE FROM whitelist", [])?;
        Ok(())
    }

    fn connect(&self) -> Result<Connection, StoreError> {
        let conn = Connection::open(&self.path)?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS whitelist (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                mac TEXT NOT NULL UNIQUE
            );",
        )?;
        Ok(conn)
    }
}

fn validated(mac: &str) -> Result<String, StoreError> {
    let normalized = normalize_mac(mac);
    if is_valid_mac(&normalized) {
        Ok(normalized)
    } else {
        Err(StoreError::InvalidMac(mac.trim().to_string()))
    }
}

impl WhitelistProvider for WhitelistStore {
    fn whitelist(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.load_all()?.iter().map(|m| m.to_uppercase()).collect())
    }
}
