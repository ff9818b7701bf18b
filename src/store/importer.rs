//! airodump-ng CSV import.
//!
//! A capture CSV holds two sections, each introduced by its own header row:
//! access points (`BSSID, ..., channel, ..., ESSID, Key`) and stations
//! (`Station MAC, ..., BSSID, Probed ESSIDs`). Header names have drifted
//! between releases, so columns are located by name with aliases.

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use tracing::{debug, info, warn};

use super::error::StoreError;
use super::model::{Client, ImportSummary, Network};
use super::{ResultStore, ScanImporter};

/// Association values that mean "not associated".
const UNASSOCIATED: [&str; 3] = ["(NOT ASSOCIATED)", "FF:FF:FF:FF:FF:FF", ""];

/// Rows parsed from one capture file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedCapture {
    /// Access points.
    pub networks: Vec<Network>,
    /// Stations.
    pub clients: Vec<Client>,
}

enum Section {
    Networks {
        bssid: Option<usize>,
        channel: Option<usize>,
        essid: Option<usize>,
    },
    Clients {
        station: Option<usize>,
        bssid: Option<usize>,
    },
}

fn normalize_header(cell: &str) -> String {
    cell.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

fn find_column(header: &[String], aliases: &[&str]) -> Option<usize> {
    aliases
        .iter()
        .find_map(|alias| header.iter().position(|h| h == alias))
}

fn to_int(cell: &str) -> Option<i32> {
    cell.trim().parse().ok()
}

fn cell(row: &[String], idx: Option<usize>) -> Option<&str> {
    idx.and_then(|i| row.get(i)).map(String::as_str)
}

/// Parse an airodump-ng CSV capture from any reader.
///
/// Blank rows are skipped, rows missing key columns are dropped, and
/// invalid UTF-8 in names is replaced rather than rejected.
pub fn parse_airodump_csv<R: Read>(reader: R) -> Result<ParsedCapture, csv::Error> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(reader);

    let mut parsed = ParsedCapture::default();
    let mut section: Option<Section> = None;

    for record in reader.byte_records() {
        let record = record?;
        let row: Vec<String> = record
            .iter()
            .map(|field| String::from_utf8_lossy(field).into_owned())
            .collect();
        if row.iter().all(|c| c.trim().is_empty()) {
            continue;
        }

        let header: Vec<String> = row.iter().map(|c| normalize_header(c)).collect();
        let has = |name: &str| header.iter().any(|h| h == name);

        if has("bssid") && has("essid") {
            section = Some(Section::Networks {
                bssid: find_column(&header, &["bssid"]),
                channel: find_column(&header, &["channel", "ch"]),
                essid: find_column(&header, &["essid", "ssid"]),
            });
            continue;
        }
        if (has("station mac") || has("station")) && has("bssid") {
            section = Some(Section::Clients {
                station: find_column(&header, &["station mac", "station"]),
                bssid: find_column(&header, &["bssid"]),
            });
            continue;
        }

        match &section {
            Some(Section::Networks {
                bssid,
                channel,
                essid,
            }) => {
                let (Some(bssid), Some(_)) = (cell(&row, *bssid), *essid) else {
                    continue;
                };
                let ssid = cell(&row, *essid).unwrap_or_default().trim();
                let channel = cell(&row, *channel).and_then(to_int);
                parsed.networks.push(Network::new(ssid, bssid, channel));
            }
            Some(Section::Clients { station, bssid }) => {
                let Some(station) = cell(&row, *station) else {
                    continue;
                };
                let associated = cell(&row, *bssid)
                    .map(|b| b.trim().to_uppercase())
                    .filter(|b| !UNASSOCIATED.contains(&b.as_str()));
                parsed
                    .clients
                    .push(Client::new(station, associated.as_deref()));
            }
            None => {}
        }
    }

    Ok(parsed)
}

/// Imports the CSV written by `airodump-ng -w <prefix> --output-format csv`.
///
/// airodump-ng numbers its output (`<prefix>-01.csv`, `-02.csv`, ...) and
/// never overwrites, so [`prepare`](ScanImporter::prepare) deletes earlier
/// captures and [`import`](ScanImporter::import) reads the newest one.
#[derive(Debug, Clone)]
pub struct AirodumpImporter {
    prefix: PathBuf,
}

impl AirodumpImporter {
    /// Importer for captures written with `prefix`.
    pub fn new(prefix: impl Into<PathBuf>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// Capture prefix.
    #[must_use]
    pub fn prefix(&self) -> &Path {
        &self.prefix
    }

    /// Capture files for this prefix, oldest first.
    pub fn captures(&self) -> Result<Vec<PathBuf>, StoreError> {
        let dir = match self.prefix.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let Some(stem) = self.prefix.file_name().and_then(|s| s.to_str()) else {
            return Ok(Vec::new());
        };

        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => return Err(StoreError::Io { path: dir, source }),
        };

        let mut captures: Vec<(SystemTime, PathBuf)> = entries
            .filter_map(Result::ok)
            .filter(|entry| {
                entry
                    .file_name()
                    .to_str()
                    .is_some_and(|name| is_capture_name(name, stem))
            })
            .map(|entry| {
                let modified = entry
                    .metadata()
                    .and_then(|m| m.modified())
                    .unwrap_or(SystemTime::UNIX_EPOCH);
                (modified, entry.path())
            })
            .collect();
        captures.sort();
        Ok(captures.into_iter().map(|(_, path)| path).collect())
    }

    /// Import a specific CSV file into `store`.
    pub fn import_file(
        &self,
        path: &Path,
        store: &dyn ResultStore,
    ) -> Result<ImportSummary, StoreError> {
        let file = fs::File::open(path).map_err(|source| StoreError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let parsed = parse_airodump_csv(file).map_err(|source| StoreError::Csv {
            path: path.to_path_buf(),
            source,
        })?;
        store.upsert(&parsed.networks, &parsed.clients)?;

        let summary = ImportSummary {
            networks: parsed.networks.len(),
            clients: parsed.clients.len(),
        };
        info!(
            "Imported {} networks and {} clients from {:?}",
            summary.networks, summary.clients, path
        );
        Ok(summary)
    }
}

/// `<stem>-NN.csv` where NN is all digits.
fn is_capture_name(name: &str, stem: &str) -> bool {
    name.strip_prefix(stem)
        .and_then(|rest| rest.strip_prefix('-'))
        .and_then(|rest| rest.strip_suffix(".csv"))
        .is_some_and(|n| !n.is_empty() && n.chars().all(|c| c.is_ascii_digit()))
}

impl ScanImporter for AirodumpImporter {
    fn prepare(&self) -> Result<(), StoreError> {
        for path in self.captures()? {
            match fs::remove_file(&path) {
                Ok(()) => debug!("Removed stale capture {:?}", path),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(source) => return Err(StoreError::Io { path, source }),
            }
        }
        if let Some(parent) = self.prefix.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| StoreError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        Ok(())
    }

    fn import(&self, store: &dyn ResultStore) -> Result<ImportSummary, StoreError> {
        let captures = self.captures()?;
        let Some(latest) = captures.last() else {
            warn!("No capture found for prefix {:?}", self.prefix);
            return Err(StoreError::NoCapture(self.prefix.display().to_string()));
        };
        self.import_file(latest, store)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use tempfile::tempdir;

    const CAPTURE: &str = "\r
BSSID, First time seen, Last time seen, channel, Speed, Privacy, Cipher, Authentication, Power, # beacons, # IV, LAN IP, ID-length, ESSID, Key\r
aa:bb:cc:dd:ee:01, 2024-01-01 10:00:00, 2024-01-01 10:00:20,  6,  54, WPA2, CCMP, PSK, -40,       12,        0,   0.  0.  0.  0,   7, HomeNet, \r
AA:BB:CC:DD:EE:02, 2024-01-01 10:00:00, 2024-01-01 10:00:20, -1,  -1, , , , -1,        0,        0,   0.  0.  0.  0,   0, , \r
\r
Station MAC, First time seen, Last time seen, Power, # packets, BSSID, Probed ESSIDs\r
11:22:33:44:55:66, 2024-01-01 10:00:01, 2024-01-01 10:00:19, -50,       30, aa:bb:cc:dd:ee:01,\r
77:88:99:AA:BB:CC, 2024-01-01 10:00:02, 2024-01-01 10:00:18, -60,        4, (not associated) ,Cafe\r
DD:EE:FF:00:11:22, 2024-01-01 10:00:03, 2024-01-01 10:00:17, -70,        2, FF:FF:FF:FF:FF:FF,\r
";

    #[test]
    fn test_parse_sections() {
        let parsed = parse_airodump_csv(CAPTURE.as_bytes()).unwrap();

        assert_eq!(
            parsed.networks,
            vec![
                Network::new("HomeNet", "AA:BB:CC:DD:EE:01", Some(6)),
                Network::new("", "AA:BB:CC:DD:EE:02", Some(-1)),
            ]
        );
        assert_eq!(parsed.clients.len(), 3);
        assert_eq!(
            parsed.clients[0],
            Client::new("11:22:33:44:55:66", Some("AA:BB:CC:DD:EE:01"))
        );
        assert_eq!(parsed.clients[1].associated_network, None);
        assert_eq!(parsed.clients[2].associated_network, None);
    }

    #[test]
    fn test_parse_header_aliases() {
        let csv = "BSSID,CH,SSID,ESSID\n01:02:03:04:05:06, 11 ,x,Net\nSTATION,BSSID\nAA:AA:AA:AA:AA:AA,01:02:03:04:05:06\n";
        let parsed = parse_airodump_csv(csv.as_bytes()).unwrap();
        assert_eq!(parsed.networks[0].channel, Some(11));
        assert_eq!(parsed.networks[0].ssid, "Net");
        assert_eq!(
            parsed.clients[0].associated_network.as_deref(),
            Some("01:02:03:04:05:06")
        );
    }

    #[test]
    fn test_non_numeric_channel_is_none() {
        let csv = "BSSID,channel,ESSID\n01:02:03:04:05:06,abc,Net\n";
        let parsed = parse_airodump_csv(csv.as_bytes()).unwrap();
        assert_eq!(parsed.networks[0].channel, None);
    }

    #[test]
    fn test_capture_name_matching() {
        assert!(is_capture_name("scan-01.csv", "scan"));
        assert!(is_capture_name("scan-12.csv", "scan"));
        assert!(!is_capture_name("scan-01.kismet.csv", "scan"));
        assert!(!is_capture_name("scan-.csv", "scan"));
        assert!(!is_capture_name("other-01.csv", "scan"));
    }

    #[test]
    fn test_prepare_and_import_latest() {
        let dir = tempdir().unwrap();
        let importer = AirodumpImporter::new(dir.path().join("tmp").join("scan"));
        importer.prepare().unwrap();
        assert!(dir.path().join("tmp").is_dir());

        fs::write(dir.path().join("tmp/scan-01.csv"), CAPTURE).unwrap();
        fs::write(dir.path().join("tmp/scan-01.kismet.csv"), "ignored").unwrap();

        let store = MemoryStore::new();
        let summary = importer.import(&store).unwrap();
        assert_eq!(summary, ImportSummary { networks: 2, clients: 3 });
        assert_eq!(store.counts().unwrap().networks, 2);

        importer.prepare().unwrap();
        assert!(!dir.path().join("tmp/scan-01.csv").exists());
        assert!(dir.path().join("tmp/scan-01.kismet.csv").exists());
        assert!(matches!(importer.import(&store), Err(StoreError::NoCapture(_))));
    }
}
