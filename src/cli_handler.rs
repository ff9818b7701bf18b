//! One-shot subcommands that work on the stores without a session.

use std::path::Path;

use anyhow::{Context, Result};

use crate::cli::{Commands, WhitelistAction};
use crate::config::Settings;
use crate::store::{
    normalize_mac, AirodumpImporter, ResultStore, SqliteStore, WhitelistProvider,
    WhitelistStore,
};

/// Handle a subcommand against the stores named by `settings`.
pub fn handle_command(command: Commands, settings: &Settings) -> Result<()> {
    match command {
        Commands::Import { csv } => import(&csv, settings),
        Commands::Targets => targets(settings),
        Commands::Whitelist { action } => whitelist(action, settings),
        Commands::Settings => {
            print!("{}", settings.to_toml().context("Failed to render settings")?);
            Ok(())
        }
    }
}

fn import(csv: &Path, settings: &Settings) -> Result<()> {
    let store = open_results(settings)?;
    let importer = AirodumpImporter::new(&settings.capture_prefix);
    let summary = importer
        .import_file(csv, &store)
        .with_context(|| format!("Failed to import {:?}", csv))?;
    println!(
        "Imported {} networks and {} clients",
        summary.networks, summary.clients
    );
    Ok(())
}

fn targets(settings: &Settings) -> Result<()> {
    let store = open_results(settings)?;
    let whitelist = open_whitelist(settings)?.whitelist()?;

    let mut offset = 0;
    while let Some(network) = store.network_at(&whitelist, offset)? {
        let mut clients = 0;
        while store.client_at(&network.bssid, clients)?.is_some() {
            clients += 1;
        }
        println!(
            "{:>3}  {}  ch {:>3}  {:>2} clients  {}",
            offset + 1,
            network.bssid,
            network.channel.unwrap_or_default(),
            clients,
            network.ssid
        );
        offset += 1;
    }

    let counts = store.counts()?;
    println!(
        "{} attackable of {} networks ({} whitelisted entries), {} clients",
        offset,
        counts.networks,
        whitelist.len(),
        counts.clients
    );
    Ok(())
}

fn whitelist(action: WhitelistAction, settings: &Settings) -> Result<()> {
    let store = open_whitelist(settings)?;
    match action {
        WhitelistAction::List => {
            for mac in store.load_all()? {
                println!("{}", mac);
            }
        }
        WhitelistAction::Add { mac } => {
            let added = store
                .add(&mac)
                .with_context(|| format!("Cannot whitelist {}", mac))?;
            let mac = normalize_mac(&mac);
            if added {
                println!("Added {}", mac);
            } else {
                println!("{} is already whitelisted", mac);
            }
        }
        WhitelistAction::Remove { mac } => {
            let mac = normalize_mac(&mac);
            if store.remove(&mac)? {
                println!("Removed {}", mac);
            } else {
                println!("{} was not whitelisted", mac);
            }
        }
        WhitelistAction::Clear => {
            store.clear()?;
            println!("Whitelist cleared");
        }
    }
    Ok(())
}

fn open_results(settings: &Settings) -> Result<SqliteStore> {
    SqliteStore::open(&settings.database)
        .with_context(|| format!("Failed to open result store {:?}", settings.database))
}

fn open_whitelist(settings: &Settings) -> Result<WhitelistStore> {
    WhitelistStore::open(&settings.database)
        .with_context(|| format!("Failed to open whitelist {:?}", settings.database))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn settings_in(dir: &Path) -> Settings {
        let mut settings = Settings::embedded().unwrap();
        settings.database = dir.join("db").join("wifi.sqlite");
        settings.capture_prefix = dir.join("scan").to_string_lossy().into_owned();
        settings
    }

    #[test]
    fn test_import_then_targets() {
        let dir = tempdir().unwrap();
        let settings = settings_in(dir.path());
        let csv = dir.path().join("scan-01.csv");
        std::fs::write(
            &csv,
            "BSSID, First time seen, Last time seen, channel, Speed, Privacy, Cipher, Authentication, Power, # beacons, # IV, LAN IP, ID-length, ESSID, Key\n\
             AA:BB:CC:DD:EE:01, 2024-01-01 10:00:00, 2024-01-01 10:00:20, 6, 54, WPA2, CCMP, PSK, -40, 12, 0, 0.0.0.0, 7, HomeNet, \n",
        )
        .unwrap();

        handle_command(Commands::Import { csv }, &settings).unwrap();
        handle_command(Commands::Targets, &settings).unwrap();

        let store = SqliteStore::open(&settings.database).unwrap();
        assert_eq!(store.counts().unwrap().networks, 1);
    }

    #[test]
    fn test_whitelist_add_rejects_garbage() {
        let dir = tempdir().unwrap();
        let settings = settings_in(dir.path());
        let action = WhitelistAction::Add {
            mac: "not-a-mac".to_string(),
        };
        assert!(handle_command(Commands::Whitelist { action }, &settings).is_err());
    }

    #[test]
    fn test_whitelist_add_and_remove() {
        let dir = tempdir().unwrap();
        let settings = settings_in(dir.path());
        let add = WhitelistAction::Add {
            mac: "aa:bb:cc:dd:ee:ff".to_string(),
        };
        handle_command(Commands::Whitelist { action: add }, &settings).unwrap();

        let store = WhitelistStore::open(&settings.database).unwrap();
        assert_eq!(store.load_all().unwrap(), vec!["AA:BB:CC:DD:EE:FF".to_string()]);

        let remove = WhitelistAction::Remove {
            mac: "AA:BB:CC:DD:EE:FF".to_string(),
        };
        handle_command(Commands::Whitelist { action: remove }, &settings).unwrap();
        assert!(store.load_all().unwrap().is_empty());
    }
}
