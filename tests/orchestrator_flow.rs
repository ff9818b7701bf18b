//! End-to-end attack cycles driven through the public orchestrator API with
//! a recording executor in place of real processes.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use deauther::attack::{
    AttackOrchestrator, AttackPhase, CommandBuilder, CommandExecutor, InboundCommand, StatusEvent,
    WifiMode,
};
use deauther::config::Settings;
use deauther::store::{
    Client, ImportSummary, MemoryStore, Network, ResultStore, ScanImporter, StoreCounts,
    StoreError,
};
use deauther::supervisor::{ProcessEvent, ProcessId, ProcessRequest, SPAWN_FAILURE_CODE};
use tokio::sync::mpsc;

#[derive(Clone, Default)]
struct Recorder {
    launched: Arc<Mutex<Vec<String>>>,
    killed: Arc<Mutex<Vec<ProcessId>>>,
}

impl Recorder {
    fn commands(&self) -> Vec<String> {
        self.launched.lock().unwrap().clone()
    }

    fn last(&self) -> ProcessId {
        self.launched.lock().unwrap().len() as ProcessId
    }
}

impl CommandExecutor for Recorder {
    fn execute(&mut self, request: ProcessRequest) -> ProcessId {
        let mut launched = self.launched.lock().unwrap();
        launched.push(request.command().to_string());
        launched.len() as ProcessId
    }

    fn kill(&mut self, id: ProcessId) -> bool {
        self.killed.lock().unwrap().push(id);
        true
    }
}

/// Importer that writes fixed rows, standing in for airodump captures.
struct Rows(Vec<Network>, Vec<Client>);

impl ScanImporter for Rows {
    fn prepare(&self) -> Result<(), StoreError> {
        Ok(())
    }

    fn import(&self, store: &dyn ResultStore) -> Result<ImportSummary, StoreError> {
        store.upsert(&self.0, &self.1)?;
        Ok(ImportSummary {
            networks: self.0.len(),
            clients: self.1.len(),
        })
    }
}

/// Store that hands back rows verbatim, unknown channels included.
struct Unfiltered(Vec<Network>);

impl ResultStore for Unfiltered {
    fn clear(&self) -> Result<(), StoreError> {
        Ok(())
    }

    fn upsert(&self, _networks: &[Network], _clients: &[Client]) -> Result<(), StoreError> {
        Ok(())
    }

    fn network_at(
        &self,
        _whitelist: &[String],
        offset: usize,
    ) -> Result<Option<Network>, StoreError> {
        Ok(self.0.get(offset).cloned())
    }

    fn client_at(&self, _network: &str, _offset: usize) -> Result<Option<Client>, StoreError> {
        Ok(None)
    }

    fn counts(&self) -> Result<StoreCounts, StoreError> {
        Ok(StoreCounts::default())
    }
}

struct Harness {
    orchestrator: AttackOrchestrator<Recorder>,
    recorder: Recorder,
    events: mpsc::UnboundedReceiver<StatusEvent>,
}

impl Harness {
    /// Broadcast-only cycles with two attack loops.
    fn new(store: Box<dyn ResultStore>, importer: Rows, whitelist: MemoryStore) -> Self {
        let mut settings = Settings::embedded().expect("embedded defaults parse");
        settings.max_attack_loop = 2;
        settings.fast_mode = true;
        Self::with_settings(settings, store, importer, whitelist)
    }

    fn with_settings(
        settings: Settings,
        store: Box<dyn ResultStore>,
        importer: Rows,
        whitelist: MemoryStore,
    ) -> Self {
        let recorder = Recorder::default();
        let (tx, events) = mpsc::unbounded_channel();
        let builder = CommandBuilder::new(&settings).with_resolver(|_| None::<PathBuf>);
        let orchestrator = AttackOrchestrator::new(
            recorder.clone(),
            settings,
            store,
            Box::new(importer),
            Box::new(whitelist),
            tx,
        )
        .with_builder(builder);

        Self {
            orchestrator,
            recorder,
            events,
        }
    }

    /// Complete the most recent command successfully.
    fn finish_last(&mut self) {
        let id = self.recorder.last();
        self.orchestrator
            .handle_process_event(ProcessEvent::Completed { id, code: 0 });
    }

    fn drain(&mut self) -> Vec<StatusEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            events.push(event);
        }
        events
    }
}

fn channel_six_pair() -> Vec<Network> {
    vec![
        Network::new("alpha", "AA:AA:AA:AA:AA:AA", Some(6)),
        Network::new("beta", "BB:BB:BB:BB:BB:BB", Some(6)),
    ]
}

fn pair_rows() -> Rows {
    Rows(channel_six_pair(), Vec::new())
}

fn no_rows() -> Rows {
    Rows(Vec::new(), Vec::new())
}

fn is_broadcast(command: &str, bssid: &str) -> bool {
    command.contains("--deauth") && command.contains(&format!("-a {}", bssid))
}

#[test]
fn test_full_cycle_loops_then_rescans() {
    let store = MemoryStore::new();
    let mut h = Harness::new(Box::new(store.clone()), pair_rows(), store);

    h.orchestrator.handle_command(InboundCommand::Scan);
    // monitor, scan, channel, AA, BB, AA, BB
    for _ in 0..7 {
        h.finish_last();
    }

    let commands = h.recorder.commands();
    assert_eq!(commands.len(), 8, "{:#?}", commands);
    assert!(commands[0].contains("mode monitor"));
    assert!(commands[1].contains("airodump-ng"));
    assert_eq!(commands[2], "iw wlan0 set channel 6");
    assert!(is_broadcast(&commands[3], "AA:AA:AA:AA:AA:AA"));
    assert!(is_broadcast(&commands[4], "BB:BB:BB:BB:BB:BB"));
    assert!(is_broadcast(&commands[5], "AA:AA:AA:AA:AA:AA"));
    assert!(is_broadcast(&commands[6], "BB:BB:BB:BB:BB:BB"));
    assert!(commands[7].contains("mode monitor"));

    assert_eq!(h.orchestrator.phase(), AttackPhase::SettingMonitorMode);
    assert_eq!(h.orchestrator.state().attack_loop_count, 1);

    let events = h.drain();
    assert!(events.contains(&StatusEvent::ModeState(WifiMode::Monitor)));
    assert!(events.contains(&StatusEvent::ScannerState(true)));
    assert!(events.contains(&StatusEvent::ScannerState(false)));
}

#[test]
fn test_default_settings_attack_clients_after_broadcast() {
    let store = MemoryStore::new();
    let rows = Rows(
        channel_six_pair(),
        vec![Client::new("11:11:11:11:11:11", Some("AA:AA:AA:AA:AA:AA"))],
    );
    let settings = Settings::embedded().expect("embedded defaults parse");
    let mut h = Harness::with_settings(settings, Box::new(store.clone()), rows, store);
    assert!(!h.orchestrator.settings().fast_mode);

    h.orchestrator.handle_command(InboundCommand::Scan);
    // monitor, scan, channel, AA
    for _ in 0..4 {
        h.finish_last();
    }

    assert_eq!(h.orchestrator.phase(), AttackPhase::AttackingClient);
    let commands = h.recorder.commands();
    assert!(commands[4].contains("-a AA:AA:AA:AA:AA:AA"));
    assert!(commands[4].contains("-c 11:11:11:11:11:11"));

    h.finish_last();
    let commands = h.recorder.commands();
    assert!(is_broadcast(&commands[5], "BB:BB:BB:BB:BB:BB"));
    assert!(!commands[5].contains("-c "));
}

#[test]
fn test_whitelist_change_applies_mid_cycle() {
    let store = MemoryStore::new();
    let mut h = Harness::new(
        Box::new(store.clone()),
        pair_rows(),
        store.clone(),
    );

    h.orchestrator.handle_command(InboundCommand::Scan);
    // monitor, scan, channel
    for _ in 0..3 {
        h.finish_last();
    }
    assert!(is_broadcast(&h.recorder.commands()[3], "AA:AA:AA:AA:AA:AA"));

    store.set_whitelist(["bb:bb:bb:bb:bb:bb"]);
    h.finish_last();

    // BB is skipped; the second loop goes straight back to AA.
    let commands = h.recorder.commands();
    assert!(is_broadcast(&commands[4], "AA:AA:AA:AA:AA:AA"));
    assert_eq!(h.orchestrator.state().attack_loop_count, 2);

    h.finish_last();
    let commands = h.recorder.commands();
    assert!(commands[5].contains("mode monitor"));
    assert!(commands.iter().all(|c| !c.contains("BB:BB:BB:BB:BB:BB")));
}

#[test]
fn test_unknown_channel_is_skipped() {
    let targets = Unfiltered(vec![
        Network::new("ghost", "CC:CC:CC:CC:CC:CC", Some(-1)),
        Network::new("alpha", "AA:AA:AA:AA:AA:AA", Some(6)),
    ]);
    let mut h = Harness::new(Box::new(targets), no_rows(), MemoryStore::new());

    h.orchestrator.handle_command(InboundCommand::Scan);
    // monitor, scan, channel, AA, AA
    for _ in 0..5 {
        h.finish_last();
    }

    let commands = h.recorder.commands();
    assert_eq!(commands[2], "iw wlan0 set channel 6");
    assert!(is_broadcast(&commands[3], "AA:AA:AA:AA:AA:AA"));
    assert!(is_broadcast(&commands[4], "AA:AA:AA:AA:AA:AA"));
    assert!(commands[5].contains("mode monitor"));
    assert!(commands.iter().all(|c| !c.contains("CC:CC:CC:CC:CC:CC")));
    assert!(commands.iter().all(|c| !c.contains("channel -1")));
}

#[test]
fn test_stop_mid_attack_restores_managed_mode() {
    let store = MemoryStore::new();
    let mut h = Harness::new(Box::new(store.clone()), pair_rows(), store);

    h.orchestrator.handle_command(InboundCommand::Scan);
    for _ in 0..3 {
        h.finish_last();
    }
    let broadcast = h.recorder.last();
    assert_eq!(h.orchestrator.phase(), AttackPhase::AttackingBroadcast);
    h.drain();

    h.orchestrator.handle_command(InboundCommand::StopAttack);
    assert_eq!(h.orchestrator.phase(), AttackPhase::SettingManagedMode);
    let teardown = h.recorder.last();
    assert_eq!(h.orchestrator.pending(), Some(teardown));
    assert!(h.recorder.commands()[teardown as usize - 1].contains("mode managed"));
    // Only a running scan is killed.
    assert!(h.recorder.killed.lock().unwrap().is_empty());

    // The in-flight broadcast finishing must not advance the cycle.
    h.orchestrator
        .handle_process_event(ProcessEvent::Completed { id: broadcast, code: 0 });
    assert_eq!(h.recorder.last(), teardown);
    assert_eq!(h.orchestrator.phase(), AttackPhase::SettingManagedMode);

    h.finish_last();
    assert_eq!(h.orchestrator.phase(), AttackPhase::Stopped);
    assert_eq!(h.orchestrator.state().wifi_mode, WifiMode::Managed);
    let events = h.drain();
    assert!(events.contains(&StatusEvent::ModeState(WifiMode::Managed)));
    assert_eq!(events.last(), Some(&StatusEvent::AttackState(false)));

    // A new scan is accepted after stopping.
    h.orchestrator.handle_command(InboundCommand::Scan);
    assert_eq!(h.orchestrator.phase(), AttackPhase::SettingMonitorMode);
}

#[test]
fn test_spawn_failure_returns_to_idle() {
    let store = MemoryStore::new();
    let mut h = Harness::new(Box::new(store.clone()), pair_rows(), store);

    h.orchestrator.handle_command(InboundCommand::Scan);
    let id = h.recorder.last();
    h.orchestrator.handle_process_event(ProcessEvent::Failed {
        id,
        code: SPAWN_FAILURE_CODE,
        message: "No such file or directory".into(),
    });

    assert_eq!(h.orchestrator.phase(), AttackPhase::Idle);
    assert_eq!(h.recorder.commands().len(), 1);
    let events = h.drain();
    assert_eq!(events.last(), Some(&StatusEvent::AttackState(false)));
}
