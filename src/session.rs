//! Session wiring and lifecycle.
//!
//! A [`Session`] owns the process supervisor and the attack orchestrator and
//! runs them on one task: operator commands and process events are applied
//! in arrival order, so the orchestrator never needs a lock. Front-ends talk
//! to it through a [`SessionHandle`].

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn};

use crate::attack::{
    AttackOrchestrator, AttackPhase, InboundCommand, StatusEvent, SupervisorExecutor, WifiMode,
};
use crate::cli::Cli;
use crate::config::{ConfigLoader, Settings};
use crate::store::{
    AirodumpImporter, ResultStore, ScanImporter, SqliteStore, WhitelistProvider, WhitelistStore,
};
use crate::stream::StreamAggregator;
use crate::supervisor::{ProcessEvent, ProcessSupervisor};
use crate::tui::{TuiApp, TuiRunner};

/// How long shutdown waits for managed mode to be restored.
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

/// Front-end side of a running session.
pub struct SessionHandle {
    /// Operator commands.
    pub commands: mpsc::UnboundedSender<InboundCommand>,
    /// Status events, in emission order.
    pub status: mpsc::UnboundedReceiver<StatusEvent>,
    /// Rendered scan HUD frames, when the session has a HUD.
    pub hud: Option<mpsc::UnboundedReceiver<String>>,
    /// Current attack phase.
    pub phase: watch::Receiver<AttackPhase>,
}

/// The supervisor, orchestrator and their event loop.
pub struct Session {
    orchestrator: AttackOrchestrator<SupervisorExecutor>,
    supervisor: ProcessSupervisor,
    processes: mpsc::UnboundedReceiver<ProcessEvent>,
    commands: mpsc::UnboundedReceiver<InboundCommand>,
    phase: watch::Sender<AttackPhase>,
    auto_start: bool,
}

impl Session {
    /// Wire a session. With `hud`, scan output is aggregated into frames.
    ///
    /// Must be called within a Tokio runtime.
    pub fn new(
        settings: Settings,
        store: Box<dyn ResultStore>,
        importer: Box<dyn ScanImporter>,
        whitelist: Box<dyn WhitelistProvider>,
        hud: bool,
    ) -> (Self, SessionHandle) {
        let supervisor = ProcessSupervisor::new();
        let (process_tx, process_rx) = mpsc::unbounded_channel::<ProcessEvent>();
        let (status_tx, status_rx) = mpsc::unbounded_channel();
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (phase_tx, phase_rx) = watch::channel(AttackPhase::Idle);

        let executor = SupervisorExecutor::new(supervisor.clone(), Arc::new(process_tx));
        let auto_start = settings.automatic_turn_on;
        let aggregator = settings.hud.aggregator_config();
        let mut orchestrator =
            AttackOrchestrator::new(executor, settings, store, importer, whitelist, status_tx);

        let hud_rx = if hud {
            let (aggregator, frames) = StreamAggregator::spawn(aggregator);
            orchestrator = orchestrator.with_hud(aggregator);
            Some(frames)
        } else {
            None
        };

        let session = Self {
            orchestrator,
            supervisor,
            processes: process_rx,
            commands: command_rx,
            phase: phase_tx,
            auto_start,
        };
        let handle = SessionHandle {
            commands: command_tx,
            status: status_rx,
            hud: hud_rx,
            phase: phase_rx,
        };
        (session, handle)
    }

    /// Open the on-disk stores named by `settings` and wire a session that
    /// reloads settings from `loader`.
    pub fn open(settings: Settings, loader: ConfigLoader, hud: bool) -> Result<(Self, SessionHandle)> {
        let store = SqliteStore::open(&settings.database)
            .with_context(|| format!("Failed to open result store {:?}", settings.database))?;
        let whitelist = WhitelistStore::open(&settings.database)
            .with_context(|| format!("Failed to open whitelist {:?}", settings.database))?;
        let importer = AirodumpImporter::new(&settings.capture_prefix);

        let (mut session, handle) = Self::new(
            settings,
            Box::new(store),
            Box::new(importer),
            Box::new(whitelist),
            hud,
        );
        session.orchestrator = session.orchestrator.with_settings_source(Box::new(loader));
        Ok((session, handle))
    }

    /// Apply commands and process events until `shutdown` flips to true or
    /// its sender is dropped, then restore managed mode.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        if self.auto_start {
            info!("Automatic turn-on enabled; starting scan");
            self.orchestrator.handle_command(InboundCommand::Scan);
            self.publish_phase();
        }

        loop {
            tokio::select! {
                Some(command) = self.commands.recv() => {
                    self.orchestrator.handle_command(command);
                }
                Some(event) = self.processes.recv() => {
                    self.release_finished(&event);
                    self.orchestrator.handle_process_event(event);
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
            self.publish_phase();
        }

        self.wind_down().await;
    }

    /// Stop the cycle, wait for teardown within [`SHUTDOWN_GRACE`], then
    /// kill whatever is left.
    async fn wind_down(&mut self) {
        let needs_teardown = self.orchestrator.phase().is_active()
            || self.orchestrator.state().wifi_mode == WifiMode::Monitor;
        if needs_teardown && self.orchestrator.phase() != AttackPhase::SettingManagedMode {
            info!("Shutting down; restoring managed mode");
            self.orchestrator.shutdown();
            self.publish_phase();
        }

        let deadline = tokio::time::Instant::now() + SHUTDOWN_GRACE;
        while self.orchestrator.phase() == AttackPhase::SettingManagedMode {
            match tokio::time::timeout_at(deadline, self.processes.recv()).await {
                Ok(Some(event)) => {
                    self.release_finished(&event);
                    self.orchestrator.handle_process_event(event);
                    self.publish_phase();
                }
                Ok(None) => break,
                Err(_) => {
                    warn!("Managed mode restore did not finish within {:?}", SHUTDOWN_GRACE);
                    break;
                }
            }
        }

        let killed = self.supervisor.kill_all();
        if killed > 0 {
            info!("Killed {} remaining processes", killed);
        }
    }

    fn release_finished(&self, event: &ProcessEvent) {
        if event.is_terminal() {
            // Terminal events fire after the handle is final.
            self.supervisor.release(event.id());
        }
    }

    fn publish_phase(&self) {
        let phase = self.orchestrator.phase();
        self.phase.send_if_modified(|current| {
            if *current == phase {
                false
            } else {
                *current = phase;
                true
            }
        });
    }
}

/// Run a session with the TUI or the headless front-end until the operator
/// quits, then shut it down.
pub fn run_session(cli: &Cli, settings: Settings, loader: ConfigLoader) -> Result<()> {
    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to create tokio runtime")?;

    let wifi_card = settings.wifi_card.clone();
    let (session, handle) = {
        let _guard = rt.enter();
        Session::open(settings, loader, !cli.headless)?
    };

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let session_task = rt.spawn(session.run(shutdown_rx));

    let front_end = if cli.headless {
        rt.block_on(run_headless(handle, cli.json))
    } else {
        run_tui(handle, wifi_card)
    };

    let _ = shutdown_tx.send(true);
    rt.block_on(async {
        let grace = SHUTDOWN_GRACE + Duration::from_secs(1);
        match tokio::time::timeout(grace, session_task).await {
            Ok(Ok(())) => debug!("Session finished"),
            Ok(Err(e)) => error!("Session task failed: {}", e),
            Err(_) => warn!("Session did not finish within {:?}", grace),
        }
    });

    front_end
}

fn run_tui(handle: SessionHandle, wifi_card: String) -> Result<()> {
    let mut app = TuiApp::new(handle, wifi_card);
    let mut runner = TuiRunner::new().context("Failed to initialize TUI")?;
    runner.run(&mut app).context("TUI error")?;
    Ok(())
}

/// Line-oriented front-end: commands on stdin, status on stdout.
///
/// `quit` or Ctrl-C ends the session. End of input only stops reading, so
/// `echo scan | deauther --headless` keeps attacking until interrupted.
pub async fn run_headless(mut handle: SessionHandle, json: bool) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;

    loop {
        tokio::select! {
            line = lines.next_line(), if stdin_open => {
                match line.context("Failed to read stdin")? {
                    Some(line) => {
                        let line = line.trim();
                        if line.is_empty() {
                            continue;
                        }
                        if matches!(line, "quit" | "exit") {
                            break;
                        }
                        match InboundCommand::parse_line(line) {
                            Ok(command) => {
                                if handle.commands.send(command).is_err() {
                                    break;
                                }
                            }
                            Err(e) => print_status(&StatusEvent::type_out(e.to_string()), json),
                        }
                    }
                    None => {
                        debug!("stdin closed; waiting for Ctrl-C");
                        stdin_open = false;
                    }
                }
            }
            Some(event) = handle.status.recv() => print_status(&event, json),
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted");
                break;
            }
        }
    }

    while let Ok(event) = handle.status.try_recv() {
        print_status(&event, json);
    }
    Ok(())
}

fn print_status(event: &StatusEvent, json: bool) {
    if json {
        match serde_json::to_string(event) {
            Ok(line) => println!("{}", line),
            Err(e) => warn!("Failed to serialize status event: {}", e),
        }
    } else {
        println!("{}", event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn quiet_settings() -> Settings {
        let mut settings = Settings::embedded().unwrap();
        settings.elevation = crate::supervisor::ElevationMethod::None;
        settings.elevated_tools.clear();
        settings
    }

    #[tokio::test]
    async fn test_session_answers_whitelist_and_shuts_down() {
        let store = MemoryStore::new();
        store.set_whitelist(["AA:BB:CC:DD:EE:FF"]);
        let dir = tempfile::tempdir().unwrap();
        let importer = AirodumpImporter::new(dir.path().join("scan"));
        let (session, mut handle) = Session::new(
            quiet_settings(),
            Box::new(store.clone()),
            Box::new(importer),
            Box::new(store),
            false,
        );
        assert!(handle.hud.is_none());

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(session.run(shutdown_rx));

        handle.commands.send(InboundCommand::Whitelist).unwrap();
        let event = handle.status.recv().await.unwrap();
        assert!(event.to_string().contains("AA:BB:CC:DD:EE:FF"));

        shutdown_tx.send(true).unwrap();
        task.await.unwrap();
        assert_eq!(*handle.phase.borrow(), AttackPhase::Idle);
    }
}
