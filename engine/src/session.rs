//! Host-facing engine lifecycle: one process and the task that polls it.

use std::path::PathBuf;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::Instrument;

use crate::driver::{DriverEvent, DriverPhase, EngineMoveRequest, UciDriver};
use crate::history::HistoryError;
use crate::process::EngineProcess;
use crate::profile::{EngineKind, EngineProfile};
use crate::EngineError;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(250);
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(100);
pub const MAX_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// How long an engine that understands `quit` gets to exit on its own.
const QUIT_GRACE: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineSettings {
    pub kind: EngineKind,
    pub engines_dir: PathBuf,
    pub custom_path: Option<PathBuf>,
    pub poll_interval: Duration,
    pub search_timeout: Option<Duration>,
    /// Try the other bundled engines when the requested one will not start.
    pub fallback: bool,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            kind: EngineKind::default(),
            engines_dir: PathBuf::from("engines"),
            custom_path: None,
            poll_interval: DEFAULT_POLL_INTERVAL,
            search_timeout: None,
            fallback: true,
        }
    }
}

enum PollerCommand {
    Request(EngineMoveRequest),
    Reset,
    SeedHistory(String, oneshot::Sender<Result<(), HistoryError>>),
    Shutdown(oneshot::Sender<()>),
}

/// An engine event stamped with the game it belongs to.
type EpochEvent = (u64, DriverEvent);

/// A running engine. Dropping it stops the polling task and kills the process.
///
/// Every `reset` and `seed_history` starts a new game epoch. Both ends count
/// epochs in command order, so events the poller produced for an earlier game
/// are recognised and dropped on receipt.
pub struct EngineSession {
    kind: EngineKind,
    cmd_tx: mpsc::UnboundedSender<PollerCommand>,
    event_rx: mpsc::UnboundedReceiver<EpochEvent>,
    epoch: u64,
    task: Option<JoinHandle<()>>,
}

impl EngineSession {
    /// Launch an engine and start polling it.
    #[tracing::instrument(level = "info", skip_all, fields(kind = %settings.kind))]
    pub async fn start(settings: EngineSettings) -> Result<Self, EngineError> {
        let (profile, process) = launch(&settings)?;
        let kind = profile.kind;

        let driver = UciDriver::new(process, profile).with_search_timeout(settings.search_timeout);
        let period = settings
            .poll_interval
            .clamp(MIN_POLL_INTERVAL, MAX_POLL_INTERVAL);

        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(
            run_poller(driver, cmd_rx, event_tx, period)
                .instrument(tracing::info_span!("engine", kind = %kind)),
        );

        Ok(Self {
            kind,
            cmd_tx,
            event_rx,
            epoch: 0,
            task: Some(task),
        })
    }

    /// The engine that actually started, which differs from the requested
    /// one after a fallback.
    pub fn kind(&self) -> EngineKind {
        self.kind
    }

    /// Start a new game. Replies still owed to the old one are discarded.
    pub fn reset(&mut self) -> Result<(), EngineError> {
        self.send(PollerCommand::Reset)?;
        self.epoch += 1;
        Ok(())
    }

    pub fn request_move(&self, request: EngineMoveRequest) -> Result<(), EngineError> {
        self.send(PollerCommand::Request(request))
    }

    /// Non-blocking check for a reply or other engine event.
    pub fn poll_reply(&mut self) -> Option<DriverEvent> {
        while let Ok((epoch, event)) = self.event_rx.try_recv() {
            if let Some(event) = self.current(epoch, event) {
                return Some(event);
            }
        }
        None
    }

    /// Wait for the next engine event. `None` once the polling task is gone.
    pub async fn next_event(&mut self) -> Option<DriverEvent> {
        loop {
            let (epoch, event) = self.event_rx.recv().await?;
            if let Some(event) = self.current(epoch, event) {
                return Some(event);
            }
        }
    }

    /// Replace the engine's history, starting a new game epoch.
    pub async fn seed_history(&mut self, command: String) -> Result<(), EngineError> {
        let (tx, rx) = oneshot::channel();
        self.send(PollerCommand::SeedHistory(command, tx))?;
        self.epoch += 1;
        rx.await.map_err(|_| EngineError::ChannelClosed)??;
        Ok(())
    }

    /// Keep events of the current game. A dead process matters to every game.
    fn current(&self, epoch: u64, event: DriverEvent) -> Option<DriverEvent> {
        if epoch == self.epoch || event == DriverEvent::Died {
            Some(event)
        } else {
            tracing::debug!(
                epoch,
                current = self.epoch,
                "Dropping engine event from an earlier game: {:?}",
                event
            );
            None
        }
    }

    /// Stop the engine and wait for the polling task to finish.
    pub async fn shutdown(mut self) {
        let (tx, rx) = oneshot::channel();
        if self.send(PollerCommand::Shutdown(tx)).is_ok() {
            let _ = rx.await;
        }
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }

    fn send(&self, cmd: PollerCommand) -> Result<(), EngineError> {
        self.cmd_tx.send(cmd).map_err(|_| EngineError::ChannelClosed)
    }
}

impl Drop for EngineSession {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// Spawn the requested engine, falling back to the other kinds if allowed.
fn launch(settings: &EngineSettings) -> Result<(EngineProfile, EngineProcess), EngineError> {
    let candidates = if settings.fallback {
        settings.kind.fallback_order()
    } else {
        vec![settings.kind]
    };

    let mut tried = Vec::new();
    let mut last_error = None;
    for kind in candidates {
        let profile = kind.profile();
        let path = profile.executable_path(&settings.engines_dir, settings.custom_path.as_deref());
        match EngineProcess::spawn(&path) {
            Ok(process) => {
                if kind != settings.kind {
                    tracing::warn!(requested = %settings.kind, using = %kind, "Fell back to another engine");
                }
                return Ok((profile, process));
            }
            Err(e) => {
                tried.push(path);
                last_error = Some(e);
            }
        }
    }

    match (tried.len(), last_error) {
        (1, Some(e)) => Err(e),
        _ => Err(EngineError::NoEngineFound(tried)),
    }
}

async fn run_poller(
    mut driver: UciDriver<EngineProcess>,
    mut cmd_rx: mpsc::UnboundedReceiver<PollerCommand>,
    event_tx: mpsc::UnboundedSender<EpochEvent>,
    period: Duration,
) {
    let mut epoch: u64 = 0;
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    tracing::info!(?period, "Engine polling started");

    let done = loop {
        tokio::select! {
            cmd = cmd_rx.recv() => match cmd {
                Some(PollerCommand::Request(request)) => {
                    tracing::debug!("Engine move requested after {}", request.token);
                    if let Err(e) = driver.request_move(request) {
                        tracing::warn!("{}", e);
                    }
                }
                Some(PollerCommand::Reset) => {
                    epoch += 1;
                    if let Err(e) = driver.reset() {
                        tracing::warn!("Engine reset failed: {}", e);
                    }
                }
                Some(PollerCommand::SeedHistory(command, reply)) => {
                    epoch += 1;
                    let _ = reply.send(driver.seed_history(&command));
                }
                Some(PollerCommand::Shutdown(reply)) => break Some(reply),
                None => break None,
            },
            _ = ticker.tick() => {
                for event in driver.tick() {
                    let _ = event_tx.send((epoch, event));
                }
                if driver.phase() == DriverPhase::Dead {
                    break None;
                }
            }
        }
    };

    let grace = if driver.profile().quirks.orderly_shutdown {
        QUIT_GRACE
    } else {
        Duration::ZERO
    };
    driver.shutdown();
    driver.into_transport().shutdown(grace).await;
    tracing::info!("Engine polling stopped");

    if let Some(reply) = done {
        let _ = reply.send(());
    }
}
