//! The UCI conversation with one engine, advanced one poll at a time.

use std::collections::VecDeque;
use std::time::Duration;

use chess::UciMove;
use tokio::time::Instant;

use crate::difficulty::Difficulty;
use crate::history::{HistoryError, PositionHistory};
use crate::profile::EngineProfile;
use crate::uci::{find_bestmove, parse_uci_message, UciMessage};
use crate::EngineError;

/// Line-oriented access to a running engine.
pub trait EngineTransport {
    /// Queue one command line. The newline is added by the transport.
    fn write_line(&mut self, line: &str) -> Result<(), EngineError>;

    /// Every line the engine has printed since the last call.
    fn drain_lines(&mut self) -> Vec<String>;

    fn has_exited(&mut self) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverPhase {
    Uninitialized,
    AwaitingUciOk,
    AwaitingReadyOk,
    Idle,
    AwaitingBestMove,
    Dead,
}

impl DriverPhase {
    pub fn is_warming_up(self) -> bool {
        matches!(
            self,
            Self::Uninitialized | Self::AwaitingUciOk | Self::AwaitingReadyOk
        )
    }
}

/// A human move to forward to the engine, with the clocks at that moment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineMoveRequest {
    pub token: String,
    pub white_ms: u64,
    pub black_ms: u64,
    pub difficulty: Difficulty,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriverEvent {
    /// The engine answered with a decodable move.
    EngineMove(UciMove),
    /// A `bestmove` line could not be decoded. Still waiting for a reply.
    MalformedReply(String),
    /// The search ran past the configured limit and `stop` was sent.
    SearchTimedOut,
    /// A move could not be added to the position history.
    HistoryFull(HistoryError),
    /// The engine process exited.
    Died,
}

pub struct UciDriver<T> {
    transport: T,
    profile: EngineProfile,
    phase: DriverPhase,
    warmup: VecDeque<String>,
    history: PositionHistory,
    pending: Option<EngineMoveRequest>,
    last_elo_sent: Option<u32>,
    last_engine_move: Option<String>,
    search_timeout: Option<Duration>,
    search_started: Option<Instant>,
    stop_sent: bool,
    /// `bestmove` replies still owed for searches abandoned by a reset.
    stale_replies: usize,
}

impl<T: EngineTransport> UciDriver<T> {
    pub fn new(transport: T, profile: EngineProfile) -> Self {
        Self {
            transport,
            profile,
            phase: DriverPhase::Uninitialized,
            warmup: profile.warmup_commands().into(),
            history: PositionHistory::new(),
            pending: None,
            last_elo_sent: None,
            last_engine_move: None,
            search_timeout: None,
            search_started: None,
            stop_sent: false,
            stale_replies: 0,
        }
    }

    pub fn with_search_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.search_timeout = timeout;
        self
    }

    pub fn phase(&self) -> DriverPhase {
        self.phase
    }

    pub fn profile(&self) -> &EngineProfile {
        &self.profile
    }

    pub fn history(&self) -> &PositionHistory {
        &self.history
    }

    pub fn last_engine_move(&self) -> Option<&str> {
        self.last_engine_move.as_deref()
    }

    pub fn has_pending_move(&self) -> bool {
        self.pending.is_some()
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn into_transport(self) -> T {
        self.transport
    }

    /// Queue a human move. It is sent once the engine is idle.
    pub fn request_move(&mut self, request: EngineMoveRequest) -> Result<(), EngineError> {
        if self.phase == DriverPhase::Dead {
            return Err(EngineError::ProcessDied);
        }
        if self.pending.replace(request).is_some() {
            tracing::warn!("Replacing a move that was never sent to the engine");
        }
        Ok(())
    }

    /// One polling cycle.
    pub fn tick(&mut self) -> Vec<DriverEvent> {
        let mut events = Vec::new();
        if self.phase == DriverPhase::Dead {
            return events;
        }

        let exited = self.transport.has_exited();
        for line in self.transport.drain_lines() {
            tracing::trace!("UCI << {}", line);
            self.observe_line(&line, &mut events);
        }
        if exited {
            self.mark_dead(&mut events);
            return events;
        }

        if let Err(e) = self.advance(&mut events) {
            tracing::error!("Engine write failed: {}", e);
            self.mark_dead(&mut events);
        }
        events
    }

    fn mark_dead(&mut self, events: &mut Vec<DriverEvent>) {
        tracing::warn!(engine = %self.profile.kind, "Engine process is no longer running");
        self.phase = DriverPhase::Dead;
        self.pending = None;
        events.push(DriverEvent::Died);
    }

    fn observe_line(&mut self, line: &str, events: &mut Vec<DriverEvent>) {
        if self.stale_replies > 0 && line.contains("bestmove") {
            self.stale_replies -= 1;
            tracing::debug!("Discarding reply to an abandoned search: {}", line);
            return;
        }

        if self.phase == DriverPhase::AwaitingBestMove {
            match find_bestmove(line) {
                Some(Ok(mv)) => self.accept_engine_move(mv, events),
                Some(Err(e)) => {
                    tracing::warn!("{}", e);
                    events.push(DriverEvent::MalformedReply(line.to_string()));
                }
                None => {}
            }
            return;
        }

        match parse_uci_message(line) {
            Ok(UciMessage::Id { name, value }) if name == "name" => {
                tracing::info!("Engine identifies as {}", value);
            }
            Ok(UciMessage::UciOk) => tracing::debug!("Received uciok"),
            Ok(UciMessage::ReadyOk) => tracing::debug!("Received readyok"),
            Ok(UciMessage::Info(info)) => tracing::trace!("Engine info: {:?}", info),
            _ => {}
        }
    }

    fn accept_engine_move(&mut self, mv: UciMove, events: &mut Vec<DriverEvent>) {
        let token = mv.to_string();
        tracing::info!("Engine plays {}", token);
        if let Err(e) = self.history.push(&token) {
            tracing::error!("{}", e);
            events.push(DriverEvent::HistoryFull(e));
        }
        self.last_engine_move = Some(token);
        self.phase = DriverPhase::Idle;
        self.search_started = None;
        events.push(DriverEvent::EngineMove(mv));
    }

    fn advance(&mut self, events: &mut Vec<DriverEvent>) -> Result<(), EngineError> {
        if self.phase.is_warming_up() {
            if let Some(command) = self.warmup.pop_front() {
                self.send(&command)?;
                self.phase = match self.phase {
                    DriverPhase::Uninitialized => DriverPhase::AwaitingUciOk,
                    DriverPhase::AwaitingUciOk => DriverPhase::AwaitingReadyOk,
                    other => other,
                };
                return Ok(());
            }
            tracing::info!(engine = %self.profile.kind, "Engine ready");
            self.phase = DriverPhase::Idle;
        }

        if self.phase == DriverPhase::AwaitingBestMove {
            self.check_search_timeout(events)?;
        }

        if self.phase == DriverPhase::Idle {
            if let Some(request) = self.pending.take() {
                self.dispatch(request, events)?;
            }
        }
        Ok(())
    }

    fn check_search_timeout(&mut self, events: &mut Vec<DriverEvent>) -> Result<(), EngineError> {
        let (Some(limit), Some(started)) = (self.search_timeout, self.search_started) else {
            return Ok(());
        };
        if self.stop_sent || started.elapsed() < limit {
            return Ok(());
        }
        tracing::warn!("Engine search exceeded {:?}", limit);
        if self.profile.quirks.orderly_shutdown {
            self.send("stop")?;
        }
        self.stop_sent = true;
        events.push(DriverEvent::SearchTimedOut);
        Ok(())
    }

    fn dispatch(
        &mut self,
        request: EngineMoveRequest,
        events: &mut Vec<DriverEvent>,
    ) -> Result<(), EngineError> {
        if let Err(e) = self.history.push(&request.token) {
            tracing::error!("{}", e);
            events.push(DriverEvent::HistoryFull(e));
            return Ok(());
        }

        let position = self.history.as_command().to_string();
        self.send(&position)?;

        let difficulty = request.difficulty;
        if self.profile.quirks.elo_option && self.last_elo_sent != Some(difficulty.elo()) {
            self.send(&format!("setoption name UCI_Elo value {}", difficulty.elo()))?;
            self.last_elo_sent = Some(difficulty.elo());
        }

        self.send(&format!(
            "go wtime {} btime {} depth {}",
            request.white_ms,
            request.black_ms,
            difficulty.depth()
        ))?;

        tracing::debug!(difficulty = %difficulty, "Engine thinking after {}", request.token);
        self.phase = DriverPhase::AwaitingBestMove;
        self.search_started = Some(Instant::now());
        self.stop_sent = false;
        Ok(())
    }

    fn send(&mut self, line: &str) -> Result<(), EngineError> {
        tracing::trace!("UCI >> {}", line);
        self.transport.write_line(line)
    }

    /// Start a new game: clear the history and drop any pending move.
    pub fn reset(&mut self) -> Result<(), EngineError> {
        self.history.reset();
        self.pending = None;
        self.last_engine_move = None;

        match self.phase {
            DriverPhase::Dead => return Err(EngineError::ProcessDied),
            DriverPhase::AwaitingBestMove => {
                if self.profile.quirks.orderly_shutdown {
                    self.send("stop")?;
                }
                self.stale_replies += 1;
                self.phase = DriverPhase::Idle;
                self.search_started = None;
            }
            _ => {}
        }

        if self.profile.quirks.new_game_command {
            if self.phase.is_warming_up() {
                self.warmup.push_back("ucinewgame".to_string());
            } else {
                self.send("ucinewgame")?;
            }
        }
        Ok(())
    }

    /// Replace the history, as when a saved game is loaded.
    pub fn seed_history(&mut self, command: &str) -> Result<(), HistoryError> {
        self.history = PositionHistory::from_command(command)?;
        self.pending = None;
        Ok(())
    }

    /// Say goodbye to engines that handle it. Others are killed by the owner
    /// of the transport.
    pub fn shutdown(&mut self) {
        if self.phase != DriverPhase::Dead && self.profile.quirks.orderly_shutdown {
            for command in ["stop", "quit"] {
                if let Err(e) = self.send(command) {
                    tracing::debug!("Could not send {}: {}", command, e);
                    break;
                }
            }
        }
        self.phase = DriverPhase::Dead;
        self.pending = None;
    }
}
