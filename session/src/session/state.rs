use std::path::Path;
use std::time::Instant;

use chess::{
    encode, evaluate_status, Board, GameStatus, GameplayMode, MoveError, MoveOutcome, PieceColor,
    Square,
};
use engine::{Difficulty, DriverEvent, EngineMoveRequest, EngineSession, PositionHistory};

use super::commands::SessionError;
use super::snapshot::{SessionSnapshot, TimerSnapshot};
use crate::config::Settings;
use crate::persistence::{read_save, write_save, SaveRecord, SaveStore, SavedGame};

/// Internal mutable state, owned entirely by the session actor. No locks.
pub(crate) struct SessionState {
    pub board: Board,
    pub status: GameStatus,
    pub mode: GameplayMode,
    pub player_color: PieceColor,
    pub difficulty: Difficulty,
    pub engine: Option<EngineSession>,
    pub engine_thinking: bool,
    pub animating: bool,
    pub history: PositionHistory,
    pub timer: TimerState,
    pub time_ms: u64,
    pub saves: SaveStore,
    pub status_text: String,
}

/// Session-owned chess clock.
pub(crate) struct TimerState {
    pub white_remaining_ms: u64,
    pub black_remaining_ms: u64,
    pub active_side: Option<PieceColor>,
    pub last_tick: Instant,
}

impl TimerState {
    pub fn new(white_ms: u64, black_ms: u64) -> Self {
        Self {
            white_remaining_ms: white_ms,
            black_remaining_ms: black_ms,
            active_side: None,
            last_tick: Instant::now(),
        }
    }

    /// Tick the timer, decrementing the active side's remaining time.
    /// Returns true if a flag has fallen (time expired).
    pub fn tick(&mut self) -> bool {
        let now = Instant::now();
        let elapsed_ms = now.duration_since(self.last_tick).as_millis() as u64;
        self.last_tick = now;

        match self.active_side {
            Some(PieceColor::White) => {
                self.white_remaining_ms = self.white_remaining_ms.saturating_sub(elapsed_ms);
                self.white_remaining_ms == 0
            }
            Some(PieceColor::Black) => {
                self.black_remaining_ms = self.black_remaining_ms.saturating_sub(elapsed_ms);
                self.black_remaining_ms == 0
            }
            None => false,
        }
    }

    pub fn start(&mut self, side: PieceColor) {
        self.last_tick = Instant::now();
        self.active_side = Some(side);
    }

    pub fn stop(&mut self) {
        // Flush any remaining elapsed time before stopping
        self.tick();
        self.active_side = None;
    }

    pub fn switch_to(&mut self, side: PieceColor) {
        // Flush elapsed time for current side, then switch
        self.tick();
        self.active_side = Some(side);
        self.last_tick = Instant::now();
    }

    pub fn to_snapshot(&self) -> TimerSnapshot {
        TimerSnapshot {
            white_remaining_ms: self.white_remaining_ms,
            black_remaining_ms: self.black_remaining_ms,
            active_side: self.active_side,
        }
    }

    pub fn is_active(&self) -> bool {
        self.active_side.is_some()
    }
}

/// History token for a played move, `q` appended on promotion.
fn move_token(outcome: &MoveOutcome) -> String {
    let mut token = encode(outcome.from, outcome.to);
    if outcome.promoted {
        token.push('q');
    }
    token
}

impl SessionState {
    pub fn new(settings: &Settings, engine: Option<EngineSession>) -> Self {
        let mut state = Self {
            board: Board::new(),
            status: GameStatus::Active,
            mode: settings.mode,
            player_color: PieceColor::White,
            difficulty: settings.difficulty,
            engine,
            engine_thinking: false,
            animating: false,
            history: PositionHistory::new(),
            timer: TimerState::new(settings.time_ms, settings.time_ms),
            time_ms: settings.time_ms,
            saves: SaveStore::new(settings.saves_dir()),
            status_text: "new game".to_string(),
        };
        state.start_clock();
        state
    }

    /// Build a full snapshot of the current state.
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            board: self.board.clone(),
            turn: self.board.turn(),
            player_color: self.player_color,
            status: self.status,
            mode: self.mode,
            last_move: self.board.last_move(),
            timer: self.timer.to_snapshot(),
            engine: self.engine.as_ref().map(|e| e.kind()),
            engine_thinking: self.engine_thinking,
            animating: self.animating,
            difficulty: self.difficulty,
            history: self.history.as_command().to_string(),
            status_text: self.status_text.clone(),
        }
    }

    /// Next engine event, or never if there is no engine.
    pub async fn next_engine_event(&mut self) -> Option<DriverEvent> {
        match self.engine.as_mut() {
            Some(engine) => engine.next_event().await,
            None => std::future::pending().await,
        }
    }

    /// Clocks only run while a game with alternating turns is in progress.
    pub fn clock_running(&self) -> bool {
        self.timer.is_active() && !self.status.is_over()
    }

    fn start_clock(&mut self) {
        if self.mode.is_free_move() || self.status.is_over() {
            self.timer.active_side = None;
        } else {
            self.timer.start(self.board.turn());
        }
    }

    /// Advance the clock. Returns true when this tick ended the game.
    pub fn tick_clock(&mut self) -> bool {
        if !self.timer.tick() {
            return false;
        }
        let Some(side) = self.timer.active_side else {
            return false;
        };
        self.timer.stop();
        self.status = GameStatus::Flagged(side);
        self.engine_thinking = false;
        self.status_text = self.status.to_string();
        tracing::info!(%side, "Flag fell");
        true
    }

    /// Validate and play a human move.
    pub fn apply_human_move(&mut self, from: Square, to: Square) -> Result<MoveOutcome, SessionError> {
        if self.mode.uses_engine() {
            if self.engine.is_none() {
                return Err(SessionError::EngineStopped);
            }
            if self.board.turn() != self.player_color {
                return Err(SessionError::EngineTurn);
            }
        }
        self.apply_move(from, to).map_err(SessionError::from)
    }

    /// Apply a move through the rules and update clock, status and history.
    /// Nothing changes on error.
    pub fn apply_move(&mut self, from: Square, to: Square) -> Result<MoveOutcome, MoveError> {
        if self.status.is_over() {
            return Err(MoveError::GameOver(self.status));
        }
        let outcome = self.board.try_move(from, to, self.mode)?;

        if !self.mode.is_free_move() {
            if let Err(e) = self.history.push(&move_token(&outcome)) {
                tracing::warn!("Move kept out of the saved history: {}", e);
            }
        }

        self.status = outcome.status;
        if self.status.is_over() {
            self.timer.stop();
            self.status_text = self.status.to_string();
        } else {
            if self.timer.is_active() {
                self.timer.switch_to(self.board.turn());
            }
            self.status_text = if outcome.gives_check {
                format!("{} is in check", self.board.turn())
            } else {
                format!("{} to move", self.board.turn())
            };
        }
        tracing::debug!(mv = %move_token(&outcome), status = %self.status, "Move applied");
        Ok(outcome)
    }

    /// Ask the engine to answer `outcome`, if this game has an engine turn next.
    pub fn request_engine_reply(&mut self, outcome: &MoveOutcome) -> Result<(), SessionError> {
        if !self.mode.uses_engine() || self.status.is_over() {
            return Ok(());
        }
        self.request_engine_move(move_token(outcome))
    }

    fn request_engine_move(&mut self, token: String) -> Result<(), SessionError> {
        let engine = self.engine.as_ref().ok_or(SessionError::EngineStopped)?;
        engine.request_move(EngineMoveRequest {
            token,
            white_ms: self.timer.white_remaining_ms,
            black_ms: self.timer.black_remaining_ms,
            difficulty: self.difficulty,
        })?;
        self.engine_thinking = true;
        self.status_text = "engine is thinking".to_string();
        Ok(())
    }

    pub fn apply_new_game(&mut self) -> Result<SessionSnapshot, SessionError> {
        if let Some(engine) = &mut self.engine {
            engine.reset()?;
        }
        self.board = Board::new();
        self.status = GameStatus::Active;
        self.history.reset();
        self.engine_thinking = false;
        self.timer = TimerState::new(self.time_ms, self.time_ms);
        self.start_clock();
        self.status_text = "new game".to_string();
        tracing::info!("New game");
        Ok(self.snapshot())
    }

    fn saved_game(&self) -> SavedGame {
        SavedGame {
            board: self.board.clone(),
            white_time_ms: self.timer.white_remaining_ms,
            black_time_ms: self.timer.black_remaining_ms,
            player_color: self.player_color,
            history: self.history.clone(),
        }
    }

    pub fn save_to(&mut self, path: &Path) -> Result<(), SessionError> {
        if self.timer.is_active() {
            self.timer.tick();
        }
        write_save(path, &SaveRecord::from_game(&self.saved_game()))?;
        self.status_text = format!("saved to {}", path.display());
        tracing::info!(path = %path.display(), "Game saved");
        Ok(())
    }

    /// Read and validate a save without touching the current game.
    pub fn read_game(path: &Path) -> Result<SavedGame, SessionError> {
        let game = read_save(path)?.into_game()?;
        Ok(game)
    }

    /// Replace the current game with a loaded one and bring the engine in line.
    pub async fn install_game(&mut self, game: SavedGame, path: &Path) -> Result<(), SessionError> {
        let status = evaluate_status(&game.board, game.board.turn());
        let engine_to_move = self.mode.uses_engine()
            && !status.is_over()
            && game.board.turn() != game.player_color;

        // The engine replays every ply but the last, then answers the last one.
        let (seed, pending) = if engine_to_move {
            split_last_move(&game.history)
        } else {
            (game.history.clone(), None)
        };

        if let Some(engine) = &mut self.engine {
            engine.reset()?;
            engine.seed_history(seed.as_command().to_string()).await?;
        }

        let mut board = game.board;
        if let Some(loser) = status.loser() {
            board.set_in_check(loser, true);
        }
        self.board = board;
        self.status = status;
        self.player_color = game.player_color;
        self.history = game.history;
        self.engine_thinking = false;
        self.timer = TimerState::new(game.white_time_ms, game.black_time_ms);
        self.start_clock();
        self.status_text = match status {
            GameStatus::Active => format!("loaded {}", path.display()),
            over => over.to_string(),
        };
        tracing::info!(path = %path.display(), plies = self.history.ply_count(), "Game loaded");

        if let Some(token) = pending {
            self.request_engine_move(token)?;
        }
        Ok(())
    }
}

/// Split off the final ply so it can be replayed as a fresh engine request.
fn split_last_move(history: &PositionHistory) -> (PositionHistory, Option<String>) {
    let moves: Vec<&str> = history.moves().collect();
    let Some((last, rest)) = moves.split_last() else {
        return (history.clone(), None);
    };
    let mut seed = PositionHistory::new();
    for token in rest {
        if seed.push(token).is_err() {
            return (history.clone(), None);
        }
    }
    (seed, Some(last.to_string()))
}
