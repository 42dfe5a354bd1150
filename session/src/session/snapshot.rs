use chess::{Board, GameStatus, GameplayMode, PieceColor, Square};
use engine::{Difficulty, EngineKind};

/// Complete, immutable snapshot of session state.
/// Sent to subscribers on every state change and on subscribe.
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    pub board: Board,
    pub turn: PieceColor,
    pub player_color: PieceColor,
    pub status: GameStatus,
    pub mode: GameplayMode,
    pub last_move: Option<(Square, Square)>,
    pub timer: TimerSnapshot,
    /// The running engine, `None` in two-player games or after the engine died.
    pub engine: Option<EngineKind>,
    pub engine_thinking: bool,
    pub animating: bool,
    pub difficulty: Difficulty,
    /// The `position startpos moves ...` command for the game so far.
    pub history: String,
    /// One-line description of the latest notable thing that happened.
    pub status_text: String,
}

/// Clock state for the host to render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerSnapshot {
    pub white_remaining_ms: u64,
    pub black_remaining_ms: u64,
    pub active_side: Option<PieceColor>,
}
