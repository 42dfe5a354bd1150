pub mod board;
pub mod board_display;
pub mod check;
pub mod moves;
pub mod notation;
pub mod rules;
pub mod types;

pub use board::{Board, BoardError, BoardParts, Cells, CAPTURE_SLOTS};
pub use board_display::BoardDisplay;
pub use check::{
    attack_scan, checkmate_state, confirm_checkmate, evaluate_status, is_in_check, AttackScan,
    GameStatus, MateState,
};
pub use moves::{CastleSide, GameplayMode, MoveError, MoveOutcome};
pub use notation::{decode, encode, NotationError, UciMove};
pub use rules::{has_any_legal_move, is_legal, legal_destinations};
pub use types::{Piece, PieceColor, PieceKind, Square, EMPTY, INVALID};
