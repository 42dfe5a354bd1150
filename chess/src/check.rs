//! Check, checkmate and stalemate detection.

use crate::board::Board;
use crate::rules::{has_any_legal_move, is_legal, leaves_king_in_check};
use crate::types::{Piece, PieceColor, PieceKind, Square, EMPTY, INVALID};

const ORTHOGONAL: [(i8, i8); 4] = [(1, 0), (-1, 0), (0, 1), (0, -1)];
const DIAGONAL: [(i8, i8); 4] = [(1, 1), (1, -1), (-1, 1), (-1, -1)];
const KNIGHT_JUMPS: [(i8, i8); 8] = [
    (2, 1),
    (2, -1),
    (-2, 1),
    (-2, -1),
    (1, 2),
    (1, -2),
    (-1, 2),
    (-1, -2),
];
const KING_STEPS: [(i8, i8); 8] = [
    (1, 0),
    (-1, 0),
    (0, 1),
    (0, -1),
    (1, 1),
    (1, -1),
    (-1, 1),
    (-1, -1),
];

/// Result of a mate test for one side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MateState {
    Safe,
    Checkmate,
    Stalemate,
}

/// Overall game status after a move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GameStatus {
    #[default]
    Active,
    WhiteCheckmated,
    BlackCheckmated,
    Stalemate,
    /// The named side ran out of time.
    Flagged(PieceColor),
}

impl GameStatus {
    pub fn checkmated(color: PieceColor) -> Self {
        match color {
            PieceColor::White => Self::WhiteCheckmated,
            PieceColor::Black => Self::BlackCheckmated,
        }
    }

    pub fn is_over(self) -> bool {
        self != Self::Active
    }

    /// Side that lost, if the game ended decisively.
    pub fn loser(self) -> Option<PieceColor> {
        match self {
            Self::WhiteCheckmated => Some(PieceColor::White),
            Self::BlackCheckmated => Some(PieceColor::Black),
            Self::Flagged(color) => Some(color),
            Self::Active | Self::Stalemate => None,
        }
    }
}

impl std::fmt::Display for GameStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Active => write!(f, "in progress"),
            Self::WhiteCheckmated => write!(f, "white is checkmated"),
            Self::BlackCheckmated => write!(f, "black is checkmated"),
            Self::Stalemate => write!(f, "stalemate"),
            Self::Flagged(color) => write!(f, "{color} ran out of time"),
        }
    }
}

/// Pieces attacking a square, plus the empty squares between each sliding
/// attacker and that square.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttackScan {
    pub attackers: Vec<Square>,
    pub blocking: Vec<Square>,
}

impl AttackScan {
    pub fn in_check(&self) -> bool {
        !self.attackers.is_empty()
    }
}

/// Whether a piece of `color` standing on `target` would be attacked.
pub fn is_in_check(board: &Board, target: Square, color: PieceColor) -> bool {
    attack_scan(board, target, color).in_check()
}

/// Walk every ray and knight jump out of `target`, collecting hostile pieces
/// that attack it.
pub fn attack_scan(board: &Board, target: Square, color: PieceColor) -> AttackScan {
    let hostile = color.opposite();
    let mut scan = AttackScan::default();

    for (dr, df) in ORTHOGONAL {
        walk_ray(board, target, (dr, df), hostile, &mut scan, |kind, dist, _| {
            matches!(kind, PieceKind::Rook | PieceKind::Queen)
                || (kind == PieceKind::King && dist == 1)
        });
    }

    for (dr, df) in DIAGONAL {
        walk_ray(board, target, (dr, df), hostile, &mut scan, |kind, dist, step_rank| {
            match kind {
                PieceKind::Bishop | PieceKind::Queen => true,
                PieceKind::King => dist == 1,
                // A pawn attacks toward its own forward direction, so from the
                // target it sits one step against that direction.
                PieceKind::Pawn => dist == 1 && step_rank == -hostile.forward(),
                _ => false,
            }
        });
    }

    for (dr, df) in KNIGHT_JUMPS {
        if let Some(sq) = target.offset(dr, df) {
            if board.piece_at(sq) == Some(Piece::new(PieceKind::Knight, hostile)) {
                scan.attackers.push(sq);
            }
        }
    }

    scan
}

fn walk_ray(
    board: &Board,
    target: Square,
    (dr, df): (i8, i8),
    hostile: PieceColor,
    scan: &mut AttackScan,
    attacks: impl Fn(PieceKind, i8, i8) -> bool,
) {
    let mut path = Vec::new();
    let mut dist = 1;
    loop {
        let rank = target.rank() as i8 + dr * dist;
        let file = target.file() as i8 + df * dist;
        let code = board.code_at_signed(rank, file);
        if code == INVALID {
            return;
        }
        if code == EMPTY {
            if let Some(sq) = target.offset(dr * dist, df * dist) {
                path.push(sq);
            }
            dist += 1;
            continue;
        }
        if let Some(piece) = Piece::from_code(code) {
            if piece.color == hostile && attacks(piece.kind, dist, dr) {
                if let Some(sq) = target.offset(dr * dist, df * dist) {
                    scan.attackers.push(sq);
                    scan.blocking.extend(path);
                }
            }
        }
        return;
    }
}

/// Decide whether `color` is checkmated, stalemated or safe.
///
/// Works on a scratch copy; the board passed in is never touched.
pub fn checkmate_state(board: &Board, color: PieceColor) -> MateState {
    let Some(king) = board.king_square(color) else {
        return MateState::Safe;
    };

    let mut probe = board.clone();
    probe.clear(king);

    for (dr, df) in KING_STEPS {
        let Some(next) = king.offset(dr, df) else {
            continue;
        };
        if probe.color_at(next) == Some(color) {
            continue;
        }
        if !is_in_check(&probe, next, color) {
            return MateState::Safe;
        }
    }

    let scan = attack_scan(&probe, king, color);
    if !scan.in_check() {
        return if has_any_legal_move(board, color) {
            MateState::Safe
        } else {
            MateState::Stalemate
        };
    }

    if can_parry(board, color, &scan) {
        MateState::Safe
    } else {
        MateState::Checkmate
    }
}

/// Whether any non-king piece can capture an attacker or interpose.
fn can_parry(board: &Board, color: PieceColor, scan: &AttackScan) -> bool {
    let targets = || scan.attackers.iter().chain(scan.blocking.iter()).copied();
    board
        .pieces_of(color)
        .filter(|(_, piece)| piece.kind != PieceKind::King)
        .any(|(from, _)| {
            targets().any(|to| {
                is_legal(board, from, to, color) && !leaves_king_in_check(board, from, to, color)
            })
        })
}

/// Run [`checkmate_state`] twice, the second time on an independent copy,
/// and only report a terminal state when both runs agree.
pub fn confirm_checkmate(board: &Board, color: PieceColor) -> MateState {
    let first = checkmate_state(board, color);
    if first == MateState::Safe {
        return first;
    }
    let copy = board.clone();
    let second = checkmate_state(&copy, color);
    if first == second {
        first
    } else {
        MateState::Safe
    }
}

/// Status of the game with `color` to move.
pub fn evaluate_status(board: &Board, color: PieceColor) -> GameStatus {
    match confirm_checkmate(board, color) {
        MateState::Safe => GameStatus::Active,
        MateState::Checkmate => GameStatus::checkmated(color),
        MateState::Stalemate => GameStatus::Stalemate,
    }
}
