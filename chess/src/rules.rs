//! Move legality by piece type.
//!
//! These checks are pseudo-legal: they know nothing about whether the mover's
//! king ends up attacked. [`Board::try_move`](crate::Board::try_move) applies
//! that rule afterwards on a scratch copy.

use crate::board::Board;
use crate::check::is_in_check;
use crate::moves::CastleSide;
use crate::types::{PieceColor, PieceKind, Square};

/// Whether `color` may move the piece on `from` to `to`, ignoring self-check.
pub fn is_legal(board: &Board, from: Square, to: Square, color: PieceColor) -> bool {
    if from == to {
        return false;
    }
    let Some(piece) = board.piece_at(from) else {
        return false;
    };
    if piece.color != color || board.color_at(to) == Some(color) {
        return false;
    }

    let dr = to.rank() as i8 - from.rank() as i8;
    let df = to.file() as i8 - from.file() as i8;

    match piece.kind {
        PieceKind::Pawn => is_pawn_move(board, from, to, color),
        PieceKind::Rook => is_straight_move(board, from, to),
        PieceKind::Knight => matches!((dr.abs(), df.abs()), (2, 1) | (1, 2)),
        PieceKind::Bishop => dr.abs() == df.abs() && is_diagonal_clear(board, from, to),
        PieceKind::Queen => {
            is_straight_move(board, from, to)
                || (dr.abs() == df.abs() && is_diagonal_clear(board, from, to))
        }
        PieceKind::King => {
            (dr.abs() <= 1 && df.abs() <= 1) || castle_side(board, from, to, color).is_some()
        }
    }
}

fn is_pawn_move(board: &Board, from: Square, to: Square, color: PieceColor) -> bool {
    let forward = color.forward();
    let dr = to.rank() as i8 - from.rank() as i8;
    let df = to.file() as i8 - from.file() as i8;

    match df.abs() {
        0 if dr == forward => board.is_empty_at(to),
        0 if dr == 2 * forward && from.rank() == color.pawn_rank() => {
            let Some(mid) = from.offset(forward, 0) else {
                return false;
            };
            board.is_empty_at(mid) && board.is_empty_at(to)
        }
        1 if dr == forward => board.color_at(to) == Some(color.opposite()),
        _ => false,
    }
}

fn is_straight_move(board: &Board, from: Square, to: Square) -> bool {
    if from.rank() == to.rank() {
        is_rank_clear(board, from, to)
    } else if from.file() == to.file() {
        is_file_clear(board, from, to)
    } else {
        false
    }
}

/// Every square strictly between two squares on the same rank is empty.
pub fn is_rank_clear(board: &Board, from: Square, to: Square) -> bool {
    if from.rank() != to.rank() {
        return false;
    }
    let (lo, hi) = ordered(from.file(), to.file());
    ((lo + 1)..hi).all(|file| {
        Square::new(from.rank(), file).is_some_and(|sq| board.is_empty_at(sq))
    })
}

/// Every square strictly between two squares on the same file is empty.
pub fn is_file_clear(board: &Board, from: Square, to: Square) -> bool {
    if from.file() != to.file() {
        return false;
    }
    let (lo, hi) = ordered(from.rank(), to.rank());
    ((lo + 1)..hi).all(|rank| {
        Square::new(rank, from.file()).is_some_and(|sq| board.is_empty_at(sq))
    })
}

/// Every square strictly between two squares on the same diagonal is empty.
pub fn is_diagonal_clear(board: &Board, from: Square, to: Square) -> bool {
    let dr = to.rank() as i8 - from.rank() as i8;
    let df = to.file() as i8 - from.file() as i8;
    if dr.abs() != df.abs() || dr == 0 {
        return false;
    }
    let (step_r, step_f) = (dr.signum(), df.signum());
    (1..dr.abs()).all(|i| {
        from.offset(step_r * i, step_f * i)
            .is_some_and(|sq| board.is_empty_at(sq))
    })
}

fn ordered(a: u8, b: u8) -> (u8, u8) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

/// Recognise a castling move and check its preconditions.
///
/// The king must be on its home square with castle rights intact, move two
/// files toward a rook still on its corner, with every square between them
/// empty. The king may not castle out of, through, or into check.
pub fn castle_side(
    board: &Board,
    from: Square,
    to: Square,
    color: PieceColor,
) -> Option<CastleSide> {
    let home = color.home_rank();
    if !board.can_castle(color) || from.rank() != home || from.file() != 5 || to.rank() != home {
        return None;
    }
    let king = board.piece_at(from)?;
    if king.kind != PieceKind::King || king.color != color {
        return None;
    }

    let side = match to.file() {
        7 => CastleSide::King,
        3 => CastleSide::Queen,
        _ => return None,
    };

    let rook_sq = Square::new(home, side.rook_file())?;
    match board.piece_at(rook_sq) {
        Some(p) if p.kind == PieceKind::Rook && p.color == color => {}
        _ => return None,
    }
    if !is_rank_clear(board, from, rook_sq) {
        return None;
    }

    // Attack tests run with the king lifted so it cannot shield its own path.
    let mut probe = board.clone();
    probe.clear(from);
    let crossing = Square::new(home, side.rook_target_file())?;
    for sq in [from, crossing, to] {
        if is_in_check(&probe, sq, color) {
            return None;
        }
    }

    Some(side)
}

/// Whether moving `from` to `to` would leave `color`'s king attacked.
pub fn leaves_king_in_check(board: &Board, from: Square, to: Square, color: PieceColor) -> bool {
    let mut probe = board.clone();
    let Some(piece) = probe.piece_at(from) else {
        return false;
    };
    let castled = castle_side(board, from, to, color);
    probe.relocate(from, to, piece, castled);
    match probe.king_square(color) {
        Some(king) => is_in_check(&probe, king, color),
        None => false,
    }
}

/// Destinations `color` may legally move the piece on `from` to.
pub fn legal_destinations(board: &Board, from: Square, color: PieceColor) -> Vec<Square> {
    Square::all()
        .filter(|&to| is_legal(board, from, to, color) && !leaves_king_in_check(board, from, to, color))
        .collect()
}

/// Whether `color` has at least one fully legal move.
pub fn has_any_legal_move(board: &Board, color: PieceColor) -> bool {
    board.pieces_of(color).any(|(from, _)| {
        Square::all().any(|to| {
            is_legal(board, from, to, color) && !leaves_king_in_check(board, from, to, color)
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Piece;

    fn sq(name: &str) -> Square {
        let b = name.as_bytes();
        Square::new(b[1] - b'0', b[0] - b'a' + 1).unwrap()
    }

    fn lone(kind: PieceKind, color: PieceColor, at: &str) -> Board {
        let mut board = Board::empty();
        board.place(sq(at), Piece::new(kind, color));
        board
    }

    #[test]
    fn test_pawn_single_and_double_step() {
        let board = Board::new();
        assert!(is_legal(&board, sq("e2"), sq("e3"), PieceColor::White));
        assert!(is_legal(&board, sq("e2"), sq("e4"), PieceColor::White));
        assert!(!is_legal(&board, sq("e2"), sq("e5"), PieceColor::White));
        assert!(is_legal(&board, sq("e7"), sq("e5"), PieceColor::Black));
        assert!(!is_legal(&board, sq("e7"), sq("e8"), PieceColor::Black));
    }

    #[test]
    fn test_pawn_double_step_blocked() {
        let mut board = Board::new();
        board.place(sq("e3"), Piece::new(PieceKind::Knight, PieceColor::Black));
        assert!(!is_legal(&board, sq("e2"), sq("e4"), PieceColor::White));
        assert!(!is_legal(&board, sq("e2"), sq("e3"), PieceColor::White));
    }

    #[test]
    fn test_pawn_double_step_only_from_start_rank() {
        let board = lone(PieceKind::Pawn, PieceColor::White, "e3");
        assert!(!is_legal(&board, sq("e3"), sq("e5"), PieceColor::White));
    }

    #[test]
    fn test_pawn_captures_diagonally_only_onto_enemy() {
        let mut board = lone(PieceKind::Pawn, PieceColor::White, "d4");
        assert!(!is_legal(&board, sq("d4"), sq("e5"), PieceColor::White));
        board.place(sq("e5"), Piece::new(PieceKind::Pawn, PieceColor::Black));
        assert!(is_legal(&board, sq("d4"), sq("e5"), PieceColor::White));
        board.place(sq("d5"), Piece::new(PieceKind::Pawn, PieceColor::Black));
        assert!(!is_legal(&board, sq("d4"), sq("d5"), PieceColor::White));
    }

    #[test]
    fn test_pawn_never_moves_backwards() {
        let board = lone(PieceKind::Pawn, PieceColor::Black, "d5");
        assert!(is_legal(&board, sq("d5"), sq("d4"), PieceColor::Black));
        assert!(!is_legal(&board, sq("d5"), sq("d6"), PieceColor::Black));
    }

    #[test]
    fn test_knight_l_shapes() {
        let board = lone(PieceKind::Knight, PieceColor::White, "d4");
        let dests = legal_destinations(&board, sq("d4"), PieceColor::White);
        assert_eq!(dests.len(), 8);
        assert!(dests.contains(&sq("e6")));
        assert!(dests.contains(&sq("b3")));
        assert!(!dests.contains(&sq("d6")));
    }

    #[test]
    fn test_knight_jumps_over_pieces() {
        let board = Board::new();
        assert!(is_legal(&board, sq("g1"), sq("f3"), PieceColor::White));
        assert!(!is_legal(&board, sq("g1"), sq("e2"), PieceColor::White));
    }

    #[test]
    fn test_bishop_blocked_diagonal() {
        let mut board = lone(PieceKind::Bishop, PieceColor::White, "c1");
        assert!(is_legal(&board, sq("c1"), sq("h6"), PieceColor::White));
        board.place(sq("e3"), Piece::new(PieceKind::Pawn, PieceColor::Black));
        assert!(is_legal(&board, sq("c1"), sq("e3"), PieceColor::White));
        assert!(!is_legal(&board, sq("c1"), sq("f4"), PieceColor::White));
        assert!(!is_legal(&board, sq("c1"), sq("c4"), PieceColor::White));
    }

    #[test]
    fn test_queen_combines_rook_and_bishop() {
        let board = lone(PieceKind::Queen, PieceColor::Black, "d4");
        assert_eq!(legal_destinations(&board, sq("d4"), PieceColor::Black).len(), 27);
        assert!(!is_legal(&board, sq("d4"), sq("e6"), PieceColor::Black));
    }

    #[test]
    fn test_no_friendly_capture() {
        let board = Board::new();
        assert!(!is_legal(&board, sq("a1"), sq("a2"), PieceColor::White));
        assert!(!is_legal(&board, sq("d1"), sq("e1"), PieceColor::White));
    }

    #[test]
    fn test_no_op_and_wrong_color() {
        let board = Board::new();
        assert!(!is_legal(&board, sq("e2"), sq("e2"), PieceColor::White));
        assert!(!is_legal(&board, sq("e2"), sq("e4"), PieceColor::Black));
    }

    #[test]
    fn test_king_single_steps() {
        let board = lone(PieceKind::King, PieceColor::White, "e4");
        assert_eq!(legal_destinations(&board, sq("e4"), PieceColor::White).len(), 8);
        assert!(!is_legal(&board, sq("e4"), sq("e6"), PieceColor::White));
    }

    fn castle_board() -> Board {
        let mut board = Board::empty();
        board.place(sq("e1"), Piece::new(PieceKind::King, PieceColor::White));
        board.place(sq("h1"), Piece::new(PieceKind::Rook, PieceColor::White));
        board.place(sq("a1"), Piece::new(PieceKind::Rook, PieceColor::White));
        board.place(sq("e8"), Piece::new(PieceKind::King, PieceColor::Black));
        board.set_castle_rights(true, false);
        board
    }

    #[test]
    fn test_castle_both_sides() {
        let board = castle_board();
        assert_eq!(
            castle_side(&board, sq("e1"), sq("g1"), PieceColor::White),
            Some(CastleSide::King)
        );
        assert_eq!(
            castle_side(&board, sq("e1"), sq("c1"), PieceColor::White),
            Some(CastleSide::Queen)
        );
        assert!(!is_legal(&board, sq("e8"), sq("g8"), PieceColor::Black));
    }

    #[test]
    fn test_castle_blocked_by_piece() {
        let mut board = castle_board();
        board.place(sq("b1"), Piece::new(PieceKind::Knight, PieceColor::White));
        assert!(castle_side(&board, sq("e1"), sq("c1"), PieceColor::White).is_none());
        assert!(castle_side(&board, sq("e1"), sq("g1"), PieceColor::White).is_some());
    }

    #[test]
    fn test_castle_through_attacked_square() {
        let mut board = castle_board();
        board.place(sq("f8"), Piece::new(PieceKind::Rook, PieceColor::Black));
        assert!(castle_side(&board, sq("e1"), sq("g1"), PieceColor::White).is_none());
        assert!(castle_side(&board, sq("e1"), sq("c1"), PieceColor::White).is_some());
    }

    #[test]
    fn test_castle_out_of_check() {
        let mut board = castle_board();
        board.place(sq("e5"), Piece::new(PieceKind::Rook, PieceColor::Black));
        assert!(castle_side(&board, sq("e1"), sq("g1"), PieceColor::White).is_none());
        assert!(castle_side(&board, sq("e1"), sq("c1"), PieceColor::White).is_none());
    }

    #[test]
    fn test_castle_requires_rights() {
        let mut board = castle_board();
        board.set_castle_rights(false, false);
        assert!(!is_legal(&board, sq("e1"), sq("g1"), PieceColor::White));
    }

    #[test]
    fn test_start_position_has_moves() {
        let board = Board::new();
        assert!(has_any_legal_move(&board, PieceColor::White));
        assert!(has_any_legal_move(&board, PieceColor::Black));
    }
}
