//! Whole-game scenarios played through the public API.

use chess::{
    checkmate_state, encode, BoardDisplay, Board, CastleSide, GameStatus, GameplayMode, MateState,
    MoveError, Piece, PieceColor, PieceKind, Square,
};

fn sq(name: &str) -> Square {
    let (from, _) = chess::decode(&format!("{name}a1")).unwrap();
    from
}

fn play_line(board: &mut Board, line: &str) {
    for token in line.split_whitespace() {
        let (from, to) = chess::decode(token).unwrap();
        board
            .try_move(from, to, GameplayMode::Normal)
            .unwrap_or_else(|e| panic!("{token}: {e}"));
    }
}

#[test]
fn scholars_mate_ends_the_game() {
    let mut board = Board::new();
    play_line(&mut board, "e2e4 e7e5 f1c4 b8c6 d1h5 g8f6");
    let outcome = board
        .try_move(sq("h5"), sq("f7"), GameplayMode::Normal)
        .unwrap();
    assert_eq!(outcome.status, GameStatus::BlackCheckmated);
    assert_eq!(
        outcome.captured,
        Some(Piece::new(PieceKind::Pawn, PieceColor::Black))
    );
    assert!(board.in_check(PieceColor::Black));
    assert!(!board.in_check(PieceColor::White));
}

#[test]
fn pinned_knight_cannot_leave_the_line() {
    let mut board = Board::new();
    play_line(&mut board, "e2e4 e7e5 d2d3 f8b4 b1c3 a7a6");
    let before = board.clone();
    assert!(matches!(
        board.try_move(sq("c3"), sq("d5"), GameplayMode::Normal),
        Err(MoveError::LeavesKingInCheck { .. })
    ));
    assert_eq!(board, before);
}

#[test]
fn black_castles_queenside_in_a_game() {
    let mut board = Board::new();
    play_line(
        &mut board,
        "d2d4 d7d5 c2c4 b8c6 b1c3 c8f5 g1f3 d8d7 e2e3",
    );
    let outcome = board
        .try_move(sq("e8"), sq("c8"), GameplayMode::Normal)
        .unwrap();
    assert_eq!(outcome.castled, Some(CastleSide::Queen));
    assert_eq!(board.king_square(PieceColor::Black), Some(sq("c8")));
    assert_eq!(
        board.piece_at(sq("d8")),
        Some(Piece::new(PieceKind::Rook, PieceColor::Black))
    );
    assert!(!board.can_castle(PieceColor::Black));
}

#[test]
fn two_player_mode_alternates_turns() {
    let mut board = Board::new();
    board
        .try_move(sq("e2"), sq("e4"), GameplayMode::TwoPlayer)
        .unwrap();
    assert_eq!(board.turn(), PieceColor::Black);
    assert!(matches!(
        board.try_move(sq("d2"), sq("d4"), GameplayMode::TwoPlayer),
        Err(MoveError::NotYourTurn(PieceColor::White))
    ));
}

#[test]
fn stalemate_after_quiet_move() {
    let mut board = Board::empty();
    board.place(sq("a8"), Piece::new(PieceKind::King, PieceColor::Black));
    board.place(sq("c7"), Piece::new(PieceKind::Queen, PieceColor::White));
    board.place(sq("c6"), Piece::new(PieceKind::King, PieceColor::White));
    let outcome = board
        .try_move(sq("c7"), sq("b6"), GameplayMode::Normal)
        .unwrap();
    assert_eq!(outcome.status, GameStatus::Stalemate);
    assert!(!outcome.gives_check);
    assert_eq!(
        checkmate_state(&board, PieceColor::Black),
        MateState::Stalemate
    );
}

#[test]
fn display_reflects_moves() {
    let mut board = Board::new();
    play_line(&mut board, "e2e4");
    let text = BoardDisplay::new(&board).to_string();
    assert!(text.lines().nth(4).unwrap().contains('P'));
    assert_eq!(encode(sq("e2"), sq("e4")), "e2e4");
}
