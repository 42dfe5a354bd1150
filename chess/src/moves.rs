//! Applying moves to a [`Board`].

use crate::board::Board;
use crate::check::{evaluate_status, is_in_check, GameStatus};
use crate::rules::{castle_side, is_legal};
use crate::types::{Piece, PieceColor, PieceKind, Square};

/// How moves are validated and whether turns alternate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GameplayMode {
    /// Human against the engine.
    #[default]
    Normal,
    /// Two humans sharing the board.
    TwoPlayer,
    /// Any piece may go anywhere; turns do not alternate.
    FreeMove,
}

impl GameplayMode {
    pub fn is_free_move(self) -> bool {
        self == Self::FreeMove
    }

    pub fn uses_engine(self) -> bool {
        self == Self::Normal
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CastleSide {
    King,
    Queen,
}

impl CastleSide {
    /// File of the rook taking part in the castle.
    pub fn rook_file(self) -> u8 {
        match self {
            Self::King => 8,
            Self::Queen => 1,
        }
    }

    /// File the rook lands on, which is also the square the king crosses.
    pub fn rook_target_file(self) -> u8 {
        match self {
            Self::King => 6,
            Self::Queen => 4,
        }
    }
}

/// What happened when a move was applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveOutcome {
    pub from: Square,
    pub to: Square,
    pub piece: Piece,
    pub captured: Option<Piece>,
    pub castled: Option<CastleSide>,
    pub promoted: bool,
    /// The move left the opponent's king attacked.
    pub gives_check: bool,
    pub status: GameStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MoveError {
    #[error("Source and destination are the same square")]
    NoMovement,
    #[error("No piece on {0}")]
    EmptySquare(Square),
    #[error("It is not {0}'s turn")]
    NotYourTurn(PieceColor),
    #[error("Illegal move {from}{to}")]
    Illegal { from: Square, to: Square },
    #[error("Move {from}{to} leaves the king in check")]
    LeavesKingInCheck { from: Square, to: Square },
    #[error("The game is over: {0}")]
    GameOver(GameStatus),
}

impl Board {
    /// Validate and apply a move for the side to move.
    ///
    /// The board is only modified when `Ok` is returned. Outside free-move
    /// mode a move that leaves the mover's own king attacked is rejected.
    pub fn try_move(
        &mut self,
        from: Square,
        to: Square,
        mode: GameplayMode,
    ) -> Result<MoveOutcome, MoveError> {
        if from == to {
            return Err(MoveError::NoMovement);
        }
        let piece = self.piece_at(from).ok_or(MoveError::EmptySquare(from))?;
        if piece.color != self.turn {
            return Err(MoveError::NotYourTurn(piece.color));
        }

        let free = mode.is_free_move();
        if free {
            // Free placement still may not take a friendly piece or a king.
            match self.piece_at(to) {
                Some(target) if target.color == piece.color || target.kind == PieceKind::King => {
                    return Err(MoveError::Illegal { from, to });
                }
                _ => {}
            }
        } else if !is_legal(self, from, to, piece.color) {
            return Err(MoveError::Illegal { from, to });
        }

        let castled = if free {
            None
        } else {
            castle_side(self, from, to, piece.color)
        };

        let mut next = self.clone();
        let captured = next.relocate(from, to, piece, castled);

        if !free {
            if let Some(king) = next.king_square(piece.color) {
                if is_in_check(&next, king, piece.color) {
                    return Err(MoveError::LeavesKingInCheck { from, to });
                }
            }
        }

        if let Some(taken) = captured {
            next.record_capture(taken);
        }

        let promoted = piece.kind == PieceKind::Pawn && to.rank() == piece.color.promotion_rank();
        if promoted {
            next.place(to, Piece::new(PieceKind::Queen, piece.color));
        }

        next.last_move = Some((from, to));
        let opponent = piece.color.opposite();
        if !free {
            next.turn = opponent;
        }

        for color in [PieceColor::White, PieceColor::Black] {
            let attacked = next
                .king_square(color)
                .is_some_and(|king| is_in_check(&next, king, color));
            next.set_in_check(color, attacked);
        }

        let status = if free {
            GameStatus::Active
        } else {
            evaluate_status(&next, opponent)
        };
        if let Some(loser) = status.loser() {
            next.set_in_check(loser, true);
        }

        let gives_check = next.in_check(opponent);
        *self = next;

        Ok(MoveOutcome {
            from,
            to,
            piece,
            captured,
            castled,
            promoted,
            gives_check,
            status,
        })
    }

    /// Move a piece without validation, handling the rook of a castle and
    /// castle-right bookkeeping. Returns the piece that was taken, if any.
    pub(crate) fn relocate(
        &mut self,
        from: Square,
        to: Square,
        piece: Piece,
        castled: Option<CastleSide>,
    ) -> Option<Piece> {
        let captured = self.piece_at(to);
        self.clear(from);
        self.place(to, piece);

        if let Some(side) = castled {
            self.shift_castle_rook(piece.color, side);
        }

        if piece.kind == PieceKind::King || is_rook_corner(from, piece.color) {
            self.revoke_castle(piece.color);
        }
        if let Some(taken) = captured {
            if taken.kind == PieceKind::Rook && is_rook_corner(to, taken.color) {
                self.revoke_castle(taken.color);
            }
        }

        captured
    }

    fn shift_castle_rook(&mut self, color: PieceColor, side: CastleSide) {
        let home = color.home_rank();
        let (Some(corner), Some(target)) = (
            Square::new(home, side.rook_file()),
            Square::new(home, side.rook_target_file()),
        ) else {
            return;
        };
        let rook = Piece::new(PieceKind::Rook, color);
        if self.piece_at(corner) == Some(rook) {
            self.clear(corner);
            self.place(target, rook);
        }
    }
}

fn is_rook_corner(sq: Square, color: PieceColor) -> bool {
    sq.rank() == color.home_rank() && (sq.file() == 1 || sq.file() == 8)
}
