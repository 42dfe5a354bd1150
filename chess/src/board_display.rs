//! Plain text rendering of a [`Board`].

use std::fmt;

use crate::board::Board;
use crate::types::{PieceColor, Square};

/// Renders a board as an 8x8 character grid, rank 8 on top.
///
/// White pieces are upper case, Black lower case, empty squares `.`.
#[derive(Debug, Clone, Copy)]
pub struct BoardDisplay<'a> {
    board: &'a Board,
    perspective: PieceColor,
}

impl<'a> BoardDisplay<'a> {
    pub fn new(board: &'a Board) -> Self {
        Self {
            board,
            perspective: PieceColor::White,
        }
    }

    /// Draw from Black's side: rank 1 on top, file h on the left.
    pub fn flipped(mut self, flipped: bool) -> Self {
        self.perspective = if flipped {
            PieceColor::Black
        } else {
            PieceColor::White
        };
        self
    }

    fn ranks(&self) -> Vec<u8> {
        match self.perspective {
            PieceColor::White => (1..=8).rev().collect(),
            PieceColor::Black => (1..=8).collect(),
        }
    }

    fn files(&self) -> Vec<u8> {
        match self.perspective {
            PieceColor::White => (1..=8).collect(),
            PieceColor::Black => (1..=8).rev().collect(),
        }
    }
}

impl fmt::Display for BoardDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let files = self.files();
        for rank in self.ranks() {
            write!(f, "{rank} ")?;
            for &file in &files {
                let c = Square::new(rank, file)
                    .and_then(|sq| self.board.piece_at(sq))
                    .map_or('.', |p| p.to_char());
                write!(f, " {c}")?;
            }
            writeln!(f)?;
        }
        write!(f, "  ")?;
        for &file in &files {
            write!(f, " {}", (b'a' + file - 1) as char)?;
        }
        writeln!(f)
    }
}
