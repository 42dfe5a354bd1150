//! 10x10 mailbox board with a sentinel border.
//!
//! Rows and columns 0 and 9 always hold [`INVALID`], so ray walks can stop on
//! the sentinel instead of bounds-checking. Cells are indexed `[rank][file]`.

use crate::types::{Piece, PieceColor, PieceKind, Square, EMPTY, INVALID};

/// Number of capture tally slots. Slot 0 is unused.
pub const CAPTURE_SLOTS: usize = 11;

pub type Cells = [[i8; 10]; 10];

const X: i8 = INVALID;
const E: i8 = EMPTY;
const WP: i8 = PieceKind::Pawn as i8;
const WR: i8 = PieceKind::Rook as i8;
const WN: i8 = PieceKind::Knight as i8;
const WB: i8 = PieceKind::Bishop as i8;
const WQ: i8 = PieceKind::Queen as i8;
const WK: i8 = PieceKind::King as i8;

const START_POSITION: Cells = [
    [X; 10],
    [X, WR, WN, WB, WQ, WK, WB, WN, WR, X],
    [X, WP, WP, WP, WP, WP, WP, WP, WP, X],
    [X, E, E, E, E, E, E, E, E, X],
    [X, E, E, E, E, E, E, E, E, X],
    [X, E, E, E, E, E, E, E, E, X],
    [X, E, E, E, E, E, E, E, E, X],
    [X, -WP, -WP, -WP, -WP, -WP, -WP, -WP, -WP, X],
    [X, -WR, -WN, -WB, -WQ, -WK, -WB, -WN, -WR, X],
    [X; 10],
];

/// Game state owned by the rule engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Board {
    pub(crate) cells: Cells,
    pub(crate) white_king: Option<Square>,
    pub(crate) black_king: Option<Square>,
    pub(crate) captures: [u32; CAPTURE_SLOTS],
    pub(crate) white_castle: bool,
    pub(crate) black_castle: bool,
    pub(crate) white_in_check: bool,
    pub(crate) black_in_check: bool,
    pub(crate) turn: PieceColor,
    pub(crate) last_move: Option<(Square, Square)>,
}

/// Raw parts of a board, used when restoring a saved game.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardParts {
    pub cells: Cells,
    pub captures: [u32; CAPTURE_SLOTS],
    pub white_king: Square,
    pub black_king: Square,
    pub white_castle: bool,
    pub black_castle: bool,
    pub white_in_check: bool,
    pub black_in_check: bool,
    pub turn: PieceColor,
    pub last_move: Option<(Square, Square)>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BoardError {
    #[error("Border cell [{0}][{1}] is not a sentinel")]
    BrokenBorder(usize, usize),
    #[error("Unknown piece code {code} at {square}")]
    UnknownCode { code: i8, square: Square },
    #[error("{0} king cache does not match the board")]
    KingMismatch(PieceColor),
}

impl Board {
    /// Standard starting position, White to move.
    pub fn new() -> Self {
        Self {
            cells: START_POSITION,
            white_king: Square::new(1, 5),
            black_king: Square::new(8, 5),
            captures: [0; CAPTURE_SLOTS],
            white_castle: true,
            black_castle: true,
            white_in_check: false,
            black_in_check: false,
            turn: PieceColor::White,
            last_move: None,
        }
    }

    /// Board with only the sentinel border. Castling is disabled; use
    /// [`Board::set_castle_rights`] when a setup needs it.
    pub fn empty() -> Self {
        let mut cells = [[INVALID; 10]; 10];
        for row in cells.iter_mut().take(9).skip(1) {
            for cell in row.iter_mut().take(9).skip(1) {
                *cell = EMPTY;
            }
        }
        Self {
            cells,
            white_king: None,
            black_king: None,
            captures: [0; CAPTURE_SLOTS],
            white_castle: false,
            black_castle: false,
            white_in_check: false,
            black_in_check: false,
            turn: PieceColor::White,
            last_move: None,
        }
    }

    /// Rebuild a board from saved parts, validating the border and king cache.
    pub fn from_parts(parts: BoardParts) -> Result<Self, BoardError> {
        for (r, row) in parts.cells.iter().enumerate() {
            for (f, &code) in row.iter().enumerate() {
                let border = r == 0 || r == 9 || f == 0 || f == 9;
                if border {
                    if code != INVALID {
                        return Err(BoardError::BrokenBorder(r, f));
                    }
                    continue;
                }
                if code != EMPTY && Piece::from_code(code).is_none() {
                    let square = Square::new(r as u8, f as u8).ok_or(BoardError::BrokenBorder(r, f))?;
                    return Err(BoardError::UnknownCode { code, square });
                }
            }
        }

        let board = Self {
            cells: parts.cells,
            white_king: Some(parts.white_king),
            black_king: Some(parts.black_king),
            captures: parts.captures,
            white_castle: parts.white_castle,
            black_castle: parts.black_castle,
            white_in_check: parts.white_in_check,
            black_in_check: parts.black_in_check,
            turn: parts.turn,
            last_move: parts.last_move,
        };

        for color in [PieceColor::White, PieceColor::Black] {
            let king = Piece::new(PieceKind::King, color);
            let cached = board.king_square(color);
            let found: Vec<Square> = Square::all().filter(|&sq| board.piece_at(sq) == Some(king)).collect();
            if found.len() != 1 || cached != Some(found[0]) {
                return Err(BoardError::KingMismatch(color));
            }
        }

        Ok(board)
    }

    /// Raw parts for persistence. A missing king is stored as a1.
    pub fn to_parts(&self) -> BoardParts {
        let fallback = Square { rank: 1, file: 1 };
        BoardParts {
            cells: self.cells,
            captures: self.captures,
            white_king: self.white_king.unwrap_or(fallback),
            black_king: self.black_king.unwrap_or(fallback),
            white_castle: self.white_castle,
            black_castle: self.black_castle,
            white_in_check: self.white_in_check,
            black_in_check: self.black_in_check,
            turn: self.turn,
            last_move: self.last_move,
        }
    }

    /// Raw code at a 0..=9 index pair, sentinel included.
    pub fn code_at(&self, rank: usize, file: usize) -> i8 {
        self.cells
            .get(rank)
            .and_then(|row| row.get(file))
            .copied()
            .unwrap_or(INVALID)
    }

    /// Raw code at a signed index pair; anything outside the 10x10 grid is `INVALID`.
    pub(crate) fn code_at_signed(&self, rank: i8, file: i8) -> i8 {
        if rank < 0 || file < 0 {
            return INVALID;
        }
        self.code_at(rank as usize, file as usize)
    }

    pub fn piece_at(&self, sq: Square) -> Option<Piece> {
        Piece::from_code(self.cells[sq.rank() as usize][sq.file() as usize])
    }

    pub fn is_empty_at(&self, sq: Square) -> bool {
        self.cells[sq.rank() as usize][sq.file() as usize] == EMPTY
    }

    pub fn color_at(&self, sq: Square) -> Option<PieceColor> {
        self.piece_at(sq).map(|p| p.color)
    }

    /// Put a piece on a square, keeping the king cache in sync.
    pub fn place(&mut self, sq: Square, piece: Piece) {
        if let Some(old) = self.piece_at(sq) {
            if old.kind == PieceKind::King {
                self.set_king_square(old.color, None);
            }
        }
        self.cells[sq.rank() as usize][sq.file() as usize] = piece.code();
        if piece.kind == PieceKind::King {
            self.set_king_square(piece.color, Some(sq));
        }
    }

    /// Empty a square, keeping the king cache in sync.
    pub fn clear(&mut self, sq: Square) {
        if let Some(old) = self.piece_at(sq) {
            if old.kind == PieceKind::King && self.king_square(old.color) == Some(sq) {
                self.set_king_square(old.color, None);
            }
        }
        self.cells[sq.rank() as usize][sq.file() as usize] = EMPTY;
    }

    pub(crate) fn set_code(&mut self, sq: Square, code: i8) {
        self.cells[sq.rank() as usize][sq.file() as usize] = code;
    }

    pub fn king_square(&self, color: PieceColor) -> Option<Square> {
        match color {
            PieceColor::White => self.white_king,
            PieceColor::Black => self.black_king,
        }
    }

    pub(crate) fn set_king_square(&mut self, color: PieceColor, sq: Option<Square>) {
        match color {
            PieceColor::White => self.white_king = sq,
            PieceColor::Black => self.black_king = sq,
        }
    }

    pub fn turn(&self) -> PieceColor {
        self.turn
    }

    pub fn set_turn(&mut self, color: PieceColor) {
        self.turn = color;
    }

    pub fn can_castle(&self, color: PieceColor) -> bool {
        match color {
            PieceColor::White => self.white_castle,
            PieceColor::Black => self.black_castle,
        }
    }

    /// Set castle rights for a position setup.
    pub fn set_castle_rights(&mut self, white: bool, black: bool) {
        self.white_castle = white;
        self.black_castle = black;
    }

    /// Castle rights only ever go from true to false.
    pub(crate) fn revoke_castle(&mut self, color: PieceColor) {
        match color {
            PieceColor::White => self.white_castle = false,
            PieceColor::Black => self.black_castle = false,
        }
    }

    pub fn in_check(&self, color: PieceColor) -> bool {
        match color {
            PieceColor::White => self.white_in_check,
            PieceColor::Black => self.black_in_check,
        }
    }

    pub fn set_in_check(&mut self, color: PieceColor, value: bool) {
        match color {
            PieceColor::White => self.white_in_check = value,
            PieceColor::Black => self.black_in_check = value,
        }
    }

    pub fn captures(&self) -> &[u32; CAPTURE_SLOTS] {
        &self.captures
    }

    /// How many pieces of this kind and color have been captured.
    pub fn captured_count(&self, piece: Piece) -> u32 {
        piece.capture_bucket().map_or(0, |b| self.captures[b])
    }

    pub(crate) fn record_capture(&mut self, piece: Piece) {
        if let Some(bucket) = piece.capture_bucket() {
            self.captures[bucket] += 1;
        }
    }

    pub fn last_move(&self) -> Option<(Square, Square)> {
        self.last_move
    }

    pub fn cells(&self) -> &Cells {
        &self.cells
    }

    /// Every occupied square holding a piece of `color`.
    pub fn pieces_of(&self, color: PieceColor) -> impl Iterator<Item = (Square, Piece)> + '_ {
        Square::all().filter_map(move |sq| match self.piece_at(sq) {
            Some(p) if p.color == color => Some((sq, p)),
            _ => None,
        })
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}
