//! Canonical piece, color and square types for the project.
//!
//! The board stores pieces as signed codes (see [`Piece::code`]); these types
//! are the typed view over those codes.

/// Code of an empty board cell.
pub const EMPTY: i8 = 0;

/// Code of a sentinel cell on the board border.
pub const INVALID: i8 = 99;

/// Project-owned piece type. Discriminants match the board's piece codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i8)]
pub enum PieceKind {
    Pawn = 1,
    Rook = 2,
    Knight = 3,
    Bishop = 4,
    Queen = 5,
    King = 6,
}

/// Project-owned color type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PieceColor {
    White,
    Black,
}

/// A colored piece.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Piece {
    pub kind: PieceKind,
    pub color: PieceColor,
}

impl PieceKind {
    pub const ALL: [PieceKind; 6] = [
        Self::Pawn,
        Self::Rook,
        Self::Knight,
        Self::Bishop,
        Self::Queen,
        Self::King,
    ];

    pub fn to_char_upper(self) -> char {
        match self {
            Self::Pawn => 'P',
            Self::Knight => 'N',
            Self::Bishop => 'B',
            Self::Rook => 'R',
            Self::Queen => 'Q',
            Self::King => 'K',
        }
    }

    pub fn to_char_lower(self) -> char {
        self.to_char_upper().to_ascii_lowercase()
    }

    pub fn from_char(c: char) -> Option<Self> {
        match c.to_ascii_lowercase() {
            'p' => Some(Self::Pawn),
            'n' => Some(Self::Knight),
            'b' => Some(Self::Bishop),
            'r' => Some(Self::Rook),
            'q' => Some(Self::Queen),
            'k' => Some(Self::King),
            _ => None,
        }
    }

    /// Kind for a code magnitude in 1..=6.
    pub fn from_magnitude(m: i8) -> Option<Self> {
        match m {
            1 => Some(Self::Pawn),
            2 => Some(Self::Rook),
            3 => Some(Self::Knight),
            4 => Some(Self::Bishop),
            5 => Some(Self::Queen),
            6 => Some(Self::King),
            _ => None,
        }
    }
}

impl PieceColor {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::White => "white",
            Self::Black => "black",
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            Self::White => Self::Black,
            Self::Black => Self::White,
        }
    }

    /// Rank delta of a pawn push for this color.
    pub fn forward(self) -> i8 {
        match self {
            Self::White => 1,
            Self::Black => -1,
        }
    }

    /// Rank the king and rooks start on.
    pub fn home_rank(self) -> u8 {
        match self {
            Self::White => 1,
            Self::Black => 8,
        }
    }

    /// Rank the pawns start on.
    pub fn pawn_rank(self) -> u8 {
        match self {
            Self::White => 2,
            Self::Black => 7,
        }
    }

    /// Rank on which a pawn promotes.
    pub fn promotion_rank(self) -> u8 {
        match self {
            Self::White => 8,
            Self::Black => 1,
        }
    }
}

impl Piece {
    pub const fn new(kind: PieceKind, color: PieceColor) -> Self {
        Self { kind, color }
    }

    /// Signed board code: positive for White, negative for Black.
    pub fn code(self) -> i8 {
        let m = self.kind as i8;
        match self.color {
            PieceColor::White => m,
            PieceColor::Black => -m,
        }
    }

    /// Decode a board cell. `EMPTY`, `INVALID` and unknown codes yield `None`.
    pub fn from_code(code: i8) -> Option<Self> {
        let kind = PieceKind::from_magnitude(code.checked_abs()?)?;
        let color = if code > 0 {
            PieceColor::White
        } else {
            PieceColor::Black
        };
        Some(Self { kind, color })
    }

    /// Capture tally bucket: 1..=5 for White pieces, 6..=10 for Black ones.
    /// Kings have no bucket.
    pub fn capture_bucket(self) -> Option<usize> {
        if self.kind == PieceKind::King {
            return None;
        }
        let base = self.kind as usize;
        Some(match self.color {
            PieceColor::White => base,
            PieceColor::Black => 5 + base,
        })
    }

    pub fn to_char(self) -> char {
        match self.color {
            PieceColor::White => self.kind.to_char_upper(),
            PieceColor::Black => self.kind.to_char_lower(),
        }
    }
}

/// A square on the playable area. Rank and file are both 1..=8.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Square {
    pub(crate) rank: u8,
    pub(crate) file: u8,
}

impl Square {
    pub fn new(rank: u8, file: u8) -> Option<Self> {
        if (1..=8).contains(&rank) && (1..=8).contains(&file) {
            Some(Self { rank, file })
        } else {
            None
        }
    }

    pub fn rank(self) -> u8 {
        self.rank
    }

    pub fn file(self) -> u8 {
        self.file
    }

    /// Square shifted by a signed delta, if still on the board.
    pub fn offset(self, d_rank: i8, d_file: i8) -> Option<Self> {
        let rank = self.rank as i8 + d_rank;
        let file = self.file as i8 + d_file;
        if rank < 1 || file < 1 {
            return None;
        }
        Self::new(rank as u8, file as u8)
    }

    /// Iterate every playable square, rank-major from a1.
    pub fn all() -> impl Iterator<Item = Square> {
        (1..=8u8).flat_map(|rank| (1..=8u8).map(move |file| Square { rank, file }))
    }
}

impl std::fmt::Display for PieceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_char_upper())
    }
}

impl std::fmt::Display for PieceColor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::fmt::Display for Square {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", (b'a' + self.file - 1) as char, self.rank)
    }
}
