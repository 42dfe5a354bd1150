//! UCI long algebraic notation (`e2e4`, `e7e8q`).

use std::fmt;
use std::str::FromStr;

use crate::types::Square;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NotationError {
    #[error("Move token '{0}' is shorter than four characters")]
    TooShort(String),
    #[error("Invalid file '{1}' in move token '{0}'")]
    BadFile(String, char),
    #[error("Invalid rank '{1}' in move token '{0}'")]
    BadRank(String, char),
    #[error("Invalid promotion suffix in move token '{0}'")]
    BadPromotion(String),
}

/// Encode a move as a four character token.
pub fn encode(from: Square, to: Square) -> String {
    format!("{from}{to}")
}

/// Decode the first four characters of a token into a square pair.
///
/// Anything after the fourth character is ignored.
pub fn decode(token: &str) -> Result<(Square, Square), NotationError> {
    let mut chars = token.chars();
    let mut next_square = || -> Result<Square, NotationError> {
        let (Some(f), Some(r)) = (chars.next(), chars.next()) else {
            return Err(NotationError::TooShort(token.to_string()));
        };
        let file = match f {
            'a'..='h' => f as u8 - b'a' + 1,
            _ => return Err(NotationError::BadFile(token.to_string(), f)),
        };
        let rank = match r {
            '1'..='8' => r as u8 - b'0',
            _ => return Err(NotationError::BadRank(token.to_string(), r)),
        };
        Square::new(rank, file).ok_or_else(|| NotationError::BadRank(token.to_string(), r))
    };
    let from = next_square()?;
    let to = next_square()?;
    Ok((from, to))
}

/// A move as exchanged with the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UciMove {
    pub from: Square,
    pub to: Square,
    /// Pawn promotion. Promotion is always to a queen.
    pub promotion: bool,
}

impl UciMove {
    pub fn new(from: Square, to: Square) -> Self {
        Self {
            from,
            to,
            promotion: false,
        }
    }
}

impl fmt::Display for UciMove {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.from, self.to)?;
        if self.promotion {
            write!(f, "q")?;
        }
        Ok(())
    }
}

impl FromStr for UciMove {
    type Err = NotationError;

    /// Accepts `e2e4` or a five character form with a promotion letter. Any
    /// promotion piece is read as a queen.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (from, to) = decode(s)?;
        let promotion = match s.chars().nth(4) {
            None => false,
            Some('q' | 'r' | 'b' | 'n' | 'Q' | 'R' | 'B' | 'N') if s.chars().count() == 5 => true,
            Some(_) => return Err(NotationError::BadPromotion(s.to_string())),
        };
        Ok(Self {
            from,
            to,
            promotion,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_uses_file_letter_then_rank_digit() {
        let e2 = Square::new(2, 5).unwrap();
        let e4 = Square::new(4, 5).unwrap();
        assert_eq!(encode(e2, e4), "e2e4");
        let a1 = Square::new(1, 1).unwrap();
        let h8 = Square::new(8, 8).unwrap();
        assert_eq!(encode(a1, h8), "a1h8");
    }

    #[test]
    fn test_decode() {
        let (from, to) = decode("g8f6").unwrap();
        assert_eq!((from.rank(), from.file()), (8, 7));
        assert_eq!((to.rank(), to.file()), (6, 6));
    }

    #[test]
    fn test_decode_ignores_trailing_text() {
        assert_eq!(decode("e7e8q").unwrap(), decode("e7e8").unwrap());
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(matches!(decode(""), Err(NotationError::TooShort(_))));
        assert!(matches!(decode("e2e"), Err(NotationError::TooShort(_))));
        assert!(matches!(decode("i2e4"), Err(NotationError::BadFile(_, 'i'))));
        assert!(matches!(decode("e9e4"), Err(NotationError::BadRank(_, '9'))));
        assert!(matches!(decode("e2e0"), Err(NotationError::BadRank(_, '0'))));
        assert!(matches!(decode("(non"), Err(NotationError::BadFile(_, '('))));
        assert!(decode("é2e4").is_err());
    }

    #[test]
    fn test_uci_move_display_and_parse() {
        let mv: UciMove = "e7e8q".parse().unwrap();
        assert!(mv.promotion);
        assert_eq!(mv.to_string(), "e7e8q");

        let mv: UciMove = "b1c3".parse().unwrap();
        assert!(!mv.promotion);
        assert_eq!(mv.to_string(), "b1c3");

        assert!("e7e8x".parse::<UciMove>().is_err());
        assert!("e7e8qq".parse::<UciMove>().is_err());
    }
}
