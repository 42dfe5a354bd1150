//! The `position startpos moves ...` command built up over a game.

/// Every position command starts with this text.
pub const POSITION_PREFIX: &str = "position startpos moves ";

/// Largest position command the game will build or load, in bytes.
pub const MAX_POSITION_LEN: usize = 4096;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HistoryError {
    #[error("Position history is full ({len} bytes), cannot add '{token}'")]
    Full { len: usize, token: String },
    #[error("Position history must start with '{}'", POSITION_PREFIX)]
    BadPrefix,
    #[error("Position history is {0} bytes, over the size limit")]
    TooLong(usize),
    #[error("Invalid move token '{0}' in position history")]
    BadToken(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PositionHistory {
    text: String,
}

impl PositionHistory {
    pub fn new() -> Self {
        Self {
            text: POSITION_PREFIX.to_string(),
        }
    }

    pub fn reset(&mut self) {
        self.text.clear();
        self.text.push_str(POSITION_PREFIX);
    }

    /// Append one ply as `<token> `. The history is unchanged on error.
    pub fn push(&mut self, token: &str) -> Result<(), HistoryError> {
        if token.is_empty() || token.contains(char::is_whitespace) {
            return Err(HistoryError::BadToken(token.to_string()));
        }
        if self.text.len() + token.len() + 1 > MAX_POSITION_LEN {
            return Err(HistoryError::Full {
                len: self.text.len(),
                token: token.to_string(),
            });
        }
        self.text.push_str(token);
        self.text.push(' ');
        Ok(())
    }

    /// Rebuild a history from a saved position command.
    pub fn from_command(command: &str) -> Result<Self, HistoryError> {
        if command.len() > MAX_POSITION_LEN {
            return Err(HistoryError::TooLong(command.len()));
        }
        let Some(moves) = command.strip_prefix(POSITION_PREFIX) else {
            return Err(HistoryError::BadPrefix);
        };
        let mut history = Self::new();
        for token in moves.split_whitespace() {
            history.push(token)?;
        }
        Ok(history)
    }

    /// The full command text, including the trailing space after each ply.
    pub fn as_command(&self) -> &str {
        &self.text
    }

    pub fn moves(&self) -> impl Iterator<Item = &str> {
        self.text[POSITION_PREFIX.len()..].split_whitespace()
    }

    pub fn ply_count(&self) -> usize {
        self.moves().count()
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.len() == POSITION_PREFIX.len()
    }
}

impl Default for PositionHistory {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_appends_token_and_space() {
        let mut history = PositionHistory::new();
        assert!(history.is_empty());
        history.push("e2e4").unwrap();
        history.push("e7e5").unwrap();
        assert_eq!(history.as_command(), "position startpos moves e2e4 e7e5 ");
        assert_eq!(history.ply_count(), 2);
    }

    #[test]
    fn test_reset() {
        let mut history = PositionHistory::new();
        history.push("d2d4").unwrap();
        history.reset();
        assert_eq!(history.as_command(), POSITION_PREFIX);
    }

    #[test]
    fn test_cap_is_enforced() {
        let mut history = PositionHistory::new();
        let mut pushed = 0;
        while history.push("g1f3").is_ok() {
            pushed += 1;
        }
        assert!(history.len() <= MAX_POSITION_LEN);
        assert_eq!(pushed, (MAX_POSITION_LEN - POSITION_PREFIX.len()) / 5);
        let before = history.clone();
        assert!(matches!(
            history.push("g8f6"),
            Err(HistoryError::Full { .. })
        ));
        assert_eq!(history, before);
    }

    #[test]
    fn test_from_command() {
        let history =
            PositionHistory::from_command("position startpos moves e2e4 e7e5 e7e8q ").unwrap();
        assert_eq!(history.moves().collect::<Vec<_>>(), vec!["e2e4", "e7e5", "e7e8q"]);
        assert_eq!(
            PositionHistory::from_command("position fen 8/8 moves "),
            Err(HistoryError::BadPrefix)
        );
        let long = format!("{POSITION_PREFIX}{}", "a2a3 ".repeat(1000));
        assert!(matches!(
            PositionHistory::from_command(&long),
            Err(HistoryError::TooLong(_))
        ));
    }

    #[test]
    fn test_rejects_blank_tokens() {
        let mut history = PositionHistory::new();
        assert!(history.push("").is_err());
        assert!(history.push("e2 e4").is_err());
    }
}
