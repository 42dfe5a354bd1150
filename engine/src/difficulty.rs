use std::fmt;
use std::str::FromStr;

/// Engine strength levels. Declaration order matches the configuration index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Difficulty {
    Child = 0,
    #[default]
    Lion = 1,
    Walrus = 2,
    Raptor = 3,
    Grandmaster = 4,
}

impl Difficulty {
    pub const ALL: [Difficulty; 5] = [
        Self::Child,
        Self::Lion,
        Self::Walrus,
        Self::Raptor,
        Self::Grandmaster,
    ];

    /// Search depth passed to `go`.
    pub fn depth(self) -> u32 {
        match self {
            Self::Child => 1,
            Self::Walrus => 3,
            Self::Lion => 5,
            Self::Raptor => 10,
            Self::Grandmaster => 15,
        }
    }

    /// Strength hint passed as `UCI_Elo` to engines that accept it.
    pub fn elo(self) -> u32 {
        match self {
            Self::Child => 1000,
            Self::Walrus => 1200,
            Self::Lion => 1500,
            Self::Raptor => 1800,
            Self::Grandmaster => 2900,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Child => "child",
            Self::Lion => "lion",
            Self::Walrus => "walrus",
            Self::Raptor => "raptor",
            Self::Grandmaster => "grandmaster",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown difficulty '{0}' (expected child, lion, walrus, raptor, grandmaster or 0-4)")]
pub struct ParseDifficultyError(String);

impl FromStr for Difficulty {
    type Err = ParseDifficultyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        if let Ok(index) = lower.parse::<usize>() {
            return Self::ALL
                .get(index)
                .copied()
                .ok_or_else(|| ParseDifficultyError(s.to_string()));
        }
        Self::ALL
            .into_iter()
            .find(|d| d.as_str() == lower)
            .ok_or_else(|| ParseDifficultyError(s.to_string()))
    }
}
