//! Bundled engine kinds and the protocol quirks each one needs.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Engines the game knows how to launch. The discriminant is the index used
/// in configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum EngineKind {
    Houdini = 0,
    Critter = 1,
    Custom = 2,
    #[default]
    Stockfish = 3,
}

impl EngineKind {
    pub const ALL: [EngineKind; 4] = [Self::Houdini, Self::Critter, Self::Custom, Self::Stockfish];

    pub fn from_index(index: u8) -> Option<Self> {
        Self::ALL.get(index as usize).copied()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Houdini => "houdini",
            Self::Critter => "critter",
            Self::Custom => "custom",
            Self::Stockfish => "stockfish",
        }
    }

    pub fn profile(self) -> EngineProfile {
        let full = EngineQuirks {
            warmup_handshake: true,
            elo_option: true,
            orderly_shutdown: true,
            new_game_command: false,
        };
        match self {
            Self::Houdini => EngineProfile {
                kind: self,
                stem: "Houdini",
                arch_suffix: true,
                quirks: EngineQuirks {
                    new_game_command: true,
                    ..full
                },
            },
            Self::Critter => EngineProfile {
                kind: self,
                stem: "Critter",
                arch_suffix: true,
                quirks: full,
            },
            Self::Custom => EngineProfile {
                kind: self,
                stem: "Custom",
                arch_suffix: false,
                quirks: full,
            },
            // Stockfish only gets `uci`, never UCI_Elo, and hangs on an
            // orderly quit, so it is killed instead.
            Self::Stockfish => EngineProfile {
                kind: self,
                stem: "Stockfish",
                arch_suffix: true,
                quirks: EngineQuirks {
                    warmup_handshake: false,
                    elo_option: false,
                    orderly_shutdown: false,
                    new_game_command: false,
                },
            },
        }
    }

    /// Launch order when this kind is requested: itself first, then the
    /// remaining kinds in index order.
    pub fn fallback_order(self) -> Vec<EngineKind> {
        std::iter::once(self)
            .chain(Self::ALL.into_iter().filter(move |k| *k != self))
            .collect()
    }
}

impl fmt::Display for EngineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown engine '{0}' (expected houdini, critter, custom, stockfish or 0-3)")]
pub struct ParseEngineKindError(String);

impl FromStr for EngineKind {
    type Err = ParseEngineKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        if let Ok(index) = lower.parse::<u8>() {
            return Self::from_index(index).ok_or_else(|| ParseEngineKindError(s.to_string()));
        }
        Self::ALL
            .into_iter()
            .find(|k| k.as_str() == lower)
            .ok_or_else(|| ParseEngineKindError(s.to_string()))
    }
}

/// Protocol differences between engines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineQuirks {
    /// Send `isready`, `Hash` and `UCI_LimitStrength` after `uci`.
    pub warmup_handshake: bool,
    /// Accepts `setoption name UCI_Elo`.
    pub elo_option: bool,
    /// Send `stop` and `quit` on shutdown instead of killing the process.
    pub orderly_shutdown: bool,
    /// Send `ucinewgame` when the game is reset.
    pub new_game_command: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineProfile {
    pub kind: EngineKind,
    pub stem: &'static str,
    pub arch_suffix: bool,
    pub quirks: EngineQuirks,
}

impl EngineProfile {
    /// Commands sent one per poll before the engine is considered ready.
    pub fn warmup_commands(&self) -> Vec<String> {
        let mut commands = vec!["uci".to_string()];
        if self.quirks.warmup_handshake {
            commands.extend([
                "isready".to_string(),
                "setoption name Hash value 512".to_string(),
                "setoption name UCI_LimitStrength value true".to_string(),
            ]);
        }
        commands
    }

    /// Executable file name for the running platform.
    pub fn file_name(&self) -> String {
        let mut name = self.stem.to_string();
        if self.arch_suffix {
            name.push_str(if cfg!(target_pointer_width = "64") {
                "_x64"
            } else {
                "_x86"
            });
        }
        if cfg!(windows) {
            name.push_str(".exe");
        }
        name
    }

    /// Where to find this engine. A configured custom path wins for the
    /// custom kind.
    pub fn executable_path(&self, engines_dir: &Path, custom_path: Option<&Path>) -> PathBuf {
        match (self.kind, custom_path) {
            (EngineKind::Custom, Some(path)) => path.to_path_buf(),
            _ => engines_dir.join(self.file_name()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_order() {
        assert_eq!(EngineKind::from_index(0), Some(EngineKind::Houdini));
        assert_eq!(EngineKind::from_index(3), Some(EngineKind::Stockfish));
        assert_eq!(EngineKind::from_index(4), None);
        assert_eq!(EngineKind::Critter as u8, 1);
    }

    #[test]
    fn test_parse() {
        assert_eq!("Stockfish".parse(), Ok(EngineKind::Stockfish));
        assert_eq!("2".parse(), Ok(EngineKind::Custom));
        assert!("fritz".parse::<EngineKind>().is_err());
    }

    #[test]
    fn test_warmup_commands() {
        assert_eq!(EngineKind::Stockfish.profile().warmup_commands(), vec!["uci"]);
        assert_eq!(
            EngineKind::Critter.profile().warmup_commands(),
            vec![
                "uci",
                "isready",
                "setoption name Hash value 512",
                "setoption name UCI_LimitStrength value true",
            ]
        );
    }

    #[test]
    fn test_only_houdini_wants_new_game() {
        for kind in EngineKind::ALL {
            assert_eq!(
                kind.profile().quirks.new_game_command,
                kind == EngineKind::Houdini
            );
        }
    }

    #[test]
    fn test_executable_path() {
        let dir = Path::new("engines");
        let custom = EngineKind::Custom.profile();
        assert_eq!(
            custom.executable_path(dir, Some(Path::new("/opt/my-engine"))),
            PathBuf::from("/opt/my-engine")
        );
        let name = custom.executable_path(dir, None);
        assert!(name.starts_with("engines"));
        assert!(name.to_string_lossy().contains("Custom"));

        let houdini = EngineKind::Houdini.profile().file_name();
        assert!(houdini.starts_with("Houdini_x"));
    }

    #[test]
    fn test_fallback_order() {
        assert_eq!(
            EngineKind::Custom.fallback_order(),
            vec![
                EngineKind::Custom,
                EngineKind::Houdini,
                EngineKind::Critter,
                EngineKind::Stockfish
            ]
        );
    }
}
