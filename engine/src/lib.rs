pub mod difficulty;
pub mod driver;
pub mod history;
pub mod process;
pub mod profile;
pub mod session;
pub mod uci;

use std::path::PathBuf;

pub use difficulty::{Difficulty, ParseDifficultyError};
pub use driver::{DriverEvent, DriverPhase, EngineMoveRequest, EngineTransport, UciDriver};
pub use history::{HistoryError, PositionHistory, MAX_POSITION_LEN, POSITION_PREFIX};
pub use process::EngineProcess;
pub use profile::{EngineKind, EngineProfile, EngineQuirks, ParseEngineKindError};
pub use session::{EngineSession, EngineSettings};
pub use uci::{UciError, UciMessage};

/// Errors from launching and talking to an engine process
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("Failed to launch engine {}: {source}", .path.display())]
    Launch {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("No engine could be started (tried {0:?})")]
    NoEngineFound(Vec<PathBuf>),
    #[error("Engine process died")]
    ProcessDied,
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Engine task is no longer running")]
    ChannelClosed,
    #[error(transparent)]
    History(#[from] HistoryError),
}
