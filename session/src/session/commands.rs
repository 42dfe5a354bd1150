use std::path::PathBuf;

use chess::{MoveError, Square};
use engine::{Difficulty, EngineError};
use tokio::sync::{broadcast, oneshot};

use super::events::SessionEvent;
use super::snapshot::SessionSnapshot;
use crate::persistence::PersistenceError;

#[derive(Debug, Clone, thiserror::Error)]
pub enum SessionError {
    #[error("Illegal move: {0}")]
    IllegalMove(#[from] MoveError),
    #[error("Waiting for the engine to move")]
    EngineTurn,
    #[error("The engine has stopped")]
    EngineStopped,
    #[error("Engine error: {0}")]
    Engine(String),
    #[error("Save/load failed: {0}")]
    Persistence(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<EngineError> for SessionError {
    fn from(e: EngineError) -> Self {
        Self::Engine(e.to_string())
    }
}

impl From<PersistenceError> for SessionError {
    fn from(e: PersistenceError) -> Self {
        Self::Persistence(e.to_string())
    }
}

/// Commands sent to the session actor. Each embeds a oneshot for the reply.
/// Engine moves are requested by the actor itself after each human move.
pub enum SessionCommand {
    MakeMove {
        from: Square,
        to: Square,
        reply: oneshot::Sender<Result<SessionSnapshot, SessionError>>,
    },
    NewGame {
        reply: oneshot::Sender<Result<SessionSnapshot, SessionError>>,
    },
    Save {
        path: PathBuf,
        reply: oneshot::Sender<Result<PathBuf, SessionError>>,
    },
    Load {
        path: PathBuf,
        reply: oneshot::Sender<Result<SessionSnapshot, SessionError>>,
    },
    QuickSave {
        reply: oneshot::Sender<Result<PathBuf, SessionError>>,
    },
    QuickLoad {
        reply: oneshot::Sender<Result<SessionSnapshot, SessionError>>,
    },
    SetDifficulty {
        level: Difficulty,
        reply: oneshot::Sender<SessionSnapshot>,
    },
    SetAnimating {
        animating: bool,
        reply: oneshot::Sender<()>,
    },
    GetSnapshot {
        reply: oneshot::Sender<SessionSnapshot>,
    },
    Subscribe {
        reply: oneshot::Sender<(SessionSnapshot, broadcast::Receiver<SessionEvent>)>,
    },
    Shutdown,
}
