//! The game controller: one actor task per game owning the board, the clocks
//! and the engine, driven through a cloneable [`SessionHandle`].

mod actor;
mod commands;
mod events;
mod handle;
mod snapshot;
mod state;

use engine::EngineSession;
use tokio::sync::{broadcast, mpsc};

use crate::config::Settings;
use actor::run_session_actor;
pub use commands::SessionError;
pub use events::SessionEvent;
pub use handle::SessionHandle;
pub use snapshot::{SessionSnapshot, TimerSnapshot};
use state::SessionState;

pub struct GameSession;

impl GameSession {
    /// Start a game. Games against the engine launch it first and fail if no
    /// engine can be started.
    #[tracing::instrument(level = "info", skip_all, fields(mode = ?settings.mode))]
    pub async fn spawn(settings: Settings) -> Result<SessionHandle, SessionError> {
        let engine = if settings.mode.uses_engine() {
            Some(EngineSession::start(settings.engine.clone()).await?)
        } else {
            None
        };
        Ok(Self::spawn_with_engine(&settings, engine))
    }

    fn spawn_with_engine(settings: &Settings, engine: Option<EngineSession>) -> SessionHandle {
        let (cmd_tx, cmd_rx) = mpsc::channel(32);
        let (event_tx, _) = broadcast::channel(100);

        let state = SessionState::new(settings, engine);
        tokio::spawn(run_session_actor(state, cmd_rx, event_tx));

        SessionHandle::new(cmd_tx)
    }
}
