pub mod config;
pub mod persistence;
pub mod session;

pub use config::Settings;
pub use persistence::{PersistenceError, SaveRecord, SaveStore, SavedGame};
pub use session::{
    GameSession, SessionError, SessionEvent, SessionHandle, SessionSnapshot, TimerSnapshot,
};
