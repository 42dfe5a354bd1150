use super::snapshot::SessionSnapshot;

/// Events broadcast from the session actor to all subscribers.
#[derive(Debug, Clone)]
#[allow(clippy::large_enum_variant)]
pub enum SessionEvent {
    /// Full state snapshot after any mutation.
    StateChanged(SessionSnapshot),
    /// Something went wrong but the game goes on.
    Error(String),
    /// The engine is gone; a game against it cannot continue.
    Fatal(String),
}
