mod save_store;

pub use save_store::{
    read_save, write_save, SaveRecord, SaveStore, SavedGame, QUICK_SAVE_SLOT, SAVE_MAGIC,
};

/// Errors from the persistence layer.
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Not an Etherboard save file")]
    BadMagic,
    #[error("Corrupt save file: {0}")]
    Corrupt(String),
}
