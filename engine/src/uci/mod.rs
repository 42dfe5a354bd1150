pub mod parser;

pub use parser::{find_bestmove, parse_uci_message, EngineInfo, Score, UciMessage};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UciError {
    #[error("Malformed engine reply: {0}")]
    MalformedReply(String),
    #[error("Unknown UCI message: {0}")]
    UnknownMessage(String),
}
