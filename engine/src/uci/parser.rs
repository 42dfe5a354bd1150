use chess::UciMove;

use super::UciError;

/// Offset of the move token from the start of `bestmove`.
const BESTMOVE_OFFSET: usize = "bestmove ".len();
const TOKEN_LEN: usize = 4;

/// Incoming message from a UCI engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UciMessage {
    Id { name: String, value: String },
    UciOk,
    ReadyOk,
    BestMove(UciMove),
    Info(EngineInfo),
}

/// The parts of an `info` line worth logging.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineInfo {
    pub depth: Option<u32>,
    pub nodes: Option<u64>,
    pub score: Option<Score>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Score {
    Centipawns(i32),
    Mate(i32), // Negative for being mated
}

/// Look for a `bestmove` reply anywhere in a line.
///
/// Returns `None` when the line has no `bestmove`. The token is the four
/// characters nine bytes after the match; a fifth letter naming a promotion
/// piece is kept as a queen promotion.
pub fn find_bestmove(line: &str) -> Option<Result<UciMove, UciError>> {
    let start = line.find("bestmove")? + BESTMOVE_OFFSET;
    let malformed = || UciError::MalformedReply(line.trim().to_string());

    let Some(token) = line.get(start..start + TOKEN_LEN) else {
        return Some(Err(malformed()));
    };
    let (from, to) = match chess::decode(token) {
        Ok(squares) => squares,
        Err(_) => return Some(Err(malformed())),
    };
    let promotion = line[start + TOKEN_LEN..]
        .chars()
        .next()
        .is_some_and(|c| matches!(c, 'q' | 'r' | 'b' | 'n'));

    Some(Ok(UciMove {
        from,
        to,
        promotion,
    }))
}

/// Classify one line of engine output.
pub fn parse_uci_message(line: &str) -> Result<UciMessage, UciError> {
    let tokens: Vec<&str> = line.split_whitespace().collect();

    match tokens.first() {
        Some(&"uciok") => Ok(UciMessage::UciOk),
        Some(&"readyok") => Ok(UciMessage::ReadyOk),

        Some(&"id") => {
            let [_, name, value @ ..] = tokens.as_slice() else {
                return Err(UciError::MalformedReply(line.to_string()));
            };
            if value.is_empty() {
                return Err(UciError::MalformedReply(line.to_string()));
            }
            Ok(UciMessage::Id {
                name: name.to_string(),
                value: value.join(" "),
            })
        }

        Some(&"bestmove") => match find_bestmove(line) {
            Some(Ok(mv)) => Ok(UciMessage::BestMove(mv)),
            _ => Err(UciError::MalformedReply(line.to_string())),
        },

        Some(&"info") => Ok(UciMessage::Info(parse_info_line(&tokens[1..]))),

        _ => Err(UciError::UnknownMessage(line.to_string())),
    }
}

/// Pick depth, nodes and score out of the tokens after `info`.
fn parse_info_line(tokens: &[&str]) -> EngineInfo {
    let mut info = EngineInfo::default();
    let mut rest = tokens.iter().copied();

    while let Some(key) = rest.next() {
        match key {
            "depth" => info.depth = rest.next().and_then(|v| v.parse().ok()),
            "nodes" => info.nodes = rest.next().and_then(|v| v.parse().ok()),
            "score" => {
                info.score = match (rest.next(), rest.next().map(str::parse::<i32>)) {
                    (Some("cp"), Some(Ok(cp))) => Some(Score::Centipawns(cp)),
                    (Some("mate"), Some(Ok(plies))) => Some(Score::Mate(plies)),
                    _ => None,
                };
            }
            // Free text runs to the end of the line.
            "string" => break,
            _ => {}
        }
    }

    info
}
