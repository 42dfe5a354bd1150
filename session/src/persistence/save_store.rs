use std::path::{Path, PathBuf};

use chess::{Board, BoardParts, Cells, PieceColor, Square, CAPTURE_SLOTS};
use engine::PositionHistory;
use serde::{Deserialize, Serialize};

use super::PersistenceError;

/// Marker every save file starts with.
pub const SAVE_MAGIC: &str = "_|ETHEREAL|_";

/// Slot name used by quick-save and quick-load.
pub const QUICK_SAVE_SLOT: &str = "quick-save";

/// A game as the session holds it, validated and ready to play.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedGame {
    pub board: Board,
    pub white_time_ms: u64,
    pub black_time_ms: u64,
    pub player_color: PieceColor,
    pub history: PositionHistory,
}

/// On-disk form of a saved game.
///
/// Squares are stored as `[rank, file]` pairs; `[0, 0]` means no square.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveRecord {
    pub magic: String,
    pub board: Vec<Vec<i8>>,
    pub captures: Vec<u32>,
    pub last_move_from: [u8; 2],
    pub last_move_to: [u8; 2],
    pub white_king: [u8; 2],
    pub black_king: [u8; 2],
    pub white_time_ms: u64,
    pub black_time_ms: u64,
    pub turn: PieceColor,
    pub player_color: PieceColor,
    pub white_castle: bool,
    pub black_castle: bool,
    pub white_in_check: bool,
    pub black_in_check: bool,
    pub position: String,
}

const NO_SQUARE: [u8; 2] = [0, 0];

fn pair(sq: Square) -> [u8; 2] {
    [sq.rank(), sq.file()]
}

fn square(raw: [u8; 2], what: &str) -> Result<Square, PersistenceError> {
    Square::new(raw[0], raw[1])
        .ok_or_else(|| PersistenceError::Corrupt(format!("{what} is not a square: {raw:?}")))
}

impl SaveRecord {
    pub fn from_game(game: &SavedGame) -> Self {
        let parts = game.board.to_parts();
        let (last_move_from, last_move_to) = parts
            .last_move
            .map_or((NO_SQUARE, NO_SQUARE), |(from, to)| (pair(from), pair(to)));

        Self {
            magic: SAVE_MAGIC.to_string(),
            board: parts.cells.iter().map(|row| row.to_vec()).collect(),
            captures: parts.captures.to_vec(),
            last_move_from,
            last_move_to,
            white_king: pair(parts.white_king),
            black_king: pair(parts.black_king),
            white_time_ms: game.white_time_ms,
            black_time_ms: game.black_time_ms,
            turn: parts.turn,
            player_color: game.player_color,
            white_castle: parts.white_castle,
            black_castle: parts.black_castle,
            white_in_check: parts.white_in_check,
            black_in_check: parts.black_in_check,
            position: game.history.as_command().to_string(),
        }
    }

    /// Validate the record and rebuild the game it describes.
    pub fn into_game(self) -> Result<SavedGame, PersistenceError> {
        if self.magic != SAVE_MAGIC {
            return Err(PersistenceError::BadMagic);
        }

        if self.board.len() != 10 {
            return Err(PersistenceError::Corrupt(format!(
                "board has {} rows, expected 10",
                self.board.len()
            )));
        }
        let mut cells: Cells = [[0; 10]; 10];
        for (rank, (dst, src)) in cells.iter_mut().zip(&self.board).enumerate() {
            if src.len() != 10 {
                return Err(PersistenceError::Corrupt(format!(
                    "board row {rank} has {} cells, expected 10",
                    src.len()
                )));
            }
            dst.copy_from_slice(src);
        }

        let captures: [u32; CAPTURE_SLOTS] =
            self.captures.as_slice().try_into().map_err(|_| {
                PersistenceError::Corrupt(format!(
                    "{} capture slots, expected {CAPTURE_SLOTS}",
                    self.captures.len()
                ))
            })?;

        let last_move = match (self.last_move_from, self.last_move_to) {
            (NO_SQUARE, NO_SQUARE) => None,
            (from, to) => Some((square(from, "last move origin")?, square(to, "last move target")?)),
        };

        let board = Board::from_parts(BoardParts {
            cells,
            captures,
            white_king: square(self.white_king, "white king")?,
            black_king: square(self.black_king, "black king")?,
            white_castle: self.white_castle,
            black_castle: self.black_castle,
            white_in_check: self.white_in_check,
            black_in_check: self.black_in_check,
            turn: self.turn,
            last_move,
        })
        .map_err(|e| PersistenceError::Corrupt(e.to_string()))?;

        let history = PositionHistory::from_command(&self.position)
            .map_err(|e| PersistenceError::Corrupt(e.to_string()))?;

        Ok(SavedGame {
            board,
            white_time_ms: self.white_time_ms,
            black_time_ms: self.black_time_ms,
            player_color: self.player_color,
            history,
        })
    }
}

/// Write a save file, creating its directory if needed.
pub fn write_save(path: &Path, record: &SaveRecord) -> Result<(), PersistenceError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(record)?;
    std::fs::write(path, json)?;
    Ok(())
}

pub fn read_save(path: &Path) -> Result<SaveRecord, PersistenceError> {
    let contents = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&contents)?)
}

/// Named save slots, one JSON file each.
#[derive(Debug, Clone)]
pub struct SaveStore {
    dir: PathBuf,
}

impl SaveStore {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn slot_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}.json", name))
    }

    pub fn quick_slot_path(&self) -> PathBuf {
        self.slot_path(QUICK_SAVE_SLOT)
    }

    /// Save into a named slot. Returns the file written.
    pub fn save(&self, name: &str, record: &SaveRecord) -> Result<PathBuf, PersistenceError> {
        let path = self.slot_path(name);
        write_save(&path, record)?;
        Ok(path)
    }

    /// Load a named slot. Returns None if it was never written.
    pub fn load(&self, name: &str) -> Result<Option<SaveRecord>, PersistenceError> {
        let path = self.slot_path(name);
        if !path.exists() {
            return Ok(None);
        }
        read_save(&path).map(Some)
    }

    /// Names of all slots on disk, sorted.
    pub fn list(&self) -> Result<Vec<String>, PersistenceError> {
        if !self.dir.exists() {
            return Ok(vec![]);
        }
        let mut names = Vec::new();
        for entry in std::fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) == Some("json") {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    names.push(stem.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chess::GameplayMode;

    fn sq(name: &str) -> Square {
        let b = name.as_bytes();
        Square::new(b[1] - b'0', b[0] - b'a' + 1).unwrap()
    }

    fn played_game() -> SavedGame {
        let mut board = Board::new();
        let mut history = PositionHistory::new();
        for token in ["e2e4", "d7d5", "e4d5"] {
            let (from, to) = chess::decode(token).unwrap();
            board.try_move(from, to, GameplayMode::Normal).unwrap();
            history.push(token).unwrap();
        }
        SavedGame {
            board,
            white_time_ms: 590_000,
            black_time_ms: 595_500,
            player_color: PieceColor::White,
            history,
        }
    }

    #[test]
    fn test_round_trip_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let store = SaveStore::new(dir.path().join("saves"));
        let game = played_game();

        let path = store.save("opening", &SaveRecord::from_game(&game)).unwrap();
        assert_eq!(path, store.slot_path("opening"));

        let restored = store.load("opening").unwrap().unwrap().into_game().unwrap();
        assert_eq!(restored, game);
        assert_eq!(restored.board.last_move(), Some((sq("e4"), sq("d5"))));
        assert_eq!(restored.history.ply_count(), 3);
    }

    #[test]
    fn test_file_layout() {
        let record = SaveRecord::from_game(&played_game());
        let json: serde_json::Value = serde_json::to_value(&record).unwrap();
        assert_eq!(json["magic"], SAVE_MAGIC);
        assert_eq!(json["turn"], "black");
        assert_eq!(json["board"].as_array().unwrap().len(), 10);
        assert_eq!(json["captures"].as_array().unwrap().len(), CAPTURE_SLOTS);
        assert_eq!(json["last_move_to"], serde_json::json!([5, 4]));
        assert_eq!(json["white_king"], serde_json::json!([1, 5]));
        assert_eq!(json["position"], "position startpos moves e2e4 d7d5 e4d5 ");
    }

    #[test]
    fn test_fresh_board_has_no_last_move() {
        let game = SavedGame {
            board: Board::new(),
            white_time_ms: 1,
            black_time_ms: 1,
            player_color: PieceColor::White,
            history: PositionHistory::new(),
        };
        let record = SaveRecord::from_game(&game);
        assert_eq!(record.last_move_from, NO_SQUARE);
        assert_eq!(record.into_game().unwrap().board.last_move(), None);
    }

    #[test]
    fn test_bad_magic() {
        let mut record = SaveRecord::from_game(&played_game());
        record.magic = "_|SOMETHING|_".to_string();
        assert!(matches!(record.into_game(), Err(PersistenceError::BadMagic)));
    }

    #[test]
    fn test_corrupt_records() {
        let good = SaveRecord::from_game(&played_game());

        let mut short = good.clone();
        short.board.pop();
        assert!(matches!(short.into_game(), Err(PersistenceError::Corrupt(_))));

        let mut border = good.clone();
        border.board[0][3] = 0;
        assert!(matches!(border.into_game(), Err(PersistenceError::Corrupt(_))));

        let mut king = good.clone();
        king.white_king = [2, 5];
        assert!(matches!(king.into_game(), Err(PersistenceError::Corrupt(_))));

        let mut position = good.clone();
        position.position = "position fen 8/8 moves".to_string();
        assert!(matches!(position.into_game(), Err(PersistenceError::Corrupt(_))));

        let mut captures = good;
        captures.captures.truncate(3);
        assert!(matches!(captures.into_game(), Err(PersistenceError::Corrupt(_))));
    }

    #[test]
    fn test_missing_slot_and_listing() {
        let dir = tempfile::tempdir().unwrap();
        let store = SaveStore::new(dir.path().to_path_buf());
        assert!(store.load("nothing").unwrap().is_none());
        assert!(store.list().unwrap().is_empty());

        let record = SaveRecord::from_game(&played_game());
        store.save("b-game", &record).unwrap();
        store.save(QUICK_SAVE_SLOT, &record).unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        assert_eq!(store.list().unwrap(), vec!["b-game", QUICK_SAVE_SLOT]);
        assert!(store.quick_slot_path().ends_with("quick-save.json"));
    }

    #[test]
    fn test_garbage_file_is_a_json_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("junk.json");
        std::fs::write(&path, "not json").unwrap();
        assert!(matches!(read_save(&path), Err(PersistenceError::Json(_))));
    }
}
