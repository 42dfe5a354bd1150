//! Configuration for Etherboard
//!
//! Every setting comes from an environment variable with a built-in default.
//! The binary's command line flags are applied on top of [`Settings::from_env`].
//!
//! Data directory precedence:
//! 1. ETHERBOARD_DATA_DIR environment variable
//! 2. ~/.config/etherboard/data (production default)
//! 3. ./data (fallback for development)

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use chess::GameplayMode;
use engine::session::{MAX_POLL_INTERVAL, MIN_POLL_INTERVAL};
use engine::{Difficulty, EngineKind, EngineSettings};

const DEFAULT_CONFIG_DIR: &str = ".config/etherboard/data";
const DEV_DATA_DIR: &str = "./data";
const DEFAULT_ENGINES_DIR: &str = "./engines";

/// Starting clock for each side.
pub const DEFAULT_TIME_MS: u64 = 600_000;

/// Get the data directory for saved games.
///
/// Priority:
/// 1. ETHERBOARD_DATA_DIR env variable if set
/// 2. $HOME/.config/etherboard/data if HOME is set
/// 3. ./data as fallback
pub fn get_data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("ETHERBOARD_DATA_DIR") {
        return PathBuf::from(dir);
    }

    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(DEFAULT_CONFIG_DIR);
    }

    PathBuf::from(DEV_DATA_DIR)
}

/// Directory holding the bundled engine executables.
pub fn get_engines_dir() -> PathBuf {
    std::env::var("ETHERBOARD_ENGINES_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_ENGINES_DIR))
}

pub fn get_engine_kind() -> EngineKind {
    parse_var("ETHERBOARD_ENGINE", std::env::var("ETHERBOARD_ENGINE").ok()).unwrap_or_default()
}

/// Executable used when the engine kind is `custom`.
pub fn get_custom_engine() -> Option<PathBuf> {
    std::env::var("ETHERBOARD_CUSTOM_ENGINE")
        .ok()
        .filter(|p| !p.is_empty())
        .map(PathBuf::from)
}

pub fn get_difficulty() -> Difficulty {
    parse_var("ETHERBOARD_LEVEL", std::env::var("ETHERBOARD_LEVEL").ok()).unwrap_or_default()
}

pub fn get_time_ms() -> u64 {
    parse_var("ETHERBOARD_TIME_MS", std::env::var("ETHERBOARD_TIME_MS").ok())
        .unwrap_or(DEFAULT_TIME_MS)
}

/// Engine polling period, clamped to what the engine session accepts.
pub fn get_poll_interval() -> Duration {
    let ms = parse_var("ETHERBOARD_POLL_MS", std::env::var("ETHERBOARD_POLL_MS").ok())
        .unwrap_or(250);
    clamp_poll_interval(ms)
}

pub fn clamp_poll_interval(ms: u64) -> Duration {
    Duration::from_millis(ms).clamp(MIN_POLL_INTERVAL, MAX_POLL_INTERVAL)
}

/// Parse an optional raw value, logging and ignoring anything unparseable.
fn parse_var<T>(name: &str, raw: Option<String>) -> Option<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw = raw?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!("Ignoring {}={:?}: {}", name, raw, e);
            None
        }
    }
}

/// Everything needed to start a game session.
#[derive(Debug, Clone)]
pub struct Settings {
    pub data_dir: PathBuf,
    pub engine: EngineSettings,
    pub difficulty: Difficulty,
    pub mode: GameplayMode,
    /// Starting clock for each side, in milliseconds.
    pub time_ms: u64,
}

impl Settings {
    pub fn from_env() -> Self {
        Self {
            data_dir: get_data_dir(),
            engine: EngineSettings {
                kind: get_engine_kind(),
                engines_dir: get_engines_dir(),
                custom_path: get_custom_engine(),
                poll_interval: get_poll_interval(),
                ..EngineSettings::default()
            },
            difficulty: get_difficulty(),
            mode: GameplayMode::default(),
            time_ms: get_time_ms(),
        }
    }

    /// Where named saves and the quick-save slot live.
    pub fn saves_dir(&self) -> PathBuf {
        self.data_dir.join("saves")
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEV_DATA_DIR),
            engine: EngineSettings::default(),
            difficulty: Difficulty::default(),
            mode: GameplayMode::default(),
            time_ms: DEFAULT_TIME_MS,
        }
    }
}
