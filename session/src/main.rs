//! Etherboard: chess against a UCI engine in the terminal.
//!
//! Settings come from `ETHERBOARD_*` environment variables (see
//! [`etherboard::config`]); any flag given here overrides them.

mod console;

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use chess::GameplayMode;
use clap::Parser;
use engine::{Difficulty, EngineKind};
use etherboard::config::clamp_poll_interval;
use etherboard::{GameSession, SaveStore, Settings};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "etherboard", about = "Play chess against a UCI engine in the terminal")]
struct Cli {
    /// Engine to launch: houdini, critter, custom, stockfish or 0-3.
    #[arg(long)]
    engine: Option<EngineKind>,

    /// Executable used by the custom engine.
    #[arg(long)]
    custom_engine: Option<PathBuf>,

    /// Directory holding the bundled engine executables.
    #[arg(long)]
    engines_dir: Option<PathBuf>,

    /// Engine strength: child, lion, walrus, raptor, grandmaster or 0-4.
    #[arg(long)]
    level: Option<Difficulty>,

    /// Directory for saved games.
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Starting clock for each side, in milliseconds.
    #[arg(long)]
    time_ms: Option<u64>,

    /// Engine polling period in milliseconds, clamped to 100-500.
    #[arg(long)]
    poll_ms: Option<u64>,

    /// Ask the engine to stop a search that runs longer than this.
    #[arg(long)]
    search_timeout_ms: Option<u64>,

    /// Fail instead of trying the other engines when the requested one
    /// does not start.
    #[arg(long)]
    no_fallback: bool,

    /// Two players share the board; no engine is started.
    #[arg(long, conflicts_with = "free_move")]
    two_player: bool,

    /// Any piece may move anywhere.
    #[arg(long)]
    free_move: bool,

    /// Draw the board from Black's side.
    #[arg(long)]
    flip: bool,

    /// Write logs to this file instead of stderr.
    #[arg(long)]
    log_file: Option<PathBuf>,
}

impl Cli {
    fn apply(&self, settings: &mut Settings) {
        if let Some(kind) = self.engine {
            settings.engine.kind = kind;
        }
        if let Some(path) = &self.custom_engine {
            settings.engine.custom_path = Some(path.clone());
        }
        if let Some(dir) = &self.engines_dir {
            settings.engine.engines_dir = dir.clone();
        }
        if let Some(level) = self.level {
            settings.difficulty = level;
        }
        if let Some(dir) = &self.data_dir {
            settings.data_dir = dir.clone();
        }
        if let Some(ms) = self.time_ms {
            settings.time_ms = ms;
        }
        if let Some(ms) = self.poll_ms {
            settings.engine.poll_interval = clamp_poll_interval(ms);
        }
        if let Some(ms) = self.search_timeout_ms {
            settings.engine.search_timeout = Some(Duration::from_millis(ms));
        }
        if self.no_fallback {
            settings.engine.fallback = false;
        }
        settings.mode = if self.two_player {
            GameplayMode::TwoPlayer
        } else if self.free_move {
            GameplayMode::FreeMove
        } else {
            GameplayMode::Normal
        };
    }
}

/// Install the global subscriber. With a log file, logs go through a
/// non-blocking writer whose guard must live until exit.
fn init_tracing(log_file: Option<&Path>) -> anyhow::Result<Option<WorkerGuard>> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let Some(path) = log_file else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_span_events(FmtSpan::CLOSE)
            .with_writer(std::io::stderr)
            .init();
        return Ok(None);
    };

    let file_name = path
        .file_name()
        .with_context(|| format!("log file {} has no file name", path.display()))?;
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    std::fs::create_dir_all(dir)
        .with_context(|| format!("could not create log directory {}", dir.display()))?;

    let (writer, guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::never(dir, file_name));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_span_events(FmtSpan::CLOSE)
        .with_writer(writer)
        .with_ansi(false)
        .init();
    Ok(Some(guard))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let _guard = init_tracing(cli.log_file.as_deref())?;

    let mut settings = Settings::from_env();
    cli.apply(&mut settings);

    tracing::info!("Starting Etherboard");
    tracing::info!("Using data directory: {}", settings.data_dir.display());

    let saves = SaveStore::new(settings.saves_dir());
    let handle = GameSession::spawn(settings)
        .await
        .context("could not start the game (try --two-player to play without an engine)")?;

    let result = console::run(&handle, &saves, cli.flip).await;
    handle.shutdown().await;

    tracing::info!("Etherboard shutting down");
    result
}
