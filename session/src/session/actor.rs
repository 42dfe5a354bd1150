use std::path::{Path, PathBuf};
use std::time::Duration;

use chess::Square;
use engine::DriverEvent;
use tokio::sync::{broadcast, mpsc};
use tokio::time;
use tracing::Instrument;

use super::commands::{SessionCommand, SessionError};
use super::events::SessionEvent;
use super::snapshot::SessionSnapshot;
use super::state::SessionState;

const CLOCK_TICK: Duration = Duration::from_secs(1);

/// The main session actor loop.
/// Owns all mutable state. Processes commands and engine events sequentially.
pub(crate) async fn run_session_actor(
    state: SessionState,
    cmd_rx: mpsc::Receiver<SessionCommand>,
    event_tx: broadcast::Sender<SessionEvent>,
) {
    let span = tracing::info_span!(
        "session",
        mode = ?state.mode,
        engine = ?state.engine.as_ref().map(|e| e.kind()),
    );
    run_session_actor_inner(state, cmd_rx, event_tx)
        .instrument(span)
        .await;
}

async fn run_session_actor_inner(
    mut state: SessionState,
    mut cmd_rx: mpsc::Receiver<SessionCommand>,
    event_tx: broadcast::Sender<SessionEvent>,
) {
    tracing::info!("Session actor started");

    let mut clock = time::interval(CLOCK_TICK);
    clock.set_missed_tick_behavior(time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;

            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(SessionCommand::Shutdown) | None => {
                        tracing::info!("Session actor shutting down");
                        if let Some(engine) = state.engine.take() {
                            engine.shutdown().await;
                        }
                        break;
                    }
                    Some(cmd) => handle_command(&mut state, cmd, &event_tx).await,
                }
            }

            // Engine replies wait in the channel while the host animates.
            event = state.next_engine_event(), if !state.animating => {
                match event {
                    Some(event) => handle_engine_event(&mut state, event, &event_tx).await,
                    None => engine_lost(&mut state, &event_tx, "engine stopped").await,
                }
            }

            _ = clock.tick(), if state.clock_running() => {
                if state.tick_clock() {
                    let _ = event_tx.send(SessionEvent::StateChanged(state.snapshot()));
                }
            }
        }
    }

    tracing::info!("Session actor exited");
}

async fn handle_command(
    state: &mut SessionState,
    cmd: SessionCommand,
    event_tx: &broadcast::Sender<SessionEvent>,
) {
    match cmd {
        SessionCommand::MakeMove { from, to, reply } => {
            let result = make_move(state, from, to, event_tx).await;
            if let Ok(ref snap) = result {
                let _ = event_tx.send(SessionEvent::StateChanged(snap.clone()));
            }
            let _ = reply.send(result);
        }
        SessionCommand::NewGame { reply } => {
            let result = state.apply_new_game();
            if let Ok(ref snap) = result {
                let _ = event_tx.send(SessionEvent::StateChanged(snap.clone()));
            }
            let _ = reply.send(result);
        }
        SessionCommand::Save { path, reply } => {
            let _ = reply.send(save(state, path, event_tx));
        }
        SessionCommand::QuickSave { reply } => {
            let path = state.saves.quick_slot_path();
            let _ = reply.send(save(state, path, event_tx));
        }
        SessionCommand::Load { path, reply } => {
            let _ = reply.send(load(state, &path, event_tx).await);
        }
        SessionCommand::QuickLoad { reply } => {
            let path = state.saves.quick_slot_path();
            let _ = reply.send(load(state, &path, event_tx).await);
        }
        SessionCommand::SetDifficulty { level, reply } => {
            state.difficulty = level;
            state.status_text = format!("difficulty set to {level}");
            tracing::info!(%level, "Difficulty changed");
            let snap = state.snapshot();
            let _ = event_tx.send(SessionEvent::StateChanged(snap.clone()));
            let _ = reply.send(snap);
        }
        SessionCommand::SetAnimating { animating, reply } => {
            tracing::trace!(animating, "Animation gate");
            state.animating = animating;
            let _ = reply.send(());
        }
        SessionCommand::GetSnapshot { reply } => {
            let _ = reply.send(state.snapshot());
        }
        SessionCommand::Subscribe { reply } => {
            let snapshot = state.snapshot();
            let rx = event_tx.subscribe();
            let _ = reply.send((snapshot, rx));
        }
        // Handled by the actor loop before dispatch.
        SessionCommand::Shutdown => {}
    }
}

async fn make_move(
    state: &mut SessionState,
    from: Square,
    to: Square,
    event_tx: &broadcast::Sender<SessionEvent>,
) -> Result<SessionSnapshot, SessionError> {
    let outcome = state.apply_human_move(from, to)?;
    if let Err(e) = state.request_engine_reply(&outcome) {
        tracing::error!("Failed to request engine move: {}", e);
        engine_lost(state, event_tx, "engine stopped").await;
    }
    Ok(state.snapshot())
}

fn save(
    state: &mut SessionState,
    path: PathBuf,
    event_tx: &broadcast::Sender<SessionEvent>,
) -> Result<PathBuf, SessionError> {
    match state.save_to(&path) {
        Ok(()) => {
            let _ = event_tx.send(SessionEvent::StateChanged(state.snapshot()));
            Ok(path)
        }
        Err(e) => {
            tracing::warn!(path = %path.display(), "Save failed: {}", e);
            Err(e)
        }
    }
}

async fn load(
    state: &mut SessionState,
    path: &Path,
    event_tx: &broadcast::Sender<SessionEvent>,
) -> Result<SessionSnapshot, SessionError> {
    let game = SessionState::read_game(path).inspect_err(|e| {
        tracing::warn!(path = %path.display(), "Load failed: {}", e);
    })?;
    state.install_game(game, path).await?;
    let snap = state.snapshot();
    let _ = event_tx.send(SessionEvent::StateChanged(snap.clone()));
    Ok(snap)
}

async fn handle_engine_event(
    state: &mut SessionState,
    event: DriverEvent,
    event_tx: &broadcast::Sender<SessionEvent>,
) {
    match event {
        DriverEvent::EngineMove(mv) => {
            state.engine_thinking = false;

            // A reply can outlive the game it was asked for, e.g. after a flag.
            if state.status.is_over() || state.board.turn() == state.player_color {
                tracing::debug!("Discarding engine move {}", mv);
                return;
            }

            match state.apply_move(mv.from, mv.to) {
                Ok(_) => {
                    let _ = event_tx.send(SessionEvent::StateChanged(state.snapshot()));
                }
                // The engine's history already holds the move, so it cannot
                // go on playing this game.
                Err(e) => {
                    tracing::error!("Engine move {} rejected: {}", mv, e);
                    let reason = format!("engine move {mv} rejected: {e}");
                    engine_lost(state, event_tx, &reason).await;
                }
            }
        }
        DriverEvent::MalformedReply(line) => {
            tracing::warn!("Malformed engine reply: {}", line);
            let _ = event_tx.send(SessionEvent::Error(format!("Malformed engine reply: {line}")));
        }
        DriverEvent::SearchTimedOut => {
            tracing::warn!("Engine search timed out");
            let _ = event_tx.send(SessionEvent::Error("Engine search timed out".into()));
        }
        DriverEvent::HistoryFull(e) => {
            tracing::error!("{}", e);
            engine_lost(state, event_tx, "move history is full").await;
        }
        DriverEvent::Died => engine_lost(state, event_tx, "engine stopped").await,
    }
}

/// Drop the engine and tell subscribers the engine game is over.
async fn engine_lost(
    state: &mut SessionState,
    event_tx: &broadcast::Sender<SessionEvent>,
    reason: &str,
) {
    let Some(engine) = state.engine.take() else {
        return;
    };
    tracing::error!(kind = %engine.kind(), reason, "Engine stopped");
    engine.shutdown().await;
    state.engine_thinking = false;
    state.status_text = "engine stopped".to_string();
    let _ = event_tx.send(SessionEvent::Fatal(reason.to_string()));
    let _ = event_tx.send(SessionEvent::StateChanged(state.snapshot()));
}
