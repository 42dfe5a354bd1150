//! Full games against a scripted engine process.
#![cfg(unix)]

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chess::{decode, GameplayMode, Piece, PieceColor, PieceKind, Square};
use engine::{EngineKind, EngineSettings};
use etherboard::{GameSession, SessionError, SessionEvent, SessionHandle, SessionSnapshot, Settings};
use tokio::sync::broadcast;

const FAKE_ENGINE: &str = r#"#!/bin/sh
while IFS= read -r line; do
  case "$line" in
    uci) echo "id name FakeFish"; echo "uciok" ;;
    isready) echo "readyok" ;;
    go*) echo "info depth 1 score cp 10"; echo "bestmove e7e5 ponder g1f3" ;;
    quit) exit 0 ;;
  esac
done
"#;

/// Answers `d7d5` to queen's pawn openings and `e7e5` to everything else.
const POSITIONAL_ENGINE: &str = r#"#!/bin/sh
position=""
while IFS= read -r line; do
  case "$line" in
    uci) echo "uciok" ;;
    isready) echo "readyok" ;;
    position*) position="$line" ;;
    go*)
      case "$position" in
        *d2d4*) echo "bestmove d7d5" ;;
        *) echo "bestmove e7e5" ;;
      esac ;;
    quit) exit 0 ;;
  esac
done
"#;

/// Always plays a pawn jump our rules refuse.
const STUBBORN_ENGINE: &str = r#"#!/bin/sh
while IFS= read -r line; do
  case "$line" in
    uci) echo "uciok" ;;
    isready) echo "readyok" ;;
    go*) echo "bestmove e7e4" ;;
    quit) exit 0 ;;
  esac
done
"#;

const CRASHING_ENGINE: &str = "#!/bin/sh\nexit 3\n";

fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, body).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

fn settings(dir: &Path, engine: PathBuf) -> Settings {
    Settings {
        data_dir: dir.join("data"),
        engine: EngineSettings {
            kind: EngineKind::Custom,
            engines_dir: dir.to_path_buf(),
            custom_path: Some(engine),
            poll_interval: Duration::from_millis(100),
            search_timeout: None,
            fallback: false,
        },
        mode: GameplayMode::Normal,
        ..Settings::default()
    }
}

fn mv(token: &str) -> (Square, Square) {
    decode(token).unwrap()
}

async fn wait_for(
    events: &mut broadcast::Receiver<SessionEvent>,
    mut done: impl FnMut(&SessionSnapshot) -> bool,
) -> SessionSnapshot {
    tokio::time::timeout(Duration::from_secs(10), async {
        loop {
            if let Ok(SessionEvent::StateChanged(snap)) = events.recv().await {
                if done(&snap) {
                    return snap;
                }
            }
        }
    })
    .await
    .expect("session did not reach the expected state")
}

/// The first position where the engine has just moved. Snapshots of a
/// fresh game have no last move and are skipped.
async fn wait_for_reply(events: &mut broadcast::Receiver<SessionEvent>) -> SessionSnapshot {
    wait_for(events, |s| s.turn == PieceColor::White && s.last_move.is_some()).await
}

async fn wait_for_fatal(events: &mut broadcast::Receiver<SessionEvent>) -> String {
    tokio::time::timeout(Duration::from_secs(10), async {
        loop {
            if let Ok(SessionEvent::Fatal(message)) = events.recv().await {
                return message;
            }
        }
    })
    .await
    .expect("the engine game never ended")
}

async fn start(dir: &Path) -> SessionHandle {
    start_with(dir, FAKE_ENGINE).await
}

async fn start_with(dir: &Path, script: &str) -> SessionHandle {
    let engine = write_script(dir, "engine", script);
    GameSession::spawn(settings(dir, engine)).await.unwrap()
}

fn square(name: &str) -> Square {
    decode(&format!("{name}a1")).unwrap().0
}

#[tokio::test]
async fn engine_answers_the_first_move() {
    let dir = tempfile::tempdir().unwrap();
    let handle = start(dir.path()).await;
    let (initial, mut events) = handle.subscribe().await.unwrap();
    assert_eq!(initial.engine, Some(EngineKind::Custom));

    let (from, to) = mv("e2e4");
    let snap = handle.make_move(from, to).await.unwrap();
    assert!(snap.engine_thinking);
    assert_eq!(snap.turn, PieceColor::Black);

    // A second human move has to wait for the engine.
    let (from, to) = mv("d2d4");
    assert!(matches!(
        handle.make_move(from, to).await,
        Err(SessionError::EngineTurn)
    ));

    let answered = wait_for_reply(&mut events).await;
    assert_eq!(answered.history, "position startpos moves e2e4 e7e5 ");
    assert_eq!(answered.last_move, Some(mv("e7e5")));
    assert!(!answered.engine_thinking);

    handle.shutdown().await;
}

#[tokio::test]
async fn animation_holds_back_the_engine_reply() {
    let dir = tempfile::tempdir().unwrap();
    let handle = start(dir.path()).await;
    let (_, mut events) = handle.subscribe().await.unwrap();

    handle.set_animating(true).await.unwrap();
    let (from, to) = mv("e2e4");
    handle.make_move(from, to).await.unwrap();

    tokio::time::sleep(Duration::from_millis(1500)).await;
    let held = handle.snapshot().await.unwrap();
    assert_eq!(held.turn, PieceColor::Black);
    assert_eq!(held.history, "position startpos moves e2e4 ");

    handle.set_animating(false).await.unwrap();
    let answered = wait_for_reply(&mut events).await;
    assert_eq!(answered.history, "position startpos moves e2e4 e7e5 ");

    handle.shutdown().await;
}

#[tokio::test]
async fn loading_on_the_engine_turn_asks_the_engine_again() {
    let dir = tempfile::tempdir().unwrap();
    let handle = start(dir.path()).await;
    let (_, mut events) = handle.subscribe().await.unwrap();

    handle.set_animating(true).await.unwrap();
    let (from, to) = mv("e2e4");
    handle.make_move(from, to).await.unwrap();
    handle.quick_save().await.unwrap();
    handle.new_game().await.unwrap();

    let loaded = handle.quick_load().await.unwrap();
    assert_eq!(loaded.turn, PieceColor::Black);
    assert!(loaded.engine_thinking);

    handle.set_animating(false).await.unwrap();
    let answered = wait_for_reply(&mut events).await;
    assert_eq!(answered.history, "position startpos moves e2e4 e7e5 ");

    handle.shutdown().await;
}

#[tokio::test]
async fn new_game_ignores_the_old_games_reply() {
    let dir = tempfile::tempdir().unwrap();
    let handle = start_with(dir.path(), POSITIONAL_ENGINE).await;
    let (_, mut events) = handle.subscribe().await.unwrap();

    // The e2e4 answer is ready but held back when the new game starts.
    handle.set_animating(true).await.unwrap();
    let (from, to) = mv("e2e4");
    handle.make_move(from, to).await.unwrap();
    tokio::time::sleep(Duration::from_millis(1500)).await;

    handle.new_game().await.unwrap();
    let (from, to) = mv("d2d4");
    handle.make_move(from, to).await.unwrap();
    handle.set_animating(false).await.unwrap();

    let answered = wait_for_reply(&mut events).await;
    assert_eq!(answered.history, "position startpos moves d2d4 d7d5 ");
    assert_eq!(
        answered.board.piece_at(square("d5")),
        Some(Piece::new(PieceKind::Pawn, PieceColor::Black))
    );
    assert!(answered.board.is_empty_at(square("e5")));
    assert!(answered.board.piece_at(square("e7")).is_some());

    handle.shutdown().await;
}

#[tokio::test]
async fn load_ignores_the_old_games_reply() {
    let dir = tempfile::tempdir().unwrap();
    let handle = start_with(dir.path(), POSITIONAL_ENGINE).await;
    let (_, mut events) = handle.subscribe().await.unwrap();

    // Save a queen's pawn game on the engine's turn.
    handle.set_animating(true).await.unwrap();
    let (from, to) = mv("d2d4");
    handle.make_move(from, to).await.unwrap();
    handle.quick_save().await.unwrap();

    handle.new_game().await.unwrap();
    let (from, to) = mv("e2e4");
    handle.make_move(from, to).await.unwrap();
    tokio::time::sleep(Duration::from_millis(1500)).await;

    handle.quick_load().await.unwrap();
    handle.set_animating(false).await.unwrap();

    let answered = wait_for_reply(&mut events).await;
    assert_eq!(answered.history, "position startpos moves d2d4 d7d5 ");
    assert!(answered.board.is_empty_at(square("e4")));
    assert!(answered.board.is_empty_at(square("e5")));

    handle.shutdown().await;
}

#[tokio::test]
async fn rejected_engine_move_ends_the_engine_game() {
    let dir = tempfile::tempdir().unwrap();
    let handle = start_with(dir.path(), STUBBORN_ENGINE).await;
    let (_, mut events) = handle.subscribe().await.unwrap();

    let (from, to) = mv("e2e4");
    handle.make_move(from, to).await.unwrap();

    let message = wait_for_fatal(&mut events).await;
    assert!(message.contains("e7e4"), "{message}");

    let snap = handle.snapshot().await.unwrap();
    assert_eq!(snap.engine, None);
    assert!(!snap.engine_thinking);
    assert_eq!(snap.status_text, "engine stopped");
    assert_eq!(snap.history, "position startpos moves e2e4 ");

    let (from, to) = mv("d2d4");
    assert!(matches!(
        handle.make_move(from, to).await,
        Err(SessionError::EngineStopped)
    ));
}

#[tokio::test]
async fn full_history_ends_the_engine_game() {
    let dir = tempfile::tempdir().unwrap();
    let handle = start(dir.path()).await;
    let (_, mut events) = handle.subscribe().await.unwrap();

    // A saved game whose history has no room for another ply.
    let path = handle.quick_save().await.unwrap();
    let mut json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    json["position"] = format!("position startpos moves {}", "g1f3 ".repeat(814)).into();
    std::fs::write(&path, json.to_string()).unwrap();
    handle.quick_load().await.unwrap();

    let (from, to) = mv("e2e4");
    handle.make_move(from, to).await.unwrap();

    let message = wait_for_fatal(&mut events).await;
    assert_eq!(message, "move history is full");

    let snap = handle.snapshot().await.unwrap();
    assert_eq!(snap.engine, None);
    assert!(!snap.engine_thinking);
    assert_eq!(snap.status_text, "engine stopped");
    assert_eq!(snap.turn, PieceColor::Black);
}

#[tokio::test]
async fn engine_death_ends_the_engine_game() {
    let dir = tempfile::tempdir().unwrap();
    let engine = write_script(dir.path(), "crashfish", CRASHING_ENGINE);
    let handle = GameSession::spawn(settings(dir.path(), engine)).await.unwrap();

    let stopped = tokio::time::timeout(Duration::from_secs(10), async {
        loop {
            let snap = handle.snapshot().await.unwrap();
            if snap.engine.is_none() {
                return snap;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    })
    .await
    .expect("engine death was never noticed");
    assert_eq!(stopped.status_text, "engine stopped");

    let (from, to) = mv("e2e4");
    assert!(matches!(
        handle.make_move(from, to).await,
        Err(SessionError::EngineStopped)
    ));
}

#[tokio::test]
async fn missing_engine_fails_to_start() {
    let dir = tempfile::tempdir().unwrap();
    let result = GameSession::spawn(settings(dir.path(), dir.path().join("nope"))).await;
    assert!(matches!(result, Err(SessionError::Engine(_))));
}

#[tokio::test]
async fn two_player_games_need_no_engine() {
    let dir = tempfile::tempdir().unwrap();
    let mut settings = settings(dir.path(), dir.path().join("nope"));
    settings.mode = GameplayMode::TwoPlayer;
    let handle = GameSession::spawn(settings).await.unwrap();

    let (from, to) = mv("e2e4");
    handle.make_move(from, to).await.unwrap();
    let (from, to) = mv("e7e5");
    let snap = handle.make_move(from, to).await.unwrap();
    assert_eq!(snap.engine, None);
    assert_eq!(snap.history, "position startpos moves e2e4 e7e5 ");
}
