//! Line-oriented terminal front end for a game session.

use std::str::FromStr;

use chess::{decode, BoardDisplay, NotationError, Square};
use engine::{Difficulty, ParseDifficultyError};
use etherboard::{SaveStore, SessionEvent, SessionHandle, SessionSnapshot};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;

const HELP: &str = "\
moves:        e2e4, e7e8q
new           start a new game
save <name>   save to a named slot
load <name>   load a named slot
saves         list saved games
quick-save    save to the quick slot (qs)
quick-load    load the quick slot (ql)
level <name>  child, lion, walrus, raptor or grandmaster
board         print the board again
quit          leave";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Move(Square, Square),
    New,
    Save(String),
    Load(String),
    ListSaves,
    QuickSave,
    QuickLoad,
    Level(Difficulty),
    Board,
    Help,
    Quit,
}

#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("Unknown command '{0}', type 'help'")]
    Unknown(String),
    #[error("'{0}' needs a save name")]
    MissingName(&'static str),
    #[error("'level' needs a difficulty")]
    MissingLevel,
    #[error(transparent)]
    Notation(#[from] NotationError),
    #[error(transparent)]
    Level(#[from] ParseDifficultyError),
}

impl FromStr for Command {
    type Err = CommandError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let Some(word) = words.next() else {
            return Err(CommandError::Unknown(String::new()));
        };
        let arg = words.next();

        let name = |command: &'static str| {
            arg.map(str::to_string)
                .ok_or(CommandError::MissingName(command))
        };

        match word.to_ascii_lowercase().as_str() {
            "new" => Ok(Self::New),
            "save" => Ok(Self::Save(name("save")?)),
            "load" => Ok(Self::Load(name("load")?)),
            "saves" => Ok(Self::ListSaves),
            "quick-save" | "qs" => Ok(Self::QuickSave),
            "quick-load" | "ql" => Ok(Self::QuickLoad),
            "level" => Ok(Self::Level(arg.ok_or(CommandError::MissingLevel)?.parse()?)),
            "board" => Ok(Self::Board),
            "help" | "?" => Ok(Self::Help),
            "quit" | "exit" => Ok(Self::Quit),
            token if (4..=5).contains(&token.len()) => {
                let (from, to) = decode(token)?;
                Ok(Self::Move(from, to))
            }
            _ => Err(CommandError::Unknown(word.to_string())),
        }
    }
}

/// Read commands from stdin and print session events until the player quits
/// or stdin closes.
pub async fn run(handle: &SessionHandle, saves: &SaveStore, flip: bool) -> anyhow::Result<()> {
    let (snapshot, mut events) = handle.subscribe().await?;
    print_snapshot(&snapshot, flip);
    println!("Type 'help' for commands.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    break;
                };
                if line.trim().is_empty() {
                    continue;
                }
                match line.parse::<Command>() {
                    Ok(Command::Quit) => break,
                    Ok(command) => {
                        if let Err(e) = execute(handle, saves, command, flip).await {
                            println!("{e}");
                        }
                    }
                    Err(e) => println!("{e}"),
                }
            }

            event = events.recv() => {
                match event {
                    Ok(SessionEvent::StateChanged(snap)) => print_snapshot(&snap, flip),
                    Ok(SessionEvent::Error(message)) => println!("error: {message}"),
                    Ok(SessionEvent::Fatal(message)) => {
                        println!("fatal: {message}. Start a two-player game to keep playing.");
                    }
                    Err(RecvError::Lagged(n)) => tracing::warn!("Missed {} session events", n),
                    Err(RecvError::Closed) => break,
                }
            }
        }
    }

    Ok(())
}

/// Run one command. Board changes come back as `StateChanged` events, so only
/// replies without one are printed here.
async fn execute(
    handle: &SessionHandle,
    saves: &SaveStore,
    command: Command,
    flip: bool,
) -> anyhow::Result<()> {
    match command {
        Command::Move(from, to) => {
            handle.make_move(from, to).await?;
        }
        Command::New => {
            handle.new_game().await?;
        }
        Command::Save(name) => {
            let path = handle.save(saves.slot_path(&name)).await?;
            println!("saved {}", path.display());
        }
        Command::Load(name) => {
            handle.load(saves.slot_path(&name)).await?;
        }
        Command::ListSaves => {
            let names = saves.list()?;
            if names.is_empty() {
                println!("no saved games in {}", saves.dir().display());
            }
            for name in names {
                println!("  {name}");
            }
        }
        Command::QuickSave => {
            let path = handle.quick_save().await?;
            println!("saved {}", path.display());
        }
        Command::QuickLoad => {
            handle.quick_load().await?;
        }
        Command::Level(level) => {
            handle.set_difficulty(level).await?;
        }
        Command::Board => print_snapshot(&handle.snapshot().await?, flip),
        Command::Help => println!("{HELP}"),
        Command::Quit => {}
    }
    Ok(())
}

fn print_snapshot(snap: &SessionSnapshot, flip: bool) {
    println!();
    print!("{}", BoardDisplay::new(&snap.board).flipped(flip));
    println!(
        "white {}  black {}  level {}  | {}",
        format_clock(snap.timer.white_remaining_ms),
        format_clock(snap.timer.black_remaining_ms),
        snap.difficulty,
        snap.status_text
    );
}

fn format_clock(ms: u64) -> String {
    let secs = ms / 1000;
    format!("{}:{:02}", secs / 60, secs % 60)
}
