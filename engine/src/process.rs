//! A spawned engine process with its pipes pumped by background tasks.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWriteExt, BufReader};
use tokio::process::Child;
use tokio::sync::mpsc;

use crate::driver::EngineTransport;
use crate::EngineError;

pub struct EngineProcess {
    child: Child,
    path: PathBuf,
    stdin_tx: Option<mpsc::UnboundedSender<String>>,
    lines_rx: mpsc::UnboundedReceiver<String>,
    exited: bool,
}

impl EngineProcess {
    /// Launch the executable at `path`. Must be called inside a tokio runtime.
    #[tracing::instrument(level = "info")]
    pub fn spawn(path: &Path) -> Result<Self, EngineError> {
        tracing::debug!("Spawning engine process");
        let mut child = tokio::process::Command::new(path)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| {
                tracing::warn!("Failed to spawn engine: {}", source);
                EngineError::Launch {
                    path: path.to_path_buf(),
                    source,
                }
            })?;

        let mut stdin = child.stdin.take().ok_or_else(|| missing_pipe("stdin"))?;
        let stdout = child.stdout.take().ok_or_else(|| missing_pipe("stdout"))?;
        let stderr = child.stderr.take().ok_or_else(|| missing_pipe("stderr"))?;

        let (lines_tx, lines_rx) = mpsc::unbounded_channel::<String>();
        tokio::spawn(pump_lines(stdout, lines_tx.clone(), "stdout"));
        tokio::spawn(pump_lines(stderr, lines_tx, "stderr"));

        let (stdin_tx, mut stdin_rx) = mpsc::unbounded_channel::<String>();
        tokio::spawn(async move {
            while let Some(line) = stdin_rx.recv().await {
                if let Err(e) = stdin.write_all(line.as_bytes()).await {
                    tracing::error!("Failed to write to engine stdin: {}", e);
                    break;
                }
                if let Err(e) = stdin.write_all(b"\n").await {
                    tracing::error!("Failed to write to engine stdin: {}", e);
                    break;
                }
                if let Err(e) = stdin.flush().await {
                    tracing::error!("Failed to flush engine stdin: {}", e);
                    break;
                }
            }
            tracing::debug!("Stdin writer task exiting");
        });

        tracing::info!(pid = ?child.id(), "Engine process started");
        Ok(Self {
            child,
            path: path.to_path_buf(),
            stdin_tx: Some(stdin_tx),
            lines_rx,
            exited: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn id(&self) -> Option<u32> {
        self.child.id()
    }

    /// Close stdin, give the process `grace` to exit on its own, then kill it.
    pub async fn shutdown(mut self, grace: Duration) {
        self.stdin_tx = None;
        if !grace.is_zero() {
            if let Ok(Ok(status)) = tokio::time::timeout(grace, self.child.wait()).await {
                tracing::info!(%status, "Engine exited");
                return;
            }
        }
        match self.child.kill().await {
            Ok(()) => tracing::info!("Engine killed"),
            Err(e) => tracing::debug!("Kill after exit: {}", e),
        }
    }
}

fn missing_pipe(name: &str) -> EngineError {
    EngineError::Io(std::io::Error::new(
        std::io::ErrorKind::BrokenPipe,
        format!("engine {name} unavailable"),
    ))
}

async fn pump_lines<R>(stream: R, tx: mpsc::UnboundedSender<String>, name: &'static str)
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(stream);
    let mut line = String::new();
    loop {
        line.clear();
        match reader.read_line(&mut line).await {
            Ok(0) => {
                tracing::debug!("Engine {} EOF", name);
                break;
            }
            Ok(_) => {
                let trimmed = line.trim_end();
                if trimmed.is_empty() {
                    continue;
                }
                if tx.send(trimmed.to_string()).is_err() {
                    break;
                }
            }
            Err(e) => {
                tracing::warn!("Error reading engine {}: {}", name, e);
                break;
            }
        }
    }
}

impl EngineTransport for EngineProcess {
    fn write_line(&mut self, line: &str) -> Result<(), EngineError> {
        let tx = self.stdin_tx.as_ref().ok_or(EngineError::ChannelClosed)?;
        tx.send(line.to_string())
            .map_err(|_| EngineError::ChannelClosed)
    }

    fn drain_lines(&mut self) -> Vec<String> {
        let mut lines = Vec::new();
        while let Ok(line) = self.lines_rx.try_recv() {
            lines.push(line);
        }
        lines
    }

    fn has_exited(&mut self) -> bool {
        if self.exited {
            return true;
        }
        match self.child.try_wait() {
            Ok(Some(status)) => {
                tracing::info!(%status, "Engine process exited");
                self.exited = true;
            }
            Ok(None) => {}
            Err(e) => {
                tracing::warn!("Could not poll engine process: {}", e);
                self.exited = true;
            }
        }
        self.exited
    }
}
