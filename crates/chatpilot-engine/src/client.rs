//! Host side of the channel: spawn a controller process and talk to it.

use chatpilot_common::protocol::{Action, Request, Response};
use std::ffi::OsStr;
use std::process::{ExitStatus, Stdio};
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tracing::debug;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Failed to start controller: {0}")]
    Spawn(std::io::Error),
    #[error("Controller I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("Controller sent an unreadable line: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("Controller exited before responding")]
    Disconnected,
    #[error("Controller stdio was not captured")]
    MissingPipe,
}

pub struct ControllerClient {
    child: Child,
    stdin: ChildStdin,
    stdout: Lines<BufReader<ChildStdout>>,
}

impl ControllerClient {
    /// Start `program` with piped stdin/stdout. Its stderr is inherited.
    pub async fn spawn<I, S>(program: impl AsRef<OsStr>, args: I) -> Result<Self, ClientError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(ClientError::Spawn)?;

        let stdin = child.stdin.take().ok_or(ClientError::MissingPipe)?;
        let stdout = child.stdout.take().ok_or(ClientError::MissingPipe)?;
        Ok(Self {
            child,
            stdin,
            stdout: BufReader::new(stdout).lines(),
        })
    }

    /// Send one request and wait for its response.
    ///
    /// `close` has no response; use [`ControllerClient::close`] for it.
    pub async fn request(&mut self, request: &Request) -> Result<Response, ClientError> {
        self.send(request).await?;
        loop {
            let line = self
                .stdout
                .next_line()
                .await?
                .ok_or(ClientError::Disconnected)?;
            if line.trim().is_empty() {
                continue;
            }
            debug!("Controller replied: {}", line);
            return Ok(serde_json::from_str(&line)?);
        }
    }

    /// Ask the controller to release its browser and wait for it to exit.
    pub async fn close(mut self) -> Result<ExitStatus, ClientError> {
        self.send(&Request::close()).await?;
        drop(self.stdin);
        Ok(self.child.wait().await?)
    }

    async fn send(&mut self, request: &Request) -> Result<(), ClientError> {
        let mut line = serde_json::to_string(request)?;
        line.push('\n');
        if request.action != Action::Chat {
            debug!("Sending {}", line.trim_end());
        }
        self.stdin.write_all(line.as_bytes()).await?;
        self.stdin.flush().await?;
        Ok(())
    }
}
