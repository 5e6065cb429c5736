//! Line-oriented command channel.
//!
//! Reads one JSON request per line and writes exactly one JSON response per
//! request (except `close`, which ends the conversation). A request is fully
//! resolved, and its response flushed, before the next line is read.

use crate::backend::Backend;
use crate::interaction::{Interaction, InteractionEngine};
use crate::registry::SiteRegistry;
use crate::session::SessionManager;
use chatpilot_common::error::DriverError;
use chatpilot_common::protocol::{Action, Request, Response};
use serde::Serialize;
use std::io;
use std::path::{Path, PathBuf};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{debug, info, warn};

/// Outcome of one request.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Respond(Response),
    /// The session was released by a `close` request.
    Closed,
}

#[derive(Debug, Clone, Copy)]
pub struct ChannelOptions {
    /// Stop reading after a `close` request.
    pub exit_on_close: bool,
    /// Release the session and stop on Ctrl-C.
    pub handle_ctrl_c: bool,
    /// Treat lines starting with `#` as comments (script files).
    pub skip_comments: bool,
}

impl Default for ChannelOptions {
    fn default() -> Self {
        Self {
            exit_on_close: true,
            handle_ctrl_c: false,
            skip_comments: false,
        }
    }
}

/// A processed input line and, for input that is not JSON, the message for
/// the error stream.
struct Handled {
    reply: Reply,
    diagnostic: Option<String>,
}

fn reject(err: DriverError) -> Handled {
    warn!("Rejected input line: {}", err);
    let diagnostic = match &err {
        DriverError::Parse(message) => Some(message.clone()),
        _ => None,
    };
    Handled {
        reply: Reply::Respond(err.into()),
        diagnostic,
    }
}

/// Shape of the diagnostic line written to the error stream for input that
/// is not JSON at all.
#[derive(Serialize)]
struct Diagnostic<'a> {
    error: &'a str,
}

pub struct CommandChannel<B: Backend> {
    sessions: SessionManager<B>,
    registry: SiteRegistry,
    engine: InteractionEngine,
    profile_dir: PathBuf,
}

impl<B: Backend> CommandChannel<B> {
    pub fn new(sessions: SessionManager<B>, registry: SiteRegistry, profile_dir: PathBuf) -> Self {
        Self {
            sessions,
            registry,
            engine: InteractionEngine::new(),
            profile_dir,
        }
    }

    pub fn sessions(&self) -> &SessionManager<B> {
        &self.sessions
    }

    pub fn registry(&self) -> &SiteRegistry {
        &self.registry
    }

    /// Parse and dispatch one raw input line.
    ///
    /// The stderr diagnostic for non-JSON input is only written by [`run`].
    pub async fn handle_line(&mut self, line: &str) -> Reply {
        self.process(line).await.reply
    }

    async fn process(&mut self, line: &str) -> Handled {
        match Request::parse(line) {
            Ok(request) => Handled {
                reply: self.dispatch(request).await,
                diagnostic: None,
            },
            Err(e) => reject(e),
        }
    }

    pub async fn dispatch(&mut self, request: Request) -> Reply {
        debug!("Dispatching '{}'", request.action.as_str());
        match self.execute(&request).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!("'{}' failed: {}", request.action.as_str(), e);
                Reply::Respond(e.into())
            }
        }
    }

    async fn execute(&mut self, request: &Request) -> Result<Reply, DriverError> {
        let response = match request.action {
            Action::Init => {
                self.sessions.open(&self.profile_dir).await?;
                Response::Ready
            }
            Action::Navigate => {
                if !self.sessions.is_open() {
                    return Err(DriverError::SessionNotOpen);
                }
                let url = request.require_url()?;
                let result = self.sessions.navigate(url).await?;
                debug!("Landed on {} ({})", result.url, result.title);
                Response::Navigated {
                    url: url.to_string(),
                }
            }
            Action::Chat => {
                let page = self.sessions.page()?;
                let site_id = request.require_site_id()?;
                let adapter = self.registry.resolve(site_id)?;
                let outcome = self.engine.interact(page, adapter, request.prompt()).await;
                match outcome {
                    Ok(Interaction::Opened { site_id }) => Response::ChatOpened { site_id },
                    Ok(Interaction::Answered { content }) => Response::ResponseReceived { content },
                    Err(e) => {
                        if matches!(e, DriverError::Browser(_) | DriverError::SessionNotOpen) {
                            self.sessions.check_alive().await;
                        }
                        return Err(e);
                    }
                }
            }
            Action::Close => {
                self.shutdown().await;
                return Ok(Reply::Closed);
            }
        };
        Ok(Reply::Respond(response))
    }

    /// Release the browser, logging instead of failing.
    pub async fn shutdown(&mut self) {
        if let Err(e) = self.sessions.close().await {
            warn!("Error while closing browser session: {}", e);
        }
    }
}

/// Possible outcomes from reading a single input line.
enum ReadLineResult<'a> {
    /// A non-empty input line to process.
    Input(&'a str),
    /// A line that is not valid UTF-8.
    Undecodable(String),
    /// Blank or comment line.
    Skip,
    /// End of input.
    Exit,
}

fn classify_line(read: usize, bytes: &[u8], options: ChannelOptions) -> ReadLineResult<'_> {
    if read == 0 {
        return ReadLineResult::Exit;
    }
    match std::str::from_utf8(bytes) {
        Ok(input) => {
            let trimmed = input.trim();
            if trimmed.is_empty() || (options.skip_comments && trimmed.starts_with('#')) {
                ReadLineResult::Skip
            } else {
                ReadLineResult::Input(trimmed)
            }
        }
        Err(e) => ReadLineResult::Undecodable(format!("input is not valid UTF-8: {}", e)),
    }
}

/// Read lines until one yields a reply. `None` at end of input.
async fn next_request<B, R>(
    channel: &mut CommandChannel<B>,
    input: &mut R,
    buf: &mut Vec<u8>,
    options: ChannelOptions,
) -> io::Result<Option<Handled>>
where
    B: Backend,
    R: AsyncBufRead + Unpin,
{
    loop {
        buf.clear();
        let read = input.read_until(b'\n', buf).await?;
        let handled = match classify_line(read, buf, options) {
            ReadLineResult::Input(line) => channel.process(line).await,
            ReadLineResult::Undecodable(message) => reject(DriverError::Parse(message)),
            ReadLineResult::Skip => continue,
            ReadLineResult::Exit => return Ok(None),
        };
        return Ok(Some(handled));
    }
}

/// Resolves on Ctrl-C; never resolves when disabled.
async fn interrupted(enabled: bool) {
    if enabled {
        match tokio::signal::ctrl_c().await {
            Ok(()) => return,
            Err(e) => warn!("Cannot listen for Ctrl-C: {}", e),
        }
    }
    std::future::pending::<()>().await
}

async fn write_line<W: AsyncWrite + Unpin>(writer: &mut W, line: &str) -> io::Result<()> {
    writer.write_all(line.as_bytes()).await?;
    writer.write_all(b"\n").await?;
    writer.flush().await
}

async fn write_response<W: AsyncWrite + Unpin>(writer: &mut W, response: &Response) -> io::Result<()> {
    let line = response.to_json_line().map_err(io::Error::other)?;
    write_line(writer, &line).await
}

async fn write_diagnostic<W: AsyncWrite + Unpin>(writer: &mut W, message: &str) -> io::Result<()> {
    let line = serde_json::to_string(&Diagnostic { error: message }).map_err(io::Error::other)?;
    write_line(writer, &line).await
}

/// Serve requests from `input` until EOF, Ctrl-C or `close`.
///
/// The session is always released before this returns.
pub async fn run<B, R, W, E>(
    channel: &mut CommandChannel<B>,
    input: R,
    out: &mut W,
    err: &mut E,
    options: ChannelOptions,
) -> io::Result<()>
where
    B: Backend,
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
    E: AsyncWrite + Unpin,
{
    let signal = interrupted(options.handle_ctrl_c);
    run_until(channel, input, out, err, options, signal).await
}

/// Like [`run`], but stops when `signal` resolves, even in the middle of a
/// request. The interrupted request gets no response.
pub async fn run_until<B, R, W, E, S>(
    channel: &mut CommandChannel<B>,
    mut input: R,
    out: &mut W,
    err: &mut E,
    options: ChannelOptions,
    signal: S,
) -> io::Result<()>
where
    B: Backend,
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
    E: AsyncWrite + Unpin,
    S: Future<Output = ()>,
{
    let result = serve(channel, &mut input, out, err, options, signal).await;
    channel.shutdown().await;
    result
}

async fn serve<B, R, W, E, S>(
    channel: &mut CommandChannel<B>,
    input: &mut R,
    out: &mut W,
    err: &mut E,
    options: ChannelOptions,
    signal: S,
) -> io::Result<()>
where
    B: Backend,
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
    E: AsyncWrite + Unpin,
    S: Future<Output = ()>,
{
    tokio::pin!(signal);
    let mut buf = Vec::new();

    loop {
        let handled = tokio::select! {
            handled = next_request(channel, input, &mut buf, options) => handled?,
            () = &mut signal => {
                info!("Interrupted; shutting down");
                return Ok(());
            }
        };
        let Some(Handled { reply, diagnostic }) = handled else {
            return Ok(());
        };

        if let Some(message) = diagnostic {
            write_diagnostic(err, &message).await?;
        }
        match reply {
            Reply::Respond(response) => write_response(out, &response).await?,
            Reply::Closed if options.exit_on_close => return Ok(()),
            Reply::Closed => {}
        }
    }
}

/// Replay a JSON-lines script through the channel.
pub async fn run_file<B, W, E>(
    channel: &mut CommandChannel<B>,
    path: &Path,
    out: &mut W,
    err: &mut E,
) -> io::Result<()>
where
    B: Backend,
    W: AsyncWrite + Unpin,
    E: AsyncWrite + Unpin,
{
    let file = tokio::fs::File::open(path).await?;
    let options = ChannelOptions {
        exit_on_close: true,
        handle_ctrl_c: false,
        skip_comments: true,
    };
    run(channel, BufReader::new(file), out, err, options).await
}
