use anyhow::Context;
use chatpilot_engine::channel::{self, ChannelOptions, CommandChannel};
use chatpilot_engine::config::{ChatpilotConfig, ConfigLoader};
use chatpilot_engine::error::DriverError;
use chatpilot_engine::protocol::Response;
use chatpilot_engine::registry::SiteRegistry;
use chatpilot_engine::session::SessionManager;
use chatpilot_h::backend::HeadlessBackend;
use clap::Parser;
use std::io::Write;
use std::path::PathBuf;
use tokio::io::BufReader;
use tracing_subscriber::EnvFilter;

/// Overrides the browser profile location.
const PROFILE_DIR_ENV: &str = "CHATPILOT_PROFILE_DIR";

#[derive(Parser, Debug)]
#[command(name = "chatpilot", version, about = "Drive web chat sites over a JSON-lines channel")]
struct Args {
    /// Config file (default: ./chatpilot.yaml, then ~/.chatpilot/config.yaml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Browser profile directory holding cookies and login state
    #[arg(long)]
    profile_dir: Option<PathBuf>,

    /// Run the browser without a window (only once the profile is logged in)
    #[arg(long)]
    headless: bool,

    /// JSON-lines script to execute instead of reading stdin
    #[arg(long)]
    file: Option<PathBuf>,

    /// Print the registered site ids and exit
    #[arg(long)]
    list_sites: bool,

    /// Debug logging (RUST_LOG takes precedence)
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Logging goes to stderr; stdout carries the protocol
    let default_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    let (config, registry) = match load(&args).await {
        Ok(loaded) => loaded,
        Err(e) => {
            report_fatal(&DriverError::Config(format!("{:#}", e)));
            return Err(e);
        }
    };

    if args.list_sites {
        for id in registry.ids() {
            println!("{}", id);
        }
        return Ok(());
    }

    let profile_dir = config.browser.resolve_profile_dir(
        args.profile_dir.clone(),
        std::env::var_os(PROFILE_DIR_ENV).map(PathBuf::from),
    );
    tracing::info!(
        "Ready: {} sites, profile {}",
        registry.len(),
        profile_dir.display()
    );

    let sessions = SessionManager::new(HeadlessBackend::new(), config.browser.clone());
    let mut channel = CommandChannel::new(sessions, registry, profile_dir);
    let mut stdout = tokio::io::stdout();
    let mut stderr = tokio::io::stderr();

    match &args.file {
        Some(path) => channel::run_file(&mut channel, path, &mut stdout, &mut stderr)
            .await
            .with_context(|| format!("executing {}", path.display()))?,
        None => {
            let options = ChannelOptions {
                exit_on_close: true,
                handle_ctrl_c: true,
                skip_comments: false,
            };
            let stdin = BufReader::new(tokio::io::stdin());
            channel::run(&mut channel, stdin, &mut stdout, &mut stderr, options)
                .await
                .context("serving stdin")?;
        }
    }

    tracing::info!("Channel closed");
    Ok(())
}

async fn load(args: &Args) -> anyhow::Result<(ChatpilotConfig, SiteRegistry)> {
    let mut config = ConfigLoader::load(args.config.as_deref())
        .await
        .context("loading configuration")?;
    if args.headless {
        config.browser.headless = true;
    }
    let registry = config.registry().context("building site registry")?;
    Ok((config, registry))
}

/// Best effort: tell a waiting host why we are exiting.
fn report_fatal(err: &DriverError) {
    let response = Response::from(err.clone());
    if let Ok(line) = response.to_json_line() {
        let mut stdout = std::io::stdout().lock();
        let _ = writeln!(stdout, "{}", line);
        let _ = stdout.flush();
    }
    tracing::error!("{}", err);
}
