//! `scrutiny` — terminal client for a multi-agent code analysis service.
//!
//! Queues local files (or a repository reference) for upload, starts an
//! analysis job on the backend, follows its progress live, renders the
//! issue report, and hosts a chat view over the analyzed codebase.

mod app;
mod text;
mod ui;

use anyhow::Result;
use app::App;
use clap::Parser;
use scrutiny_client::{ApiClient, ClientConfig};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

const DEFAULT_SERVER: &str = "http://127.0.0.1:8000";

#[derive(Parser)]
#[command(name = "scrutiny")]
#[command(about = "Terminal client for a multi-agent code analysis service")]
#[command(version)]
struct Cli {
    /// Backend server URL (defaults to SCRUTINY_SERVER_URL, then localhost)
    #[arg(long, value_name = "URL")]
    server: Option<String>,

    /// Analyze a repository reference instead of uploading files
    #[arg(long, value_name = "REPO")]
    repo: Option<String>,

    /// Files to queue for upload
    #[arg(value_name = "PATH")]
    paths: Vec<PathBuf>,

    /// Verbose logging (only with SCRUTINY_DEBUG_LOG=1)
    #[arg(short, long)]
    verbose: bool,
}

/// Installs a panic hook that restores terminal state before printing
/// panic info, so a crash inside the alternate screen stays readable.
fn install_panic_hook() {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let _ = crossterm::terminal::disable_raw_mode();
        let _ = crossterm::execute!(
            std::io::stdout(),
            crossterm::terminal::LeaveAlternateScreen
        );
        default_hook(panic_info);
    }));
}

/// The TUI owns the terminal, so logs are off by default; set
/// SCRUTINY_DEBUG_LOG=1 to write them to `.scrutiny.log`.
fn init_logging(verbose: bool) {
    if std::env::var("SCRUTINY_DEBUG_LOG").is_err() {
        return;
    }
    let filter = if verbose { "debug" } else { "info" };
    if let Ok(file) = std::fs::File::create(".scrutiny.log") {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::sync::Mutex::new(file))
            .with_ansi(false)
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    install_panic_hook();
    init_logging(cli.verbose);

    let config = match cli.server {
        Some(url) => ClientConfig::new(url, None, None),
        None => ClientConfig::from_env()
            .unwrap_or_else(|_| ClientConfig::new(DEFAULT_SERVER.to_string(), None, None)),
    };
    let poll_interval = Duration::from_secs(config.poll_interval_seconds);
    let server_label = config.base_url.clone();

    let client = Arc::new(ApiClient::new(config)?);

    App::new(client, poll_interval, server_label, cli.paths, cli.repo)
        .run()
        .await
}
