//! QuickInput host - terminal quick input for an extension process
//!
//! Spawns the extension, speaks JSON-RPC over its stdin/stdout and renders
//! every `$show` / `$input` / `$createOrUpdate` it sends as a terminal prompt.

mod terminal;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use console::style;
use tracing_subscriber::EnvFilter;

use quickinput_core::ConfigManager;
use quickinput_rpc::StdioTransport;
use terminal::TerminalService;

#[derive(Parser)]
#[command(name = "quickinput-host")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(
    about = "Serve terminal quick picks and input boxes to an extension process",
    long_about = None
)]
struct Cli {
    /// Configuration file (defaults to the user config directory)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Extension command and its arguments
    #[arg(last = true, required = true, num_args = 1..)]
    command: Vec<String>,
}

/// `RUST_LOG` wins, then `--verbose`, then the configured filter
fn log_filter(verbose: bool, configured: Option<&str>) -> EnvFilter {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return filter;
    }
    if verbose {
        return EnvFilter::new("info,quickinput_core=debug,quickinput_rpc=debug");
    }
    configured
        .and_then(|filter| EnvFilter::try_new(filter).ok())
        .unwrap_or_else(|| EnvFilter::new("warn"))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config_manager = match &cli.config {
        Some(path) => ConfigManager::with_path(path.clone()),
        None => ConfigManager::new(),
    }
    .context("Failed to load configuration")?;
    let config = config_manager.config().clone();

    // Logs go to stderr so they never mix with the prompts
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(cli.verbose, config.logging.filter.as_deref()))
        .with_writer(std::io::stderr)
        .init();

    tracing::debug!(path = %config_manager.path().display(), "Configuration loaded");

    let (program, args) = cli
        .command
        .split_first()
        .context("No extension command given")?;
    let (transport, mut child) = StdioTransport::spawn(program, args)
        .with_context(|| format!("Failed to start {}", program))?;

    let service = Arc::new(TerminalService::new());
    let served = quickinput_rpc::serve(service, &config, transport).await;

    let status = child.wait().await.context("Failed to wait for the extension")?;
    served.context("Connection to the extension failed")?;

    if !status.success() {
        eprintln!(
            "{} {} exited with {}",
            style("!").yellow().bold(),
            program,
            status
        );
        std::process::exit(status.code().unwrap_or(1));
    }

    Ok(())
}
