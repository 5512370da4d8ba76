//! fixtrace: error-to-fix correlation bridge.
//!
//! Entry point for the `fixtrace` binary. Reads host editor messages as JSON
//! lines on stdin (`event`, `protocol`), mirrors editor state into an
//! [`InMemoryHost`] (`bridge`), and writes detected errors and fixes as JSON
//! lines on stdout. Logs go to stderr (`logging`).
//!
//! # Startup sequence
//!
//! 1. Logging, so config problems are reported through tracing.
//! 2. Config from `--config` or the XDG path; a missing file means defaults.
//! 3. `register_sigterm()`, polled in the 50ms heartbeat below.
//! 4. Engine spawn, then the stdin reader task.
//!
//! The loop exits on EOF, SIGTERM, or a closed detection stream. On exit the
//! engine is shut down and any detections already queued are still written.

mod bridge;
mod event;
mod logging;
mod protocol;

use std::path::PathBuf;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use fixtrace_core::config::default_config_path;
use fixtrace_core::{DetectorConfig, Engine, InMemoryHost};
use tracing::{debug, info};

use crate::bridge::Bridge;
use crate::event::{AppEvent, EventHandler};
use crate::logging::Verbosity;
use crate::protocol::EventWriter;

#[derive(Debug, Parser)]
#[command(name = "fixtrace", version, about = "Pairs editor errors with the edits that fix them")]
struct Cli {
    /// Workspace root used to resolve crash-trace paths. Repeatable.
    #[arg(long = "root", value_name = "DIR")]
    roots: Vec<PathBuf>,

    /// Config file; defaults to `$XDG_CONFIG_HOME/fixtrace/config.toml`.
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    #[arg(short, long)]
    verbose: bool,

    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init_subscriber(Verbosity::from_flags(cli.verbose, cli.quiet));

    let config_path = cli.config.unwrap_or_else(default_config_path);
    let config = DetectorConfig::load_or_default(&config_path)
        .with_context(|| format!("loading config from {}", config_path.display()))?;

    let term_flag = event::register_sigterm().context("registering SIGTERM handler")?;

    let roots = if cli.roots.is_empty() {
        vec![std::env::current_dir().context("reading current directory")?]
    } else {
        cli.roots
    };
    info!(roots = roots.len(), "starting");

    let host = Arc::new(InMemoryHost::with_roots(roots));
    let (engine, mut detections) = Engine::spawn(Arc::clone(&host), &config);
    let bridge = Bridge::new(host, engine.clone());

    let handler = EventHandler::new();
    event::spawn_input_task(tokio::io::stdin(), handler.tx.clone());
    let mut rx = handler.rx;
    let mut out = EventWriter::new(tokio::io::stdout());

    'event_loop: loop {
        tokio::select! {
            _ = tokio::time::sleep(std::time::Duration::from_millis(50)) => {
                if term_flag.load(Ordering::Relaxed) {
                    info!("received SIGTERM");
                    break 'event_loop;
                }
            }
            maybe_event = rx.recv() => match maybe_event {
                Some(AppEvent::Input(message)) => bridge.apply(message),
                Some(AppEvent::InputClosed) | None => {
                    debug!("input closed");
                    break 'event_loop;
                }
            },
            detection = detections.recv() => match detection {
                Some(event) => out.write(&event).await?,
                None => break 'event_loop,
            },
        }
    }

    engine.shutdown();
    while let Some(event) = detections.recv().await {
        out.write(&event).await?;
    }
    Ok(())
}
