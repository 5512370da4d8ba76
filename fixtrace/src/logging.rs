//! Tracing subscriber for the bridge binary.
//!
//! Logs go to stderr; stdout carries the event stream. Filter priority,
//! highest first: `FIXTRACE_LOG`, `RUST_LOG`, the `--verbose`/`--quiet`
//! flags, and finally `warn`.

use tracing::Level;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    Quiet,
    Normal,
    Verbose,
}

impl Verbosity {
    pub const fn from_flags(verbose: bool, quiet: bool) -> Self {
        if verbose {
            Self::Verbose
        } else if quiet {
            Self::Quiet
        } else {
            Self::Normal
        }
    }

    pub const fn default_level(self) -> Level {
        match self {
            Self::Quiet => Level::ERROR,
            Self::Normal => Level::WARN,
            Self::Verbose => Level::DEBUG,
        }
    }
}

/// Installs the global subscriber. Call once, before loading config.
pub fn init_subscriber(verbosity: Verbosity) {
    let use_ansi = std::io::IsTerminal::is_terminal(&std::io::stderr());
    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(use_ansi)
        .with_target(true)
        .with_level(true);

    tracing_subscriber::registry()
        .with(build_env_filter(verbosity))
        .with(fmt_layer.with_timer(fmt::time::uptime()))
        .init();
}

fn build_env_filter(verbosity: Verbosity) -> EnvFilter {
    if let Ok(directives) = std::env::var("FIXTRACE_LOG") {
        if let Ok(filter) = EnvFilter::try_new(&directives) {
            return filter;
        }
    }
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return filter;
    }
    EnvFilter::new(verbosity.default_level().to_string().to_lowercase())
}
