//! Hornet command-line front end
//!
//! The binary in this crate registers no hardware backends itself — vendor
//! bring-up lives in adapter crates. Those crates depend on this library,
//! build a [`Dispatcher`] with their factories, and hand it to [`run`].

pub mod args;
pub mod commands;

use hornet_core::{Dispatcher, DiscoveryConfig, Result};

pub use args::{Cli, Commands};

/// Execute a parsed CLI invocation against the given dispatcher
pub async fn run(dispatcher: &Dispatcher, cli: Cli) -> Result<()> {
    let config = DiscoveryConfig {
        exclude_handles: cli.exclude.clone(),
        ..Default::default()
    };
    commands::run(dispatcher, &config, cli.command).await
}

/// Initialise the tracing subscriber from `-v` counts
pub fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level)),
        )
        .with_writer(std::io::stderr)
        .init();
}
