//! swiftblob
//!
//! Operator CLI for blobs stored in an OpenStack Swift container.

mod commands;

use clap::Parser;
use tracing::debug;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use swiftblob_core::storage::{StorageConfig, SwiftStorageService};
use swiftblob_shared::{AppConfig, LogFormat, LogSettings};

use crate::commands::Command;

#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

/// Logs go to stderr so stdout carries only command output.
fn init_tracing(settings: &LogSettings) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&settings.filter));
    let registry = tracing_subscriber::registry().with(filter);

    match settings.format {
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init(),
        LogFormat::Pretty => registry
            .with(fmt::layer().with_writer(std::io::stderr))
            .init(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config = AppConfig::load()?;
    init_tracing(&config.log);

    let storage = StorageConfig::from_settings(&config.storage)?;
    debug!(provider = storage.provider.name(), container = %storage.container, "loaded configuration");
    let service = SwiftStorageService::from_config(storage)?;

    cli.command.run(&service).await
}
