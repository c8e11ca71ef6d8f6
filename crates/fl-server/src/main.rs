//! # ferrolink
//!
//! Entry point of the ferrolink server.

#![forbid(unsafe_code)]

use std::path::PathBuf;

use clap::Parser;
use fl_core::Config;
use fl_server::Server;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments.
#[derive(Debug, Parser)]
#[command(name = "ferrolink", version, about = "SAML service provider and security token service")]
struct Args {
    /// Path to the TOML configuration file.
    #[arg(short, long, env = "FL_CONFIG")]
    config: Option<PathBuf>,

    /// Log filter, e.g. `info` or `fl_sts=debug`.
    #[arg(long, env = "RUST_LOG", default_value = "info")]
    log: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(&args.log))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("ferrolink starting...");

    let config = Config::load(args.config.as_deref())?;
    Server::new(config).await?.run().await
}
