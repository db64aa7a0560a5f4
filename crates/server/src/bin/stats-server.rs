//! Stats server binary.

use anyhow::Result;
use clap::Parser;
use tracing::info;

use stats_server::{server, telemetry, Config};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::parse();
    telemetry::init_tracing(config.log_format)?;

    info!(version = env!("CARGO_PKG_VERSION"), "Starting stats server...");

    server::run(config).await
}
