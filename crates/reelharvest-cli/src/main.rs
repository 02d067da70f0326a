//! Reelharvest - scrape short-video items and creator profiles through a
//! rotating proxy pool.

mod cli;
mod output;

use tracing::info;

fn init_tracing() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,reelharvest=debug"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true))
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    info!("Starting Reelharvest v{}", env!("CARGO_PKG_VERSION"));

    cli::run().await
}
