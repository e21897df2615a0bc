//! Binary crate for the `weatherbot` service.
//!
//! This crate focuses on:
//! - Parsing CLI arguments
//! - Logging setup and process bootstrap
//! - The liveness endpoint that runs next to the scheduler

use clap::Parser;

mod cli;
mod health;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cmd = cli::Cli::parse();
    cmd.run().await
}
