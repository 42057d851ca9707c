//! Binary crate for the `weather-ingest` command-line tool.
//!
//! This crate focuses on:
//! - Parsing CLI arguments
//! - Interactive configuration
//! - Logging setup and human-friendly output

use anyhow::Context;
use clap::Parser;

mod cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cmd = cli::Cli::parse();

    tracing::subscriber::set_global_default(
        tracing_subscriber::FmtSubscriber::builder()
            .with_max_level(cmd.log_level)
            .with_writer(std::io::stderr)
            .finish(),
    )
    .context("Failed to set tracing subscriber")?;

    cmd.run().await
}
