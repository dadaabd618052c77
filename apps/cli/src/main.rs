//! Prospector CLI — phone enrichment for collected business listings.
//!
//! Wraps the extraction pipeline: enrich a single URL, a collector CSV,
//! or run the full collect-then-enrich pipeline.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
