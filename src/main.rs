//! pagelink - cross-context DOM observation and control
//!
//! Main entry point for the pagelink CLI.

mod cli;
mod cmd_query;
mod cmd_serve;
mod logging;

use std::path::Path;

use anyhow::Context;
use clap::Parser;
use tracing::warn;

use pagelink_config::{Config, ConfigLoader, ConfigValidator};

use crate::cli::{Cli, Commands};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli.config)?;
    let _log_guard = logging::init(&config.logging)?;

    for warning in ConfigValidator::validate(&config).warnings {
        warn!("config {}: {}", warning.path, warning.message);
    }

    match cli.command {
        Commands::Serve { html, url, peer } => {
            cmd_serve::run(&config, &html, &url, peer.as_deref()).await
        }
        Commands::Coordinate { html, url } => cmd_serve::coordinate(&config, &html, &url).await,
        Commands::Query {
            html,
            url,
            query,
            query_file,
            map,
        } => cmd_query::run(&html, &url, query, query_file.as_deref(), map),
        Commands::Catalog { format } => {
            cmd_query::catalog(format);
            Ok(())
        }
    }
}

fn load_config(path: &Path) -> anyhow::Result<Config> {
    ConfigLoader::load_or_default(path)
        .with_context(|| format!("Failed to load configuration from {}", path.display()))
}
