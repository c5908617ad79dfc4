//! market-pulse - Market data, regime and signal pipeline for DEX tokens

use anyhow::{Context, Result};
use clap::Parser;
use std::path::Path;
use tracing_subscriber::{fmt, EnvFilter};

use market_pulse::adapters::cli::{self, CliApp};
use market_pulse::config::{load_config, Config};

const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if it exists
    dotenvy::dotenv().ok();

    let app = CliApp::parse();
    let config = load_app_config(&app.config)?;
    init_logging(app.verbose, app.debug, &config.logging.level)?;

    cli::execute(app, config).await
}

/// Flags win over RUST_LOG, which wins over `[logging].level`
fn init_logging(verbose: bool, debug: bool, level: &str) -> Result<()> {
    let filter = if debug {
        EnvFilter::new("debug")
    } else if verbose {
        EnvFilter::new("info")
    } else {
        EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(level))
            .context("Invalid logging level")?
    };

    fmt().with_env_filter(filter).init();
    Ok(())
}

fn load_app_config(path: &Path) -> Result<Config> {
    // A missing default file means "run with defaults"; an explicit path must exist
    if path == Path::new(DEFAULT_CONFIG_PATH) && !path.exists() {
        return Ok(Config::default());
    }
    load_config(path)
        .with_context(|| format!("Failed to load configuration from {}", path.display()))
}
