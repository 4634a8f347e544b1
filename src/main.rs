//! Moonshot Scanner
//!
//! Discovers and ranks early-stage crypto tokens.

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

use moonshot_scanner::adapters::cli::{self, CliApp};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if it exists (API keys go here, not in the config file)
    dotenvy::dotenv().ok();

    let app = CliApp::parse();
    let config = cli::load_app_config(&app.config)?;
    init_logging(app.verbose, app.debug, &config.logging.level)?;

    cli::execute(app.command, config).await
}

fn init_logging(verbose: bool, debug: bool, level: &str) -> Result<()> {
    let filter = if debug {
        EnvFilter::new("debug")
    } else if verbose {
        EnvFilter::new("info")
    } else {
        EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    // stdout carries the scan output; logs go to stderr
    fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
    Ok(())
}
