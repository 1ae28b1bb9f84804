use anyhow::Result;
use clap::Parser;
use tracing::debug;

use kiosk_cli::settings::init_logger;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = kiosk_cli::cli::Cli::parse();
    // Before the logger, so RUST_LOG may come from .env
    let dotenv = dotenvy::dotenv();
    init_logger(cli.verbose)?;
    if let Err(e) = dotenv {
        debug!("No .env file loaded: {}", e);
    }
    kiosk_cli::run(cli).await?;
    Ok(())
}
