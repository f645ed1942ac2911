use anyhow::{Context, Result, anyhow};
use clap::Parser;
use tracing::info;
use trendgram::cli::CliOptions;
use trendgram::config::setup_logging;

#[tokio::main]
async fn main() -> Result<()> {
    // .env wins over the process environment
    dotenvy::dotenv_override().ok();
    let cli = CliOptions::parse();

    setup_logging(cli.debug).map_err(|err| anyhow!("Failed to set up logging: {err}"))?;

    let report = trendgram::app::run(&cli)
        .await
        .context("Trend-to-Gram run did not complete")?;

    match report.media.code {
        Some(code) => info!("Posted https://www.instagram.com/p/{code}/"),
        None => info!("Posted media {}", report.media.id),
    }
    Ok(())
}
