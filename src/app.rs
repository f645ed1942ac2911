//! Wiring from CLI options to a pipeline run.

use tracing::{debug, error};

use crate::cli::CliOptions;
use crate::config::Settings;
use crate::error::AppError;
use crate::gemini::GeminiClient;
use crate::instagram::InstagramClient;
use crate::pipeline::{Pipeline, PipelineReport};
use crate::trends::TopicSource;

/// Validates config, builds the clients once and runs the pipeline a single time.
///
/// Configuration is checked before any client exists, so a missing credential
/// never results in a network call.
pub async fn run(cli: &CliOptions) -> Result<PipelineReport, AppError> {
    let settings = Settings::from_cli(cli).inspect_err(|err| error!("{err}"))?;
    debug!("Settings: {settings:?}");

    let client = reqwest::Client::builder().build()?;
    let generator = GeminiClient::new(client.clone(), settings.gemini.clone());
    let publisher = InstagramClient::new(client, settings.instagram_endpoint.clone());

    let topics = match settings.topic {
        Some(topic) => TopicSource::Fixed(topic),
        None => TopicSource::File(settings.trends_file),
    };

    let pipeline = Pipeline::new(
        generator,
        publisher,
        settings.instagram,
        topics,
        settings.output_dir,
    );
    Ok(pipeline.run().await?)
}
