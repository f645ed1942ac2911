//! Config handling

use std::fmt;
use std::path::PathBuf;

use tracing::info;
use tracing::log::LevelFilter;
use url::Url;

use crate::cli::CliOptions;
use crate::constants::{ENV_GOOGLE_API_KEY, ENV_INSTA_PASSWORD, ENV_INSTA_USERNAME};
use crate::error::ConfigError;

/// Sets up logging based on the debug flag
pub fn setup_logging(debug: bool) -> Result<(), Box<std::io::Error>> {
    let level = if debug {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    let mut logger = simple_logger::SimpleLogger::new().with_level(level);
    if !debug {
        logger = logger
            .with_module_level("tracing", LevelFilter::Warn)
            .with_module_level("reqwest", LevelFilter::Info)
            .with_module_level("rustls", LevelFilter::Info)
            .with_module_level("hyper_util", LevelFilter::Info)
            .with_module_level("h2", LevelFilter::Info);
    }
    logger.init().map_err(|err| {
        eprintln!("Failed to initialize logger: {}", err);
        Box::new(std::io::Error::other(err))
    })
}

/// Instagram login details. `Debug` never prints the password.
#[derive(Clone)]
pub struct InstagramCredentials {
    /// Account username
    pub username: String,
    /// Account password
    pub password: String,
}

impl fmt::Debug for InstagramCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstagramCredentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Gemini connection settings. `Debug` never prints the key.
#[derive(Clone)]
pub struct GeminiSettings {
    /// API key sent as `x-goog-api-key`
    pub api_key: String,
    /// Base URL of the API
    pub endpoint: Url,
    /// Model for prompt expansion and captions
    pub text_model: String,
    /// Model that can return image parts
    pub image_model: String,
}

impl fmt::Debug for GeminiSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeminiSettings")
            .field("api_key", &"<redacted>")
            .field("endpoint", &self.endpoint.as_str())
            .field("text_model", &self.text_model)
            .field("image_model", &self.image_model)
            .finish()
    }
}

/// Validated runtime settings, built once at startup.
#[derive(Clone, Debug)]
pub struct Settings {
    /// Gemini connection
    pub gemini: GeminiSettings,
    /// Instagram login
    pub instagram: InstagramCredentials,
    /// Instagram API base URL
    pub instagram_endpoint: Url,
    /// Fixed topic, skips the trends file when set
    pub topic: Option<String>,
    /// Trend list location
    pub trends_file: PathBuf,
    /// Where images are written
    pub output_dir: PathBuf,
}

impl Settings {
    /// Checks every required credential is present, reporting all missing ones at once.
    pub fn from_cli(cli: &CliOptions) -> Result<Self, ConfigError> {
        let present = |value: &Option<String>| {
            value
                .as_deref()
                .filter(|v| !v.trim().is_empty())
                .map(str::to_string)
        };

        let (api_key, username, password) = match (
            present(&cli.google_api_key),
            present(&cli.insta_username),
            present(&cli.insta_password),
        ) {
            (Some(api_key), Some(username), Some(password)) => (api_key, username, password),
            (api_key, username, password) => {
                let missing = [
                    (ENV_GOOGLE_API_KEY, api_key.is_none()),
                    (ENV_INSTA_USERNAME, username.is_none()),
                    (ENV_INSTA_PASSWORD, password.is_none()),
                ]
                .into_iter()
                .filter(|(_, is_missing)| *is_missing)
                .map(|(name, _)| name)
                .collect();
                return Err(ConfigError::Missing(missing));
            }
        };

        info!("All configurations and credentials loaded successfully.");
        Ok(Self {
            gemini: GeminiSettings {
                api_key,
                endpoint: cli.gemini_endpoint.clone(),
                text_model: cli.text_model.clone(),
                image_model: cli.image_model.clone(),
            },
            instagram: InstagramCredentials { username, password },
            instagram_endpoint: cli.instagram_endpoint.clone(),
            topic: cli
                .topic
                .as_ref()
                .map(|topic| topic.trim().to_string())
                .filter(|topic| !topic.is_empty()),
            trends_file: cli.trends_file.clone(),
            output_dir: cli.output_dir.clone(),
        })
    }
}
