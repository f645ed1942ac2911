//! CLI parser
use clap::Parser;
use std::path::PathBuf;
use url::Url;

use crate::constants::{
    DEFAULT_GEMINI_ENDPOINT, DEFAULT_IMAGE_MODEL, DEFAULT_INSTAGRAM_ENDPOINT, DEFAULT_OUTPUT_DIR,
    DEFAULT_TEXT_MODEL, DEFAULT_TRENDS_FILE,
};

#[derive(Parser, Debug, Clone)]
#[command(name = "trendgram")]
#[command(
    about = "Turn a trending topic into a Gemini-generated image and caption, then post it to Instagram"
)]
/// CLI Options
pub struct CliOptions {
    #[clap(long, help = "Enable debug logging", env = "TRENDGRAM_DEBUG")]
    /// Enable debug logging. Env: TRENDGRAM_DEBUG
    pub debug: bool,

    #[clap(long, short, env = "TRENDGRAM_TOPIC")]
    /// Use this topic instead of picking one from the trends file.
    /// Env: TRENDGRAM_TOPIC
    pub topic: Option<String>,

    #[clap(long, default_value = DEFAULT_TRENDS_FILE, env = "TRENDGRAM_TRENDS_FILE")]
    /// CSV of candidate topics, header row first, topic in the first column.
    /// Env: TRENDGRAM_TRENDS_FILE
    pub trends_file: PathBuf,

    #[clap(long, short, default_value = DEFAULT_OUTPUT_DIR, env = "TRENDGRAM_OUTPUT_DIR")]
    /// Directory generated images are written to, created if missing.
    /// Env: TRENDGRAM_OUTPUT_DIR
    pub output_dir: PathBuf,

    #[clap(long, default_value = DEFAULT_TEXT_MODEL, env = "TRENDGRAM_TEXT_MODEL")]
    /// Text model used for prompt expansion and captions
    pub text_model: String,

    #[clap(long, default_value = DEFAULT_IMAGE_MODEL, env = "TRENDGRAM_IMAGE_MODEL")]
    /// Image model
    pub image_model: String,

    #[clap(long, default_value = DEFAULT_GEMINI_ENDPOINT, env = "TRENDGRAM_GEMINI_ENDPOINT")]
    /// Gemini API base URL
    pub gemini_endpoint: Url,

    #[clap(long, default_value = DEFAULT_INSTAGRAM_ENDPOINT, env = "TRENDGRAM_INSTAGRAM_ENDPOINT")]
    /// Instagram API base URL
    pub instagram_endpoint: Url,

    #[clap(long, env = "GOOGLE_API_KEY", hide_env_values = true)]
    /// Gemini API key. Env: GOOGLE_API_KEY
    pub google_api_key: Option<String>,

    #[clap(long, env = "INSTA_USERNAME")]
    /// Instagram username. Env: INSTA_USERNAME
    pub insta_username: Option<String>,

    #[clap(long, env = "INSTA_PASSWORD", hide_env_values = true)]
    /// Instagram password. Env: INSTA_PASSWORD
    pub insta_password: Option<String>,
}
