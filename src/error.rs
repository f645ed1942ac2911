//! Error handling

use std::fmt;
use std::path::PathBuf;

/// Startup configuration problems, raised before any request goes out.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// One or more required values were not set
    #[error("Missing required environment variables: {}", .0.join(", "))]
    Missing(Vec<&'static str>),
}

/// Why no topic could be picked from the trends file.
#[derive(Debug, thiserror::Error)]
pub enum TrendError {
    /// The trends file does not exist
    #[error("Trend CSV file not found at '{}'", .0.display())]
    NotFound(PathBuf),
    /// The trends file exists but could not be read
    #[error("Error reading trend CSV file '{}': {source}", path.display())]
    Read {
        /// File we tried to read
        path: PathBuf,
        /// Underlying I/O error
        source: std::io::Error,
    },
    /// The trends file has no data rows
    #[error("The CSV file '{}' is empty or contains no trends", .0.display())]
    Empty(PathBuf),
}

/// Failures talking to the generative API or persisting its output.
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    /// Transport-level failure
    #[error("Request to Gemini failed: {0}")]
    Request(#[from] reqwest::Error),
    /// Non-success HTTP status
    #[error("Gemini API error {status}: {body}")]
    Api {
        /// HTTP status returned
        status: reqwest::StatusCode,
        /// Raw response body
        body: String,
    },
    /// Body was not the JSON we expected
    #[error("Failed to parse Gemini response: {0}")]
    Parse(#[from] serde_json::Error),
    /// The prompt was refused by the safety filters
    #[error("Gemini blocked the prompt: {0}")]
    Blocked(String),
    /// No candidate carried any text
    #[error("Gemini returned no text")]
    EmptyResponse,
    /// No candidate carried inline image data
    #[error("No image data found in the Gemini API response.")]
    NoImageData,
    /// Inline data was not valid base64
    #[error("Failed to base64-decode image: {0}")]
    Decode(#[from] base64::DecodeError),
    /// Inline data could not be decoded or re-encoded as an image
    #[error("Failed to process image: {0}")]
    Image(#[from] image::ImageError),
    /// The image file could not be written
    #[error("Failed to write image '{}': {source}", path.display())]
    Io {
        /// Target path
        path: PathBuf,
        /// Underlying I/O error
        source: std::io::Error,
    },
}

/// Failures logging in or posting to Instagram.
#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    /// Credentials were rejected or the session needs re-validation
    #[error("Instagram login required: {0}")]
    LoginRequired(String),
    /// Transport-level failure
    #[error("Request to Instagram failed: {0}")]
    Request(#[from] reqwest::Error),
    /// Instagram answered but refused the request
    #[error("Instagram rejected {step} ({status}): {message}")]
    Rejected {
        /// Which call was refused
        step: &'static str,
        /// HTTP status returned
        status: reqwest::StatusCode,
        /// Message from the response, or the raw body
        message: String,
    },
    /// Body was not the JSON we expected
    #[error("Failed to parse Instagram response: {0}")]
    Parse(#[from] serde_json::Error),
    /// The image to upload could not be read
    #[error("Failed to read '{}': {source}", path.display())]
    Io {
        /// File we tried to read
        path: PathBuf,
        /// Underlying I/O error
        source: std::io::Error,
    },
}

/// The pipeline stages, in execution order.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Stage {
    /// Picking the topic
    SelectTrend,
    /// Turning the topic into an image prompt
    ExpandPrompt,
    /// Rendering and saving the image
    GenerateImage,
    /// Writing the caption
    GenerateCaption,
    /// Posting to Instagram
    Publish,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::SelectTrend => "select trend",
            Self::ExpandPrompt => "expand prompt",
            Self::GenerateImage => "generate image",
            Self::GenerateCaption => "generate caption",
            Self::Publish => "publish",
        };
        f.write_str(name)
    }
}

/// The error carried out of whichever stage failed.
#[derive(Debug, thiserror::Error)]
pub enum StageFailure {
    /// See [`TrendError`]
    #[error(transparent)]
    Trend(#[from] TrendError),
    /// See [`GenerationError`]
    #[error(transparent)]
    Generation(#[from] GenerationError),
    /// See [`PublishError`]
    #[error(transparent)]
    Publish(#[from] PublishError),
}

/// Why a pipeline run halted.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// The output directory could not be created
    #[error("Failed to create output directory '{}': {source}", path.display())]
    OutputDir {
        /// Directory we tried to create
        path: PathBuf,
        /// Underlying I/O error
        source: std::io::Error,
    },
    /// A stage failed, later stages were not run
    #[error("Pipeline halted at {stage}: {source}")]
    Stage {
        /// Stage that failed
        stage: Stage,
        /// What went wrong
        source: StageFailure,
    },
}

impl PipelineError {
    /// The stage that halted the run, if it got that far.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Self::OutputDir { .. } => None,
            Self::Stage { stage, .. } => Some(*stage),
        }
    }
}

/// Anything that stops a run of the binary.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// See [`ConfigError`]
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// Building the HTTP client failed
    #[error("Failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
    /// See [`PipelineError`]
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}
