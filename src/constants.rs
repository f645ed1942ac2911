//! Shared constants/defaults for things
//!

/// Where the trend list lives unless told otherwise
pub const DEFAULT_TRENDS_FILE: &str = "constants/trends.csv";

/// The default place we put generated images
pub const DEFAULT_OUTPUT_DIR: &str = "constants/generated_images";

/// Extension used for every generated image, also selects the encoder.
pub const IMAGE_EXTENSION: &str = "jpg";

/// File stem used when a topic has no usable filename characters
pub const FALLBACK_IMAGE_STEM: &str = "image";

/// Text model used for prompt expansion and captions
pub const DEFAULT_TEXT_MODEL: &str = "gemini-1.5-flash-latest";

/// Image-capable model used to render the picture
pub const DEFAULT_IMAGE_MODEL: &str = "gemini-2.0-flash-preview-image-generation";

/// Base URL of the Gemini REST API
pub const DEFAULT_GEMINI_ENDPOINT: &str = "https://generativelanguage.googleapis.com";

/// Base URL of the Instagram mobile API
pub const DEFAULT_INSTAGRAM_ENDPOINT: &str = "https://i.instagram.com";

/// Environment variable holding the Gemini API key
pub const ENV_GOOGLE_API_KEY: &str = "GOOGLE_API_KEY";

/// Environment variable holding the Instagram username
pub const ENV_INSTA_USERNAME: &str = "INSTA_USERNAME";

/// Environment variable holding the Instagram password
pub const ENV_INSTA_PASSWORD: &str = "INSTA_PASSWORD";

/// User agent the Instagram app sends; the mobile API rejects browser agents.
pub const INSTAGRAM_USER_AGENT: &str = "Instagram 269.0.0.18.75 Android (26/8.0.0; 480dpi; 1080x1920; OnePlus; 6T Dev; devitron; qcom; en_US; 314665256)";

/// App id header value paired with [`INSTAGRAM_USER_AGENT`]
pub const INSTAGRAM_APP_ID: &str = "567067343352427";
