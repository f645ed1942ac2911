//! Gemini `generateContent` client.
//!
//! Docs: <https://ai.google.dev/api/generate-content>

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::GeminiSettings;
use crate::error::GenerationError;

/// Text and image generation, the seam the pipeline is tested through.
#[async_trait]
pub trait ContentGenerator: Send + Sync {
    /// One text-only generation, returning the text of the first candidate.
    async fn generate_text(&self, prompt: &str) -> Result<String, GenerationError>;

    /// One generation asking for TEXT and IMAGE parts, returned unparsed.
    async fn generate_image(
        &self,
        prompt: &str,
    ) -> Result<GenerateContentResponse, GenerationError>;
}

// -----------------------------
// Wire types
// -----------------------------

/// Request body for POST /v1beta/models/{model}:generateContent
#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<RequestContent<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Serialize, Debug)]
struct RequestContent<'a> {
    role: &'a str,
    parts: Vec<RequestPart<'a>>,
}

#[derive(Serialize, Debug)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_modalities: Vec<Modality>,
}

#[derive(Serialize, Debug, Clone, Copy)]
#[serde(rename_all = "UPPERCASE")]
enum Modality {
    Text,
    Image,
}

/// Response body of `generateContent`.
#[derive(Deserialize, Serialize, Debug, Default, Clone)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
    /// Generation attempts, in order
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    /// Set when the prompt itself was refused
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_feedback: Option<PromptFeedback>,
}

/// One generation attempt.
#[derive(Deserialize, Serialize, Debug, Default, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    /// Generated parts; absent when the candidate was filtered
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<Content>,
    /// Why generation stopped, e.g. `STOP` or `SAFETY`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,
}

/// The parts of a candidate.
#[derive(Deserialize, Serialize, Debug, Default, Clone)]
pub struct Content {
    /// Text or binary segments, in order
    #[serde(default)]
    pub parts: Vec<Part>,
}

/// One segment of a candidate.
#[derive(Deserialize, Serialize, Debug, Default, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    /// Text segment
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Binary segment
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inline_data: Option<InlineData>,
}

/// Binary payload embedded in a part.
#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    /// e.g. `image/png`
    pub mime_type: String,
    /// Base64-encoded bytes
    pub data: String,
}

/// Feedback on a refused prompt.
#[derive(Deserialize, Serialize, Debug, Default, Clone)]
#[serde(rename_all = "camelCase")]
pub struct PromptFeedback {
    /// e.g. `SAFETY`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_reason: Option<String>,
}

impl GenerateContentResponse {
    /// Concatenated text parts of the first candidate.
    pub fn text(&self) -> Result<String, GenerationError> {
        self.check_blocked()?;
        let text: String = self
            .candidates
            .first()
            .and_then(|candidate| candidate.content.as_ref())
            .map(|content| {
                content
                    .parts
                    .iter()
                    .filter_map(|part| part.text.as_deref())
                    .collect()
            })
            .unwrap_or_default();
        if text.is_empty() {
            return Err(GenerationError::EmptyResponse);
        }
        Ok(text)
    }

    /// First inline payload, scanning candidates then parts in order.
    pub fn first_inline_data(&self) -> Option<&InlineData> {
        self.candidates
            .iter()
            .filter_map(|candidate| candidate.content.as_ref())
            .flat_map(|content| content.parts.iter())
            .find_map(|part| part.inline_data.as_ref())
    }

    /// Errors if the prompt was blocked and nothing came back.
    pub fn check_blocked(&self) -> Result<(), GenerationError> {
        if self.candidates.is_empty()
            && let Some(reason) = self
                .prompt_feedback
                .as_ref()
                .and_then(|feedback| feedback.block_reason.clone())
        {
            return Err(GenerationError::Blocked(reason));
        }
        Ok(())
    }
}

// -----------------------------
// Client
// -----------------------------

/// Gemini REST client holding the key and model names for one run.
#[derive(Clone, Debug)]
pub struct GeminiClient {
    client: reqwest::Client,
    settings: GeminiSettings,
}

impl GeminiClient {
    /// Wraps a shared HTTP client.
    pub fn new(client: reqwest::Client, settings: GeminiSettings) -> Self {
        Self { client, settings }
    }

    fn endpoint_for(&self, model: &str) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.settings.endpoint.as_str().trim_end_matches('/'),
            model
        )
    }

    async fn generate_content(
        &self,
        model: &str,
        prompt: &str,
        response_modalities: Option<Vec<Modality>>,
    ) -> Result<GenerateContentResponse, GenerationError> {
        let req_body = GenerateContentRequest {
            contents: vec![RequestContent {
                role: "user",
                parts: vec![RequestPart { text: prompt }],
            }],
            generation_config: response_modalities
                .map(|response_modalities| GenerationConfig { response_modalities }),
        };

        let url = self.endpoint_for(model);
        debug!("POST {url}");
        let resp = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.settings.api_key)
            .json(&req_body)
            .send()
            .await?;

        let status = resp.status();
        let bytes = resp.bytes().await?;
        if !status.is_success() {
            return Err(GenerationError::Api {
                status,
                body: String::from_utf8_lossy(&bytes).into_owned(),
            });
        }

        Ok(serde_json::from_slice(&bytes)?)
    }
}

#[async_trait]
impl ContentGenerator for GeminiClient {
    async fn generate_text(&self, prompt: &str) -> Result<String, GenerationError> {
        self.generate_content(&self.settings.text_model, prompt, None)
            .await?
            .text()
    }

    async fn generate_image(
        &self,
        prompt: &str,
    ) -> Result<GenerateContentResponse, GenerationError> {
        let response = self
            .generate_content(
                &self.settings.image_model,
                prompt,
                Some(vec![Modality::Text, Modality::Image]),
            )
            .await?;
        response.check_blocked()?;
        Ok(response)
    }
}
