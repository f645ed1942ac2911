//! Prompt expansion, image rendering and captions.

use std::io::Cursor;
use std::path::{Path, PathBuf};

use base64::Engine;
use base64::engine::general_purpose;
use image::{DynamicImage, ImageFormat};
use tracing::{debug, error, info};

use crate::constants::{FALLBACK_IMAGE_STEM, IMAGE_EXTENSION};
use crate::error::GenerationError;
use crate::gemini::{ContentGenerator, GenerateContentResponse};

fn image_prompt_instructions(topic: &str) -> String {
    format!(
        "Convert the following topic into a highly creative and detailed prompt for \
         generating a visually stunning image: '{topic}'. The prompt should evoke a \
         'viral' aesthetic and be suitable for an AI image generator."
    )
}

fn caption_instructions(topic: &str) -> String {
    format!(
        "Generate an engaging Instagram caption and 15 relevant hashtags for the topic: \
         '{topic}'. The caption should be short, shareable, and encourage interaction."
    )
}

/// Turns a short topic into a detailed image-generation prompt.
pub async fn expand_prompt<G: ContentGenerator + ?Sized>(
    generator: &G,
    topic: &str,
) -> Result<String, GenerationError> {
    match generator.generate_text(&image_prompt_instructions(topic)).await {
        Ok(prompt) => {
            info!("Generated image prompt: {prompt}");
            Ok(prompt)
        }
        Err(err) => {
            error!("Error generating image prompt: {err}");
            Err(err)
        }
    }
}

/// Writes a short caption plus hashtags for the topic.
pub async fn generate_caption<G: ContentGenerator + ?Sized>(
    generator: &G,
    topic: &str,
) -> Result<String, GenerationError> {
    match generator.generate_text(&caption_instructions(topic)).await {
        Ok(caption) => {
            info!("Generated caption: {caption}");
            Ok(caption)
        }
        Err(err) => {
            error!("Error generating Instagram caption: {err}");
            Err(err)
        }
    }
}

/// Renders the prompt and saves the first returned image at `path`.
pub async fn generate_image<G: ContentGenerator + ?Sized>(
    generator: &G,
    prompt: &str,
    path: &Path,
) -> Result<PathBuf, GenerationError> {
    let result = async {
        let response = generator.generate_image(prompt).await?;
        let bytes = extract_image_bytes(&response)?;
        save_image(&bytes, path)?;
        Ok::<_, GenerationError>(path.to_path_buf())
    }
    .await;

    match &result {
        Ok(path) => info!("Saved image: {}", path.display()),
        Err(err) => error!("Error generating image: {err}"),
    }
    result
}

/// Decoded bytes of the first inline part, candidates then parts in order.
pub fn extract_image_bytes(response: &GenerateContentResponse) -> Result<Vec<u8>, GenerationError> {
    let inline = response
        .first_inline_data()
        .ok_or(GenerationError::NoImageData)?;
    debug!("Found inline {} payload", inline.mime_type);

    for text in response
        .candidates
        .iter()
        .filter_map(|candidate| candidate.content.as_ref())
        .flat_map(|content| content.parts.iter())
        .filter_map(|part| part.text.as_deref())
    {
        debug!("Ignoring text returned alongside the image: {text}");
    }

    Ok(general_purpose::STANDARD.decode(&inline.data)?)
}

/// Decodes `bytes` and writes them as an RGB image, format chosen by extension.
pub fn save_image(bytes: &[u8], path: &Path) -> Result<(), GenerationError> {
    let decoded = image::load_from_memory(bytes)?;
    let format = ImageFormat::from_path(path)?;

    let mut encoded = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(decoded.to_rgb8()).write_to(&mut encoded, format)?;

    std::fs::write(path, encoded.into_inner()).map_err(|source| GenerationError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Topic reduced to alphanumerics, spaces and underscores, spaces as underscores.
pub fn sanitize_topic(topic: &str) -> String {
    topic
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == ' ' || *c == '_')
        .collect::<String>()
        .trim_end()
        .replace(' ', "_")
}

/// Where the image for `topic` goes inside `output_dir`.
pub fn image_path_for(output_dir: &Path, topic: &str) -> PathBuf {
    let stem = sanitize_topic(topic);
    let stem = if stem.is_empty() {
        FALLBACK_IMAGE_STEM
    } else {
        stem.as_str()
    };
    output_dir.join(format!("{stem}.{IMAGE_EXTENSION}"))
}
