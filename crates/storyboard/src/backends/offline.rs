//! Offline backend
//!
//! Deterministic stand-in for a hosted service: breaks the story into beats
//! by sentence and renders flat colour tiles. Used for dry runs.

use super::{
    model_outputs_images, BackendType, GenerationBackend, ImageRequest, ImageResponse,
    InlineImage, TextPurpose, TextRequest,
};
use crate::scene::{NarrativeAct, SCENES_PER_RUN};
use anyhow::Result;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use sha2::{Digest, Sha256};

/// Tiles are rendered at a fraction of the model resolution
const TILE_SCALE: u32 = 8;

/// Offline backend
#[derive(Debug, Default)]
pub struct OfflineBackend;

impl OfflineBackend {
    pub fn new() -> Self {
        Self
    }

    /// Nine-beat breakdown built from the story's sentences
    fn breakdown(prompt: &str) -> Result<String> {
        let story = extract_story(prompt);
        let sentences: Vec<&str> = story
            .split(|c| matches!(c, '.' | '!' | '?' | '\n'))
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect();

        let scenes: Vec<serde_json::Value> = (1..=SCENES_PER_RUN as u8)
            .map(|position| {
                let beat = if sentences.is_empty() {
                    story.trim()
                } else {
                    let index = (usize::from(position) - 1) * sentences.len() / SCENES_PER_RUN;
                    sentences[index]
                };
                let act = NarrativeAct::for_position(position);
                serde_json::json!({
                    "position": position,
                    "description": format!("{} ({})", beat, act.label()),
                    "caption": beat,
                    "mood": format!("{} lighting", act.label()),
                    "shotType": "unspecified",
                    "videoPrompt": "slow push in",
                })
            })
            .collect();

        Ok(serde_json::to_string(&scenes)?)
    }

    fn render_tile(prompt: &str, width: u32, height: u32) -> Result<InlineImage> {
        let hash = Sha256::digest(prompt.as_bytes());
        let color = Rgb([hash[0], hash[1], hash[2]]);
        let tile = RgbImage::from_pixel(width.max(1), height.max(1), color);

        let mut bytes = Vec::new();
        DynamicImage::ImageRgb8(tile)
            .write_to(&mut std::io::Cursor::new(&mut bytes), ImageFormat::Png)?;

        Ok(InlineImage {
            mime_type: "image/png".to_string(),
            bytes,
        })
    }
}

/// Marker the planner puts right after the story block
const STORY_END: &str = "\n\nReturn ONLY";

/// The planner wraps the story in a `STORY:` block; fall back to the whole prompt
fn extract_story(prompt: &str) -> &str {
    match prompt.split_once("STORY:") {
        Some((_, rest)) => rest.split(STORY_END).next().unwrap_or(rest),
        None => prompt,
    }
}

#[async_trait::async_trait]
impl GenerationBackend for OfflineBackend {
    fn name(&self) -> &str {
        "Offline"
    }

    fn backend_type(&self) -> BackendType {
        BackendType::Offline
    }

    fn requires_credential(&self) -> bool {
        false
    }

    fn supports_image_output(&self, model: &str) -> bool {
        model_outputs_images(model)
    }

    async fn plan_text(&self, request: TextRequest) -> Result<String> {
        match request.purpose {
            TextPurpose::Breakdown => Self::breakdown(&request.prompt),
            TextPurpose::CharacterAnalysis => Ok(format!(
                "The character shown in the {} reference image",
                request
                    .attachments
                    .first()
                    .map(|a| a.mime_type.as_str())
                    .unwrap_or("attached")
            )),
            TextPurpose::PanelDescription => Ok(request
                .prompt
                .lines()
                .find(|line| line.starts_with("SCENE:"))
                .map(|line| line.trim_start_matches("SCENE:").trim().to_string())
                .unwrap_or_else(|| "An illustrated storyboard panel".to_string())),
        }
    }

    async fn synthesize_image(&self, request: ImageRequest) -> Result<ImageResponse> {
        let (width, height) = request.aspect_ratio.dimensions();
        let image = Self::render_tile(&request.prompt, width / TILE_SCALE, height / TILE_SCALE)?;
        Ok(ImageResponse {
            images: vec![image],
            text: None,
        })
    }
}
