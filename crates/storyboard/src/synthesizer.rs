//! Panel synthesizer: one scene in, one image (or written stand-in) out.

use crate::backends::{GenerationBackend, ImageRequest, InlineImage, TextPurpose, TextRequest};
use crate::config::StoryConfig;
use crate::error::{Result, StoryboardError};
use crate::panel::PanelImage;
use crate::run::RunContext;
use crate::scene::Scene;
use std::sync::Arc;
use tracing::{debug, warn};

/// Renders single panels against the run's reference image
pub struct PanelSynthesizer {
    backend: Arc<dyn GenerationBackend>,
    /// Text model used for character analysis
    analysis_model: String,
    analyze_character: bool,
}

impl PanelSynthesizer {
    pub fn new(backend: Arc<dyn GenerationBackend>, analysis_model: impl Into<String>) -> Self {
        Self {
            backend,
            analysis_model: analysis_model.into(),
            analyze_character: true,
        }
    }

    pub fn with_character_analysis(mut self, enabled: bool) -> Self {
        self.analyze_character = enabled;
        self
    }

    /// Synthesize one panel.
    ///
    /// Models that cannot output images yield a [`PanelImage::Placeholder`]
    /// instead of an error. An image-capable model that returns no image is
    /// a `Synthesis` failure.
    pub async fn synthesize(&self, scene: &Scene, run: &RunContext) -> Result<PanelImage> {
        let config = &run.config;
        let reference: InlineImage = config
            .reference_image
            .as_ref()
            .map(InlineImage::from)
            .ok_or_else(|| {
                StoryboardError::configuration("a character reference image is required")
            })?;

        let character = if self.analyze_character {
            run.character
                .get_or_analyze(
                    self.backend.as_ref(),
                    &self.analysis_model,
                    &reference,
                    run.credential.as_deref(),
                )
                .await
        } else {
            None
        };

        let prompt = build_prompt(scene, config, character);

        if !self.backend.supports_image_output(&config.model) {
            return Ok(self.describe_instead(scene, config, prompt, run).await);
        }

        debug!(panel = scene.position, model = %config.model, "synthesizing panel");

        let response = self
            .backend
            .synthesize_image(ImageRequest {
                model: config.model.clone(),
                prompt,
                reference: Some(reference),
                aspect_ratio: config.aspect_ratio,
                credential: run.credential.clone(),
            })
            .await
            .map_err(|e| StoryboardError::synthesis(format!("{:#}", e)))?;

        match response.images.into_iter().next() {
            Some(image) if !image.bytes.is_empty() => Ok(PanelImage::Rendered {
                mime_type: image.mime_type,
                bytes: image.bytes,
            }),
            _ => Err(StoryboardError::synthesis(match response.text {
                Some(text) => format!("model returned no image: {}", text.trim()),
                None => "model returned no image".to_string(),
            })),
        }
    }

    /// Written stand-in for text-only models. Never fails.
    async fn describe_instead(
        &self,
        scene: &Scene,
        config: &StoryConfig,
        image_prompt: String,
        run: &RunContext,
    ) -> PanelImage {
        let prompt = format!(
            "{}\n\nThis model cannot draw. Describe the finished illustration in one vivid \
paragraph.\nSCENE: {}",
            image_prompt, scene.description
        );
        let request = TextRequest::new(TextPurpose::PanelDescription, &config.model, prompt)
            .with_credential(run.credential.clone());

        let description = match self.backend.plan_text(request).await {
            Ok(text) if !text.trim().is_empty() => text.trim().to_string(),
            Ok(_) => scene.description.clone(),
            Err(e) => {
                warn!(panel = scene.position, "panel description failed: {:#}", e);
                scene.description.clone()
            }
        };

        PanelImage::Placeholder { description }
    }
}

/// Image prompt for one scene
pub fn build_prompt(scene: &Scene, config: &StoryConfig, character: Option<&str>) -> String {
    let mut prompt = String::from(
        "Use the attached reference image as the main character. Keep their face, hair, body \
proportions, clothing and colours identical to the reference in this panel. Do not add text, \
speech bubbles or panel borders.\n",
    );

    if let Some(character) = character {
        prompt.push_str(&format!("CHARACTER: {}\n", character));
    }

    prompt.push_str(&format!("SCENE: {}\n", scene.description));
    prompt.push_str(&format!("SHOT TYPE: {}\n", scene.shot_type));
    prompt.push_str(&format!("MOOD: {}\n", scene.mood));
    prompt.push_str(&format!(
        "STYLE: {}, {}\n",
        config.style.label(),
        config.style.prompt_hint()
    ));
    prompt.push_str(&format!("ASPECT RATIO: {}", config.aspect_ratio.label()));
    prompt
}
