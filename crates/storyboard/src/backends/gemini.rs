//! Gemini backend integration
//!
//! Talks to the Gemini `generateContent` REST endpoint for both the scene
//! breakdown (structured JSON output) and panel images (inline image parts).

use super::{
    model_outputs_images, BackendConfig, BackendType, GenerationBackend, ImageRequest,
    ImageResponse, InlineImage, TextPurpose, TextRequest,
};
use anyhow::{Context, Result};
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

const DEFAULT_API_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Gemini API backend
pub struct GeminiBackend {
    api_url: String,
    client: reqwest::Client,
}

impl GeminiBackend {
    /// Create new Gemini backend
    pub fn new(config: BackendConfig) -> Result<Self> {
        let api_url = config
            .api_url
            .unwrap_or_else(|| DEFAULT_API_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs.unwrap_or(120)))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { api_url, client })
    }

    fn endpoint(&self, model: &str) -> String {
        format!("{}/models/{}:generateContent", self.api_url, model)
    }

    /// Send one generateContent request and return the first candidate's parts
    async fn generate_content(
        &self,
        model: &str,
        credential: Option<&str>,
        request: &GenerateContentRequest,
    ) -> Result<Vec<Part>> {
        let key = credential.context("Gemini backend requires an API key")?;

        let response = self
            .client
            .post(self.endpoint(model))
            .header("x-goog-api-key", key)
            .json(request)
            .send()
            .await?;

        if !response.status().is_success() {
            anyhow::bail!(
                "Gemini API error: {} - {}",
                response.status(),
                response.text().await?
            );
        }

        let body: GenerateContentResponse = response.json().await?;

        if let Some(reason) = body.prompt_feedback.and_then(|f| f.block_reason) {
            anyhow::bail!("Gemini blocked the prompt: {}", reason);
        }

        let candidate = body
            .candidates
            .into_iter()
            .next()
            .context("Gemini returned no candidates")?;

        debug!(
            model,
            finish_reason = candidate.finish_reason.as_deref().unwrap_or("unknown"),
            "generateContent finished"
        );

        Ok(candidate.content.map(|c| c.parts).unwrap_or_default())
    }
}

#[async_trait::async_trait]
impl GenerationBackend for GeminiBackend {
    fn name(&self) -> &str {
        "Gemini"
    }

    fn backend_type(&self) -> BackendType {
        BackendType::Gemini
    }

    fn supports_image_output(&self, model: &str) -> bool {
        model_outputs_images(model)
    }

    async fn plan_text(&self, request: TextRequest) -> Result<String> {
        let mut parts = vec![Part::text(request.prompt)];
        parts.extend(request.attachments.iter().map(Part::inline));

        let generation_config = match (request.purpose, request.json_schema) {
            (TextPurpose::Breakdown, schema) | (_, schema @ Some(_)) => Some(GenerationConfig {
                response_mime_type: Some("application/json".to_string()),
                response_schema: schema,
                ..Default::default()
            }),
            _ => None,
        };

        let body = GenerateContentRequest {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts,
            }],
            generation_config,
        };

        let parts = self
            .generate_content(&request.model, request.credential.as_deref(), &body)
            .await?;

        let text: String = parts.into_iter().filter_map(|p| p.text).collect();
        if text.trim().is_empty() {
            anyhow::bail!("Gemini returned no text");
        }
        Ok(text)
    }

    async fn synthesize_image(&self, request: ImageRequest) -> Result<ImageResponse> {
        let mut parts = vec![Part::text(request.prompt)];
        if let Some(reference) = &request.reference {
            parts.push(Part::inline(reference));
        }

        let body = GenerateContentRequest {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts,
            }],
            generation_config: Some(GenerationConfig {
                response_modalities: Some(vec!["TEXT".to_string(), "IMAGE".to_string()]),
                image_config: Some(ImageConfig {
                    aspect_ratio: request.aspect_ratio.label().to_string(),
                }),
                ..Default::default()
            }),
        };

        let parts = self
            .generate_content(&request.model, request.credential.as_deref(), &body)
            .await?;

        let mut response = ImageResponse::default();
        let mut text = String::new();
        for part in parts {
            if let Some(inline) = part.inline_data {
                let bytes = base64::engine::general_purpose::STANDARD
                    .decode(inline.data.as_bytes())
                    .context("Gemini returned malformed image data")?;
                response.images.push(InlineImage {
                    mime_type: inline.mime_type,
                    bytes,
                });
            }
            if let Some(t) = part.text {
                text.push_str(&t);
            }
        }
        if !text.trim().is_empty() {
            response.text = Some(text);
        }

        Ok(response)
    }
}

/// generateContent request body
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    inline_data: Option<Blob>,
}

impl Part {
    fn text(text: String) -> Self {
        Self {
            text: Some(text),
            ..Default::default()
        }
    }

    fn inline(image: &InlineImage) -> Self {
        Self {
            inline_data: Some(Blob {
                mime_type: image.mime_type.clone(),
                data: base64::engine::general_purpose::STANDARD.encode(&image.bytes),
            }),
            ..Default::default()
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Blob {
    mime_type: String,
    data: String,
}

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_schema: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_modalities: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    image_config: Option<ImageConfig>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ImageConfig {
    aspect_ratio: String,
}

/// generateContent response body
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}
