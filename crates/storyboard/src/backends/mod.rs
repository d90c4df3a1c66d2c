//! Generation backends
//!
//! Unified interface over the hosted text/image generation services:
//! - Gemini API (`generateContent`)
//! - Offline renderer (deterministic, no network)

pub mod gemini;
pub mod offline;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub use gemini::GeminiBackend;
pub use offline::OfflineBackend;

use crate::config::{AspectRatio, ReferenceImage};
use crate::error::StoryboardError;

/// Backend type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendType {
    /// Google Gemini generateContent API
    Gemini,
    /// Local deterministic renderer
    Offline,
}

impl std::fmt::Display for BackendType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Gemini => write!(f, "gemini"),
            Self::Offline => write!(f, "offline"),
        }
    }
}

impl std::str::FromStr for BackendType {
    type Err = StoryboardError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gemini" => Ok(Self::Gemini),
            "offline" => Ok(Self::Offline),
            other => Err(StoryboardError::configuration(format!(
                "unknown backend '{}', expected gemini or offline",
                other
            ))),
        }
    }
}

/// Image payload sent to or returned by a backend
#[derive(Clone, PartialEq, Eq)]
pub struct InlineImage {
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl std::fmt::Debug for InlineImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InlineImage")
            .field("mime_type", &self.mime_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

impl From<&ReferenceImage> for InlineImage {
    fn from(image: &ReferenceImage) -> Self {
        Self {
            mime_type: image.mime_type.clone(),
            bytes: image.bytes.clone(),
        }
    }
}

/// Why a text request is made; lets backends shape the request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextPurpose {
    /// Nine-scene story breakdown (JSON)
    Breakdown,
    /// Description of the reference character
    CharacterAnalysis,
    /// Written stand-in for a panel a text-only model cannot draw
    PanelDescription,
}

/// Text generation request
#[derive(Debug, Clone)]
pub struct TextRequest {
    pub purpose: TextPurpose,
    pub model: String,
    pub prompt: String,
    pub attachments: Vec<InlineImage>,
    /// Structured output schema, when the caller wants JSON back
    pub json_schema: Option<serde_json::Value>,
    pub credential: Option<String>,
}

impl TextRequest {
    pub fn new(purpose: TextPurpose, model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            purpose,
            model: model.into(),
            prompt: prompt.into(),
            attachments: Vec::new(),
            json_schema: None,
            credential: None,
        }
    }

    pub fn with_attachment(mut self, image: InlineImage) -> Self {
        self.attachments.push(image);
        self
    }

    pub fn with_json_schema(mut self, schema: serde_json::Value) -> Self {
        self.json_schema = Some(schema);
        self
    }

    pub fn with_credential(mut self, credential: Option<String>) -> Self {
        self.credential = credential;
        self
    }
}

/// Image synthesis request
#[derive(Debug, Clone)]
pub struct ImageRequest {
    pub model: String,
    pub prompt: String,
    pub reference: Option<InlineImage>,
    pub aspect_ratio: AspectRatio,
    pub credential: Option<String>,
}

/// Image synthesis response: inline images plus any text the model returned
#[derive(Debug, Clone, Default)]
pub struct ImageResponse {
    pub images: Vec<InlineImage>,
    pub text: Option<String>,
}

/// Generation backend trait
#[async_trait::async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Backend name
    fn name(&self) -> &str;

    /// Backend type
    fn backend_type(&self) -> BackendType;

    /// Whether calls need a credential
    fn requires_credential(&self) -> bool {
        true
    }

    /// Whether `model` can return binary image data
    fn supports_image_output(&self, model: &str) -> bool;

    /// Generate text (plain or JSON)
    async fn plan_text(&self, request: TextRequest) -> Result<String>;

    /// Generate an image
    async fn synthesize_image(&self, request: ImageRequest) -> Result<ImageResponse>;
}

/// Naming rule for image-capable models: `*image*` or `imagen*`
pub fn model_outputs_images(model: &str) -> bool {
    let model = model.to_ascii_lowercase();
    model.contains("image") || model.starts_with("imagen")
}

/// Credential sources, resolved per call
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    /// Caller-supplied credential
    pub override_key: Option<String>,
    /// Process-wide default
    pub default_key: Option<String>,
}

impl Credentials {
    pub fn new(override_key: Option<String>, default_key: Option<String>) -> Self {
        Self {
            override_key,
            default_key,
        }
    }

    /// Override first, then default. Blank values count as absent.
    pub fn resolve(&self) -> Option<String> {
        [&self.override_key, &self.default_key]
            .into_iter()
            .flatten()
            .map(|key| key.trim())
            .find(|key| !key.is_empty())
            .map(str::to_string)
    }

    /// Resolve, failing when the backend needs a credential and none is set
    pub fn resolve_for(
        &self,
        backend: &dyn GenerationBackend,
    ) -> std::result::Result<Option<String>, StoryboardError> {
        match self.resolve() {
            Some(key) => Ok(Some(key)),
            None if backend.requires_credential() => Err(StoryboardError::configuration(format!(
                "{} backend requires an API key",
                backend.name()
            ))),
            None => Ok(None),
        }
    }
}

/// Backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Backend type
    pub backend_type: BackendType,

    /// API endpoint base URL (for cloud backends)
    pub api_url: Option<String>,

    /// Request timeout in seconds
    pub timeout_secs: Option<u64>,
}

impl BackendConfig {
    /// Create new backend config
    pub fn new(backend_type: BackendType) -> Self {
        Self {
            backend_type,
            api_url: None,
            timeout_secs: Some(120),
        }
    }

    /// With API endpoint
    pub fn with_api_url(mut self, url: String) -> Self {
        self.api_url = Some(url);
        self
    }

    /// With timeout
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }
}

/// Backend factory for creating backend instances
pub struct BackendFactory;

impl BackendFactory {
    /// Create backend from config
    pub fn create(config: BackendConfig) -> Result<Arc<dyn GenerationBackend>> {
        match config.backend_type {
            BackendType::Gemini => Ok(Arc::new(GeminiBackend::new(config)?)),
            BackendType::Offline => Ok(Arc::new(OfflineBackend::new())),
        }
    }
}
