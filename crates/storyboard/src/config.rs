//! Run configuration: story, style, aspect ratio and character reference.

use crate::error::{Result, StoryboardError};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Default image synthesis model
pub const DEFAULT_IMAGE_MODEL: &str = "gemini-2.5-flash-image-preview";

/// Output aspect ratio for every panel of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AspectRatio {
    #[serde(rename = "1:1")]
    Square,
    #[serde(rename = "16:9")]
    Landscape,
    #[serde(rename = "9:16")]
    Portrait,
    #[serde(rename = "4:3")]
    Standard,
    #[serde(rename = "3:4")]
    StandardPortrait,
}

impl AspectRatio {
    pub const ALL: [AspectRatio; 5] = [
        Self::Square,
        Self::Landscape,
        Self::Portrait,
        Self::Standard,
        Self::StandardPortrait,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Self::Square => "1:1",
            Self::Landscape => "16:9",
            Self::Portrait => "9:16",
            Self::Standard => "4:3",
            Self::StandardPortrait => "3:4",
        }
    }

    /// Pixel size the image models render at for this ratio
    pub fn dimensions(&self) -> (u32, u32) {
        match self {
            Self::Square => (1024, 1024),
            Self::Landscape => (1344, 768),
            Self::Portrait => (768, 1344),
            Self::Standard => (1184, 864),
            Self::StandardPortrait => (864, 1184),
        }
    }
}

impl Default for AspectRatio {
    fn default() -> Self {
        Self::Landscape
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for AspectRatio {
    type Err = StoryboardError;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().replace(' ', "");
        Self::ALL
            .into_iter()
            .find(|ratio| ratio.label() == normalized)
            .ok_or_else(|| {
                StoryboardError::configuration(format!(
                    "unknown aspect ratio '{}', expected one of: {}",
                    s,
                    Self::ALL.map(|r| r.label()).join(", ")
                ))
            })
    }
}

/// Visual style applied to every panel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Style {
    Cinematic,
    Anime,
    Watercolor,
    ComicBook,
    Animation3d,
    FilmNoir,
    PencilSketch,
    Photorealistic,
    OilPainting,
}

impl Style {
    pub const ALL: [Style; 9] = [
        Self::Cinematic,
        Self::Anime,
        Self::Watercolor,
        Self::ComicBook,
        Self::Animation3d,
        Self::FilmNoir,
        Self::PencilSketch,
        Self::Photorealistic,
        Self::OilPainting,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Self::Cinematic => "Cinematic",
            Self::Anime => "Anime",
            Self::Watercolor => "Watercolor",
            Self::ComicBook => "Comic Book",
            Self::Animation3d => "3D Animation",
            Self::FilmNoir => "Film Noir",
            Self::PencilSketch => "Pencil Sketch",
            Self::Photorealistic => "Photorealistic",
            Self::OilPainting => "Oil Painting",
        }
    }

    /// Rendering hints appended to image prompts
    pub fn prompt_hint(&self) -> &'static str {
        match self {
            Self::Cinematic => "cinematic film still, dramatic lighting, shallow depth of field",
            Self::Anime => "anime illustration, clean line art, cel shading",
            Self::Watercolor => "watercolor painting, soft washes, visible paper texture",
            Self::ComicBook => "comic book art, bold ink outlines, halftone shading",
            Self::Animation3d => "3D animated film render, soft global illumination",
            Self::FilmNoir => "black and white film noir, hard shadows, high contrast",
            Self::PencilSketch => "graphite pencil sketch, cross-hatching, monochrome",
            Self::Photorealistic => "photorealistic photograph, natural lighting, sharp detail",
            Self::OilPainting => "oil painting, thick impasto brushstrokes, rich color",
        }
    }

    /// Lowercase, hyphenated name accepted on the command line
    pub fn slug(&self) -> String {
        self.label().to_ascii_lowercase().replace(' ', "-")
    }
}

impl Default for Style {
    fn default() -> Self {
        Self::Cinematic
    }
}

impl fmt::Display for Style {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Style {
    type Err = StoryboardError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|style| {
                style.label().eq_ignore_ascii_case(wanted)
                    || style.slug().eq_ignore_ascii_case(wanted)
            })
            .ok_or_else(|| {
                StoryboardError::configuration(format!(
                    "unknown style '{}', expected one of: {}",
                    s,
                    Self::ALL.map(|st| st.label()).join(", ")
                ))
            })
    }
}

/// Character reference image sent alongside every panel prompt
#[derive(Clone, PartialEq, Eq)]
pub struct ReferenceImage {
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

impl ReferenceImage {
    /// Wrap raw image bytes, sniffing the format from its magic bytes
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        if bytes.is_empty() {
            return Err(StoryboardError::configuration("reference image is empty"));
        }

        let format = image::guess_format(&bytes).map_err(|e| {
            StoryboardError::configuration(format!("reference image format not recognised: {}", e))
        })?;

        let mime_type = match format {
            image::ImageFormat::Png => "image/png",
            image::ImageFormat::Jpeg => "image/jpeg",
            image::ImageFormat::WebP => "image/webp",
            image::ImageFormat::Gif => "image/gif",
            other => {
                return Err(StoryboardError::configuration(format!(
                    "unsupported reference image format: {:?}",
                    other
                )))
            }
        };

        Ok(Self {
            bytes,
            mime_type: mime_type.to_string(),
        })
    }

    /// Load a reference image from disk
    pub fn from_path(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path).map_err(|e| {
            StoryboardError::configuration(format!(
                "cannot read reference image {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_bytes(bytes)
    }

    /// Short content hash, stable across runs for the same image
    pub fn digest(&self) -> String {
        let hash = Sha256::digest(&self.bytes);
        hex::encode(&hash[..8])
    }
}

impl fmt::Debug for ReferenceImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReferenceImage")
            .field("mime_type", &self.mime_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// Everything a single run needs, fixed once the run starts
#[derive(Debug, Clone)]
pub struct StoryConfig {
    /// Free-text story outline
    pub story: String,

    /// Panel aspect ratio
    pub aspect_ratio: AspectRatio,

    /// Visual style
    pub style: Style,

    /// Whether captions are shown under panels
    pub show_captions: bool,

    /// Character reference (required before start)
    pub reference_image: Option<ReferenceImage>,

    /// Caller-supplied credential, overrides the process default
    pub credential: Option<String>,

    /// Image synthesis model identifier
    pub model: String,
}

impl StoryConfig {
    pub fn new(story: impl Into<String>) -> Self {
        Self {
            story: story.into(),
            aspect_ratio: AspectRatio::default(),
            style: Style::default(),
            show_captions: true,
            reference_image: None,
            credential: None,
            model: DEFAULT_IMAGE_MODEL.to_string(),
        }
    }

    pub fn with_style(mut self, style: Style) -> Self {
        self.style = style;
        self
    }

    pub fn with_aspect_ratio(mut self, aspect_ratio: AspectRatio) -> Self {
        self.aspect_ratio = aspect_ratio;
        self
    }

    pub fn with_reference_image(mut self, image: ReferenceImage) -> Self {
        self.reference_image = Some(image);
        self
    }

    pub fn with_credential(mut self, credential: impl Into<String>) -> Self {
        self.credential = Some(credential.into());
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_captions(mut self, show: bool) -> Self {
        self.show_captions = show;
        self
    }

    /// Check the config is complete enough to start a run
    pub fn validate(&self) -> Result<()> {
        if self.story.trim().is_empty() {
            return Err(StoryboardError::configuration("story text is empty"));
        }
        if self.model.trim().is_empty() {
            return Err(StoryboardError::configuration("model identifier is empty"));
        }
        match &self.reference_image {
            Some(image) if !image.bytes.is_empty() => Ok(()),
            _ => Err(StoryboardError::configuration(
                "a character reference image is required",
            )),
        }
    }
}
