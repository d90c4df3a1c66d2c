//! Panel state for one storyboard run
//!
//! A panel pairs a planned scene with its synthesis result and status.

use crate::error::StoryboardError;
use crate::scene::Scene;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Panel identifier, equal to the scene position
pub type PanelId = u8;

/// Rendered result of a panel
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PanelImage {
    /// Binary image returned by the model
    Rendered {
        mime_type: String,
        #[serde(with = "base64_bytes")]
        bytes: Vec<u8>,
    },
    /// Descriptive stand-in from a model that cannot output images
    Placeholder { description: String },
}

impl PanelImage {
    pub fn is_rendered(&self) -> bool {
        matches!(self, Self::Rendered { .. })
    }

    /// `data:` URL for rendered images
    pub fn to_data_url(&self) -> Option<String> {
        match self {
            Self::Rendered { mime_type, bytes } => Some(format!(
                "data:{};base64,{}",
                mime_type,
                base64::engine::general_purpose::STANDARD.encode(bytes)
            )),
            Self::Placeholder { .. } => None,
        }
    }

    /// File extension to save this result under
    pub fn file_extension(&self) -> &'static str {
        match self {
            Self::Rendered { mime_type, .. } => match mime_type.as_str() {
                "image/jpeg" => "jpg",
                "image/webp" => "webp",
                "image/gif" => "gif",
                _ => "png",
            },
            Self::Placeholder { .. } => "txt",
        }
    }
}

impl std::fmt::Debug for PanelImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Rendered { mime_type, bytes } => f
                .debug_struct("Rendered")
                .field("mime_type", mime_type)
                .field("len", &bytes.len())
                .finish(),
            Self::Placeholder { description } => f
                .debug_struct("Placeholder")
                .field("description", description)
                .finish(),
        }
    }
}

mod base64_bytes {
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&base64::engine::general_purpose::STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        base64::engine::general_purpose::STANDARD
            .decode(encoded)
            .map_err(serde::de::Error::custom)
    }
}

/// Derived panel status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PanelStatus {
    /// Waiting for its batch
    Pending,
    /// Synthesis in flight
    Loading,
    /// Image available
    Ready,
    /// Last attempt failed
    Failed,
}

/// One cell of the 3x3 grid
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Panel {
    pub id: PanelId,
    pub scene: Scene,
    pub image: Option<PanelImage>,
    pub loading: bool,
    pub error: Option<String>,
    /// Settled synthesis attempts
    pub attempts: u32,
}

impl Panel {
    /// New panel, loading, with no result yet
    pub fn new(scene: Scene) -> Self {
        Self {
            id: scene.position,
            scene,
            image: None,
            loading: true,
            error: None,
            attempts: 0,
        }
    }

    pub fn status(&self) -> PanelStatus {
        match (self.loading, &self.image, &self.error) {
            (true, _, _) if self.attempts == 0 => PanelStatus::Pending,
            (true, _, _) => PanelStatus::Loading,
            (false, Some(_), _) => PanelStatus::Ready,
            (false, None, _) => PanelStatus::Failed,
        }
    }

    /// Record the outcome of a synthesis call
    pub fn settle(&mut self, outcome: Result<PanelImage, StoryboardError>) {
        self.loading = false;
        self.attempts += 1;
        match outcome {
            Ok(image) => {
                self.image = Some(image);
                self.error = None;
            }
            Err(err) => {
                self.image = None;
                self.error = Some(err.to_string());
            }
        }
    }

    /// Put the panel back into loading for a retry
    pub fn begin_retry(&mut self) {
        self.loading = true;
        self.image = None;
        self.error = None;
    }

    pub fn is_settled(&self) -> bool {
        !self.loading
    }
}

/// Panel counts by status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PanelCounts {
    pub pending: usize,
    pub loading: usize,
    pub ready: usize,
    pub failed: usize,
}

/// The panels of one run, ordered by id
#[derive(Debug, Clone, Default)]
pub struct PanelBoard {
    panels: BTreeMap<PanelId, Panel>,
}

impl PanelBoard {
    /// Create one loading panel per scene
    pub fn from_scenes(scenes: &[Scene]) -> Self {
        let panels = scenes
            .iter()
            .cloned()
            .map(|scene| (scene.position, Panel::new(scene)))
            .collect();
        Self { panels }
    }

    pub fn get(&self, id: PanelId) -> Option<&Panel> {
        self.panels.get(&id)
    }

    /// Apply every outcome of one batch. Unknown ids are ignored.
    pub fn apply_batch(&mut self, outcomes: Vec<(PanelId, Result<PanelImage, StoryboardError>)>) {
        for (id, outcome) in outcomes {
            self.settle(id, outcome);
        }
    }

    /// Settle a single panel, returning false for unknown ids
    pub fn settle(&mut self, id: PanelId, outcome: Result<PanelImage, StoryboardError>) -> bool {
        match self.panels.get_mut(&id) {
            Some(panel) => {
                panel.settle(outcome);
                true
            }
            None => false,
        }
    }

    /// Mark a settled panel for retry; false if unknown or still loading
    pub fn begin_retry(&mut self, id: PanelId) -> bool {
        match self.panels.get_mut(&id) {
            Some(panel) if panel.is_settled() => {
                panel.begin_retry();
                true
            }
            _ => false,
        }
    }

    pub fn is_settled(&self) -> bool {
        self.panels.values().all(Panel::is_settled)
    }

    pub fn counts(&self) -> PanelCounts {
        let mut counts = PanelCounts::default();
        for panel in self.panels.values() {
            match panel.status() {
                PanelStatus::Pending => counts.pending += 1,
                PanelStatus::Loading => counts.loading += 1,
                PanelStatus::Ready => counts.ready += 1,
                PanelStatus::Failed => counts.failed += 1,
            }
        }
        counts
    }

    pub fn to_vec(&self) -> Vec<Panel> {
        self.panels.values().cloned().collect()
    }
}
