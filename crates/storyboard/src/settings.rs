//! Persisted user settings (credential and defaults)

use crate::backends::BackendType;
use crate::config::DEFAULT_IMAGE_MODEL;
use crate::error::{Result, StoryboardError};
use crate::orchestrator::{WorkflowSettings, DEFAULT_BATCH_SIZE};
use crate::planner::DEFAULT_PLANNER_MODEL;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable holding the process default credential
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Environment variable overriding the settings file location
pub const SETTINGS_PATH_ENV: &str = "STORYBOARD_SETTINGS";

/// Settings stored between sessions. Not a security boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub api_key: Option<String>,
    pub backend: BackendType,
    pub image_model: String,
    pub planner_model: String,
    pub batch_size: usize,
    pub analyze_character: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_key: None,
            backend: BackendType::Gemini,
            image_model: DEFAULT_IMAGE_MODEL.to_string(),
            planner_model: DEFAULT_PLANNER_MODEL.to_string(),
            batch_size: DEFAULT_BATCH_SIZE,
            analyze_character: true,
        }
    }
}

impl Settings {
    /// Default settings file, `$STORYBOARD_SETTINGS` or `<config dir>/storyboard/settings.json`
    pub fn default_path() -> PathBuf {
        if let Ok(path) = std::env::var(SETTINGS_PATH_ENV) {
            if !path.trim().is_empty() {
                return PathBuf::from(path);
            }
        }
        let base = dirs::config_dir().unwrap_or_else(std::env::temp_dir);
        base.join("storyboard").join("settings.json")
    }

    /// Load settings, falling back to defaults when the file does not exist
    pub fn load(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(json) => serde_json::from_str(&json).map_err(|e| {
                StoryboardError::configuration(format!(
                    "invalid settings file {}: {}",
                    path.display(),
                    e
                ))
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e.into()),
        }
    }

    /// Save settings as pretty JSON, creating parent directories
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Stored key, else the environment
    pub fn default_credential(&self) -> Option<String> {
        self.api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .or_else(|| std::env::var(API_KEY_ENV).ok())
            .filter(|key| !key.trim().is_empty())
    }

    pub fn workflow_settings(&self) -> WorkflowSettings {
        WorkflowSettings {
            batch_size: self.batch_size,
            planner_model: self.planner_model.clone(),
            analyze_character: self.analyze_character,
            default_credential: self.default_credential(),
        }
    }
}
