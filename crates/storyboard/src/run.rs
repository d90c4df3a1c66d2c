//! Per-run context shared by the planner, synthesizer and orchestrator.

use crate::character::CharacterMemo;
use crate::config::StoryConfig;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Run identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(pub Uuid);

impl RunId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Everything scoped to one run. Dropped on reset; nothing leaks into the next run.
#[derive(Debug)]
pub struct RunContext {
    pub id: RunId,
    pub config: StoryConfig,
    /// Resolved credential for this run
    pub credential: Option<String>,
    pub character: CharacterMemo,
    pub started_at: DateTime<Utc>,
}

impl RunContext {
    pub fn new(config: StoryConfig, credential: Option<String>) -> Self {
        Self {
            id: RunId::new(),
            config,
            credential,
            character: CharacterMemo::new(),
            started_at: Utc::now(),
        }
    }
}
