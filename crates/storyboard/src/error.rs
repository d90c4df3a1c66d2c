use thiserror::Error;

/// Failures surfaced by the storyboard workflow.
///
/// `Configuration` and `Planning` abort the operation they occur in.
/// `Synthesis` is always caught at the panel boundary and recorded on the
/// panel instead of being returned past a batch.
#[derive(Debug, Error)]
pub enum StoryboardError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("planning failed: {0}")]
    Planning(String),

    #[error("panel synthesis failed: {0}")]
    Synthesis(String),

    #[error("a run is already in progress")]
    RunInProgress,

    #[error("run was reset before it finished")]
    RunReset,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl StoryboardError {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    pub fn planning(message: impl Into<String>) -> Self {
        Self::Planning(message.into())
    }

    pub fn synthesis(message: impl Into<String>) -> Self {
        Self::Synthesis(message.into())
    }
}

pub type Result<T> = std::result::Result<T, StoryboardError>;
