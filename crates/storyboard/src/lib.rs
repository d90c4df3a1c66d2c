//! Storyboard generation
//!
//! Turns a short story and a character reference image into a 3x3
//! storyboard: one breakdown call plans nine scenes, then each scene is
//! rendered by an image model in small concurrent batches.

pub mod backends;
pub mod character;
pub mod config;
pub mod error;
pub mod orchestrator;
pub mod panel;
pub mod planner;
pub mod run;
pub mod scene;
pub mod settings;
pub mod synthesizer;

pub use backends::{
    BackendConfig, BackendFactory, BackendType, Credentials, GenerationBackend, ImageRequest,
    ImageResponse, InlineImage, TextPurpose, TextRequest,
};
pub use config::{AspectRatio, ReferenceImage, StoryConfig, Style, DEFAULT_IMAGE_MODEL};
pub use error::{Result, StoryboardError};
pub use orchestrator::{
    Orchestrator, Phase, WorkflowEvent, WorkflowSettings, WorkflowSnapshot, DEFAULT_BATCH_SIZE,
};
pub use panel::{Panel, PanelBoard, PanelCounts, PanelId, PanelImage, PanelStatus};
pub use planner::{ScenePlanner, DEFAULT_PLANNER_MODEL};
pub use run::{RunContext, RunId};
pub use scene::{NarrativeAct, Scene, SCENES_PER_RUN, SHOT_TYPES};
pub use settings::Settings;
pub use synthesizer::PanelSynthesizer;
