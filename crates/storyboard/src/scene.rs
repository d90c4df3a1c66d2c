//! Planned narrative beats and the fixed shot grammar.

use serde::{Deserialize, Serialize};

/// Number of scenes every run is planned into (a 3x3 grid)
pub const SCENES_PER_RUN: usize = 9;

/// Shot type for each grid position, in order. Model output never overrides these.
pub const SHOT_TYPES: [&str; SCENES_PER_RUN] = [
    "Establishing Wide Shot",
    "Medium Shot",
    "Close-Up",
    "Over-the-Shoulder Shot",
    "Low-Angle Shot",
    "Dutch Angle",
    "Extreme Close-Up",
    "High-Angle Shot",
    "Wide Closing Shot",
];

/// Shot type for a 1-based position, `None` outside 1..=9
pub fn shot_type_for(position: u8) -> Option<&'static str> {
    let index = usize::from(position).checked_sub(1)?;
    SHOT_TYPES.get(index).copied()
}

/// Five-act structure the planner segments stories into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NarrativeAct {
    Intro,
    Development,
    Twist,
    Climax,
    Resolution,
}

impl NarrativeAct {
    pub fn for_position(position: u8) -> Self {
        match position {
            0..=2 => Self::Intro,
            3..=4 => Self::Development,
            5..=6 => Self::Twist,
            7..=8 => Self::Climax,
            _ => Self::Resolution,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Intro => "intro",
            Self::Development => "development",
            Self::Twist => "twist",
            Self::Climax => "climax",
            Self::Resolution => "resolution",
        }
    }
}

/// One planned beat of the story
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scene {
    /// 1-based grid position, narrative order
    pub position: u8,

    /// One-sentence visual description
    pub description: String,

    /// Short caption
    pub caption: String,

    /// Mood and lighting
    pub mood: String,

    /// Fixed shot type for this position
    pub shot_type: String,

    /// Camera/motion directive for downstream video tooling
    pub video_prompt: String,
}

impl Scene {
    pub fn act(&self) -> NarrativeAct {
        NarrativeAct::for_position(self.position)
    }
}
