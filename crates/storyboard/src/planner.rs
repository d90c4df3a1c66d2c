//! Scene planner: story text to nine scenes with one breakdown call.

use crate::backends::{GenerationBackend, TextPurpose, TextRequest};
use crate::config::Style;
use crate::error::{Result, StoryboardError};
use crate::scene::{NarrativeAct, Scene, SCENES_PER_RUN, SHOT_TYPES};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info};

/// Default text model for the breakdown
pub const DEFAULT_PLANNER_MODEL: &str = "gemini-2.5-flash";

/// Scene as returned by the model, before validation.
/// Any `shotType` the model sends is ignored.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SceneDraft {
    position: u8,
    description: String,
    caption: String,
    mood: String,
    #[serde(default, alias = "video_prompt")]
    video_prompt: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Breakdown {
    Scenes(Vec<SceneDraft>),
    Wrapped { scenes: Vec<SceneDraft> },
}

impl Breakdown {
    fn into_drafts(self) -> Vec<SceneDraft> {
        match self {
            Self::Scenes(drafts) | Self::Wrapped { scenes: drafts } => drafts,
        }
    }
}

/// Turns a story into an ordered list of nine scenes
pub struct ScenePlanner {
    backend: Arc<dyn GenerationBackend>,
    model: String,
}

impl ScenePlanner {
    pub fn new(backend: Arc<dyn GenerationBackend>, model: impl Into<String>) -> Self {
        Self {
            backend,
            model: model.into(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Plan the story. All-or-nothing: any failure yields `Planning` and no scenes.
    pub async fn plan(
        &self,
        story: &str,
        style: Style,
        credential: Option<&str>,
    ) -> Result<Vec<Scene>> {
        info!(model = %self.model, style = %style, "planning storyboard scenes");

        let prompt = build_prompt(story, style);
        let request = TextRequest::new(TextPurpose::Breakdown, &self.model, prompt)
            .with_json_schema(breakdown_schema())
            .with_credential(credential.map(str::to_string));

        let raw = self
            .backend
            .plan_text(request)
            .await
            .map_err(|e| StoryboardError::planning(format!("{:#}", e)))?;

        debug!(len = raw.len(), "breakdown response received");

        let scenes = parse_breakdown(&raw)?;
        info!(scenes = scenes.len(), "storyboard planned");
        Ok(scenes)
    }
}

/// Prompt asking for a nine-scene, five-act breakdown as JSON
pub fn build_prompt(story: &str, style: Style) -> String {
    let acts: Vec<String> = [(1u8, 2u8), (3, 4), (5, 6), (7, 8), (9, 9)]
        .iter()
        .map(|&(first, last)| {
            let act = NarrativeAct::for_position(first).label();
            if first == last {
                format!("- scene {}: {}", first, act)
            } else {
                format!("- scenes {}-{}: {}", first, last, act)
            }
        })
        .collect();

    format!(
        "You are a storyboard artist. Break the story below into exactly {count} scenes \
for a 3x3 storyboard, following this five-act structure:\n{acts}\n\n\
Visual style: {style} ({hint}).\n\n\
STORY:\n{story}\n\n\
Return ONLY a JSON array of exactly {count} objects in narrative order. Each object has:\n\
- position: integer 1-{count}\n\
- description: one sentence describing what is visible in the frame\n\
- caption: a short caption of at most 12 words\n\
- mood: the mood and lighting\n\
- shotType: the camera shot type\n\
- videoPrompt: a camera and motion directive for animating the frame into a short clip\n\
Do not add commentary outside the JSON.",
        count = SCENES_PER_RUN,
        acts = acts.join("\n"),
        style = style.label(),
        hint = style.prompt_hint(),
        story = story.trim(),
    )
}

/// Response schema for structured-output capable models
pub fn breakdown_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "ARRAY",
        "items": {
            "type": "OBJECT",
            "properties": {
                "position": { "type": "INTEGER" },
                "description": { "type": "STRING" },
                "caption": { "type": "STRING" },
                "mood": { "type": "STRING" },
                "shotType": { "type": "STRING" },
                "videoPrompt": { "type": "STRING" }
            },
            "required": ["position", "description", "caption", "mood", "shotType", "videoPrompt"]
        }
    })
}

fn strip_code_fences(raw: &str) -> &str {
    raw.trim()
        .trim_start_matches("```json")
        .trim_start_matches("```JSON")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim()
}

/// Outermost `[...]` span, for responses with prose around the JSON
fn bracketed_span(raw: &str) -> Option<&str> {
    let start = raw.find('[')?;
    let end = raw.rfind(']')?;
    (start < end).then(|| &raw[start..=end])
}

/// Parse and validate a breakdown response into nine ordered scenes.
///
/// Shot types are always taken from [`SHOT_TYPES`] by position.
pub fn parse_breakdown(raw: &str) -> Result<Vec<Scene>> {
    let text = strip_code_fences(raw);
    if text.is_empty() {
        return Err(StoryboardError::planning("breakdown response was empty"));
    }

    let breakdown = match serde_json::from_str::<Breakdown>(text) {
        Ok(breakdown) => breakdown,
        Err(first_err) => bracketed_span(text)
            .and_then(|span| serde_json::from_str::<Breakdown>(span).ok())
            .ok_or_else(|| {
                StoryboardError::planning(format!(
                    "breakdown is not valid scene JSON: {}",
                    first_err
                ))
            })?,
    };

    let mut drafts = breakdown.into_drafts();
    if drafts.len() != SCENES_PER_RUN {
        return Err(StoryboardError::planning(format!(
            "expected {} scenes, got {}",
            SCENES_PER_RUN,
            drafts.len()
        )));
    }

    drafts.sort_by_key(|d| d.position);
    let positions: Vec<u8> = drafts.iter().map(|d| d.position).collect();
    let expected: Vec<u8> = (1..=SCENES_PER_RUN as u8).collect();
    if positions != expected {
        return Err(StoryboardError::planning(format!(
            "scene positions must be exactly 1-{}, got {:?}",
            SCENES_PER_RUN, positions
        )));
    }

    drafts
        .into_iter()
        .map(|draft| {
            for (field, value) in [
                ("description", &draft.description),
                ("caption", &draft.caption),
                ("mood", &draft.mood),
            ] {
                if value.trim().is_empty() {
                    return Err(StoryboardError::planning(format!(
                        "scene {} has an empty {}",
                        draft.position, field
                    )));
                }
            }

            Ok(Scene {
                position: draft.position,
                description: draft.description.trim().to_string(),
                caption: draft.caption.trim().to_string(),
                mood: draft.mood.trim().to_string(),
                shot_type: SHOT_TYPES[usize::from(draft.position) - 1].to_string(),
                video_prompt: draft.video_prompt.unwrap_or_default().trim().to_string(),
            })
        })
        .collect()
}
