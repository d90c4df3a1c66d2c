//! Character description derived from the reference image
//!
//! One analysis call per run; every panel prompt reuses the result so the
//! character reads the same across all nine panels.

use crate::backends::{GenerationBackend, InlineImage, TextPurpose, TextRequest};
use tokio::sync::OnceCell;
use tracing::{debug, warn};

/// Longest description kept in prompts
pub const MAX_DESCRIPTION_CHARS: usize = 600;

const ANALYSIS_PROMPT: &str = "Describe the main character in this reference image so an \
illustrator can draw them consistently. Cover face, hair, body type, clothing, colours and any \
distinctive accessories. Reply with one compact paragraph and nothing else.";

/// Per-run memo of the character description.
///
/// Lives on the run context, so every new run starts empty.
#[derive(Debug, Default)]
pub struct CharacterMemo {
    description: OnceCell<Option<String>>,
}

impl CharacterMemo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Memoized description, if analysis already ran and succeeded
    pub fn cached(&self) -> Option<&str> {
        self.description.get().and_then(|d| d.as_deref())
    }

    pub fn is_initialized(&self) -> bool {
        self.description.initialized()
    }

    /// Run the analysis once; concurrent callers wait on the same call.
    ///
    /// A failed analysis is memoized as `None` and not retried within the run.
    pub async fn get_or_analyze(
        &self,
        backend: &dyn GenerationBackend,
        model: &str,
        reference: &InlineImage,
        credential: Option<&str>,
    ) -> Option<&str> {
        self.description
            .get_or_init(|| async {
                let request =
                    TextRequest::new(TextPurpose::CharacterAnalysis, model, ANALYSIS_PROMPT)
                        .with_attachment(reference.clone())
                        .with_credential(credential.map(str::to_string));

                match backend.plan_text(request).await {
                    Ok(text) => {
                        let cleaned = postprocess::truncate(
                            &postprocess::clean(&text),
                            MAX_DESCRIPTION_CHARS,
                        );
                        debug!(len = cleaned.len(), "character description memoized");
                        (!cleaned.is_empty()).then_some(cleaned)
                    }
                    Err(e) => {
                        warn!("character analysis failed, continuing without it: {:#}", e);
                        None
                    }
                }
            })
            .await
            .as_deref()
    }
}

/// Description post-processing utilities
pub mod postprocess {
    /// Collapse whitespace and strip wrapping quotes
    pub fn clean(text: &str) -> String {
        text.split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .trim_matches('"')
            .trim()
            .to_string()
    }

    /// Truncate to `max_chars`, ending with an ellipsis when cut
    pub fn truncate(text: &str, max_chars: usize) -> String {
        if text.chars().count() <= max_chars {
            text.to_string()
        } else {
            let mut truncated: String = text.chars().take(max_chars.saturating_sub(3)).collect();
            truncated.push_str("...");
            truncated
        }
    }
}
