//! Workflow orchestration
//!
//! Drives one run through `Input -> Planning -> Generating -> Complete`:
//! plans nine scenes, synthesizes them in fixed-size batches (concurrent
//! within a batch, sequential across batches) and supports single-panel
//! regeneration afterwards.
//!
//! Every state write is tagged with the run it belongs to. Work that settles
//! after a reset, or after a newer run started, is dropped.

use crate::backends::{Credentials, GenerationBackend};
use crate::config::StoryConfig;
use crate::error::{Result, StoryboardError};
use crate::panel::{Panel, PanelBoard, PanelCounts, PanelId, PanelStatus};
use crate::planner::{ScenePlanner, DEFAULT_PLANNER_MODEL};
use crate::run::{RunContext, RunId};
use crate::synthesizer::PanelSynthesizer;
use chrono::{DateTime, Utc};
use futures::future::join_all;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

/// Default number of panels synthesized concurrently
pub const DEFAULT_BATCH_SIZE: usize = 3;

const EVENT_CAPACITY: usize = 64;

/// Workflow phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    /// No active run
    Input,
    /// Waiting on the scene breakdown
    Planning,
    /// Panels being synthesized
    Generating,
    /// All batches settled; panels may be regenerated
    Complete,
}

impl Default for Phase {
    fn default() -> Self {
        Self::Input
    }
}

/// Orchestrator settings
#[derive(Debug, Clone)]
pub struct WorkflowSettings {
    /// Panels per batch (0 is treated as 1)
    pub batch_size: usize,
    /// Text model used for the breakdown and character analysis
    pub planner_model: String,
    /// Memoize a character description from the reference image
    pub analyze_character: bool,
    /// Process-wide credential used when a config carries none
    pub default_credential: Option<String>,
}

impl Default for WorkflowSettings {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            planner_model: DEFAULT_PLANNER_MODEL.to_string(),
            analyze_character: true,
            default_credential: None,
        }
    }
}

/// Progress notifications for front ends
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkflowEvent {
    PhaseChanged {
        run_id: Option<RunId>,
        phase: Phase,
    },
    /// One batch's outcomes were applied together
    BatchApplied {
        run_id: RunId,
        batch: usize,
        panel_ids: Vec<PanelId>,
    },
    PanelRetrying {
        run_id: RunId,
        panel_id: PanelId,
    },
    PanelSettled {
        run_id: RunId,
        panel_id: PanelId,
    },
    Reset,
}

/// Point-in-time copy of the workflow state
#[derive(Debug, Clone, Serialize)]
pub struct WorkflowSnapshot {
    pub phase: Phase,
    pub run_id: Option<RunId>,
    pub started_at: Option<DateTime<Utc>>,
    pub panels: Vec<Panel>,
    pub counts: PanelCounts,
    pub last_error: Option<String>,
    pub show_captions: bool,
}

impl WorkflowSnapshot {
    pub fn panel(&self, id: PanelId) -> Option<&Panel> {
        self.panels.iter().find(|p| p.id == id)
    }

    /// Panels whose last attempt failed, in grid order
    pub fn failed_ids(&self) -> Vec<PanelId> {
        self.panels
            .iter()
            .filter(|p| p.status() == PanelStatus::Failed)
            .map(|p| p.id)
            .collect()
    }
}

#[derive(Debug, Default)]
struct WorkflowState {
    phase: Phase,
    run: Option<Arc<RunContext>>,
    board: PanelBoard,
    last_error: Option<String>,
}

impl WorkflowState {
    fn is_current(&self, id: RunId) -> bool {
        self.run.as_ref().map(|run| run.id) == Some(id)
    }

    fn run_id(&self) -> Option<RunId> {
        self.run.as_ref().map(|run| run.id)
    }

    fn snapshot(&self) -> WorkflowSnapshot {
        WorkflowSnapshot {
            phase: self.phase,
            run_id: self.run_id(),
            started_at: self.run.as_ref().map(|run| run.started_at),
            panels: self.board.to_vec(),
            counts: self.board.counts(),
            last_error: self.last_error.clone(),
            show_captions: self
                .run
                .as_ref()
                .map(|run| run.config.show_captions)
                .unwrap_or(true),
        }
    }
}

struct Inner {
    backend: Arc<dyn GenerationBackend>,
    planner: ScenePlanner,
    synthesizer: PanelSynthesizer,
    settings: WorkflowSettings,
    state: Mutex<WorkflowState>,
    events: broadcast::Sender<WorkflowEvent>,
}

impl Inner {
    fn emit(&self, event: WorkflowEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }
}

/// Returns the workflow to `Input` if a `start` future is dropped or unwinds
/// while its run is still current.
struct AbortGuard<'a> {
    inner: &'a Inner,
    run_id: RunId,
    armed: bool,
}

impl<'a> AbortGuard<'a> {
    fn new(inner: &'a Inner, run_id: RunId) -> Self {
        Self {
            inner,
            run_id,
            armed: true,
        }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for AbortGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut state = self.inner.state.lock();
        if !state.is_current(self.run_id) {
            return;
        }
        warn!(run = %self.run_id, "storyboard run aborted before completion");
        *state = WorkflowState {
            last_error: Some("run aborted before completion".to_string()),
            ..WorkflowState::default()
        };
        self.inner.emit(WorkflowEvent::PhaseChanged {
            run_id: None,
            phase: Phase::Input,
        });
    }
}

/// Handle to the workflow. Clones share the same state.
#[derive(Clone)]
pub struct Orchestrator {
    inner: Arc<Inner>,
}

impl Orchestrator {
    pub fn new(backend: Arc<dyn GenerationBackend>, settings: WorkflowSettings) -> Self {
        let planner = ScenePlanner::new(backend.clone(), settings.planner_model.clone());
        let synthesizer = PanelSynthesizer::new(backend.clone(), settings.planner_model.clone())
            .with_character_analysis(settings.analyze_character);
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        Self {
            inner: Arc::new(Inner {
                backend,
                planner,
                synthesizer,
                settings,
                state: Mutex::new(WorkflowState::default()),
                events,
            }),
        }
    }

    pub fn settings(&self) -> &WorkflowSettings {
        &self.inner.settings
    }

    pub fn subscribe(&self) -> broadcast::Receiver<WorkflowEvent> {
        self.inner.events.subscribe()
    }

    pub fn snapshot(&self) -> WorkflowSnapshot {
        self.inner.state.lock().snapshot()
    }

    pub fn phase(&self) -> Phase {
        self.inner.state.lock().phase
    }

    /// Run the whole workflow for `config` and return the completed state.
    ///
    /// Configuration problems are reported before any network call. A
    /// planning failure returns the workflow to `Input`. Panel failures are
    /// recorded on the panels and do not fail the run.
    pub async fn start(&self, config: StoryConfig) -> Result<WorkflowSnapshot> {
        let inner = &self.inner;

        config.validate()?;
        let credential = Credentials::new(
            config.credential.clone(),
            inner.settings.default_credential.clone(),
        )
        .resolve_for(inner.backend.as_ref())?;

        let run = Arc::new(RunContext::new(config, credential));
        {
            let mut state = inner.state.lock();
            if matches!(state.phase, Phase::Planning | Phase::Generating) {
                return Err(StoryboardError::RunInProgress);
            }
            *state = WorkflowState {
                phase: Phase::Planning,
                run: Some(run.clone()),
                board: PanelBoard::default(),
                last_error: None,
            };
            inner.emit(WorkflowEvent::PhaseChanged {
                run_id: Some(run.id),
                phase: Phase::Planning,
            });
        }
        let mut guard = AbortGuard::new(inner, run.id);

        let reference = run
            .config
            .reference_image
            .as_ref()
            .map(|r| r.digest())
            .unwrap_or_default();
        info!(
            run = %run.id,
            style = %run.config.style,
            aspect = %run.config.aspect_ratio,
            reference = %reference,
            "storyboard run started"
        );

        let planned = inner
            .planner
            .plan(&run.config.story, run.config.style, run.credential.as_deref())
            .await;

        let scenes = match planned {
            Ok(scenes) => scenes,
            Err(err) => {
                let mut state = inner.state.lock();
                if !state.is_current(run.id) {
                    return Err(StoryboardError::RunReset);
                }
                warn!(run = %run.id, "planning failed: {}", err);
                *state = WorkflowState {
                    last_error: Some(err.to_string()),
                    ..WorkflowState::default()
                };
                inner.emit(WorkflowEvent::PhaseChanged {
                    run_id: None,
                    phase: Phase::Input,
                });
                return Err(err);
            }
        };

        {
            let mut state = inner.state.lock();
            if !state.is_current(run.id) {
                return Err(StoryboardError::RunReset);
            }
            state.board = PanelBoard::from_scenes(&scenes);
            state.phase = Phase::Generating;
            inner.emit(WorkflowEvent::PhaseChanged {
                run_id: Some(run.id),
                phase: Phase::Generating,
            });
        }

        let batch_size = inner.settings.batch_size.max(1);
        let synthesizer = &inner.synthesizer;
        let run_ref = run.as_ref();

        for (batch, chunk) in scenes.chunks(batch_size).enumerate() {
            debug!(run = %run.id, batch, size = chunk.len(), "synthesizing batch");

            let outcomes = join_all(chunk.iter().map(|scene| async move {
                let outcome = synthesizer.synthesize(scene, run_ref).await;
                if let Err(err) = &outcome {
                    warn!(panel = scene.position, "panel failed: {}", err);
                }
                (scene.position, outcome)
            }))
            .await;

            let panel_ids: Vec<PanelId> = outcomes.iter().map(|(id, _)| *id).collect();

            {
                let mut state = inner.state.lock();
                if !state.is_current(run.id) {
                    debug!(run = %run.id, batch, "run reset mid-generation, dropping batch");
                    return Err(StoryboardError::RunReset);
                }
                state.board.apply_batch(outcomes);
                inner.emit(WorkflowEvent::BatchApplied {
                    run_id: run.id,
                    batch,
                    panel_ids,
                });
            }
        }

        guard.disarm();
        let mut state = inner.state.lock();
        if !state.is_current(run.id) {
            return Err(StoryboardError::RunReset);
        }
        state.phase = Phase::Complete;
        inner.emit(WorkflowEvent::PhaseChanged {
            run_id: Some(run.id),
            phase: Phase::Complete,
        });

        let snapshot = state.snapshot();
        info!(
            run = %run.id,
            ready = snapshot.counts.ready,
            failed = snapshot.counts.failed,
            "storyboard run complete"
        );
        Ok(snapshot)
    }

    /// Re-synthesize one panel outside the batch pipeline.
    ///
    /// Returns `None` without doing anything when there is no active run, the
    /// panel does not exist or is still loading. Also `None` when the run was
    /// reset while the call was in flight; the result is then discarded.
    pub async fn regenerate(&self, panel_id: PanelId) -> Option<Panel> {
        let inner = &self.inner;

        let (run, scene) = {
            let mut state = inner.state.lock();
            let run = state.run.clone()?;
            let scene = state.board.get(panel_id)?.scene.clone();
            if !state.board.begin_retry(panel_id) {
                return None;
            }
            inner.emit(WorkflowEvent::PanelRetrying {
                run_id: run.id,
                panel_id,
            });
            (run, scene)
        };

        info!(run = %run.id, panel = panel_id, "regenerating panel");
        let outcome = inner.synthesizer.synthesize(&scene, &run).await;

        let mut state = inner.state.lock();
        if !state.is_current(run.id) {
            debug!(run = %run.id, panel = panel_id, "run reset, dropping regenerated panel");
            return None;
        }
        state.board.settle(panel_id, outcome);
        inner.emit(WorkflowEvent::PanelSettled {
            run_id: run.id,
            panel_id,
        });
        state.board.get(panel_id).cloned()
    }

    /// Discard the run, its panels and configuration; back to `Input`.
    pub fn reset(&self) {
        let mut state = self.inner.state.lock();
        if let Some(run) = &state.run {
            info!(run = %run.id, "storyboard run reset");
        }
        *state = WorkflowState::default();
        self.inner.emit(WorkflowEvent::Reset);
    }
}
