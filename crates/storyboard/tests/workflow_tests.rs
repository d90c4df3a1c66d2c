//! Workflow integration tests
//! Batching, failure isolation, regeneration and reset against a scripted backend
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use storyboard::*;
use tokio::sync::{broadcast, Notify};

const PNG_MAGIC: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];

/// Backend whose behaviour each test scripts: failing panels, gated panels, call logs
struct ScriptedBackend {
    breakdown: Mutex<std::result::Result<String, String>>,
    breakdown_gate: Mutex<Option<Arc<Notify>>>,
    image_capable: bool,
    failing: Mutex<HashSet<u8>>,
    gates: Mutex<HashMap<u8, Arc<Notify>>>,
    started: Mutex<Vec<u8>>,
    finished: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    text_calls: Mutex<Vec<TextPurpose>>,
    image_requests: Mutex<Vec<ImageRequest>>,
}

impl ScriptedBackend {
    fn new() -> Self {
        Self {
            breakdown: Mutex::new(Ok(breakdown_json("Drone Shot"))),
            breakdown_gate: Mutex::new(None),
            image_capable: true,
            failing: Mutex::new(HashSet::new()),
            gates: Mutex::new(HashMap::new()),
            started: Mutex::new(Vec::new()),
            finished: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            text_calls: Mutex::new(Vec::new()),
            image_requests: Mutex::new(Vec::new()),
        }
    }

    fn fail_panel(&self, panel: u8) {
        self.failing.lock().insert(panel);
    }

    fn heal_panel(&self, panel: u8) {
        self.failing.lock().remove(&panel);
    }

    /// Hold the next synthesis of `panel` until the returned gate is notified
    fn gate_panel(&self, panel: u8) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.gates.lock().insert(panel, gate.clone());
        gate
    }

    /// Hold the next breakdown call until the returned gate is notified
    fn gate_breakdown(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.breakdown_gate.lock() = Some(gate.clone());
        gate
    }

    fn image_calls(&self) -> usize {
        self.image_requests.lock().len()
    }

    fn text_calls_for(&self, purpose: TextPurpose) -> usize {
        self.text_calls.lock().iter().filter(|p| **p == purpose).count()
    }
}

/// Panels are identified by the `frame-N` description the scripted breakdown uses
fn panel_of(prompt: &str) -> u8 {
    let rest = prompt
        .split("SCENE: frame-")
        .nth(1)
        .expect("prompt carries a scripted scene");
    rest.chars()
        .take_while(|c| c.is_ascii_digit())
        .collect::<String>()
        .parse()
        .expect("panel number")
}

#[async_trait::async_trait]
impl GenerationBackend for ScriptedBackend {
    fn name(&self) -> &str {
        "Scripted"
    }

    fn backend_type(&self) -> BackendType {
        BackendType::Offline
    }

    fn supports_image_output(&self, _model: &str) -> bool {
        self.image_capable
    }

    async fn plan_text(&self, request: TextRequest) -> anyhow::Result<String> {
        self.text_calls.lock().push(request.purpose);
        match request.purpose {
            TextPurpose::Breakdown => {
                let gate = self.breakdown_gate.lock().take();
                if let Some(gate) = gate {
                    gate.notified().await;
                }
                self.breakdown
                    .lock()
                    .clone()
                    .map_err(|e| anyhow::anyhow!(e))
            }
            TextPurpose::CharacterAnalysis => {
                Ok("a small silver robot with one blue eye".to_string())
            }
            TextPurpose::PanelDescription => Ok("a written panel".to_string()),
        }
    }

    async fn synthesize_image(&self, request: ImageRequest) -> anyhow::Result<ImageResponse> {
        let panel = panel_of(&request.prompt);
        self.started.lock().push(panel);
        self.image_requests.lock().push(request);

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let gate = self.gates.lock().remove(&panel);
        if let Some(gate) = gate {
            gate.notified().await;
        }
        tokio::task::yield_now().await;

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.finished.fetch_add(1, Ordering::SeqCst);

        if self.failing.lock().contains(&panel) {
            anyhow::bail!("scripted failure for panel {}", panel);
        }

        Ok(ImageResponse {
            images: vec![InlineImage {
                mime_type: "image/png".to_string(),
                bytes: vec![panel],
            }],
            text: None,
        })
    }
}

fn breakdown_json(shot: &str) -> String {
    let scenes: Vec<_> = (1..=9)
        .map(|p| {
            serde_json::json!({
                "position": p,
                "description": format!("frame-{} the robot and the flower", p),
                "caption": format!("Beat {}", p),
                "mood": "golden hour",
                "shotType": shot,
                "videoPrompt": "slow dolly in",
            })
        })
        .collect();
    serde_json::to_string(&scenes).unwrap()
}

fn reference() -> ReferenceImage {
    ReferenceImage::from_bytes(PNG_MAGIC.to_vec()).unwrap()
}

fn robot_config() -> StoryConfig {
    StoryConfig::new("A robot finds a flower")
        .with_style(Style::Watercolor)
        .with_aspect_ratio(AspectRatio::Landscape)
        .with_reference_image(reference())
}

fn orchestrator(backend: &Arc<ScriptedBackend>) -> Orchestrator {
    let settings = WorkflowSettings {
        analyze_character: false,
        ..Default::default()
    };
    Orchestrator::new(backend.clone(), settings)
}

async fn wait_until(mut condition: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}

async fn next_event(rx: &mut broadcast::Receiver<WorkflowEvent>) -> WorkflowEvent {
    tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("event in time")
        .expect("event channel open")
}

#[tokio::test]
async fn test_plan_yields_nine_scenes_with_fixed_shot_types() {
    let backend = Arc::new(ScriptedBackend::new());
    let planner = ScenePlanner::new(backend.clone(), DEFAULT_PLANNER_MODEL);

    let scenes = planner
        .plan("A robot finds a flower", Style::Watercolor, None)
        .await
        .unwrap();

    assert_eq!(scenes.len(), 9);
    let positions: HashSet<u8> = scenes.iter().map(|s| s.position).collect();
    assert_eq!(positions, (1..=9).collect());
    for scene in &scenes {
        // The scripted model said "Drone Shot" for every scene
        assert_eq!(scene.shot_type, SHOT_TYPES[scene.position as usize - 1]);
    }
}

#[tokio::test]
async fn test_three_batches_in_order() {
    let backend = Arc::new(ScriptedBackend::new());
    let orchestrator = orchestrator(&backend);
    let mut rx = orchestrator.subscribe();

    let snapshot = orchestrator.start(robot_config()).await.unwrap();
    assert_eq!(snapshot.phase, Phase::Complete);

    let mut batches = Vec::new();
    while let Ok(event) = rx.try_recv() {
        if let WorkflowEvent::BatchApplied { batch, panel_ids, .. } = event {
            batches.push((batch, panel_ids));
        }
    }
    assert_eq!(
        batches,
        vec![(0, vec![1, 2, 3]), (1, vec![4, 5, 6]), (2, vec![7, 8, 9])]
    );

    // Each batch starts only after the previous one settled
    let started = backend.started.lock().clone();
    for (index, chunk) in started.chunks(3).enumerate() {
        let expected: HashSet<u8> = (1..=3).map(|n| n + 3 * index as u8).collect();
        assert_eq!(chunk.iter().copied().collect::<HashSet<_>>(), expected);
    }
    assert_eq!(backend.max_in_flight.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_batch_results_visible_only_after_whole_batch() {
    let backend = Arc::new(ScriptedBackend::new());
    let orchestrator = orchestrator(&backend);
    let gate = backend.gate_panel(2);

    let runner = orchestrator.clone();
    let handle = tokio::spawn(async move { runner.start(robot_config()).await });

    // Panels 1 and 3 finish, panel 2 is held
    wait_until(|| backend.finished.load(Ordering::SeqCst) >= 2).await;
    let snapshot = orchestrator.snapshot();
    assert_eq!(snapshot.phase, Phase::Generating);
    for id in 1..=3 {
        let panel = snapshot.panel(id).unwrap();
        assert!(panel.loading, "panel {} visible before its batch settled", id);
        assert!(panel.image.is_none());
    }

    gate.notify_one();
    let snapshot = handle.await.unwrap().unwrap();
    assert!(snapshot.panels.iter().all(|p| !p.loading));
}

#[tokio::test]
async fn test_failed_panel_does_not_block_siblings_or_later_batches() {
    let backend = Arc::new(ScriptedBackend::new());
    backend.fail_panel(5);
    let orchestrator = orchestrator(&backend);

    let snapshot = orchestrator.start(robot_config()).await.unwrap();

    assert_eq!(snapshot.phase, Phase::Complete);
    assert_eq!(snapshot.panels.len(), 9);
    assert!(snapshot.panels.iter().all(|p| !p.loading));

    let failed = snapshot.panel(5).unwrap();
    assert_eq!(failed.status(), PanelStatus::Failed);
    assert!(failed.error.as_deref().unwrap().contains("scripted failure"));

    for id in [4, 6, 7, 8, 9] {
        assert_eq!(snapshot.panel(id).unwrap().status(), PanelStatus::Ready);
    }
    assert_eq!(snapshot.counts.ready, 8);
    assert_eq!(snapshot.counts.failed, 1);
    assert_eq!(snapshot.failed_ids(), vec![5]);
    assert_eq!(backend.image_calls(), 9);
}

#[tokio::test]
async fn test_regenerate_recovers_failed_panel_only() {
    let backend = Arc::new(ScriptedBackend::new());
    backend.fail_panel(5);
    let orchestrator = orchestrator(&backend);
    orchestrator.start(robot_config()).await.unwrap();

    backend.heal_panel(5);
    let gate = backend.gate_panel(5);
    let mut rx = orchestrator.subscribe();

    let runner = orchestrator.clone();
    let handle = tokio::spawn(async move { runner.regenerate(5).await });

    let run_id = orchestrator.snapshot().run_id.unwrap();
    assert_eq!(
        next_event(&mut rx).await,
        WorkflowEvent::PanelRetrying { run_id, panel_id: 5 }
    );
    let retrying = orchestrator.snapshot();
    assert_eq!(retrying.panel(5).unwrap().status(), PanelStatus::Loading);
    assert!(retrying.panel(5).unwrap().error.is_none());
    assert_eq!(retrying.phase, Phase::Complete);

    gate.notify_one();
    let panel = handle.await.unwrap().unwrap();
    assert_eq!(panel.status(), PanelStatus::Ready);
    assert_eq!(panel.attempts, 2);

    let snapshot = orchestrator.snapshot();
    for id in (1..=9).filter(|id| *id != 5) {
        assert_eq!(snapshot.panel(id).unwrap().attempts, 1);
        assert_eq!(snapshot.panel(id).unwrap().status(), PanelStatus::Ready);
    }
    assert_eq!(backend.image_calls(), 10);
}

#[tokio::test]
async fn test_regenerate_failure_stays_isolated() {
    let backend = Arc::new(ScriptedBackend::new());
    let orchestrator = orchestrator(&backend);
    orchestrator.start(robot_config()).await.unwrap();

    backend.fail_panel(1);
    let panel = orchestrator.regenerate(1).await.unwrap();
    assert_eq!(panel.status(), PanelStatus::Failed);
    assert_eq!(orchestrator.snapshot().counts.ready, 8);
    assert_eq!(orchestrator.phase(), Phase::Complete);
}

#[tokio::test]
async fn test_regenerate_unknown_panel_is_noop() {
    let backend = Arc::new(ScriptedBackend::new());
    let orchestrator = orchestrator(&backend);
    orchestrator.start(robot_config()).await.unwrap();

    assert!(orchestrator.regenerate(42).await.is_none());
    assert_eq!(backend.image_calls(), 9);
}

#[tokio::test]
async fn test_reset_during_generation_drops_in_flight_batch() {
    let backend = Arc::new(ScriptedBackend::new());
    let orchestrator = orchestrator(&backend);
    let gate = backend.gate_panel(2);

    let runner = orchestrator.clone();
    let handle = tokio::spawn(async move { runner.start(robot_config()).await });

    wait_until(|| backend.started.lock().len() >= 3).await;
    orchestrator.reset();
    gate.notify_one();

    let result = handle.await.unwrap();
    assert!(matches!(result, Err(StoryboardError::RunReset)));

    let snapshot = orchestrator.snapshot();
    assert_eq!(snapshot.phase, Phase::Input);
    assert!(snapshot.run_id.is_none());
    assert!(snapshot.panels.is_empty());
    // Later batches never started
    assert_eq!(backend.image_calls(), 3);
}

#[tokio::test]
async fn test_stale_regenerate_does_not_touch_new_run() {
    let backend = Arc::new(ScriptedBackend::new());
    let orchestrator = orchestrator(&backend);
    orchestrator.start(robot_config()).await.unwrap();

    let gate = backend.gate_panel(4);
    let mut rx = orchestrator.subscribe();
    let runner = orchestrator.clone();
    let stale = tokio::spawn(async move { runner.regenerate(4).await });
    assert!(matches!(
        next_event(&mut rx).await,
        WorkflowEvent::PanelRetrying { panel_id: 4, .. }
    ));
    // The stale call has reached the backend and holds the gate
    wait_until(|| backend.started.lock().len() == 10).await;

    orchestrator.reset();
    let fresh = orchestrator.start(robot_config()).await.unwrap();
    let fresh_run = fresh.run_id.unwrap();

    gate.notify_one();
    assert!(stale.await.unwrap().is_none());

    let snapshot = orchestrator.snapshot();
    assert_eq!(snapshot.run_id, Some(fresh_run));
    assert_eq!(snapshot.phase, Phase::Complete);
    let panel = snapshot.panel(4).unwrap();
    assert_eq!(panel.attempts, 1);
    assert_eq!(panel.status(), PanelStatus::Ready);
}

#[tokio::test]
async fn test_cancelled_start_returns_to_input() {
    let backend = Arc::new(ScriptedBackend::new());
    let orchestrator = orchestrator(&backend);
    let _gate = backend.gate_panel(2);
    let mut rx = orchestrator.subscribe();

    let cancelled =
        tokio::time::timeout(Duration::from_millis(100), orchestrator.start(robot_config())).await;
    assert!(cancelled.is_err());

    let snapshot = orchestrator.snapshot();
    assert_eq!(snapshot.phase, Phase::Input);
    assert!(snapshot.run_id.is_none());
    assert!(snapshot.panels.is_empty());
    assert!(snapshot.last_error.unwrap().contains("aborted"));

    let mut phases = Vec::new();
    while let Ok(event) = rx.try_recv() {
        if let WorkflowEvent::PhaseChanged { phase, .. } = event {
            phases.push(phase);
        }
    }
    assert_eq!(phases.last(), Some(&Phase::Input));

    // The workflow is usable again
    assert!(orchestrator.regenerate(1).await.is_none());
    let snapshot = orchestrator.start(robot_config()).await.unwrap();
    assert_eq!(snapshot.phase, Phase::Complete);
    assert_eq!(snapshot.counts.ready, 9);
}

#[tokio::test]
async fn test_reset_during_planning_discards_late_breakdown() {
    let backend = Arc::new(ScriptedBackend::new());
    let orchestrator = orchestrator(&backend);
    let gate = backend.gate_breakdown();

    let runner = orchestrator.clone();
    let handle = tokio::spawn(async move { runner.start(robot_config()).await });
    wait_until(|| backend.text_calls_for(TextPurpose::Breakdown) == 1).await;
    assert_eq!(orchestrator.phase(), Phase::Planning);

    // The held breakdown fails after the reset
    *backend.breakdown.lock() = Err("quota exceeded".to_string());
    orchestrator.reset();
    gate.notify_one();

    let result = handle.await.unwrap();
    assert!(matches!(result, Err(StoryboardError::RunReset)));

    let snapshot = orchestrator.snapshot();
    assert_eq!(snapshot.phase, Phase::Input);
    assert!(snapshot.panels.is_empty());
    assert!(snapshot.last_error.is_none());
    assert_eq!(backend.image_calls(), 0);
}

#[tokio::test]
async fn test_restart_during_planning_keeps_new_run() {
    let backend = Arc::new(ScriptedBackend::new());
    let orchestrator = orchestrator(&backend);
    let gate = backend.gate_breakdown();

    let runner = orchestrator.clone();
    let stale = tokio::spawn(async move { runner.start(robot_config()).await });
    wait_until(|| backend.text_calls_for(TextPurpose::Breakdown) == 1).await;

    orchestrator.reset();
    let fresh = orchestrator.start(robot_config()).await.unwrap();
    let fresh_run = fresh.run_id.unwrap();

    gate.notify_one();
    assert!(matches!(
        stale.await.unwrap(),
        Err(StoryboardError::RunReset)
    ));

    let snapshot = orchestrator.snapshot();
    assert_eq!(snapshot.run_id, Some(fresh_run));
    assert_eq!(snapshot.phase, Phase::Complete);
    assert_eq!(snapshot.counts.ready, 9);
    assert!(snapshot.panels.iter().all(|p| p.attempts == 1));
    assert!(snapshot.last_error.is_none());
    // Only the fresh run rendered panels
    assert_eq!(backend.image_calls(), 9);
}

#[tokio::test]
async fn test_start_rejected_while_running() {
    let backend = Arc::new(ScriptedBackend::new());
    let orchestrator = orchestrator(&backend);
    let gate = backend.gate_panel(1);

    let runner = orchestrator.clone();
    let handle = tokio::spawn(async move { runner.start(robot_config()).await });
    wait_until(|| !backend.started.lock().is_empty()).await;

    let second = orchestrator.start(robot_config()).await;
    assert!(matches!(second, Err(StoryboardError::RunInProgress)));

    gate.notify_one();
    assert!(handle.await.unwrap().is_ok());
}

#[tokio::test]
async fn test_robot_finds_a_flower_end_to_end() {
    let backend = Arc::new(ScriptedBackend::new());
    backend.fail_panel(7);
    let orchestrator = orchestrator(&backend);

    let snapshot = orchestrator.start(robot_config()).await.unwrap();

    assert_eq!(snapshot.phase, Phase::Complete);
    assert_eq!(snapshot.panels.len(), 9);
    assert!(snapshot.panels.iter().all(|p| p.is_settled()));
    assert_eq!(backend.text_calls_for(TextPurpose::Breakdown), 1);

    let requests = backend.image_requests.lock();
    assert_eq!(requests.len(), 9);
    for request in requests.iter() {
        assert_eq!(request.aspect_ratio, AspectRatio::Landscape);
        assert!(request.prompt.contains("Watercolor"));
        assert_eq!(request.reference.as_ref().unwrap().bytes, PNG_MAGIC.to_vec());
    }
}

#[tokio::test]
async fn test_missing_reference_rejected_before_any_call() {
    let backend = Arc::new(ScriptedBackend::new());
    let orchestrator = orchestrator(&backend);

    let config = StoryConfig::new("A robot finds a flower");
    let result = orchestrator.start(config).await;

    assert!(matches!(result, Err(StoryboardError::Configuration(_))));
    assert_eq!(orchestrator.phase(), Phase::Input);
    assert!(backend.text_calls.lock().is_empty());
    assert_eq!(backend.image_calls(), 0);
}

#[tokio::test]
async fn test_planning_failure_returns_to_input() {
    let backend = Arc::new(ScriptedBackend::new());
    *backend.breakdown.lock() = Err("quota exceeded".to_string());
    let orchestrator = orchestrator(&backend);

    let result = orchestrator.start(robot_config()).await;
    assert!(matches!(result, Err(StoryboardError::Planning(_))));

    let snapshot = orchestrator.snapshot();
    assert_eq!(snapshot.phase, Phase::Input);
    assert!(snapshot.panels.is_empty());
    assert!(snapshot.last_error.unwrap().contains("quota exceeded"));
    assert_eq!(backend.image_calls(), 0);
}

#[tokio::test]
async fn test_incomplete_breakdown_creates_no_panels() {
    let backend = Arc::new(ScriptedBackend::new());
    *backend.breakdown.lock() = Ok("```json\n[{\"position\": 1}]\n```".to_string());
    let orchestrator = orchestrator(&backend);

    let result = orchestrator.start(robot_config()).await;
    assert!(matches!(result, Err(StoryboardError::Planning(_))));
    assert!(orchestrator.snapshot().panels.is_empty());

    // A fixed breakdown lets the next start succeed
    *backend.breakdown.lock() = Ok(breakdown_json("whatever"));
    assert!(orchestrator.start(robot_config()).await.is_ok());
}

/// Scripted backend that insists on a credential
struct KeyedBackend(ScriptedBackend);

#[async_trait::async_trait]
impl GenerationBackend for KeyedBackend {
    fn name(&self) -> &str {
        "Keyed"
    }

    fn backend_type(&self) -> BackendType {
        BackendType::Gemini
    }

    fn requires_credential(&self) -> bool {
        true
    }

    fn supports_image_output(&self, model: &str) -> bool {
        self.0.supports_image_output(model)
    }

    async fn plan_text(&self, request: TextRequest) -> anyhow::Result<String> {
        self.0.plan_text(request).await
    }

    async fn synthesize_image(&self, request: ImageRequest) -> anyhow::Result<ImageResponse> {
        self.0.synthesize_image(request).await
    }
}

#[tokio::test]
async fn test_credential_resolution() {
    let backend = Arc::new(KeyedBackend(ScriptedBackend::new()));

    // Neither override nor default
    let orchestrator = Orchestrator::new(
        backend.clone(),
        WorkflowSettings {
            analyze_character: false,
            ..Default::default()
        },
    );
    let result = orchestrator.start(robot_config()).await;
    assert!(matches!(result, Err(StoryboardError::Configuration(_))));
    assert!(backend.0.text_calls.lock().is_empty());

    // Override wins over the process default
    let orchestrator = Orchestrator::new(
        backend.clone(),
        WorkflowSettings {
            analyze_character: false,
            default_credential: Some("process-key".to_string()),
            ..Default::default()
        },
    );
    orchestrator
        .start(robot_config().with_credential("caller-key"))
        .await
        .unwrap();
    assert!(backend
        .0
        .image_requests
        .lock()
        .iter()
        .all(|r| r.credential.as_deref() == Some("caller-key")));

    orchestrator.reset();
    backend.0.image_requests.lock().clear();
    orchestrator.start(robot_config()).await.unwrap();
    assert!(backend
        .0
        .image_requests
        .lock()
        .iter()
        .all(|r| r.credential.as_deref() == Some("process-key")));
}

#[tokio::test]
async fn test_character_analysis_once_per_run() {
    let backend = Arc::new(ScriptedBackend::new());
    let orchestrator = Orchestrator::new(backend.clone(), WorkflowSettings::default());

    orchestrator.start(robot_config()).await.unwrap();
    assert_eq!(backend.text_calls_for(TextPurpose::CharacterAnalysis), 1);
    assert!(backend
        .image_requests
        .lock()
        .iter()
        .all(|r| r.prompt.contains("CHARACTER: a small silver robot")));

    // A new run starts with an empty memo
    orchestrator.reset();
    orchestrator.start(robot_config()).await.unwrap();
    assert_eq!(backend.text_calls_for(TextPurpose::CharacterAnalysis), 2);
}

#[tokio::test]
async fn test_text_only_model_yields_placeholders() {
    let mut scripted = ScriptedBackend::new();
    scripted.image_capable = false;
    let backend = Arc::new(scripted);
    let orchestrator = orchestrator(&backend);

    let snapshot = orchestrator
        .start(robot_config().with_model("gemini-2.5-flash"))
        .await
        .unwrap();

    assert_eq!(snapshot.counts.ready, 9);
    assert!(snapshot
        .panels
        .iter()
        .all(|p| matches!(p.image, Some(PanelImage::Placeholder { .. }))));
    assert_eq!(backend.image_calls(), 0);
    assert_eq!(backend.text_calls_for(TextPurpose::PanelDescription), 9);
}
