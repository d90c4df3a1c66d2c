use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use storyboard::{
    AspectRatio, BackendConfig, BackendFactory, BackendType, Credentials, GenerationBackend,
    Orchestrator, PanelImage, Phase, ReferenceImage, ScenePlanner, Settings,
    StoryConfig, Style, WorkflowEvent, WorkflowSnapshot, SCENES_PER_RUN, SHOT_TYPES,
};
use tokio::sync::broadcast;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "storyboard-cli")]
#[command(about = "Storyboard CLI - Turn a story and a character reference into a 3x3 storyboard")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(short, long, global = true)]
    verbose: bool,

    /// Settings file (defaults to the user config directory)
    #[arg(long, global = true)]
    settings: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Plan and render a full storyboard
    Generate {
        #[command(flatten)]
        story: StoryArgs,

        /// Character reference image (PNG, JPEG, WebP or GIF)
        #[arg(short, long)]
        reference: Option<PathBuf>,

        /// Aspect ratio (1:1, 16:9, 9:16, 4:3, 3:4)
        #[arg(long, default_value = "16:9")]
        aspect: AspectRatio,

        /// Hide captions in the exported storyboard
        #[arg(long)]
        no_captions: bool,

        /// Image model (defaults to the settings file)
        #[arg(long)]
        model: Option<String>,

        /// Panels rendered concurrently
        #[arg(long)]
        batch_size: Option<usize>,

        /// Skip the reference character analysis
        #[arg(long)]
        no_character_analysis: bool,

        /// Regenerate failed panels up to this many times
        #[arg(long, default_value = "0")]
        retry_failed: u32,

        /// Output directory
        #[arg(short, long, default_value = "storyboard")]
        output: PathBuf,

        #[command(flatten)]
        backend: BackendArgs,
    },

    /// Plan the nine scenes only and print them as JSON
    Plan {
        #[command(flatten)]
        story: StoryArgs,

        /// Write the scenes to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        backend: BackendArgs,
    },

    /// List styles, aspect ratios and shot types
    Options,

    /// Manage the stored API key
    Key {
        #[command(subcommand)]
        action: KeyAction,
    },
}

#[derive(clap::Args)]
struct StoryArgs {
    /// Story text
    #[arg(short, long, conflicts_with = "story_file")]
    story: Option<String>,

    /// Read the story from a file
    #[arg(long)]
    story_file: Option<PathBuf>,

    /// Visual style (name or slug, e.g. watercolor, film-noir)
    #[arg(long, default_value = "cinematic")]
    style: Style,

    /// Text model used for planning (defaults to the settings file)
    #[arg(long)]
    planner_model: Option<String>,
}

#[derive(clap::Args)]
struct BackendArgs {
    /// Backend (gemini, offline)
    #[arg(long)]
    backend: Option<BackendType>,

    /// API key for this invocation, overriding the stored key
    #[arg(long)]
    api_key: Option<String>,

    /// Override the API base URL
    #[arg(long)]
    api_url: Option<String>,
}

#[derive(Subcommand)]
enum KeyAction {
    /// Store an API key
    Set { key: String },
    /// Show whether a key is configured
    Show,
    /// Remove the stored key
    Clear,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt().with_max_level(level).init();

    let settings_path = cli.settings.unwrap_or_else(Settings::default_path);
    let settings = Settings::load(&settings_path)?;

    match cli.command {
        Commands::Generate {
            story,
            reference,
            aspect,
            no_captions,
            model,
            batch_size,
            no_character_analysis,
            retry_failed,
            output,
            backend,
        } => {
            let mut settings = settings;
            if let Some(size) = batch_size {
                settings.batch_size = size;
            }
            if no_character_analysis {
                settings.analyze_character = false;
            }
            if let Some(planner_model) = &story.planner_model {
                settings.planner_model = planner_model.clone();
            }

            let mut config = StoryConfig::new(read_story(&story)?)
                .with_style(story.style)
                .with_aspect_ratio(aspect)
                .with_captions(!no_captions)
                .with_model(model.unwrap_or_else(|| settings.image_model.clone()));
            if let Some(path) = reference {
                config = config.with_reference_image(ReferenceImage::from_path(&path)?);
            }
            if let Some(key) = backend.api_key.clone() {
                config = config.with_credential(key);
            }

            generate_command(&settings, &backend, config, retry_failed, output).await
        }
        Commands::Plan {
            story,
            output,
            backend,
        } => plan_command(&settings, &backend, &story, output).await,
        Commands::Options => options_command(),
        Commands::Key { action } => key_command(settings, &settings_path, action),
    }
}

fn read_story(args: &StoryArgs) -> Result<String> {
    match (&args.story, &args.story_file) {
        (Some(story), _) => Ok(story.clone()),
        (None, Some(path)) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read story file {}", path.display())),
        (None, None) => anyhow::bail!("provide a story with --story or --story-file"),
    }
}

fn create_backend(settings: &Settings, args: &BackendArgs) -> Result<Arc<dyn GenerationBackend>> {
    let mut config = BackendConfig::new(args.backend.unwrap_or(settings.backend));
    if let Some(url) = &args.api_url {
        config = config.with_api_url(url.clone());
    }
    let backend = BackendFactory::create(config)?;
    info!("Using {} backend", backend.name());
    Ok(backend)
}

async fn generate_command(
    settings: &Settings,
    backend_args: &BackendArgs,
    config: StoryConfig,
    retry_failed: u32,
    output: PathBuf,
) -> Result<()> {
    let backend = create_backend(settings, backend_args)?;
    let orchestrator = Orchestrator::new(backend, settings.workflow_settings());
    info!(
        "Rendering in batches of {} panels",
        orchestrator.settings().batch_size.max(1)
    );

    let bar = ProgressBar::new(SCENES_PER_RUN as u64);
    bar.set_style(
        ProgressStyle::with_template("{spinner} [{bar:30}] {pos}/{len} panels {msg}")?
            .progress_chars("=> "),
    );
    let progress = tokio::spawn(track_progress(orchestrator.subscribe(), bar.clone()));

    let result = orchestrator.start(config).await;
    progress.abort();
    let mut snapshot = match result {
        Ok(snapshot) => {
            bar.finish_with_message("done");
            snapshot
        }
        Err(e) => {
            bar.abandon_with_message("failed");
            return Err(e.into());
        }
    };

    for round in 1..=retry_failed {
        let failed = snapshot.failed_ids();
        if failed.is_empty() {
            break;
        }
        info!("Retry round {}: regenerating panels {:?}", round, failed);
        for id in failed {
            if let Some(panel) = orchestrator.regenerate(id).await {
                if let Some(error) = &panel.error {
                    warn!("Panel {} failed again: {}", id, error);
                }
            }
        }
        snapshot = orchestrator.snapshot();
    }

    write_storyboard(&snapshot, &output)?;

    info!(
        "Storyboard written to {:?} ({} ready, {} failed)",
        output, snapshot.counts.ready, snapshot.counts.failed
    );
    Ok(())
}

async fn track_progress(mut events: broadcast::Receiver<WorkflowEvent>, bar: ProgressBar) {
    loop {
        match events.recv().await {
            Ok(WorkflowEvent::PhaseChanged { phase, .. }) => match phase {
                Phase::Planning => bar.set_message("planning scenes"),
                Phase::Generating => bar.set_message("rendering"),
                Phase::Complete | Phase::Input => break,
            },
            Ok(WorkflowEvent::BatchApplied { panel_ids, .. }) => bar.inc(panel_ids.len() as u64),
            Ok(_) => {}
            Err(broadcast::error::RecvError::Lagged(_)) => continue,
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

#[derive(Serialize)]
struct PanelRecord<'a> {
    position: u8,
    shot_type: &'a str,
    act: &'static str,
    description: &'a str,
    caption: Option<&'a str>,
    mood: &'a str,
    video_prompt: &'a str,
    file: Option<String>,
    placeholder: bool,
    error: Option<&'a str>,
    attempts: u32,
}

/// One file per settled panel plus a `storyboard.json` manifest
fn write_storyboard(snapshot: &WorkflowSnapshot, output: &Path) -> Result<()> {
    std::fs::create_dir_all(output)?;

    let mut records = Vec::with_capacity(snapshot.panels.len());
    for panel in &snapshot.panels {
        let file = match &panel.image {
            Some(image) => {
                let name = format!("panel_{}.{}", panel.id, image.file_extension());
                match image {
                    PanelImage::Rendered { bytes, .. } => {
                        std::fs::write(output.join(&name), bytes)?
                    }
                    PanelImage::Placeholder { description } => {
                        std::fs::write(output.join(&name), description)?
                    }
                }
                Some(name)
            }
            None => None,
        };

        let scene = &panel.scene;
        records.push(PanelRecord {
            position: scene.position,
            shot_type: &scene.shot_type,
            act: scene.act().label(),
            description: &scene.description,
            caption: snapshot.show_captions.then_some(scene.caption.as_str()),
            mood: &scene.mood,
            video_prompt: &scene.video_prompt,
            file,
            placeholder: matches!(panel.image, Some(PanelImage::Placeholder { .. })),
            error: panel.error.as_deref(),
            attempts: panel.attempts,
        });
    }

    let manifest = serde_json::json!({
        "run_id": snapshot.run_id.map(|id| id.to_string()),
        "started_at": snapshot.started_at.map(|t| t.to_rfc3339()),
        "panels": records,
        "ready": snapshot.counts.ready,
        "failed": snapshot.counts.failed,
        "timestamp": chrono::Utc::now().to_rfc3339(),
    });
    std::fs::write(
        output.join("storyboard.json"),
        serde_json::to_string_pretty(&manifest)?,
    )?;
    Ok(())
}

async fn plan_command(
    settings: &Settings,
    backend_args: &BackendArgs,
    story: &StoryArgs,
    output: Option<PathBuf>,
) -> Result<()> {
    let backend = create_backend(settings, backend_args)?;
    let credential = Credentials::new(backend_args.api_key.clone(), settings.default_credential())
        .resolve_for(backend.as_ref())?;

    let model = story
        .planner_model
        .clone()
        .unwrap_or_else(|| settings.planner_model.clone());
    let planner = ScenePlanner::new(backend, model);
    info!("Planning with {}", planner.model());
    let scenes = planner
        .plan(&read_story(story)?, story.style, credential.as_deref())
        .await?;

    let json = serde_json::to_string_pretty(&scenes)?;
    if let Some(output_path) = output {
        std::fs::write(&output_path, json)?;
        info!("Scenes written to: {:?}", output_path);
    } else {
        println!("{}", json);
    }
    Ok(())
}

fn options_command() -> Result<()> {
    println!("Styles:");
    for style in Style::ALL {
        println!("  {:<16} {}", style.slug(), style.prompt_hint());
    }

    println!("\nAspect ratios:");
    for aspect in AspectRatio::ALL {
        let (width, height) = aspect.dimensions();
        println!("  {:<6} {}x{}", aspect.label(), width, height);
    }

    println!("\nShot types:");
    for (index, shot) in SHOT_TYPES.iter().enumerate() {
        println!("  {}. {}", index + 1, shot);
    }
    Ok(())
}

fn key_command(mut settings: Settings, path: &Path, action: KeyAction) -> Result<()> {
    match action {
        KeyAction::Set { key } => {
            let key = key.trim().to_string();
            if key.is_empty() {
                anyhow::bail!("API key must not be empty");
            }
            settings.api_key = Some(key);
            settings.save(path)?;
            info!("API key stored in {:?}", path);
        }
        KeyAction::Show => match settings.default_credential() {
            Some(key) => println!("API key configured: {}", mask(&key)),
            None => println!("No API key configured"),
        },
        KeyAction::Clear => {
            settings.api_key = None;
            settings.save(path)?;
            info!("API key removed from {:?}", path);
        }
    }
    Ok(())
}

fn mask(key: &str) -> String {
    let tail: String = key.chars().rev().take(4).collect::<Vec<_>>().into_iter().rev().collect();
    format!("****{}", tail)
}
