//! Practice session simulator
//!
//! Replays scripted hand tracks through the full pipeline against a
//! template classifier and prints the feedback timeline as it happens.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use libras_gesture::classifier::extract_features;
use libras_gesture::inference::{
    ModelLoader, TemplateLoader, TemplateModel, TemplateModelFile, TensorSpec,
};
use libras_gesture::landmarks::{ScriptedSource, HAND_LANDMARK_COUNT};
use libras_gesture::{
    FeedbackMachine, FrameSource, HandDetection, Handedness, LandmarkPoint, ModelMetadata,
    PipelineConfig, PipelineResult, PracticeSession,
};

const FRAME_WIDTH: f32 = 640.0;
const FRAME_HEIGHT: f32 = 480.0;

#[derive(Parser, Debug)]
#[command(name = "practice_sim", about = "Simulate a sign practice session")]
struct Args {
    /// Template model JSON; a synthetic model is used when omitted
    #[arg(long)]
    model: Option<PathBuf>,

    /// `metadata.json` whose window length and thresholds override the config
    #[arg(long)]
    metadata: Option<PathBuf>,

    /// Pipeline configuration JSON
    #[arg(long)]
    config: Option<PathBuf>,

    /// Gestures of the synthetic model
    #[arg(long, value_delimiter = ',', default_value = "OI,OBRIGADO,TCHAU")]
    gestures: Vec<String>,

    /// Gesture the learner is asked to sign (defaults to the first one)
    #[arg(long)]
    target: Option<String>,

    /// Number of attempts to replay
    #[arg(long, default_value_t = 4)]
    attempts: usize,

    /// Every n-th attempt signs the wrong gesture (0 = never)
    #[arg(long, default_value_t = 3)]
    miss_every: usize,

    /// Frame interval in milliseconds
    #[arg(long, default_value_t = 33)]
    frame_interval_ms: u64,
}

/// Model source for the simulator: a file on disk or the built-in templates
enum SimLoader {
    File(TemplateLoader),
    Synthetic(TemplateModelFile),
}

#[async_trait]
impl ModelLoader for SimLoader {
    type Model = TemplateModel;

    async fn load(&self, path: &str) -> PipelineResult<TemplateModel> {
        match self {
            SimLoader::File(loader) => loader.load(path).await,
            SimLoader::Synthetic(file) => TemplateModel::from_file_contents(file.clone()),
        }
    }
}

/// Hand pose standing in for gesture `gesture`, with a little per-frame wobble
fn synthetic_hand(gesture: usize, frame: usize) -> HandDetection {
    let wobble = (frame % 5) as f32 * 0.5;
    let mut landmarks = [LandmarkPoint::default(); HAND_LANDMARK_COUNT];
    for (i, point) in landmarks.iter_mut().enumerate() {
        *point = LandmarkPoint::new(
            180.0 + 60.0 * gesture as f32 + 9.0 * i as f32 + wobble,
            120.0 + 40.0 * gesture as f32 + 6.0 * i as f32 - wobble,
            -0.01 * i as f32,
        );
    }
    HandDetection::new(landmarks, Handedness::Right, 0.95)
}

fn synthetic_model(gestures: &[String], window_size: usize) -> TemplateModelFile {
    TemplateModelFile {
        inputs: vec![TensorSpec::new("landmarks", vec![1, window_size, 126])],
        classes: gestures.to_vec(),
        templates: (0..gestures.len())
            .map(|g| extract_features(&[synthetic_hand(g, 2)], FRAME_WIDTH, FRAME_HEIGHT).to_vec())
            .collect(),
        temperature: 0.05,
    }
}

/// One attempt: a full window of the signed gesture, then hands down long
/// enough for the buffer to reset
fn script_attempt(source: &mut ScriptedSource, gesture: usize, window_size: usize, rest_frames: usize) {
    for frame in 0..window_size {
        source.push_hands(vec![synthetic_hand(gesture, frame)]);
    }
    source.push_empty(rest_frames);
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => PipelineConfig::load(path)
            .await
            .with_context(|| format!("reading config {}", path.display()))?,
        None => PipelineConfig::default(),
    };
    if let Some(path) = &args.metadata {
        let metadata = ModelMetadata::load(path)
            .await
            .with_context(|| format!("reading metadata {}", path.display()))?;
        config.apply_metadata(&metadata);
    }

    let window_size = config.buffer.window_size;
    let loader = match &args.model {
        Some(path) => {
            config.inference.model_path = path.display().to_string();
            SimLoader::File(TemplateLoader::new())
        }
        None => {
            anyhow::ensure!(!args.gestures.is_empty(), "at least one gesture is required");
            SimLoader::Synthetic(synthetic_model(&args.gestures, window_size))
        }
    };

    let mut machine = FeedbackMachine::new(config.feedback.clone());
    machine.on_state_change(|state, prediction| match prediction {
        Some(p) => info!(
            state = state.as_str(),
            label = p.label.as_deref().unwrap_or("?"),
            confidence = p.confidence,
            "Feedback"
        ),
        None => info!(state = state.as_str(), "Feedback"),
    });

    let mut session = PracticeSession::new(loader, &config, machine)?;
    if !session.orchestrator_mut().load_default_model().await {
        anyhow::bail!(
            "{}",
            session.orchestrator().error().unwrap_or("model failed to load")
        );
    }

    let gestures: Vec<String> = session
        .orchestrator()
        .vocabulary()
        .map(|v| v.labels().to_vec())
        .unwrap_or_else(|| args.gestures.clone());
    let target = args
        .target
        .clone()
        .or_else(|| gestures.first().cloned())
        .context("model has no gestures to practise")?;
    let target_index = gestures
        .iter()
        .position(|g| g.eq_ignore_ascii_case(&target))
        .unwrap_or(0);
    session.set_target(Some(&target));

    let rest_frames = config.buffer.max_consecutive_nulls + 2;
    let mut source = ScriptedSource::new(FRAME_WIDTH, FRAME_HEIGHT);
    for attempt in 1..=args.attempts {
        let signed = if args.miss_every > 0 && attempt % args.miss_every == 0 && gestures.len() > 1 {
            (target_index + 1) % gestures.len()
        } else {
            target_index
        };
        script_attempt(&mut source, signed, window_size, rest_frames);
    }
    source.start().await?;

    let interval = Duration::from_millis(args.frame_interval_ms);
    let mut timestamp_ms = 0.0;
    while source.remaining() > 0 {
        session.process_source_frame(&mut source, timestamp_ms).await;
        tokio::time::sleep(interval).await;
        timestamp_ms += args.frame_interval_ms as f64;
    }

    // Let the last verdict play out
    let feedback = &config.feedback;
    tokio::time::sleep(Duration::from_millis(
        feedback.processing_timeout_ms + feedback.feedback_duration_ms,
    ))
    .await;

    let inference = session.orchestrator().stats().clone();
    let stats = session.stop(&mut source).await;

    println!("target:      {target}");
    println!("attempts:    {}", stats.attempts);
    println!("hits:        {}", stats.hits);
    println!("accuracy:    {:.0}%", stats.accuracy() * 100.0);
    println!(
        "inferences:  {} (mean {:.2} ms, {} failed)",
        inference.total_inferences,
        inference.avg_time_ms,
        inference.failures
    );
    Ok(())
}
