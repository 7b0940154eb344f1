//! Inference orchestrator: lazy model loading and window classification
//!
//! Status moves `Unloaded -> Loading -> Ready`, or ends in `Failed` until the
//! caller retries `load_model`. Every failure is kept as a message in
//! `error()`; nothing here returns an error to the UI.

use std::time::Instant;

use ndarray::Array3;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};

use super::backend::{GestureModel, ModelLoader};
use super::prediction::{now_ms, Prediction};
use crate::classifier::{GestureVocabulary, BUFFER_SIZE, FEATURE_COUNT};
use crate::error::{PipelineError, PipelineResult};

/// Where the classifier is fetched from when no path is given
pub const DEFAULT_MODEL_PATH: &str = "/models/model.json";

/// Orchestrator configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InferenceConfig {
    pub model_path: String,
    /// Timesteps expected in every window (N)
    pub window_size: usize,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            model_path: DEFAULT_MODEL_PATH.to_string(),
            window_size: BUFFER_SIZE,
        }
    }
}

/// Classifier lifecycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelStatus {
    Unloaded,
    Loading,
    Ready,
    Failed(String),
}

/// Statistics for inference latency
#[derive(Debug, Default, Clone, PartialEq)]
pub struct InferenceStats {
    pub total_inferences: u64,
    pub total_time_ms: f64,
    pub avg_time_ms: f64,
    pub min_time_ms: f64,
    pub max_time_ms: f64,
    pub last_time_ms: f64,
    pub failures: u64,
}

impl InferenceStats {
    /// Record a new inference timing
    pub fn record(&mut self, time_ms: f64) {
        self.total_inferences += 1;
        self.total_time_ms += time_ms;
        self.last_time_ms = time_ms;
        self.avg_time_ms = self.total_time_ms / self.total_inferences as f64;

        if self.total_inferences == 1 {
            self.min_time_ms = time_ms;
            self.max_time_ms = time_ms;
        } else {
            self.min_time_ms = self.min_time_ms.min(time_ms);
            self.max_time_ms = self.max_time_ms.max(time_ms);
        }
    }
}

/// Puts the status back to `Unloaded` if a load future is dropped mid-flight
struct LoadingGuard<'a> {
    status: &'a watch::Sender<ModelStatus>,
    armed: bool,
}

impl<'a> LoadingGuard<'a> {
    fn new(status: &'a watch::Sender<ModelStatus>) -> Self {
        status.send_replace(ModelStatus::Loading);
        Self { status, armed: true }
    }

    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.status.send_replace(ModelStatus::Unloaded);
        }
    }
}

/// Owns one classifier for one practice session (load once, infer many)
pub struct InferenceOrchestrator<L: ModelLoader> {
    loader: L,
    config: InferenceConfig,
    model: Option<L::Model>,
    /// Labels supplied by the caller; every loaded model must match them
    vocabulary: Option<GestureVocabulary>,
    /// Labels shipped with the current model, replaced on every load
    model_labels: Option<GestureVocabulary>,
    status: watch::Sender<ModelStatus>,
    error: Option<String>,
    last_inference_time_ms: Option<f64>,
    stats: InferenceStats,
}

impl<L: ModelLoader> InferenceOrchestrator<L> {
    pub fn new(loader: L, config: InferenceConfig) -> Self {
        let (status, _) = watch::channel(ModelStatus::Unloaded);
        Self {
            loader,
            config,
            model: None,
            vocabulary: None,
            model_labels: None,
            status,
            error: None,
            last_inference_time_ms: None,
            stats: InferenceStats::default(),
        }
    }

    /// Labels to attach to predictions; checked against the model on load
    pub fn with_vocabulary(mut self, vocabulary: GestureVocabulary) -> Self {
        self.vocabulary = Some(vocabulary);
        self
    }

    /// Load the model from the configured path
    pub async fn load_default_model(&mut self) -> bool {
        let path = self.config.model_path.clone();
        self.load_model(&path).await
    }

    /// Load (or reload) the classifier. Returns whether it is ready.
    ///
    /// `&mut self` keeps a single load in flight per orchestrator.
    #[instrument(skip(self))]
    pub async fn load_model(&mut self, path: &str) -> bool {
        self.error = None;
        let guard = LoadingGuard::new(&self.status);

        let loaded = self.loader.load(path).await;
        let result = loaded.and_then(|model| Self::check_model(&model, self.vocabulary.as_ref()).map(|_| model));

        guard.disarm();

        match result {
            Ok(model) => {
                info!(
                    path,
                    classes = model.num_classes(),
                    inputs = model.inputs().len(),
                    "Gesture model loaded"
                );
                self.model_labels = model.labels();
                self.model = Some(model);
                self.status.send_replace(ModelStatus::Ready);
                true
            }
            Err(e) => {
                let message = e.to_string();
                warn!(path, error = %message, "Gesture model failed to load");
                self.model = None;
                self.model_labels = None;
                self.error = Some(message.clone());
                self.status.send_replace(ModelStatus::Failed(message));
                false
            }
        }
    }

    fn check_model(model: &L::Model, vocabulary: Option<&GestureVocabulary>) -> PipelineResult<()> {
        if model.inputs().is_empty() {
            return Err(PipelineError::NoInputs);
        }
        if model.num_classes() == 0 {
            return Err(PipelineError::model_load("model declares no output classes"));
        }
        if let Some(vocabulary) = vocabulary {
            if vocabulary.len() != model.num_classes() {
                return Err(PipelineError::model_load(format!(
                    "vocabulary has {} labels but model outputs {} classes",
                    vocabulary.len(),
                    model.num_classes()
                )));
            }
        }
        Ok(())
    }

    /// Classify one `[1, N, 126]` window
    ///
    /// Loads the model on first use. Returns `None` on any failure, with the
    /// reason in `error()`; the loaded model stays usable for the next call.
    #[instrument(skip(self, data), fields(shape = ?data.shape()))]
    pub async fn run_inference(&mut self, data: &Array3<f32>) -> Option<Prediction> {
        if self.model.is_none() && !self.load_default_model().await {
            return None;
        }

        let expected = [1, self.config.window_size, FEATURE_COUNT];
        if data.shape() != expected {
            let err = PipelineError::invalid_format(expected.to_vec(), data.shape().to_vec());
            warn!(error = %err, "Rejected window");
            self.error = Some(err.to_string());
            return None;
        }

        let model = self.model.as_ref()?;
        match Self::classify(model, data).await {
            Ok((probabilities, elapsed_ms)) => {
                let Some(prediction) = Prediction::from_probabilities(probabilities, elapsed_ms, now_ms())
                else {
                    self.record_failure(PipelineError::inference("classifier returned no comparable probabilities"));
                    return None;
                };
                let label = self
                    .vocabulary()
                    .and_then(|v| v.label(prediction.predicted_class));
                let prediction = prediction.with_label(label);

                debug!(
                    class = prediction.predicted_class,
                    label = ?prediction.label,
                    confidence = prediction.confidence,
                    elapsed_ms,
                    "Inference completed"
                );
                self.stats.record(elapsed_ms);
                self.last_inference_time_ms = Some(elapsed_ms);
                self.error = None;
                Some(prediction)
            }
            Err(e) => {
                self.record_failure(e);
                None
            }
        }
    }

    /// Prepare, predict, check the output. The prepared input is dropped
    /// before this returns, whichever way it returns.
    async fn classify(model: &L::Model, data: &Array3<f32>) -> PipelineResult<(Vec<f32>, f64)> {
        let input = model.prepare(data)?;

        let start = Instant::now();
        let probabilities = model.predict(&input).await?;
        let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;
        drop(input);

        if probabilities.len() != model.num_classes() {
            return Err(PipelineError::inference(format!(
                "expected {} probabilities, got {}",
                model.num_classes(),
                probabilities.len()
            )));
        }
        Ok((probabilities, elapsed_ms))
    }

    fn record_failure(&mut self, err: PipelineError) {
        let message = match err {
            PipelineError::Inference(_) => err.to_string(),
            other => PipelineError::inference(other.to_string()).to_string(),
        };
        warn!(error = %message, "Inference failed");
        self.stats.failures += 1;
        self.error = Some(message);
    }

    pub fn status(&self) -> ModelStatus {
        self.status.borrow().clone()
    }

    /// Watch status changes, e.g. to show a spinner while `Loading`
    pub fn subscribe(&self) -> watch::Receiver<ModelStatus> {
        self.status.subscribe()
    }

    pub fn is_loading(&self) -> bool {
        matches!(*self.status.borrow(), ModelStatus::Loading)
    }

    pub fn is_ready(&self) -> bool {
        matches!(*self.status.borrow(), ModelStatus::Ready)
    }

    pub fn model_loaded(&self) -> bool {
        self.model.is_some()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn last_inference_time_ms(&self) -> Option<f64> {
        self.last_inference_time_ms
    }

    pub fn stats(&self) -> &InferenceStats {
        &self.stats
    }

    /// Caller-supplied labels, else the loaded model's own
    pub fn vocabulary(&self) -> Option<&GestureVocabulary> {
        self.vocabulary.as_ref().or(self.model_labels.as_ref())
    }

    pub fn config(&self) -> &InferenceConfig {
        &self.config
    }
}
