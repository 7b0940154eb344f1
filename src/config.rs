//! Pipeline configuration
//!
//! One serde document covering every component. Missing fields take their
//! defaults; values from the model's `metadata.json` can be layered on top.

#[cfg(not(target_family = "wasm"))]
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::classifier::{BufferConfig, ModelMetadata};
use crate::error::{PipelineError, PipelineResult};
use crate::feedback::FeedbackConfig;
use crate::inference::{InferenceConfig, SmoothingConfig};

fn default_clear_after_recognition() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default)]
    pub buffer: BufferConfig,
    #[serde(default)]
    pub inference: InferenceConfig,
    #[serde(default)]
    pub feedback: FeedbackConfig,
    #[serde(default)]
    pub smoothing: SmoothingConfig,
    /// Start a fresh window after every judged prediction
    #[serde(default = "default_clear_after_recognition")]
    pub clear_after_recognition: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            buffer: BufferConfig::default(),
            inference: InferenceConfig::default(),
            feedback: FeedbackConfig::default(),
            smoothing: SmoothingConfig::default(),
            clear_after_recognition: default_clear_after_recognition(),
        }
    }
}

impl PipelineConfig {
    pub fn from_json_str(json: &str) -> PipelineResult<Self> {
        let config: PipelineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    #[cfg(not(target_family = "wasm"))]
    pub async fn load(path: impl AsRef<Path>) -> PipelineResult<Self> {
        let text = tokio::fs::read_to_string(path.as_ref()).await?;
        Self::from_json_str(&text)
    }

    /// Take window length, reset threshold and confidence floor from the model
    pub fn apply_metadata(&mut self, metadata: &ModelMetadata) {
        let window_size = metadata.timesteps;
        self.buffer.window_size = window_size;
        self.inference.window_size = window_size;

        if let Some(reset) = metadata.reset_threshold {
            self.buffer.max_consecutive_nulls = reset;
        }
        if let Some(threshold) = metadata.min_confidence_threshold {
            self.feedback.confidence_threshold = threshold;
            self.smoothing.min_confidence = threshold;
        }
        debug!(
            window_size,
            reset = self.buffer.max_consecutive_nulls,
            threshold = self.feedback.confidence_threshold,
            "Applied model metadata"
        );
    }

    pub fn validate(&self) -> PipelineResult<()> {
        if self.buffer.window_size == 0 {
            return Err(PipelineError::config("window size must be positive"));
        }
        if self.buffer.window_size != self.inference.window_size {
            return Err(PipelineError::config(format!(
                "buffer holds {} frames but the model expects {}",
                self.buffer.window_size, self.inference.window_size
            )));
        }
        if self.buffer.max_consecutive_nulls == 0 {
            return Err(PipelineError::config("reset threshold must be positive"));
        }
        if !(0.0..=1.0).contains(&self.feedback.confidence_threshold) {
            return Err(PipelineError::config(format!(
                "confidence threshold {} outside 0..1",
                self.feedback.confidence_threshold
            )));
        }
        Ok(())
    }
}
