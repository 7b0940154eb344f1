//! Gesture vocabulary and the model's `metadata.json`
//!
//! Labels are ordered exactly as the classifier's output layer.

#[cfg(not(target_family = "wasm"))]
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::features::FEATURE_COUNT;
use crate::error::{PipelineError, PipelineResult};

/// Index <-> label mapping for the classifier output
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GestureVocabulary {
    labels: Vec<String>,
}

impl GestureVocabulary {
    pub fn new(labels: Vec<String>) -> Self {
        Self { labels }
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn label(&self, index: usize) -> Option<&str> {
        self.labels.get(index).map(String::as_str)
    }

    /// Case-insensitive label lookup
    pub fn index_of(&self, label: &str) -> Option<usize> {
        let wanted = label.trim();
        self.labels.iter().position(|l| l.eq_ignore_ascii_case(wanted))
    }

    /// Does class `index` name the lesson's target gesture?
    pub fn matches_target(&self, index: usize, target: &str) -> bool {
        self.label(index)
            .is_some_and(|label| label.eq_ignore_ascii_case(target.trim()))
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }
}

/// Contents of `metadata.json` shipped next to the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelMetadata {
    #[serde(default)]
    pub model_version: Option<String>,
    pub input_shape: Vec<usize>,
    #[serde(default)]
    pub output_shape: Vec<usize>,
    pub timesteps: usize,
    pub features: usize,
    pub classes: Vec<String>,
    pub num_classes: usize,
    #[serde(default)]
    pub min_confidence_threshold: Option<f32>,
    #[serde(default)]
    pub buffer_size: Option<usize>,
    #[serde(default)]
    pub reset_threshold: Option<usize>,
}

impl ModelMetadata {
    pub fn from_json_str(json: &str) -> PipelineResult<Self> {
        let metadata: ModelMetadata = serde_json::from_str(json)?;
        metadata.validate()?;
        Ok(metadata)
    }

    #[cfg(not(target_family = "wasm"))]
    pub async fn load(path: impl AsRef<Path>) -> PipelineResult<Self> {
        let text = tokio::fs::read_to_string(path.as_ref()).await?;
        Self::from_json_str(&text)
    }

    /// Check the metadata describes a `[1, timesteps, 126]` model
    pub fn validate(&self) -> PipelineResult<()> {
        if self.classes.is_empty() {
            return Err(PipelineError::metadata("no gesture classes"));
        }
        if self.num_classes != self.classes.len() {
            return Err(PipelineError::metadata(format!(
                "numClasses is {} but {} classes are listed",
                self.num_classes,
                self.classes.len()
            )));
        }
        if self.features != FEATURE_COUNT {
            return Err(PipelineError::metadata(format!(
                "expected {} features per frame, got {}",
                FEATURE_COUNT, self.features
            )));
        }
        if self.timesteps == 0 {
            return Err(PipelineError::metadata("timesteps must be positive"));
        }
        let expected = [1, self.timesteps, self.features];
        if self.input_shape != expected {
            return Err(PipelineError::metadata(format!(
                "inputShape {:?} does not match [1, timesteps, features] = {:?}",
                self.input_shape, expected
            )));
        }
        if let Some(threshold) = self.min_confidence_threshold {
            if !(0.0..=1.0).contains(&threshold) {
                return Err(PipelineError::metadata(format!(
                    "minConfidenceThreshold {threshold} outside 0..1"
                )));
            }
        }
        Ok(())
    }

    pub fn vocabulary(&self) -> GestureVocabulary {
        GestureVocabulary::new(self.classes.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const METADATA: &str = r#"{
        "modelVersion": "1.0.0",
        "inputShape": [1, 30, 126],
        "outputShape": [1, 3],
        "timesteps": 30,
        "features": 126,
        "classes": ["A", "B", "OI"],
        "numClasses": 3,
        "minConfidenceThreshold": 0.7,
        "bufferSize": 30,
        "resetThreshold": 10
    }"#;

    #[test]
    fn test_parse_metadata() {
        let metadata = ModelMetadata::from_json_str(METADATA).unwrap();
        assert_eq!(metadata.timesteps, 30);
        assert_eq!(metadata.min_confidence_threshold, Some(0.7));
        assert_eq!(metadata.reset_threshold, Some(10));

        let vocabulary = metadata.vocabulary();
        assert_eq!(vocabulary.len(), 3);
        assert_eq!(vocabulary.label(2), Some("OI"));
    }

    #[test]
    fn test_rejects_class_count_mismatch() {
        let json = METADATA.replace("\"numClasses\": 3", "\"numClasses\": 61");
        let err = ModelMetadata::from_json_str(&json).unwrap_err();
        assert!(err.to_string().contains("numClasses is 61"));
    }

    #[test]
    fn test_rejects_wrong_feature_width() {
        let json = METADATA
            .replace("\"features\": 126", "\"features\": 63")
            .replace("[1, 30, 126]", "[1, 30, 63]");
        assert!(ModelMetadata::from_json_str(&json).is_err());
    }

    #[test]
    fn test_rejects_inconsistent_input_shape() {
        let json = METADATA.replace("[1, 30, 126]", "[1, 20, 126]");
        assert!(ModelMetadata::from_json_str(&json).is_err());
    }

    #[test]
    fn test_target_matching_ignores_case() {
        let vocabulary = GestureVocabulary::new(vec!["Oi".into(), "Tchau".into()]);
        assert!(vocabulary.matches_target(0, "OI"));
        assert!(vocabulary.matches_target(1, " tchau "));
        assert!(!vocabulary.matches_target(0, "TCHAU"));
        assert!(!vocabulary.matches_target(5, "OI"));
        assert_eq!(vocabulary.index_of("TCHAU"), Some(1));
    }

    #[tokio::test]
    async fn test_load_missing_file_is_io_error() {
        let err = ModelMetadata::load("/nonexistent/metadata.json").await.unwrap_err();
        assert!(matches!(err, PipelineError::Io(_)));
    }
}
