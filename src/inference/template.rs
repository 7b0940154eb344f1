//! Template-matching classifier backend
//!
//! A small file-backed model: one 126-wide reference frame per gesture.
//! A window is reduced to the mean of its frames that contain a hand and
//! scored by softmax over negative Euclidean distance to each template.

#[cfg(not(target_family = "wasm"))]
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use ndarray::{Array1, Array3, Axis};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::backend::{GestureModel, ModelLoader, TensorSpec};
use crate::classifier::{GestureVocabulary, FEATURE_COUNT};
use crate::error::{PipelineError, PipelineResult};

fn default_temperature() -> f32 {
    0.1
}

/// On-disk model format
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateModelFile {
    #[serde(default)]
    pub inputs: Vec<TensorSpec>,
    pub classes: Vec<String>,
    pub templates: Vec<Vec<f32>>,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

/// Loaded template classifier
#[derive(Debug, Clone)]
pub struct TemplateModel {
    inputs: Vec<TensorSpec>,
    vocabulary: GestureVocabulary,
    templates: Vec<Array1<f32>>,
    temperature: f32,
}

impl TemplateModel {
    pub fn from_file_contents(file: TemplateModelFile) -> PipelineResult<Self> {
        if file.templates.len() != file.classes.len() {
            return Err(PipelineError::model_load(format!(
                "{} templates for {} classes",
                file.templates.len(),
                file.classes.len()
            )));
        }
        if let Some(bad) = file.templates.iter().position(|t| t.len() != FEATURE_COUNT) {
            return Err(PipelineError::model_load(format!(
                "template {bad} has {} values, expected {FEATURE_COUNT}",
                file.templates[bad].len()
            )));
        }
        if !(file.temperature.is_finite() && file.temperature > 0.0) {
            return Err(PipelineError::model_load("temperature must be positive"));
        }

        Ok(Self {
            inputs: file.inputs,
            vocabulary: GestureVocabulary::new(file.classes),
            templates: file.templates.into_iter().map(Array1::from_vec).collect(),
            temperature: file.temperature,
        })
    }
}

/// Mean hand frame of a window
pub struct TemplateInput {
    mean: Array1<f32>,
}

#[async_trait]
impl GestureModel for TemplateModel {
    type Input = TemplateInput;

    fn inputs(&self) -> &[TensorSpec] {
        &self.inputs
    }

    fn num_classes(&self) -> usize {
        self.templates.len()
    }

    fn labels(&self) -> Option<GestureVocabulary> {
        Some(self.vocabulary.clone())
    }

    fn prepare(&self, window: &Array3<f32>) -> PipelineResult<TemplateInput> {
        let frames = window.index_axis(Axis(0), 0);
        let mut sum = Array1::<f32>::zeros(FEATURE_COUNT);
        let mut count = 0usize;
        for frame in frames.axis_iter(Axis(0)) {
            if frame.iter().any(|&v| v != 0.0) {
                sum += &frame;
                count += 1;
            }
        }
        if count > 0 {
            sum /= count as f32;
        }
        Ok(TemplateInput { mean: sum })
    }

    async fn predict(&self, input: &TemplateInput) -> PipelineResult<Vec<f32>> {
        let logits: Vec<f32> = self
            .templates
            .iter()
            .map(|t| {
                let distance = (&input.mean - t).mapv(|d| d * d).sum().sqrt();
                -distance / self.temperature
            })
            .collect();

        let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        if !max.is_finite() {
            return Err(PipelineError::inference("non-finite template score"));
        }
        let exps: Vec<f32> = logits.iter().map(|l| (l - max).exp()).collect();
        let total: f32 = exps.iter().sum();
        Ok(exps.into_iter().map(|e| e / total).collect())
    }
}

/// Reads template models from disk
///
/// Absolute web-style paths such as `/models/model.json` are resolved under
/// `root` when one is set.
#[cfg(not(target_family = "wasm"))]
#[derive(Debug, Clone, Default)]
pub struct TemplateLoader {
    root: Option<PathBuf>,
}

#[cfg(not(target_family = "wasm"))]
impl TemplateLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self { root: Some(root.into()) }
    }

    fn resolve(&self, path: &str) -> PathBuf {
        match &self.root {
            Some(root) => root.join(path.trim_start_matches('/')),
            None => Path::new(path).to_path_buf(),
        }
    }
}

#[cfg(not(target_family = "wasm"))]
#[async_trait]
impl ModelLoader for TemplateLoader {
    type Model = TemplateModel;

    async fn load(&self, path: &str) -> PipelineResult<TemplateModel> {
        let resolved = self.resolve(path);
        debug!(path = %resolved.display(), "Reading template model");

        let text = tokio::fs::read_to_string(&resolved)
            .await
            .map_err(|e| PipelineError::model_load(format!("{}: {e}", resolved.display())))?;
        let file: TemplateModelFile = serde_json::from_str(&text)
            .map_err(|e| PipelineError::model_load(format!("{}: {e}", resolved.display())))?;

        TemplateModel::from_file_contents(file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn file(classes: &[&str]) -> TemplateModelFile {
        TemplateModelFile {
            inputs: vec![TensorSpec::new("landmarks", vec![1, 30, 126])],
            classes: classes.iter().map(|c| c.to_string()).collect(),
            templates: (0..classes.len())
                .map(|i| vec![i as f32 * 0.5; FEATURE_COUNT])
                .collect(),
            temperature: 0.1,
        }
    }

    #[tokio::test]
    async fn test_nearest_template_wins() {
        let model = TemplateModel::from_file_contents(file(&["A", "B", "C"])).unwrap();
        let mut window = Array3::<f32>::zeros((1, 30, FEATURE_COUNT));
        window.slice_mut(ndarray::s![0, 10.., ..]).fill(0.5);

        let input = model.prepare(&window).unwrap();
        let probabilities = model.predict(&input).await.unwrap();

        assert_eq!(probabilities.len(), 3);
        assert_abs_diff_eq!(probabilities.iter().sum::<f32>(), 1.0, epsilon = 1e-5);
        assert_eq!(crate::inference::argmax(&probabilities), Some(1));
    }

    #[test]
    fn test_rejects_template_count_mismatch() {
        let mut contents = file(&["A", "B"]);
        contents.templates.pop();
        assert!(TemplateModel::from_file_contents(contents).is_err());
    }

    #[test]
    fn test_rejects_short_template() {
        let mut contents = file(&["A"]);
        contents.templates[0].truncate(10);
        let err = TemplateModel::from_file_contents(contents).unwrap_err();
        assert!(err.to_string().contains("template 0 has 10 values"));
    }

    #[tokio::test]
    async fn test_loader_resolves_under_root() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("models")).unwrap();
        let json = serde_json::to_string(&file(&["OI", "TCHAU"])).unwrap();
        std::fs::write(dir.path().join("models/model.json"), json).unwrap();

        let model = TemplateLoader::with_root(dir.path())
            .load("/models/model.json")
            .await
            .unwrap();
        assert_eq!(model.num_classes(), 2);
        assert_eq!(model.labels().unwrap().label(1), Some("TCHAU"));
    }

    #[tokio::test]
    async fn test_loader_reports_missing_file() {
        let err = TemplateLoader::new().load("/nonexistent/model.json").await.unwrap_err();
        assert!(matches!(err, PipelineError::ModelLoad(_)));
    }
}
