//! Classifier runtime abstraction
//!
//! A backend loads a model by path and runs it on one `[1, N, 126]` window.
//! Whatever native tensor the backend builds lives in `GestureModel::Input`
//! and is released when that value drops, on success and failure alike.

use async_trait::async_trait;
use ndarray::Array3;
use serde::{Deserialize, Serialize};

use crate::classifier::GestureVocabulary;
use crate::error::PipelineResult;

/// Declared model input
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TensorSpec {
    pub name: String,
    pub shape: Vec<usize>,
}

impl TensorSpec {
    pub fn new(name: impl Into<String>, shape: Vec<usize>) -> Self {
        Self { name: name.into(), shape }
    }
}

/// A loaded gesture classifier
#[async_trait]
pub trait GestureModel: Send + Sync {
    /// Backend-native input tensor
    type Input: Send + Sync;

    /// Inputs the model declares. A model with none cannot be fed.
    fn inputs(&self) -> &[TensorSpec];

    /// Size of the output probability vector
    fn num_classes(&self) -> usize;

    /// Labels bundled with the model, if any
    fn labels(&self) -> Option<GestureVocabulary> {
        None
    }

    /// Convert a window into the backend's input tensor
    fn prepare(&self, window: &Array3<f32>) -> PipelineResult<Self::Input>;

    /// Run the classifier and read back the probability vector
    async fn predict(&self, input: &Self::Input) -> PipelineResult<Vec<f32>>;
}

/// Loads classifiers by path
#[async_trait]
pub trait ModelLoader: Send + Sync {
    type Model: GestureModel;

    async fn load(&self, path: &str) -> PipelineResult<Self::Model>;
}
