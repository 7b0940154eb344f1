//! Error types for the recognition pipeline.

use thiserror::Error;

/// Result type alias for pipeline operations
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Pipeline errors
///
/// Every variant is recovered locally by the component that produced it and
/// surfaced to the UI as its `Display` string.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Tensor handed to inference does not match `[1, N, 126]`
    #[error("invalid data format: expected {expected:?}, got {actual:?}")]
    InvalidDataFormat {
        /// Expected shape
        expected: Vec<usize>,
        /// Actual shape
        actual: Vec<usize>,
    },

    /// Model could not be fetched or parsed
    #[error("failed to load model: {0}")]
    ModelLoad(String),

    /// Model loaded but declares no input tensors
    #[error("failed to load model: model has no defined inputs")]
    NoInputs,

    /// Classifier call failed
    #[error("inference error: {0}")]
    Inference(String),

    /// Model metadata is inconsistent
    #[error("invalid model metadata: {0}")]
    Metadata(String),

    /// Pipeline configuration is inconsistent
    #[error("configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl PipelineError {
    /// Create a model load error
    pub fn model_load<S: Into<String>>(msg: S) -> Self {
        PipelineError::ModelLoad(msg.into())
    }

    /// Create an inference error
    pub fn inference<S: Into<String>>(msg: S) -> Self {
        PipelineError::Inference(msg.into())
    }

    /// Create a metadata error
    pub fn metadata<S: Into<String>>(msg: S) -> Self {
        PipelineError::Metadata(msg.into())
    }

    /// Create a configuration error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        PipelineError::Config(msg.into())
    }

    /// Create a shape mismatch error
    pub fn invalid_format(expected: Vec<usize>, actual: Vec<usize>) -> Self {
        PipelineError::InvalidDataFormat { expected, actual }
    }
}

/// Errors raised by a landmark detector
#[derive(Error, Debug)]
pub enum SourceError {
    /// Detector was asked for a frame before `start`
    #[error("frame source not started")]
    NotStarted,

    /// Detector backend failed on this frame
    #[error("detection failed: {0}")]
    Detection(String),
}
