//! Inference module - classifier lifecycle and prediction post-processing
//!
//! Re-exports only. All logic in submodules.

mod backend;
mod orchestrator;
mod prediction;
mod smoothing;
mod template;

pub use backend::{GestureModel, ModelLoader, TensorSpec};
pub use orchestrator::{
    InferenceConfig, InferenceOrchestrator, InferenceStats, ModelStatus, DEFAULT_MODEL_PATH,
};
pub use prediction::{argmax, now_ms, Prediction};
pub use smoothing::{PredictionSmoother, SmoothingConfig, HISTORY_SIZE};
pub use template::{TemplateModel, TemplateModelFile};
#[cfg(not(target_family = "wasm"))]
pub use template::TemplateLoader;
