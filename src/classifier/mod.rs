//! Classifier module - window building and gesture vocabulary
//!
//! Rust turns per-frame hand detections into the `[1, N, 126]` window the
//! classifier consumes and maps class indices back to gesture labels.

mod buffer;
mod features;
mod vocabulary;

pub use buffer::{BufferConfig, FrameBuffer, FrameOutcome, BUFFER_SIZE, RESET_THRESHOLD};
pub use features::{extract_features, FrameSample, FEATURE_COUNT, MAX_HANDS};
pub use vocabulary::{GestureVocabulary, ModelMetadata};
