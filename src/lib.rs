//! Libras Gesture - real-time sign practice pipeline
//!
//! Hand landmarks go in, a timed right/wrong signal comes out:
//! - `landmarks`: detector-facing types and the frame source port
//! - `classifier`: rolling `[1, N, 126]` window and gesture vocabulary
//! - `inference`: lazy classifier lifecycle, predictions, smoothing
//! - `feedback`: debounced `idle -> processing -> correct|incorrect -> idle`
//! - `session`: one learner's practice loop tying the above together
//!
//! With the `wasm` feature, `bridge` exposes the same pipeline to a JS host
//! that runs the detector and the classifier itself.

pub mod classifier;
pub mod config;
pub mod error;
pub mod feedback;
pub mod inference;
pub mod landmarks;
pub mod session;

#[cfg(feature = "wasm")]
mod bridge;

pub use classifier::{FrameBuffer, GestureVocabulary, ModelMetadata};
pub use config::PipelineConfig;
pub use error::{PipelineError, PipelineResult, SourceError};
pub use feedback::{FeedbackDriver, FeedbackMachine, FeedbackState};
pub use inference::{InferenceOrchestrator, ModelStatus, Prediction};
pub use landmarks::{FrameSource, HandDetection, Handedness, LandmarkPoint};
pub use session::{PracticeSession, SessionStats};

#[cfg(feature = "wasm")]
pub use bridge::{
    feedback_tick, get_buffer_status, get_feedback_state, get_inference_buffer,
    init_panic_hook, push_hand_frame, reset_pipeline, set_feedback_state, set_target_gesture,
    set_vocabulary, set_video_dimensions, submit_probabilities,
};
