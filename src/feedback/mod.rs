//! Feedback module - debounced right/wrong signal for the UI
//!
//! Re-exports only. All logic in submodules.

mod driver;
mod machine;
mod state;

pub use driver::FeedbackDriver;
pub use machine::{FeedbackListener, FeedbackMachine};
pub use state::{
    FeedbackConfig, FeedbackSnapshot, FeedbackState,
    CONFIDENCE_THRESHOLD, FEEDBACK_DURATION_MS, PROCESSING_TIMEOUT_MS,
};
