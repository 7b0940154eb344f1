//! Bridge module - JS ↔ Rust communication
//!
//! All #[wasm_bindgen] entry points live here.
//! Re-exports only in mod.rs, logic in submodules.
//!
//! In the browser the landmark detector and the classifier run in JS; Rust
//! keeps the window and the feedback timeline.

mod hands;
mod pipeline;

pub use pipeline::{
    feedback_tick, get_buffer_status, get_feedback_state, get_inference_buffer,
    init_panic_hook, push_hand_frame, reset_pipeline, set_feedback_state, set_target_gesture,
    set_vocabulary, set_video_dimensions, submit_probabilities,
};
