//! Pipeline state behind the JS bridge
//!
//! JS calls `push_hand_frame` once per video frame, runs its classifier on
//! `get_inference_buffer()` when it returns data, hands the probabilities
//! back through `submit_probabilities`, and drives the feedback timeline by
//! calling `feedback_tick(performance.now())` from its own timer.

use std::cell::RefCell;

use wasm_bindgen::prelude::*;

use super::hands::parse_hands;
use crate::classifier::{FrameBuffer, GestureVocabulary};
use crate::config::PipelineConfig;
use crate::feedback::{FeedbackMachine, FeedbackState};
use crate::inference::Prediction;
use crate::landmarks::HandDetection;

struct BridgeState {
    buffer: FrameBuffer,
    feedback: FeedbackMachine,
    vocabulary: Option<GestureVocabulary>,
    target: Option<String>,
    clear_after_recognition: bool,
}

impl Default for BridgeState {
    fn default() -> Self {
        let config = PipelineConfig::default();
        Self {
            buffer: FrameBuffer::with_config(&config.buffer),
            feedback: FeedbackMachine::new(config.feedback),
            vocabulary: None,
            target: None,
            clear_after_recognition: config.clear_after_recognition,
        }
    }
}

impl BridgeState {
    fn push_frame(&mut self, hands: &[HandDetection], frame_width: f32, frame_height: f32) -> bool {
        let hands = (!hands.is_empty()).then_some(hands);
        self.buffer.add_frame(hands, frame_width, frame_height);
        self.buffer.is_ready()
    }

    /// Judge one classifier output. Feedback runs only while a target gesture
    /// and a vocabulary are set; the window restarts only after a prediction
    /// that clears the confidence threshold.
    fn submit(&mut self, prediction: Prediction, now_ms: f64) -> FeedbackState {
        let label = self
            .vocabulary
            .as_ref()
            .and_then(|v| v.label(prediction.predicted_class));
        let prediction = prediction.with_label(label);

        let accepted = prediction.is_well_formed()
            && prediction.confidence >= self.feedback.config().confidence_threshold;

        if let (Some(vocabulary), Some(target)) = (&self.vocabulary, &self.target) {
            let is_correct = vocabulary.matches_target(prediction.predicted_class, target);
            self.feedback.handle_prediction(Some(prediction), is_correct, now_ms);
        }

        if self.clear_after_recognition && accepted {
            self.buffer.clear();
        }
        self.feedback.state()
    }

    fn tick(&mut self, now_ms: f64) -> FeedbackState {
        self.feedback.advance(now_ms);
        self.feedback.state()
    }

    fn reset(&mut self) {
        self.buffer.clear();
        self.feedback.reset();
    }
}

// Thread-local storage (WASM is single-threaded)
thread_local! {
    static BRIDGE_STATE: RefCell<BridgeState> = RefCell::new(BridgeState::default());
}

/// Called automatically when WASM module loads
#[wasm_bindgen(start)]
pub fn init_panic_hook() {
    console_error_panic_hook::set_once();
}

#[wasm_bindgen]
pub fn set_video_dimensions(width: f32, height: f32) {
    BRIDGE_STATE.with(|state_cell| {
        state_cell.borrow_mut().buffer.update_video_dimensions(width, height);
    });
}

/// Add one frame. `num_hands == 0` means no hand was detected.
/// Returns whether the window is ready for inference.
#[wasm_bindgen]
pub fn push_hand_frame(
    flat_data: &[f32],
    num_hands: usize,
    handedness: &str,
    scores: &[f32],
    frame_width: f32,
    frame_height: f32,
) -> bool {
    let hands = parse_hands(flat_data, num_hands, handedness, scores);

    BRIDGE_STATE.with(|state_cell| {
        state_cell
            .borrow_mut()
            .push_frame(&hands, frame_width, frame_height)
    })
}

/// Window as a flat `[1 * N * 126]` array, or nothing until it is full
#[wasm_bindgen]
pub fn get_inference_buffer() -> Option<Vec<f32>> {
    BRIDGE_STATE.with(|state_cell| {
        let state = state_cell.borrow();
        state
            .buffer
            .inference_data()
            .map(|data| data.iter().copied().collect())
    })
}

/// `[frame_count, capacity, consecutive_nulls]` for the progress display
#[wasm_bindgen]
pub fn get_buffer_status() -> Vec<u32> {
    BRIDGE_STATE.with(|state_cell| {
        let state = state_cell.borrow();
        vec![
            state.buffer.frame_count() as u32,
            state.buffer.capacity() as u32,
            state.buffer.consecutive_nulls() as u32,
        ]
    })
}

/// Gesture labels in classifier output order, as a JSON array of strings
#[wasm_bindgen]
pub fn set_vocabulary(labels_json: &str) -> Result<(), JsValue> {
    let labels: Vec<String> =
        serde_json::from_str(labels_json).map_err(|e| JsValue::from_str(&e.to_string()))?;

    BRIDGE_STATE.with(|state_cell| {
        state_cell.borrow_mut().vocabulary = Some(GestureVocabulary::new(labels));
    });
    Ok(())
}

#[wasm_bindgen]
pub fn set_target_gesture(target: Option<String>) {
    BRIDGE_STATE.with(|state_cell| {
        state_cell.borrow_mut().target = target.filter(|t| !t.trim().is_empty());
    });
}

/// Classifier output for the last buffer. Returns the feedback state name.
#[wasm_bindgen]
pub fn submit_probabilities(probabilities: &[f32], inference_time_ms: f64, now_ms: f64) -> String {
    let Some(prediction) =
        Prediction::from_probabilities(probabilities.to_vec(), inference_time_ms, js_sys::Date::now())
    else {
        web_sys::console::warn_1(&"Empty classifier output ignored".into());
        return get_feedback_state();
    };

    BRIDGE_STATE.with(|state_cell| {
        state_cell
            .borrow_mut()
            .submit(prediction, now_ms)
            .as_str()
            .to_string()
    })
}

/// Fire due feedback transitions. Returns the feedback state name.
#[wasm_bindgen]
pub fn feedback_tick(now_ms: f64) -> String {
    BRIDGE_STATE.with(|state_cell| {
        state_cell.borrow_mut().tick(now_ms).as_str().to_string()
    })
}

#[wasm_bindgen]
pub fn get_feedback_state() -> String {
    BRIDGE_STATE.with(|state_cell| state_cell.borrow().feedback.state().as_str().to_string())
}

/// Manual override from the UI
#[wasm_bindgen]
pub fn set_feedback_state(name: &str) {
    let Some(target_state) = FeedbackState::from_str_opt(name) else {
        web_sys::console::warn_1(&format!("Unknown feedback state: {name}").into());
        return;
    };
    BRIDGE_STATE.with(|state_cell| {
        state_cell.borrow_mut().feedback.set_feedback_state(target_state);
    });
}

/// Clear the window and return feedback to idle (navigation away, retry)
#[wasm_bindgen]
pub fn reset_pipeline() {
    BRIDGE_STATE.with(|state_cell| state_cell.borrow_mut().reset());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::landmarks::{Handedness, LandmarkPoint};

    fn bridge(target: Option<&str>) -> BridgeState {
        let mut state = BridgeState::default();
        state.vocabulary = Some(GestureVocabulary::new(vec!["OI".into(), "TCHAU".into()]));
        state.target = target.map(str::to_owned);
        state
    }

    fn fill_window(state: &mut BridgeState) {
        let hands = [HandDetection::new(
            [LandmarkPoint::new(320.0, 240.0, 0.0); 21],
            Handedness::Right,
            0.9,
        )];
        for _ in 0..30 {
            state.push_frame(&hands, 640.0, 480.0);
        }
        assert!(state.buffer.is_ready());
    }

    fn prediction(probabilities: Vec<f32>) -> Prediction {
        Prediction::from_probabilities(probabilities, 3.0, 0.0).unwrap()
    }

    #[test]
    fn test_submit_without_target_gives_no_feedback() {
        let mut state = bridge(None);
        fill_window(&mut state);

        assert_eq!(state.submit(prediction(vec![0.1, 0.9]), 0.0), FeedbackState::Idle);
        assert_eq!(state.tick(500.0), FeedbackState::Idle);
        assert_eq!(state.buffer.frame_count(), 0);
    }

    #[test]
    fn test_submit_and_tick_follow_timeline() {
        let mut state = bridge(Some("tchau"));
        fill_window(&mut state);

        assert_eq!(state.submit(prediction(vec![0.1, 0.9]), 1000.0), FeedbackState::Processing);
        assert_eq!(state.buffer.frame_count(), 0);
        assert_eq!(state.tick(1199.0), FeedbackState::Processing);
        assert_eq!(state.tick(1200.0), FeedbackState::Correct);
        assert_eq!(state.tick(2699.0), FeedbackState::Correct);
        assert_eq!(state.tick(2700.0), FeedbackState::Idle);
    }

    #[test]
    fn test_low_confidence_keeps_window() {
        let mut state = bridge(Some("TCHAU"));
        fill_window(&mut state);

        assert_eq!(state.submit(prediction(vec![0.45, 0.55]), 0.0), FeedbackState::Processing);
        assert_eq!(state.buffer.frame_count(), 30);
        assert_eq!(state.tick(200.0), FeedbackState::Incorrect);
    }

    #[test]
    fn test_reset_clears_window_and_timers() {
        let mut state = bridge(Some("OI"));
        fill_window(&mut state);
        state.submit(prediction(vec![0.45, 0.55]), 0.0);

        state.reset();
        assert_eq!(state.buffer.frame_count(), 0);
        assert_eq!(state.feedback.state(), FeedbackState::Idle);
        assert_eq!(state.tick(5000.0), FeedbackState::Idle);
    }
}
