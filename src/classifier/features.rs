//! Feature extraction for gesture classification
//!
//! Flattens up to two hands into 126 features per frame, matching the layout
//! the classifier was trained on.

use crate::landmarks::{HandDetection, HAND_VALUES};

/// Hands encoded per frame
pub const MAX_HANDS: usize = 2;

/// Number of features per frame (2 hands x 21 landmarks x 3 coords)
pub const FEATURE_COUNT: usize = MAX_HANDS * HAND_VALUES;

/// One frame's flattened feature vector
pub type FrameSample = [f32; FEATURE_COUNT];

/// Extract 126 features from the hands seen on one frame
///
/// Layout (matches training data):
/// - 0..63: hand slot 0, `[x0, y0, z0, x1, ...]`
/// - 63..126: hand slot 1
///
/// Slots follow the order the detector reported the hands in, not their
/// handedness. Hands beyond the second are ignored and an empty slot stays
/// zero. x and y are divided by the frame width and height; z is kept as-is.
pub fn extract_features(hands: &[HandDetection], frame_width: f32, frame_height: f32) -> FrameSample {
    let mut sample = [0.0; FEATURE_COUNT];

    for (slot, hand) in hands.iter().take(MAX_HANDS).enumerate() {
        let base = slot * HAND_VALUES;
        for (i, point) in hand.landmarks.iter().enumerate() {
            let offset = base + i * 3;
            sample[offset] = point.x / frame_width;
            sample[offset + 1] = point.y / frame_height;
            sample[offset + 2] = point.z;
        }
    }

    sample
}
