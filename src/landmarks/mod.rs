//! Landmark module - hand detections coming from the detector
//!
//! Re-exports only. All logic in submodules.

mod hand;
mod source;

pub use hand::{
    HandDetection, Handedness, LandmarkPoint,
    HAND_LANDMARK_COUNT, HAND_VALUES,
    WRIST, THUMB_CMC, THUMB_MCP, THUMB_IP, THUMB_TIP,
    INDEX_MCP, INDEX_PIP, INDEX_DIP, INDEX_TIP,
    MIDDLE_MCP, MIDDLE_PIP, MIDDLE_DIP, MIDDLE_TIP,
    RING_MCP, RING_PIP, RING_DIP, RING_TIP,
    PINKY_MCP, PINKY_PIP, PINKY_DIP, PINKY_TIP,
};
pub use source::{detect_hands, FrameSource, ScriptedSource};
