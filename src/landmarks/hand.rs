//! Hand detection types as reported by the landmark detector
//!
//! One detection = 21 MediaPipe hand landmarks, a laterality label and the
//! detector's confidence for that hand.

use serde::{Deserialize, Serialize};

// ============================================================================
// HAND LANDMARK INDICES (MediaPipe Hands - 21 total)
// ============================================================================

pub const WRIST: usize = 0;
pub const THUMB_CMC: usize = 1;
pub const THUMB_MCP: usize = 2;
pub const THUMB_IP: usize = 3;
pub const THUMB_TIP: usize = 4;
pub const INDEX_MCP: usize = 5;
pub const INDEX_PIP: usize = 6;
pub const INDEX_DIP: usize = 7;
pub const INDEX_TIP: usize = 8;
pub const MIDDLE_MCP: usize = 9;
pub const MIDDLE_PIP: usize = 10;
pub const MIDDLE_DIP: usize = 11;
pub const MIDDLE_TIP: usize = 12;
pub const RING_MCP: usize = 13;
pub const RING_PIP: usize = 14;
pub const RING_DIP: usize = 15;
pub const RING_TIP: usize = 16;
pub const PINKY_MCP: usize = 17;
pub const PINKY_PIP: usize = 18;
pub const PINKY_DIP: usize = 19;
pub const PINKY_TIP: usize = 20;

/// Landmarks per hand
pub const HAND_LANDMARK_COUNT: usize = 21;

/// Floats per hand in the flat (x, y, z) layout
pub const HAND_VALUES: usize = HAND_LANDMARK_COUNT * 3;

// ============================================================================
// DATA STRUCTURES
// ============================================================================

/// A single 3D landmark point
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LandmarkPoint {
    pub x: f32, // source pixels
    pub y: f32, // source pixels
    pub z: f32, // relative depth
}

impl LandmarkPoint {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

/// Laterality label reported by the detector
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Handedness {
    Left,
    Right,
}

impl Handedness {
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "left" => Some(Handedness::Left),
            "right" => Some(Handedness::Right),
            _ => None,
        }
    }
}

/// One detected hand
///
/// The fixed-size array guarantees exactly 21 landmarks; nothing downstream
/// re-checks the count.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HandDetection {
    pub landmarks: [LandmarkPoint; HAND_LANDMARK_COUNT],
    pub handedness: Handedness,
    /// Detector confidence, 0..1
    pub score: f32,
}

impl HandDetection {
    pub fn new(
        landmarks: [LandmarkPoint; HAND_LANDMARK_COUNT],
        handedness: Handedness,
        score: f32,
    ) -> Self {
        Self { landmarks, handedness, score }
    }

    /// Parse 63 floats laid out as `[x0, y0, z0, x1, ...]`
    ///
    /// Returns `None` when the slice is not exactly one hand long.
    pub fn from_flat(data: &[f32], handedness: Handedness, score: f32) -> Option<Self> {
        if data.len() != HAND_VALUES {
            return None;
        }

        let mut landmarks = [LandmarkPoint::default(); HAND_LANDMARK_COUNT];
        for (i, point) in landmarks.iter_mut().enumerate() {
            *point = LandmarkPoint::new(data[i * 3], data[i * 3 + 1], data[i * 3 + 2]);
        }

        Some(Self { landmarks, handedness, score })
    }

    pub fn wrist(&self) -> LandmarkPoint {
        self.landmarks[WRIST]
    }
}
