//! Rolling frame buffer for 30-frame sequence storage
//!
//! Stores the last N frames of 126 features each for the sequence classifier
//! and drops the whole window once hands have been missing for too long.

use std::collections::VecDeque;

use ndarray::Array3;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::features::{extract_features, FrameSample, FEATURE_COUNT};
use crate::landmarks::HandDetection;

/// Number of frames in the classification window
pub const BUFFER_SIZE: usize = 30;

/// Consecutive frames without hands that force a window reset
pub const RESET_THRESHOLD: usize = 10;

const DEFAULT_WIDTH: f32 = 640.0;
const DEFAULT_HEIGHT: f32 = 480.0;

/// Frame buffer configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BufferConfig {
    /// Frames per classification window (N)
    pub window_size: usize,
    /// Consecutive empty frames before the window is discarded
    pub max_consecutive_nulls: usize,
    /// Normalization width used when a caller gives no usable width
    pub default_width: f32,
    /// Normalization height used when a caller gives no usable height
    pub default_height: f32,
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self {
            window_size: BUFFER_SIZE,
            max_consecutive_nulls: RESET_THRESHOLD,
            default_width: DEFAULT_WIDTH,
            default_height: DEFAULT_HEIGHT,
        }
    }
}

/// What happened to the window on the last `add_frame`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    /// Sample appended (oldest evicted if the window was full)
    Buffered,
    /// Too many empty frames in a row; the window was cleared
    AutoReset,
}

/// Rolling buffer that keeps the last N frames in chronological order
pub struct FrameBuffer {
    /// Oldest frame at the front
    window: VecDeque<FrameSample>,

    window_size: usize,
    max_consecutive_nulls: usize,

    /// Empty frames seen since the last frame with hands
    consecutive_nulls: usize,

    width: f32,
    height: f32,
}

impl FrameBuffer {
    pub fn new() -> Self {
        Self::with_config(&BufferConfig::default())
    }

    pub fn with_config(config: &BufferConfig) -> Self {
        let window_size = config.window_size.max(1);
        Self {
            window: VecDeque::with_capacity(window_size + 1),
            window_size,
            max_consecutive_nulls: config.max_consecutive_nulls.max(1),
            consecutive_nulls: 0,
            width: config.default_width,
            height: config.default_height,
        }
    }

    /// Push one frame of detections into the window
    ///
    /// `None` or an empty slice appends an all-zero sample and counts towards
    /// the auto-reset threshold. Non-positive or non-finite dimensions fall
    /// back to the stored video dimensions.
    pub fn add_frame(
        &mut self,
        hands: Option<&[HandDetection]>,
        frame_width: f32,
        frame_height: f32,
    ) -> FrameOutcome {
        let width = usable_dimension(frame_width).unwrap_or(self.width);
        let height = usable_dimension(frame_height).unwrap_or(self.height);

        let sample = match hands {
            Some(hands) if !hands.is_empty() => {
                self.consecutive_nulls = 0;
                extract_features(hands, width, height)
            }
            _ => {
                self.consecutive_nulls += 1;
                [0.0; FEATURE_COUNT]
            }
        };

        self.window.push_back(sample);
        while self.window.len() > self.window_size {
            self.window.pop_front();
        }

        if self.consecutive_nulls >= self.max_consecutive_nulls {
            debug!(
                empty_frames = self.consecutive_nulls,
                "No hands for too long, discarding window"
            );
            self.clear();
            return FrameOutcome::AutoReset;
        }

        FrameOutcome::Buffered
    }

    /// Push a frame normalized by the stored video dimensions
    pub fn add_frame_default(&mut self, hands: Option<&[HandDetection]>) -> FrameOutcome {
        self.add_frame(hands, self.width, self.height)
    }

    /// Window as a `[1, N, 126]` tensor, only once the window is full
    pub fn inference_data(&self) -> Option<Array3<f32>> {
        if !self.is_ready() {
            return None;
        }

        let data = Array3::from_shape_fn((1, self.window_size, FEATURE_COUNT), |(_, t, f)| {
            self.window[t][f]
        });
        Some(data)
    }

    /// Set the normalization dimensions used when a frame carries none
    pub fn update_video_dimensions(&mut self, width: f32, height: f32) {
        if let Some(w) = usable_dimension(width) {
            self.width = w;
        }
        if let Some(h) = usable_dimension(height) {
            self.height = h;
        }
    }

    pub fn video_dimensions(&self) -> (f32, f32) {
        (self.width, self.height)
    }

    /// Check if buffer holds N frames (ready for classification)
    pub fn is_ready(&self) -> bool {
        self.window.len() == self.window_size
    }

    pub fn frame_count(&self) -> usize {
        self.window.len()
    }

    pub fn consecutive_nulls(&self) -> usize {
        self.consecutive_nulls
    }

    pub fn capacity(&self) -> usize {
        self.window_size
    }

    pub fn max_consecutive_nulls(&self) -> usize {
        self.max_consecutive_nulls
    }

    /// Fill level in 0..=1, for progress display
    pub fn fill_ratio(&self) -> f32 {
        self.window.len() as f32 / self.window_size as f32
    }

    /// Clear the buffer (useful on reset)
    pub fn clear(&mut self) {
        self.window.clear();
        self.consecutive_nulls = 0;
    }
}

impl Default for FrameBuffer {
    fn default() -> Self {
        Self::new()
    }
}

fn usable_dimension(value: f32) -> Option<f32> {
    (value.is_finite() && value > 0.0).then_some(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::landmarks::{Handedness, LandmarkPoint};

    fn hand_at(x: f32) -> HandDetection {
        HandDetection::new([LandmarkPoint::new(x, x, 0.0); 21], Handedness::Right, 0.9)
    }

    fn small(window_size: usize, max_nulls: usize) -> FrameBuffer {
        FrameBuffer::with_config(&BufferConfig {
            window_size,
            max_consecutive_nulls: max_nulls,
            ..BufferConfig::default()
        })
    }

    #[test]
    fn test_frame_count_saturates_at_capacity() {
        let mut buffer = FrameBuffer::new();
        let hands = [hand_at(100.0)];

        for i in 1..=45 {
            buffer.add_frame(Some(&hands), 640.0, 480.0);
            assert_eq!(buffer.frame_count(), i.min(BUFFER_SIZE));
            assert_eq!(buffer.is_ready(), i >= BUFFER_SIZE);
            assert_eq!(buffer.inference_data().is_some(), buffer.is_ready());
        }
    }

    #[test]
    fn test_inference_data_shape() {
        let mut buffer = FrameBuffer::new();
        let hands = [hand_at(64.0)];
        for _ in 0..BUFFER_SIZE {
            buffer.add_frame(Some(&hands), 640.0, 480.0);
        }

        let data = buffer.inference_data().unwrap();
        assert_eq!(data.shape(), &[1, BUFFER_SIZE, FEATURE_COUNT]);
        assert_eq!(data[[0, 0, 0]], 0.1);
    }

    #[test]
    fn test_oldest_frames_evicted_first() {
        let mut buffer = small(3, 10);

        for x in [1.0, 2.0, 3.0, 4.0, 5.0] {
            buffer.add_frame(Some(&[hand_at(x)]), 10.0, 10.0);
        }

        let data = buffer.inference_data().unwrap();
        let firsts: Vec<f32> = (0..3).map(|t| data[[0, t, 0]]).collect();
        assert_eq!(firsts, vec![0.3, 0.4, 0.5]);
    }

    #[test]
    fn test_empty_frames_append_zeros() {
        let mut buffer = small(2, 10);
        buffer.add_frame(Some(&[hand_at(5.0)]), 10.0, 10.0);
        buffer.add_frame(None, 10.0, 10.0);

        let data = buffer.inference_data().unwrap();
        assert_eq!(data[[0, 0, 0]], 0.5);
        assert!(data.slice(ndarray::s![0, 1, ..]).iter().all(|&v| v == 0.0));
        assert_eq!(buffer.consecutive_nulls(), 1);
    }

    #[test]
    fn test_auto_reset_after_threshold_nulls() {
        let mut buffer = FrameBuffer::new();
        let hands = [hand_at(100.0)];
        for _ in 0..20 {
            buffer.add_frame(Some(&hands), 640.0, 480.0);
        }

        for i in 1..RESET_THRESHOLD {
            assert_eq!(buffer.add_frame(None, 640.0, 480.0), FrameOutcome::Buffered);
            assert_eq!(buffer.consecutive_nulls(), i);
        }
        assert_eq!(buffer.frame_count(), 20 + RESET_THRESHOLD - 1);

        assert_eq!(buffer.add_frame(Some(&[]), 640.0, 480.0), FrameOutcome::AutoReset);
        assert_eq!(buffer.frame_count(), 0);
        assert_eq!(buffer.consecutive_nulls(), 0);
        assert!(!buffer.is_ready());
    }

    #[test]
    fn test_hands_reset_null_counter() {
        let mut buffer = small(30, 3);
        buffer.add_frame(None, 640.0, 480.0);
        buffer.add_frame(None, 640.0, 480.0);
        buffer.add_frame(Some(&[hand_at(1.0)]), 640.0, 480.0);
        buffer.add_frame(None, 640.0, 480.0);
        buffer.add_frame(None, 640.0, 480.0);

        assert_eq!(buffer.frame_count(), 5);
        assert_eq!(buffer.consecutive_nulls(), 2);
    }

    #[test]
    fn test_invalid_dimensions_fall_back_to_video_size() {
        let mut buffer = small(1, 10);
        buffer.update_video_dimensions(200.0, 100.0);

        buffer.add_frame(Some(&[hand_at(50.0)]), 0.0, f32::NAN);
        let data = buffer.inference_data().unwrap();
        assert_eq!(data[[0, 0, 0]], 0.25);
        assert_eq!(data[[0, 0, 1]], 0.5);

        buffer.add_frame_default(Some(&[hand_at(100.0)]));
        assert_eq!(buffer.inference_data().unwrap()[[0, 0, 0]], 0.5);
    }

    #[test]
    fn test_clear_is_idempotent() {
        let mut buffer = FrameBuffer::new();
        buffer.add_frame(None, 640.0, 480.0);
        buffer.clear();
        buffer.clear();

        assert_eq!(buffer.frame_count(), 0);
        assert_eq!(buffer.consecutive_nulls(), 0);
        assert_eq!(buffer.fill_ratio(), 0.0);
    }
}
