//! Frame source abstraction over the hand landmark detector
//!
//! The detector owns its own model and delegate lifetime; the pipeline only
//! sees `start/stop/detect`. Detector failures never reach the frame buffer:
//! [`detect_hands`] turns them into "no hands".

use std::collections::VecDeque;

use async_trait::async_trait;
use tracing::warn;

use super::hand::HandDetection;
use crate::error::SourceError;

/// Port that abstracts the per-frame hand detector.
#[async_trait]
pub trait FrameSource: Send {
    /// Acquire detector resources
    async fn start(&mut self) -> Result<(), SourceError>;

    /// Release detector resources; no `detect` calls follow
    async fn stop(&mut self);

    /// Detect hands on the current frame. `Ok(None)` means no hand visible.
    async fn detect(&mut self, timestamp_ms: f64) -> Result<Option<Vec<HandDetection>>, SourceError>;

    /// Width and height of the frames the detector reports coordinates in
    fn frame_size(&self) -> (f32, f32);
}

/// Run one detection, swallowing detector errors as "no hands".
pub async fn detect_hands<S: FrameSource + ?Sized>(
    source: &mut S,
    timestamp_ms: f64,
) -> Option<Vec<HandDetection>> {
    match source.detect(timestamp_ms).await {
        Ok(Some(hands)) if !hands.is_empty() => Some(hands),
        Ok(_) => None,
        Err(e) => {
            warn!(error = %e, timestamp_ms, "Hand detection failed, treating frame as empty");
            None
        }
    }
}

/// Replays a prepared sequence of frames.
///
/// Used by the simulator and tests in place of a camera-backed detector.
/// Each entry is either a frame result or a detector failure.
pub struct ScriptedSource {
    frames: VecDeque<Result<Option<Vec<HandDetection>>, String>>,
    frame_size: (f32, f32),
    started: bool,
}

impl ScriptedSource {
    pub fn new(frame_width: f32, frame_height: f32) -> Self {
        Self {
            frames: VecDeque::new(),
            frame_size: (frame_width, frame_height),
            started: false,
        }
    }

    /// Queue a frame with the given hands (empty = no hands)
    pub fn push_hands(&mut self, hands: Vec<HandDetection>) {
        if hands.is_empty() {
            self.frames.push_back(Ok(None));
        } else {
            self.frames.push_back(Ok(Some(hands)));
        }
    }

    /// Queue `count` frames without hands
    pub fn push_empty(&mut self, count: usize) {
        for _ in 0..count {
            self.frames.push_back(Ok(None));
        }
    }

    /// Queue a detector failure
    pub fn push_failure(&mut self, message: impl Into<String>) {
        self.frames.push_back(Err(message.into()));
    }

    pub fn remaining(&self) -> usize {
        self.frames.len()
    }

    pub fn is_started(&self) -> bool {
        self.started
    }
}

#[async_trait]
impl FrameSource for ScriptedSource {
    async fn start(&mut self) -> Result<(), SourceError> {
        self.started = true;
        Ok(())
    }

    async fn stop(&mut self) {
        self.started = false;
    }

    async fn detect(&mut self, _timestamp_ms: f64) -> Result<Option<Vec<HandDetection>>, SourceError> {
        if !self.started {
            return Err(SourceError::NotStarted);
        }
        match self.frames.pop_front() {
            Some(Ok(hands)) => Ok(hands),
            Some(Err(msg)) => Err(SourceError::Detection(msg)),
            None => Ok(None),
        }
    }

    fn frame_size(&self) -> (f32, f32) {
        self.frame_size
    }
}
