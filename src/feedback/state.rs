//! Feedback states and timing configuration

use serde::{Deserialize, Serialize};

use crate::inference::Prediction;

/// Delay between receiving a prediction and showing the verdict
pub const PROCESSING_TIMEOUT_MS: u64 = 200;

/// How long a verdict stays on screen
pub const FEEDBACK_DURATION_MS: u64 = 1500;

/// Minimum confidence for a prediction to count as correct
pub const CONFIDENCE_THRESHOLD: f32 = 0.7;

/// What the UI is currently showing
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedbackState {
    #[default]
    Idle,
    Processing,
    Correct,
    Incorrect,
}

impl FeedbackState {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeedbackState::Idle => "idle",
            FeedbackState::Processing => "processing",
            FeedbackState::Correct => "correct",
            FeedbackState::Incorrect => "incorrect",
        }
    }

    pub fn from_str_opt(s: &str) -> Option<Self> {
        match s {
            "idle" => Some(FeedbackState::Idle),
            "processing" => Some(FeedbackState::Processing),
            "correct" => Some(FeedbackState::Correct),
            "incorrect" => Some(FeedbackState::Incorrect),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedbackConfig {
    pub processing_timeout_ms: u64,
    pub feedback_duration_ms: u64,
    pub confidence_threshold: f32,
}

impl Default for FeedbackConfig {
    fn default() -> Self {
        Self {
            processing_timeout_ms: PROCESSING_TIMEOUT_MS,
            feedback_duration_ms: FEEDBACK_DURATION_MS,
            confidence_threshold: CONFIDENCE_THRESHOLD,
        }
    }
}

/// Point-in-time view of the machine, published by the driver
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeedbackSnapshot {
    pub state: FeedbackState,
    pub last_prediction: Option<Prediction>,
}
