//! Feedback state machine
//!
//! `idle -> processing -> correct|incorrect -> idle`, driven by scheduled
//! transitions. Each transition carries the generation it was scheduled
//! under; any new prediction, manual override or reset bumps the generation,
//! so a transition left over from an earlier prediction does nothing.
//!
//! Time is passed in explicitly (milliseconds on any monotonic clock), which
//! lets the same machine run under the tokio driver or a browser timer.

use tracing::{debug, warn};

use super::state::{FeedbackConfig, FeedbackSnapshot, FeedbackState};
use crate::inference::Prediction;

/// Called on every transition with the new state and the prediction behind it
pub type FeedbackListener = Box<dyn FnMut(FeedbackState, Option<&Prediction>) + Send>;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Step {
    /// Leave `processing` for the verdict
    Resolve { judged_correct: bool },
    /// Leave the verdict for `idle`
    Settle,
}

#[derive(Debug, Clone, Copy)]
struct ScheduledTransition {
    generation: u64,
    due_ms: f64,
    step: Step,
}

pub struct FeedbackMachine {
    config: FeedbackConfig,
    state: FeedbackState,
    last_prediction: Option<Prediction>,
    generation: u64,
    pending: Vec<ScheduledTransition>,
    listeners: Vec<FeedbackListener>,
}

impl FeedbackMachine {
    pub fn new(config: FeedbackConfig) -> Self {
        Self {
            config,
            state: FeedbackState::Idle,
            last_prediction: None,
            generation: 0,
            pending: Vec::new(),
            listeners: Vec::new(),
        }
    }

    pub fn on_state_change<F>(&mut self, listener: F)
    where
        F: FnMut(FeedbackState, Option<&Prediction>) + Send + 'static,
    {
        self.listeners.push(Box::new(listener));
    }

    /// Start feedback for a new prediction, preempting any in flight
    ///
    /// `is_correct` is the lesson's judgment that the predicted gesture is the
    /// target. The verdict is only `correct` if the prediction's confidence
    /// also reaches the threshold. Returns `false` (and changes nothing) for a
    /// missing or malformed prediction.
    pub fn handle_prediction(&mut self, prediction: Option<Prediction>, is_correct: bool, now_ms: f64) -> bool {
        let prediction = match prediction {
            Some(p) if p.is_well_formed() => p,
            Some(p) => {
                warn!(
                    class = p.predicted_class,
                    confidence = p.confidence,
                    "Ignoring malformed prediction"
                );
                return false;
            }
            None => {
                warn!("Ignoring empty prediction");
                return false;
            }
        };

        self.cancel_pending();
        self.last_prediction = Some(prediction);
        self.transition(FeedbackState::Processing);

        self.schedule(
            now_ms + self.config.processing_timeout_ms as f64,
            Step::Resolve { judged_correct: is_correct },
        );
        true
    }

    /// Fire every transition due at `now_ms`. Returns how many fired.
    pub fn advance(&mut self, now_ms: f64) -> usize {
        let mut fired = 0;

        while let Some(index) = self.next_due_index(now_ms) {
            let task = self.pending.remove(index);
            if task.generation != self.generation {
                debug!(generation = task.generation, "Dropping stale feedback transition");
                continue;
            }

            match task.step {
                Step::Resolve { judged_correct } => {
                    let confident = self
                        .last_prediction
                        .as_ref()
                        .is_some_and(|p| p.confidence >= self.config.confidence_threshold);
                    let verdict = if judged_correct && confident {
                        FeedbackState::Correct
                    } else {
                        FeedbackState::Incorrect
                    };
                    self.transition(verdict);
                    self.schedule(task.due_ms + self.config.feedback_duration_ms as f64, Step::Settle);
                }
                Step::Settle => {
                    self.last_prediction = None;
                    self.transition(FeedbackState::Idle);
                }
            }
            fired += 1;
        }

        fired
    }

    /// When the next live transition is due
    pub fn next_deadline(&self) -> Option<f64> {
        self.pending
            .iter()
            .filter(|t| t.generation == self.generation)
            .map(|t| t.due_ms)
            .reduce(f64::min)
    }

    /// Manual override: cancel timers and show `state` right away
    pub fn set_feedback_state(&mut self, state: FeedbackState) {
        self.cancel_pending();
        self.transition(state);
    }

    /// Cancel timers and return to `idle` with no prediction
    pub fn reset(&mut self) {
        self.cancel_pending();
        self.last_prediction = None;
        self.transition(FeedbackState::Idle);
    }

    /// Cancel timers without notifying; used on teardown
    pub fn cancel_pending(&mut self) {
        self.generation += 1;
        self.pending.clear();
    }

    pub fn state(&self) -> FeedbackState {
        self.state
    }

    pub fn last_prediction(&self) -> Option<&Prediction> {
        self.last_prediction.as_ref()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn config(&self) -> &FeedbackConfig {
        &self.config
    }

    pub fn snapshot(&self) -> FeedbackSnapshot {
        FeedbackSnapshot {
            state: self.state,
            last_prediction: self.last_prediction.clone(),
        }
    }

    fn schedule(&mut self, due_ms: f64, step: Step) {
        self.pending.push(ScheduledTransition {
            generation: self.generation,
            due_ms,
            step,
        });
    }

    fn next_due_index(&self, now_ms: f64) -> Option<usize> {
        self.pending
            .iter()
            .enumerate()
            .filter(|(_, t)| t.due_ms <= now_ms)
            .min_by(|(_, a), (_, b)| a.due_ms.total_cmp(&b.due_ms))
            .map(|(i, _)| i)
    }

    fn transition(&mut self, state: FeedbackState) {
        debug!(from = self.state.as_str(), to = state.as_str(), "Feedback transition");
        self.state = state;
        let prediction = self.last_prediction.as_ref();
        for listener in self.listeners.iter_mut() {
            listener(state, prediction);
        }
    }
}

impl Default for FeedbackMachine {
    fn default() -> Self {
        Self::new(FeedbackConfig::default())
    }
}
