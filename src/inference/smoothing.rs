//! Majority-vote smoothing over recent confident predictions

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use super::prediction::Prediction;

/// Predictions remembered for the vote
pub const HISTORY_SIZE: usize = 15;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SmoothingConfig {
    pub enabled: bool,
    pub history_size: usize,
    /// Predictions below this confidence do not vote
    pub min_confidence: f32,
}

impl Default for SmoothingConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            history_size: HISTORY_SIZE,
            min_confidence: 0.7,
        }
    }
}

/// Rolling vote over the classes of recent confident predictions
pub struct PredictionSmoother {
    history: VecDeque<usize>,
    history_size: usize,
    min_confidence: f32,
}

impl PredictionSmoother {
    pub fn new(config: &SmoothingConfig) -> Self {
        let history_size = config.history_size.max(1);
        Self {
            history: VecDeque::with_capacity(history_size),
            history_size,
            min_confidence: config.min_confidence,
        }
    }

    /// Add a prediction and return the winning class
    ///
    /// A prediction under the confidence floor is not recorded and yields
    /// `None`. On a tie the class that entered the history first wins.
    pub fn observe(&mut self, prediction: &Prediction) -> Option<usize> {
        if prediction.confidence < self.min_confidence {
            return None;
        }

        self.history.push_back(prediction.predicted_class);
        if self.history.len() > self.history_size {
            self.history.pop_front();
        }

        // (class, votes) in order of first appearance
        let mut tally: Vec<(usize, usize)> = Vec::new();
        for &class in &self.history {
            match tally.iter_mut().find(|(c, _)| *c == class) {
                Some((_, votes)) => *votes += 1,
                None => tally.push((class, 1)),
            }
        }

        let mut winner: Option<(usize, usize)> = None;
        for (class, votes) in tally {
            if winner.map_or(true, |(_, best)| votes > best) {
                winner = Some((class, votes));
            }
        }
        winner.map(|(class, _)| class)
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    pub fn clear(&mut self) {
        self.history.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prediction(class: usize, confidence: f32) -> Prediction {
        let mut probabilities = vec![0.0; 4];
        probabilities[class] = confidence;
        Prediction::from_probabilities(probabilities, 1.0, 0.0).unwrap()
    }

    fn smoother(history_size: usize) -> PredictionSmoother {
        PredictionSmoother::new(&SmoothingConfig {
            enabled: true,
            history_size,
            min_confidence: 0.7,
        })
    }

    #[test]
    fn test_majority_wins_over_latest() {
        let mut smoother = smoother(15);
        smoother.observe(&prediction(1, 0.9));
        smoother.observe(&prediction(1, 0.8));
        assert_eq!(smoother.observe(&prediction(2, 0.95)), Some(1));
    }

    #[test]
    fn test_tie_goes_to_first_seen() {
        let mut smoother = smoother(15);
        smoother.observe(&prediction(3, 0.9));
        assert_eq!(smoother.observe(&prediction(0, 0.9)), Some(3));
    }

    #[test]
    fn test_low_confidence_does_not_vote() {
        let mut smoother = smoother(15);
        assert_eq!(smoother.observe(&prediction(2, 0.5)), None);
        assert!(smoother.is_empty());
    }

    #[test]
    fn test_history_is_bounded() {
        let mut smoother = smoother(3);
        for _ in 0..3 {
            smoother.observe(&prediction(1, 0.9));
        }
        for _ in 0..2 {
            smoother.observe(&prediction(2, 0.9));
        }
        assert_eq!(smoother.len(), 3);
        assert_eq!(smoother.observe(&prediction(2, 0.9)), Some(2));

        smoother.clear();
        assert!(smoother.is_empty());
    }
}
