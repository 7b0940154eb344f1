//! Classifier output turned into a prediction record

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// One classification of one window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    /// Index of the most probable class
    pub predicted_class: usize,
    /// Probability of `predicted_class`
    pub confidence: f32,
    pub raw_probabilities: Vec<f32>,
    /// Wall time of the classifier call
    pub inference_time_ms: f64,
    /// Milliseconds since the Unix epoch
    pub timestamp_ms: f64,
    /// Vocabulary label of `predicted_class`, when known
    pub label: Option<String>,
}

impl Prediction {
    /// Build from a probability vector. `None` if no entry is comparable.
    pub fn from_probabilities(
        probabilities: Vec<f32>,
        inference_time_ms: f64,
        timestamp_ms: f64,
    ) -> Option<Self> {
        let predicted_class = argmax(&probabilities)?;
        Some(Self {
            predicted_class,
            confidence: probabilities[predicted_class],
            raw_probabilities: probabilities,
            inference_time_ms: inference_time_ms.max(0.0),
            timestamp_ms,
            label: None,
        })
    }

    pub fn with_label(mut self, label: Option<&str>) -> Self {
        self.label = label.map(str::to_owned);
        self
    }

    /// Re-point the prediction at another class of the same output
    pub fn with_class(mut self, class: usize) -> Option<Self> {
        let confidence = *self.raw_probabilities.get(class)?;
        self.predicted_class = class;
        self.confidence = confidence;
        self.label = None;
        Some(self)
    }

    /// Usable by the feedback machine
    pub fn is_well_formed(&self) -> bool {
        !self.raw_probabilities.is_empty()
            && self.predicted_class < self.raw_probabilities.len()
            && self.confidence.is_finite()
            && (0.0..=1.0).contains(&self.confidence)
            && self.inference_time_ms >= 0.0
    }
}

/// Index of the largest value; ties go to the lowest index, NaN is skipped
pub fn argmax(values: &[f32]) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    for (i, &v) in values.iter().enumerate() {
        if v.is_nan() {
            continue;
        }
        match best {
            Some((_, b)) if v <= b => {}
            _ => best = Some((i, v)),
        }
    }
    best.map(|(i, _)| i)
}

/// Current wall-clock time in milliseconds since the Unix epoch
pub fn now_ms() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0.0, |d| d.as_secs_f64() * 1000.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_argmax_ties_take_lowest_index() {
        assert_eq!(argmax(&[0.1, 0.4, 0.4, 0.1]), Some(1));
        assert_eq!(argmax(&[0.25; 4]), Some(0));
    }

    #[test]
    fn test_argmax_skips_nan() {
        assert_eq!(argmax(&[f32::NAN, 0.2, 0.1]), Some(1));
        assert_eq!(argmax(&[f32::NAN]), None);
        assert_eq!(argmax(&[]), None);
    }

    #[test]
    fn test_prediction_from_probabilities() {
        let prediction = Prediction::from_probabilities(vec![0.05, 0.9, 0.05], 12.5, 1000.0).unwrap();
        assert_eq!(prediction.predicted_class, 1);
        assert_eq!(prediction.confidence, 0.9);
        assert_eq!(prediction.inference_time_ms, 12.5);
        assert!(prediction.is_well_formed());
    }

    #[test]
    fn test_with_class_moves_confidence() {
        let prediction = Prediction::from_probabilities(vec![0.3, 0.7], 1.0, 0.0)
            .unwrap()
            .with_label(Some("B"));
        let moved = prediction.with_class(0).unwrap();
        assert_eq!(moved.predicted_class, 0);
        assert_eq!(moved.confidence, 0.3);
        assert_eq!(moved.label, None);
    }

    #[test]
    fn test_malformed_predictions() {
        let mut prediction = Prediction::from_probabilities(vec![0.5, 0.5], 1.0, 0.0).unwrap();
        prediction.confidence = f32::NAN;
        assert!(!prediction.is_well_formed());

        prediction.confidence = 0.5;
        prediction.predicted_class = 7;
        assert!(!prediction.is_well_formed());
    }
}
