//! Practice session: wires frame source, buffer, classifier and feedback
//!
//! One session owns one window and one classifier. Each rendered frame goes
//! through `process_frame`; once the window is full it is classified, judged
//! against the lesson's target gesture and handed to the feedback driver.

use tracing::{debug, info, warn};

use crate::classifier::{FrameBuffer, FrameOutcome};
use crate::config::PipelineConfig;
use crate::error::PipelineResult;
use crate::feedback::{FeedbackDriver, FeedbackMachine};
use crate::inference::{InferenceOrchestrator, ModelLoader, Prediction, PredictionSmoother};
use crate::landmarks::{detect_hands, FrameSource, HandDetection};

/// In-memory tally of judged attempts; never persisted
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub attempts: u32,
    pub hits: u32,
}

impl SessionStats {
    /// Fraction of attempts that were correct, 0 when nothing was judged
    pub fn accuracy(&self) -> f32 {
        if self.attempts == 0 {
            0.0
        } else {
            self.hits as f32 / self.attempts as f32
        }
    }
}

pub struct PracticeSession<L: ModelLoader> {
    buffer: FrameBuffer,
    orchestrator: InferenceOrchestrator<L>,
    feedback: FeedbackDriver,
    smoother: Option<PredictionSmoother>,
    target: Option<String>,
    stats: SessionStats,
    confidence_threshold: f32,
    clear_after_recognition: bool,
    frames_seen: u64,
}

impl<L: ModelLoader> PracticeSession<L> {
    /// Build a session; `feedback` carries any UI listeners already attached.
    ///
    /// Must be called inside a tokio runtime (the feedback driver spawns a task).
    /// Fails if `config` does not validate.
    pub fn new(loader: L, config: &PipelineConfig, feedback: FeedbackMachine) -> PipelineResult<Self> {
        config.validate()?;

        let smoother = config
            .smoothing
            .enabled
            .then(|| PredictionSmoother::new(&config.smoothing));

        Ok(Self {
            buffer: FrameBuffer::with_config(&config.buffer),
            orchestrator: InferenceOrchestrator::new(loader, config.inference.clone()),
            feedback: FeedbackDriver::spawn(feedback),
            smoother,
            target: None,
            stats: SessionStats::default(),
            confidence_threshold: config.feedback.confidence_threshold,
            clear_after_recognition: config.clear_after_recognition,
            frames_seen: 0,
        })
    }

    /// Replace the orchestrator, e.g. one carrying a vocabulary
    pub fn with_orchestrator(mut self, orchestrator: InferenceOrchestrator<L>) -> Self {
        self.orchestrator = orchestrator;
        self
    }

    /// Gesture the learner is asked to perform. Resets the tally.
    pub fn set_target(&mut self, target: Option<&str>) {
        self.target = target.map(|t| t.trim().to_string()).filter(|t| !t.is_empty());
        self.stats = SessionStats::default();
        if let Some(smoother) = self.smoother.as_mut() {
            smoother.clear();
        }
        info!(target = ?self.target, "Practice target set");
    }

    /// Feed one frame of detections. Returns the prediction when the window
    /// was classified on this frame.
    pub async fn process_frame(
        &mut self,
        hands: Option<&[HandDetection]>,
        frame_width: f32,
        frame_height: f32,
    ) -> Option<Prediction> {
        self.frames_seen += 1;

        if self.buffer.add_frame(hands, frame_width, frame_height) == FrameOutcome::AutoReset {
            if let Some(smoother) = self.smoother.as_mut() {
                smoother.clear();
            }
        }

        let data = self.buffer.inference_data()?;
        let prediction = self.orchestrator.run_inference(&data).await?;
        let prediction = self.smooth(prediction);

        if !prediction.is_well_formed() {
            warn!(
                class = prediction.predicted_class,
                confidence = prediction.confidence,
                "Classifier output is not a probability, attempt not judged"
            );
            return Some(prediction);
        }

        let accepted = prediction.confidence >= self.confidence_threshold;
        if let Some(target) = self.target.as_deref() {
            let is_correct = self
                .orchestrator
                .vocabulary()
                .is_some_and(|v| v.matches_target(prediction.predicted_class, target));

            self.stats.attempts += 1;
            if is_correct && accepted {
                self.stats.hits += 1;
            }
            debug!(
                label = ?prediction.label,
                confidence = prediction.confidence,
                is_correct,
                hits = self.stats.hits,
                attempts = self.stats.attempts,
                "Judged prediction"
            );
            self.feedback.handle_prediction(Some(prediction.clone()), is_correct);
        }

        // A rejected prediction keeps the window sliding
        if self.clear_after_recognition && accepted {
            self.buffer.clear();
        }
        Some(prediction)
    }

    /// Pull one frame from `source` and process it
    pub async fn process_source_frame<S>(&mut self, source: &mut S, timestamp_ms: f64) -> Option<Prediction>
    where
        S: FrameSource + ?Sized,
    {
        let hands = detect_hands(source, timestamp_ms).await;
        let (width, height) = source.frame_size();
        self.process_frame(hands.as_deref(), width, height).await
    }

    fn smooth(&mut self, prediction: Prediction) -> Prediction {
        let Some(smoother) = self.smoother.as_mut() else {
            return prediction;
        };
        let Some(class) = smoother.observe(&prediction) else {
            return prediction;
        };
        if class == prediction.predicted_class {
            return prediction;
        }

        let label = self.orchestrator.vocabulary().and_then(|v| v.label(class));
        match prediction.clone().with_class(class) {
            Some(smoothed) => smoothed.with_label(label),
            None => prediction,
        }
    }

    /// Drop the window and any feedback in progress
    pub fn reset(&mut self) {
        self.buffer.clear();
        if let Some(smoother) = self.smoother.as_mut() {
            smoother.clear();
        }
        self.feedback.reset();
    }

    /// Stop the frame source and tear down feedback timers
    pub async fn stop<S: FrameSource + ?Sized>(self, source: &mut S) -> SessionStats {
        source.stop().await;
        info!(
            frames = self.frames_seen,
            hits = self.stats.hits,
            attempts = self.stats.attempts,
            "Practice session stopped"
        );
        let stats = self.stats;
        self.feedback.shutdown().await;
        stats
    }

    pub fn buffer(&self) -> &FrameBuffer {
        &self.buffer
    }

    pub fn buffer_mut(&mut self) -> &mut FrameBuffer {
        &mut self.buffer
    }

    pub fn orchestrator(&self) -> &InferenceOrchestrator<L> {
        &self.orchestrator
    }

    pub fn orchestrator_mut(&mut self) -> &mut InferenceOrchestrator<L> {
        &mut self.orchestrator
    }

    pub fn feedback(&self) -> &FeedbackDriver {
        &self.feedback
    }

    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    pub fn target(&self) -> Option<&str> {
        self.target.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::GestureVocabulary;
    use crate::inference::{GestureModel, TensorSpec};
    use crate::landmarks::{Handedness, LandmarkPoint};
    use async_trait::async_trait;
    use ndarray::Array3;

    /// Backend that forgets its softmax and returns raw logits
    struct LogitModel {
        inputs: Vec<TensorSpec>,
    }

    #[async_trait]
    impl GestureModel for LogitModel {
        type Input = ();

        fn inputs(&self) -> &[TensorSpec] {
            &self.inputs
        }

        fn num_classes(&self) -> usize {
            3
        }

        fn labels(&self) -> Option<GestureVocabulary> {
            Some(GestureVocabulary::new(vec!["A".into(), "B".into(), "C".into()]))
        }

        fn prepare(&self, _window: &Array3<f32>) -> PipelineResult<()> {
            Ok(())
        }

        async fn predict(&self, _input: &()) -> PipelineResult<Vec<f32>> {
            Ok(vec![0.5, 3.0, -1.0])
        }
    }

    struct LogitLoader;

    #[async_trait]
    impl ModelLoader for LogitLoader {
        type Model = LogitModel;

        async fn load(&self, _path: &str) -> PipelineResult<LogitModel> {
            Ok(LogitModel {
                inputs: vec![TensorSpec::new("landmarks", vec![1, 30, 126])],
            })
        }
    }

    fn hand() -> HandDetection {
        HandDetection::new([LandmarkPoint::new(320.0, 240.0, 0.0); 21], Handedness::Right, 0.9)
    }

    #[tokio::test]
    async fn test_logits_are_not_judged() {
        let mut session =
            PracticeSession::new(LogitLoader, &PipelineConfig::default(), FeedbackMachine::default()).unwrap();
        session.set_target(Some("B"));

        let hands = [hand()];
        let mut prediction = None;
        for _ in 0..30 {
            prediction = session.process_frame(Some(&hands), 640.0, 480.0).await;
        }

        let prediction = prediction.unwrap();
        assert_eq!(prediction.predicted_class, 1);
        assert_eq!(prediction.confidence, 3.0);
        assert_eq!(session.stats(), SessionStats::default());
        assert_eq!(session.buffer().frame_count(), 30);
    }

    #[tokio::test]
    async fn test_inconsistent_config_rejected() {
        let mut config = PipelineConfig::default();
        config.buffer.window_size = 20;

        let err = PracticeSession::new(LogitLoader, &config, FeedbackMachine::default())
            .err()
            .unwrap();
        assert!(err.to_string().contains("buffer holds 20 frames"));
    }

    #[test]
    fn test_accuracy() {
        assert_eq!(SessionStats::default().accuracy(), 0.0);
        let stats = SessionStats { attempts: 4, hits: 3 };
        assert_eq!(stats.accuracy(), 0.75);
    }
}
