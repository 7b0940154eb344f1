//! Tokio driver for the feedback machine
//!
//! Owns a [`FeedbackMachine`] inside one task that sleeps until the next
//! scheduled transition, independent of frame or inference cadence.
//! Dropping the driver (or `shutdown`) aborts the task, so no transition
//! fires once the consumer is gone.

use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tracing::debug;

use super::machine::FeedbackMachine;
use super::state::{FeedbackSnapshot, FeedbackState};
use crate::inference::Prediction;

enum Command {
    Prediction {
        prediction: Option<Prediction>,
        is_correct: bool,
    },
    Override(FeedbackState),
    Reset,
}

pub struct FeedbackDriver {
    commands: mpsc::UnboundedSender<Command>,
    snapshot: watch::Receiver<FeedbackSnapshot>,
    task: Option<JoinHandle<()>>,
}

impl FeedbackDriver {
    /// Move `machine` into a new task on the current tokio runtime
    pub fn spawn(machine: FeedbackMachine) -> Self {
        let (commands, rx) = mpsc::unbounded_channel();
        let (snapshot_tx, snapshot) = watch::channel(machine.snapshot());
        let task = tokio::spawn(run(machine, rx, snapshot_tx));

        Self {
            commands,
            snapshot,
            task: Some(task),
        }
    }

    pub fn handle_prediction(&self, prediction: Option<Prediction>, is_correct: bool) {
        self.send(Command::Prediction { prediction, is_correct });
    }

    pub fn set_feedback_state(&self, state: FeedbackState) {
        self.send(Command::Override(state));
    }

    pub fn reset(&self) {
        self.send(Command::Reset);
    }

    /// Latest published state
    pub fn snapshot(&self) -> FeedbackSnapshot {
        self.snapshot.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<FeedbackSnapshot> {
        self.snapshot.clone()
    }

    /// Stop the task and wait for it to finish
    pub async fn shutdown(mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            let _ = task.await;
        }
    }

    fn send(&self, command: Command) {
        if self.commands.send(command).is_err() {
            debug!("Feedback task already stopped, command dropped");
        }
    }
}

impl Drop for FeedbackDriver {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

async fn run(
    mut machine: FeedbackMachine,
    mut commands: mpsc::UnboundedReceiver<Command>,
    snapshot: watch::Sender<FeedbackSnapshot>,
) {
    let origin = Instant::now();
    let to_instant = |ms: f64| origin + Duration::from_micros((ms.max(0.0) * 1000.0).round() as u64);

    loop {
        let deadline = machine.next_deadline();

        tokio::select! {
            command = commands.recv() => {
                let Some(command) = command else { break };
                let now_ms = origin.elapsed().as_secs_f64() * 1000.0;
                match command {
                    Command::Prediction { prediction, is_correct } => {
                        machine.handle_prediction(prediction, is_correct, now_ms);
                    }
                    Command::Override(state) => machine.set_feedback_state(state),
                    Command::Reset => machine.reset(),
                }
            }
            _ = sleep_until(to_instant(deadline.unwrap_or(0.0))), if deadline.is_some() => {
                // Advance to the deadline itself so chained delays add up exactly
                if let Some(due_ms) = deadline {
                    machine.advance(due_ms);
                }
            }
        }

        snapshot.send_replace(machine.snapshot());
    }

    machine.cancel_pending();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feedback::FeedbackConfig;
    use tokio::sync::mpsc::UnboundedReceiver;

    type Event = (FeedbackState, Option<usize>, Instant);

    fn prediction(class: usize, confidence: f32) -> Prediction {
        let mut probabilities = vec![0.0; 3];
        probabilities[class] = confidence;
        Prediction::from_probabilities(probabilities, 2.0, 0.0).unwrap()
    }

    fn spawn_recording() -> (FeedbackDriver, UnboundedReceiver<Event>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut machine = FeedbackMachine::new(FeedbackConfig::default());
        machine.on_state_change(move |state, p| {
            let _ = tx.send((state, p.map(|p| p.predicted_class), Instant::now()));
        });
        (FeedbackDriver::spawn(machine), rx)
    }

    fn assert_near(actual: Duration, expected_ms: u64) {
        let expected = Duration::from_millis(expected_ms);
        assert!(
            actual >= expected && actual < expected + Duration::from_millis(2),
            "expected ~{expected:?}, got {actual:?}"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeline_under_driver() {
        let (driver, mut events) = spawn_recording();
        let start = Instant::now();

        driver.handle_prediction(Some(prediction(1, 0.9)), true);

        let (state, class, at) = events.recv().await.unwrap();
        assert_eq!((state, class), (FeedbackState::Processing, Some(1)));
        assert_near(at - start, 0);

        let (state, _, at) = events.recv().await.unwrap();
        assert_eq!(state, FeedbackState::Correct);
        assert_near(at - start, 200);

        let (state, class, at) = events.recv().await.unwrap();
        assert_eq!((state, class), (FeedbackState::Idle, None));
        assert_near(at - start, 1700);

        driver.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_prediction_preempts_first() {
        let (driver, mut events) = spawn_recording();

        driver.handle_prediction(Some(prediction(0, 0.9)), true);
        assert_eq!(events.recv().await.unwrap().0, FeedbackState::Processing);

        tokio::time::sleep(Duration::from_millis(100)).await;
        driver.handle_prediction(Some(prediction(2, 0.9)), false);

        let mut seen = Vec::new();
        for _ in 0..3 {
            let (state, class, _) = events.recv().await.unwrap();
            seen.push((state, class));
        }
        assert_eq!(
            seen,
            vec![
                (FeedbackState::Processing, Some(2)),
                (FeedbackState::Incorrect, Some(2)),
                (FeedbackState::Idle, None),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropping_driver_cancels_timers() {
        let (driver, mut events) = spawn_recording();
        driver.handle_prediction(Some(prediction(1, 0.9)), true);
        assert_eq!(events.recv().await.unwrap().0, FeedbackState::Processing);

        drop(driver);
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(events.recv().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_snapshot_follows_overrides() {
        let (driver, mut events) = spawn_recording();
        let mut snapshots = driver.subscribe();

        driver.set_feedback_state(FeedbackState::Correct);
        assert_eq!(events.recv().await.unwrap().0, FeedbackState::Correct);
        snapshots.changed().await.unwrap();
        assert_eq!(driver.snapshot().state, FeedbackState::Correct);

        driver.reset();
        let (state, class, _) = events.recv().await.unwrap();
        assert_eq!((state, class), (FeedbackState::Idle, None));
    }
}
