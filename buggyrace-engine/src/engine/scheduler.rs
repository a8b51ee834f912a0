//! Concurrent motion interpolation for one step.
//!
//! Each motion runs as its own task and reports intermediate distances over
//! a channel; the step is complete only when every task has finished.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio::time::{interval, sleep};

use buggyrace_core::motion::Motion;
use buggyrace_core::race::BuggyId;

/// An intermediate, unrounded distance reported while a motion is in flight.
#[derive(Debug, Clone, PartialEq)]
pub struct MotionSample {
    pub buggy: BuggyId,
    pub distance: f64,
}

/// The in-flight tasks of one step and the samples they report.
///
/// Tasks resolve to the motion they completed, or `None` for the hold task
/// that paces a step in which nothing moves.
pub struct StepJoin {
    pub tasks: JoinSet<Option<Motion>>,
    pub samples: mpsc::UnboundedReceiver<MotionSample>,
}

#[derive(Debug, Clone)]
pub struct MotionScheduler {
    frame_interval: Duration,
}

impl MotionScheduler {
    pub fn new(frame_interval: Duration) -> Self {
        Self {
            frame_interval: frame_interval.max(Duration::from_millis(1)),
        }
    }

    /// Number of samples produced for a motion lasting `duration`.
    pub fn frames_for(&self, duration: Duration) -> u32 {
        let frames = duration.as_nanos() / self.frame_interval.as_nanos();
        u32::try_from(frames).unwrap_or(u32::MAX).max(1)
    }

    /// Starts every motion of a step. With no motions, a single hold task
    /// keeps the step the same length as any other.
    pub fn launch(&self, motions: Vec<Motion>, duration: Duration) -> StepJoin {
        let (tx, samples) = mpsc::unbounded_channel();
        let mut tasks = JoinSet::new();

        if motions.is_empty() {
            tasks.spawn(async move {
                sleep(duration).await;
                None
            });
        }

        let frames = self.frames_for(duration);
        for motion in motions {
            tasks.spawn(interpolate(motion, duration, frames, tx.clone()));
        }

        StepJoin { tasks, samples }
    }
}

async fn interpolate(
    motion: Motion,
    duration: Duration,
    frames: u32,
    samples: mpsc::UnboundedSender<MotionSample>,
) -> Option<Motion> {
    let mut ticker = interval((duration / frames).max(Duration::from_nanos(1)));
    // First tick completes immediately.
    ticker.tick().await;
    for distance in motion.samples(frames) {
        ticker.tick().await;
        let sample = MotionSample {
            buggy: motion.buggy.clone(),
            distance,
        };
        if samples.send(sample).is_err() {
            break;
        }
    }
    Some(motion)
}

#[cfg(test)]
mod tests {
    use super::*;
    use buggyrace_core::motion::BuggyState;
    use tokio::time::Instant;

    fn motion(id: &str, from: f64, delta: f64) -> Motion {
        let state = BuggyState {
            distance: from,
            ..BuggyState::at_start(BuggyId::from(id))
        };
        Motion::plan(&state, delta)
    }

    async fn drain(mut join: StepJoin) -> (Vec<Motion>, Vec<MotionSample>) {
        let mut done = Vec::new();
        while let Some(result) = join.tasks.join_next().await {
            if let Some(motion) = result.unwrap() {
                done.push(motion);
            }
        }
        let mut samples = Vec::new();
        while let Ok(sample) = join.samples.try_recv() {
            samples.push(sample);
        }
        (done, samples)
    }

    #[test]
    fn frame_count_follows_duration() {
        let scheduler = MotionScheduler::new(Duration::from_millis(16));
        assert_eq!(scheduler.frames_for(Duration::from_millis(1_000)), 62);
        assert_eq!(scheduler.frames_for(Duration::from_millis(125)), 7);
        assert_eq!(scheduler.frames_for(Duration::from_millis(5)), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn motions_run_concurrently_and_join() {
        let scheduler = MotionScheduler::new(Duration::from_millis(100));
        let started = Instant::now();
        let join = scheduler.launch(
            vec![motion("ada", 0.0, 10.0), motion("bob", 5.0, 20.0)],
            Duration::from_secs(1),
        );
        let (done, samples) = drain(join).await;

        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_millis(990));
        assert!(elapsed < Duration::from_millis(1_100));
        assert_eq!(done.len(), 2);
        assert_eq!(samples.len(), 20);

        let last_bob = samples.iter().filter(|s| s.buggy.as_str() == "bob").last().unwrap();
        assert_eq!(last_bob.distance, 25.0);
    }

    #[tokio::test(start_paused = true)]
    async fn zero_duration_step_still_reaches_targets() {
        let scheduler = MotionScheduler::new(Duration::from_millis(16));
        let join = scheduler.launch(vec![motion("ada", 0.0, 12.0)], Duration::ZERO);
        let (done, samples) = drain(join).await;
        assert_eq!(done.len(), 1);
        assert_eq!(samples.last().map(|s| s.distance), Some(12.0));
    }

    #[tokio::test(start_paused = true)]
    async fn empty_step_holds_for_the_step_duration() {
        let scheduler = MotionScheduler::new(Duration::from_millis(16));
        let started = Instant::now();
        let (done, samples) = drain(scheduler.launch(vec![], Duration::from_millis(500))).await;
        assert!(done.is_empty());
        assert!(samples.is_empty());
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_millis(500));
        assert!(elapsed < Duration::from_millis(510));
    }
}
