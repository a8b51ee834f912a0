//! Per-buggy motion model.
//!
//! Distances are unwrapped: they accumulate across laps and never shrink
//! except on an explicit reset. Committed distances are whole units;
//! intermediate samples are not rounded.

use crate::race::BuggyId;

/// Mutable replay state of a single buggy.
#[derive(Debug, Clone, PartialEq)]
pub struct BuggyState {
    pub id: BuggyId,
    pub distance: f64,
    pub is_tracked: bool,
    /// Distance covered by the most recently committed motion.
    pub last_moved: f64,
}

impl BuggyState {
    pub fn at_start(id: BuggyId) -> Self {
        Self {
            id,
            distance: 0.0,
            is_tracked: false,
            last_moved: 0.0,
        }
    }

    pub fn lap(&self, track_length: f64) -> u32 {
        lap_for(self.distance, track_length)
    }

    /// Applies a finished motion. Returns the distance actually moved.
    pub fn commit(&mut self, motion: &Motion) -> f64 {
        debug_assert_eq!(self.id, motion.buggy);
        let target = motion.target.max(self.distance);
        self.last_moved = target - self.distance;
        self.distance = target;
        self.last_moved
    }
}

/// Lap number for an unwrapped distance, never below 1.
pub fn lap_for(distance: f64, track_length: f64) -> u32 {
    if track_length <= 0.0 {
        return 1;
    }
    ((distance / track_length).ceil() as u32).max(1)
}

/// A planned move from `start` to `target` within one step.
#[derive(Debug, Clone, PartialEq)]
pub struct Motion {
    pub buggy: BuggyId,
    pub start: f64,
    pub target: f64,
}

impl Motion {
    /// Plans a move of `delta` from the buggy's current distance. The target
    /// is rounded to the nearest whole unit and never behind the start.
    pub fn plan(state: &BuggyState, delta: f64) -> Self {
        let start = state.distance;
        Self {
            buggy: state.id.clone(),
            start,
            target: (start + delta).round().max(start),
        }
    }

    pub fn span(&self) -> f64 {
        self.target - self.start
    }

    /// Linear interpolation; `progress` is clamped to `[0, 1]`.
    pub fn distance_at(&self, progress: f64) -> f64 {
        self.start + self.span() * progress.clamp(0.0, 1.0)
    }

    /// Lazily yields `frames` evenly spaced distances, ending exactly on the target.
    pub fn samples(&self, frames: u32) -> impl Iterator<Item = f64> + '_ {
        let frames = frames.max(1);
        (1..=frames).map(move |frame| {
            if frame == frames {
                self.target
            } else {
                self.distance_at(f64::from(frame) / f64::from(frames))
            }
        })
    }
}
