use std::path::PathBuf;

use thiserror::Error;

/// Reasons a race cannot be prepared for replay.
///
/// All of these are fatal: the engine is never constructed when loading fails.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("race file not found: {}", .0.display())]
    RaceNotFound(PathBuf),

    #[error("failed to parse race JSON: {0}")]
    MalformedRace(#[source] serde_json::Error),

    #[error("there's no racetrack reference in the race JSON")]
    MissingTrackReference,

    #[error("racetrack file not found: {}", .0.display())]
    TrackNotFound(PathBuf),

    #[error("failed to parse racetrack data: {0}")]
    MalformedTrack(#[source] serde_json::Error),

    #[error("error in racetrack (expected single path, found {0})")]
    PathCount(usize),

    #[error("error in racetrack (path has no length)")]
    DegenerateTrack,

    #[error("step {step}: invalid distance {delta} for buggy {buggy}")]
    InvalidDelta {
        step: usize,
        buggy: String,
        delta: f64,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
