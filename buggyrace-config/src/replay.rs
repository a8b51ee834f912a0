//! Playback pacing and behaviour of the replay engine.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use validator::{self, Validate};

#[derive(Debug, Serialize, Deserialize, Validate, Clone)]
pub struct ReplayConfig {
    /// Wall-clock duration of one race step at normal speed (milliseconds).
    #[serde(default = "default_step_duration_ms")]
    #[validate(range(min = 10, max = 60_000))]
    pub step_duration_ms: u64,

    /// Interval between interpolated position updates (milliseconds).
    #[serde(default = "default_frame_interval_ms")]
    #[validate(range(min = 1, max = 1_000))]
    pub frame_interval_ms: u64,

    /// Speed-up applied while fast-forwarding.
    #[serde(default = "default_fast_forward_multiplier")]
    #[validate(range(min = 2, max = 64))]
    pub fast_forward_multiplier: u32,

    /// End the race as soon as a step moves no buggy.
    #[serde(default)]
    pub stall_detection: bool,

    /// Buggy to track as soon as the race is loaded.
    #[serde(default)]
    pub tracked_buggy: Option<String>,
}

fn default_step_duration_ms() -> u64 {
    1_000
}

fn default_frame_interval_ms() -> u64 {
    16
}

fn default_fast_forward_multiplier() -> u32 {
    8
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            step_duration_ms: default_step_duration_ms(),
            frame_interval_ms: default_frame_interval_ms(),
            fast_forward_multiplier: default_fast_forward_multiplier(),
            stall_detection: false,
            tracked_buggy: None,
        }
    }
}

impl ReplayConfig {
    pub fn step_duration(&self) -> Duration {
        Duration::from_millis(self.step_duration_ms)
    }

    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms)
    }
}
