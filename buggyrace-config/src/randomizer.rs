//! Randomized fallback race, used when no real race log is available.

use serde::{Deserialize, Serialize};
use validator::{self, Validate};

use crate::validation;

#[derive(Debug, Serialize, Deserialize, Validate, Clone)]
#[validate(schema(function = validation::validate_delta_range))]
pub struct RandomizerConfig {
    /// Replace the race events with randomly generated steps.
    #[serde(default)]
    pub enabled: bool,

    /// Seed for deterministic generation.
    #[serde(default = "default_seed")]
    pub seed: u64,

    /// Number of generated steps.
    #[serde(default = "default_max_steps")]
    #[validate(range(min = 1, max = 100_000))]
    pub max_steps: usize,

    /// Smallest per-step distance.
    #[serde(default = "default_min_delta")]
    pub min_delta: u32,

    /// Largest per-step distance.
    #[serde(default = "default_max_delta")]
    #[validate(range(max = 10_000))]
    pub max_delta: u32,
}

fn default_seed() -> u64 {
    42
}

fn default_max_steps() -> usize {
    100
}

fn default_min_delta() -> u32 {
    4
}

fn default_max_delta() -> u32 {
    30
}

impl Default for RandomizerConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            seed: default_seed(),
            max_steps: default_max_steps(),
            min_delta: default_min_delta(),
            max_delta: default_max_delta(),
        }
    }
}
