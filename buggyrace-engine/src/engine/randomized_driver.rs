use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use buggyrace_config::RandomizerConfig;
use buggyrace_core::race::{BuggyEvent, BuggyId};

use super::runtime_trait::StepSource;

/// Generates a random move for every buggy at every step.
///
/// Seeded, so a rewound replay produces the same race again.
pub struct RandomizedSteps {
    seed: u64,
    rng: StdRng,
    buggies: Vec<BuggyId>,
    max_steps: usize,
    min_delta: u32,
    max_delta: u32,
}

impl RandomizedSteps {
    pub fn new(config: &RandomizerConfig, buggies: Vec<BuggyId>) -> Self {
        Self {
            seed: config.seed,
            rng: StdRng::seed_from_u64(config.seed),
            buggies,
            max_steps: config.max_steps,
            min_delta: config.min_delta.min(config.max_delta),
            max_delta: config.max_delta,
        }
    }
}

impl StepSource for RandomizedSteps {
    fn total_steps(&self) -> usize {
        self.max_steps
    }

    fn events_for(&mut self, index: usize) -> Vec<BuggyEvent> {
        if index >= self.max_steps {
            return Vec::new();
        }
        self.buggies
            .iter()
            .map(|id| {
                let delta = self.rng.random_range(self.min_delta..=self.max_delta);
                BuggyEvent::moving(id.as_str(), f64::from(delta))
            })
            .collect()
    }

    fn rewind(&mut self) {
        self.rng = StdRng::seed_from_u64(self.seed);
    }
}
