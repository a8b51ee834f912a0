use std::sync::Arc;

use buggyrace_core::race::{BuggyEvent, RaceDefinition};

use super::runtime_trait::StepSource;

/// Replays the events recorded in the race definition.
pub struct ScriptedSteps {
    race: Arc<RaceDefinition>,
}

impl ScriptedSteps {
    pub fn new(race: Arc<RaceDefinition>) -> Self {
        Self { race }
    }
}

impl StepSource for ScriptedSteps {
    fn total_steps(&self) -> usize {
        self.race.total_steps()
    }

    fn events_for(&mut self, index: usize) -> Vec<BuggyEvent> {
        self.race.events.get(index).cloned().unwrap_or_default()
    }
}
