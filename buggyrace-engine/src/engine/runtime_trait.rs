//! Defines the StepSource trait for feeding the engine one step at a time.

use buggyrace_core::race::BuggyEvent;

pub trait StepSource: Send {
    /// Number of steps in the replay.
    fn total_steps(&self) -> usize;

    /// Events of step `index`; empty when the step has none.
    fn events_for(&mut self, index: usize) -> Vec<BuggyEvent>;

    /// Called on reset so a replay can be watched again from the start.
    fn rewind(&mut self) {}
}
