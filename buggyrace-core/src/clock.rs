//! Race-time labels. One step is one second of race time.

use std::fmt;

/// Elapsed race time at a step, with the current race lap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RaceClock {
    pub step: usize,
    pub lap: u32,
}

impl RaceClock {
    pub fn new(step: usize, lap: u32) -> Self {
        Self { step, lap }
    }

    /// `MM:SS`; minutes widen beyond two digits past 99.
    pub fn label(&self) -> String {
        format!("{:02}:{:02}", self.step / 60, self.step % 60)
    }
}

impl fmt::Display for RaceClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/LAP{}", self.label(), self.lap)
    }
}
