mod control;
mod error;
mod fingerprint;
mod leader;
mod randomized_driver;
mod runtime;
mod runtime_trait;
mod scheduler;
mod scripted_driver;
mod state;

pub mod output;

pub use self::{
    control::{Control, ReplayHandle},
    error::ReplayError,
    fingerprint::replay_fingerprint,
    leader::LeaderTracker,
    output::{Narration, NarrationLevel, ReplayOutput},
    randomized_driver::RandomizedSteps,
    runtime::ReplayEngine,
    runtime_trait::StepSource,
    scheduler::{MotionSample, MotionScheduler, StepJoin},
    scripted_driver::ScriptedSteps,
    state::{PlaybackSpeed, PlaybackState},
};

pub mod prelude {
    pub use super::{
        PlaybackSpeed, PlaybackState, ReplayEngine, ReplayError, ReplayHandle, ReplayOutput,
    };
}
