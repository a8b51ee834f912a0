//! Control surface of a running replay.

use tokio::sync::mpsc;

use buggyrace_core::race::BuggyId;

use super::error::ReplayError;
use super::state::PlaybackSpeed;

/// The five operations a user can perform on a replay.
#[derive(Debug, Clone, PartialEq)]
pub enum Control {
    Play,
    Pause,
    Reset,
    SetSpeed(PlaybackSpeed),
    SelectTracked(Option<BuggyId>),
}

/// Cloneable handle for driving an engine from another task.
///
/// Commands are applied by the engine in arrival order, including while a
/// step is in flight; the engine decides when each takes effect.
///
/// A pause sent mid-step settles at the step boundary and cannot be
/// withdrawn: `play` is ignored while the engine is still running, and a
/// second `pause` before the boundary is ignored as well.
#[derive(Debug, Clone)]
pub struct ReplayHandle {
    tx: mpsc::UnboundedSender<Control>,
}

impl ReplayHandle {
    pub(crate) fn new(tx: mpsc::UnboundedSender<Control>) -> Self {
        Self { tx }
    }

    pub fn play(&self) -> Result<(), ReplayError> {
        self.send(Control::Play)
    }

    /// Requests a pause at the next step boundary.
    pub fn pause(&self) -> Result<(), ReplayError> {
        self.send(Control::Pause)
    }

    pub fn reset(&self) -> Result<(), ReplayError> {
        self.send(Control::Reset)
    }

    pub fn set_speed(&self, speed: PlaybackSpeed) -> Result<(), ReplayError> {
        self.send(Control::SetSpeed(speed))
    }

    pub fn select_tracked(&self, buggy: Option<BuggyId>) -> Result<(), ReplayError> {
        self.send(Control::SelectTracked(buggy))
    }

    pub fn send(&self, control: Control) -> Result<(), ReplayError> {
        self.tx.send(control).map_err(|_| ReplayError::Detached)
    }
}
