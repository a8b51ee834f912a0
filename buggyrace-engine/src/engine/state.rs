use std::fmt;

/// Playback state of a replay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Idle,
    Running,
    Paused,
    Ended,
}

impl fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PlaybackState::Idle => "idle",
            PlaybackState::Running => "running",
            PlaybackState::Paused => "paused",
            PlaybackState::Ended => "ended",
        };
        f.write_str(name)
    }
}

/// Actual race pace, or fast-forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackSpeed {
    #[default]
    Normal,
    FastForward,
}

impl PlaybackSpeed {
    /// Divisor applied to the nominal step duration.
    pub fn multiplier(self, fast_forward: u32) -> u32 {
        match self {
            PlaybackSpeed::Normal => 1,
            PlaybackSpeed::FastForward => fast_forward.max(1),
        }
    }
}
