//! Everything the engine pushes to renderers and the narration log.
//!
//! Consumers are write-only: they receive [`ReplayOutput`] values in the
//! order the engine produced them and never feed state back except through
//! a [`ReplayHandle`](super::ReplayHandle).

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use tokio::sync::mpsc;

use buggyrace_core::clock::RaceClock;
use buggyrace_core::race::BuggyId;
use buggyrace_core::track::Point;

use super::state::PlaybackState;

static MENTION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[(\w+)\]").expect("mention pattern is valid"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NarrationLevel {
    /// Loading and setup progress.
    System,
    /// Something that happened in the race, stamped with race time.
    Event,
    /// A failure; the replay cannot continue.
    Alert,
    /// Acknowledges a control action.
    UserAction,
    /// Race heading written on reset.
    Title,
    /// The replay reached its normal end.
    Terminal,
}

/// One line of the narration log.
#[derive(Debug, Clone, PartialEq)]
pub struct Narration {
    pub level: NarrationLevel,
    pub clock: Option<RaceClock>,
    pub buggy: Option<BuggyId>,
    pub text: String,
    pub detail: Option<String>,
}

/// Part of a narration text; `[name]` mentions become selectable buggies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NarrationSegment<'a> {
    Text(&'a str),
    Buggy(BuggyId),
}

impl Narration {
    pub fn new(level: NarrationLevel, text: impl Into<String>) -> Self {
        Self {
            level,
            clock: None,
            buggy: None,
            text: text.into(),
            detail: None,
        }
    }

    pub fn event(clock: RaceClock, buggy: Option<BuggyId>, text: impl Into<String>) -> Self {
        Self {
            clock: Some(clock),
            buggy,
            ..Self::new(NarrationLevel::Event, text)
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn segments(&self) -> Vec<NarrationSegment<'_>> {
        let mut segments = Vec::new();
        let mut cursor = 0;
        for captures in MENTION.captures_iter(&self.text) {
            let (Some(whole), Some(name)) = (captures.get(0), captures.get(1)) else {
                continue;
            };
            if whole.start() > cursor {
                segments.push(NarrationSegment::Text(&self.text[cursor..whole.start()]));
            }
            segments.push(NarrationSegment::Buggy(BuggyId::new(name.as_str())));
            cursor = whole.end();
        }
        if cursor < self.text.len() {
            segments.push(NarrationSegment::Text(&self.text[cursor..]));
        }
        segments
    }
}

impl fmt::Display for Narration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(clock) = &self.clock {
            write!(f, "[{}] ", clock.label())?;
        }
        if let Some(buggy) = &self.buggy {
            write!(f, "{} ", buggy)?;
        }
        f.write_str(&self.text)?;
        if let Some(detail) = &self.detail {
            write!(f, " {}", detail)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EffectKind {
    Finish,
    Attack,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ReplayOutput {
    Narration(Narration),
    /// Interpolated position of a buggy.
    Position {
        buggy: BuggyId,
        distance: f64,
        point: Point,
    },
    /// Position of the tracked buggy, for the crosshair.
    Focus { buggy: BuggyId, point: Point },
    FocusCleared,
    Leader { buggy: BuggyId },
    Effect {
        buggy: BuggyId,
        kind: EffectKind,
        target: Option<BuggyId>,
    },
    Clock(RaceClock),
    State(PlaybackState),
    /// The narration log should be emptied.
    LogCleared,
}

pub type OutputStream = mpsc::UnboundedReceiver<ReplayOutput>;

/// Sending half of the output stream. Consumers may detach at any time.
#[derive(Debug, Clone)]
pub struct OutputSink {
    tx: mpsc::UnboundedSender<ReplayOutput>,
}

impl OutputSink {
    pub fn emit(&self, output: ReplayOutput) {
        if self.tx.send(output).is_err() {
            tracing::trace!("Output stream closed, dropping replay output");
        }
    }

    pub fn narrate(&self, narration: Narration) {
        tracing::debug!(level = ?narration.level, "{}", narration);
        self.emit(ReplayOutput::Narration(narration));
    }
}

pub fn channel() -> (OutputSink, OutputStream) {
    let (tx, rx) = mpsc::unbounded_channel();
    (OutputSink { tx }, rx)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mentions_split_into_segments() {
        let narration = Narration::new(NarrationLevel::Event, "rams [bob] and [cyd]!");
        assert_eq!(
            narration.segments(),
            vec![
                NarrationSegment::Text("rams "),
                NarrationSegment::Buggy(BuggyId::from("bob")),
                NarrationSegment::Text(" and "),
                NarrationSegment::Buggy(BuggyId::from("cyd")),
                NarrationSegment::Text("!"),
            ]
        );
    }

    #[test]
    fn plain_text_is_one_segment() {
        let narration = Narration::new(NarrationLevel::System, "preparing race");
        assert_eq!(
            narration.segments(),
            vec![NarrationSegment::Text("preparing race")]
        );
    }

    #[test]
    fn event_display_has_timestamp_and_buggy() {
        let narration = Narration::event(RaceClock::new(61, 1), Some("ada".into()), "takes the lead");
        assert_eq!(narration.to_string(), "[01:01] ada takes the lead");
    }

    #[test]
    fn closed_stream_does_not_panic() {
        let (sink, stream) = channel();
        drop(stream);
        sink.emit(ReplayOutput::FocusCleared);
    }
}
