//! Race definition as delivered by the race server.
//!
//! The race is immutable once loaded: a title, the starting buggies and one
//! list of [`BuggyEvent`]s per step. Wire keys follow the race log format
//! (`b` buggy, `e` event type, `d` distance delta, `s` narration, `t` target).

use std::fmt;

use serde::Deserialize;

use crate::LoadError;

/// Stable identity of a buggy (the owner's username in race logs).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
#[serde(transparent)]
pub struct BuggyId(String);

impl BuggyId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BuggyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for BuggyId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Flag pattern painted on a buggy. Unknown names fall back to `Plain`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(from = "String")]
pub enum FlagPattern {
    #[default]
    Plain,
    Check,
    Dstripe,
    Hstripe,
    Spot,
    Vstripe,
}

impl From<String> for FlagPattern {
    fn from(name: String) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "check" => FlagPattern::Check,
            "dstripe" => FlagPattern::Dstripe,
            "hstripe" => FlagPattern::Hstripe,
            "spot" => FlagPattern::Spot,
            "vstripe" => FlagPattern::Vstripe,
            _ => FlagPattern::Plain,
        }
    }
}

/// A participant as listed in the race results.
#[derive(Debug, Clone, Deserialize)]
pub struct BuggyEntry {
    #[serde(rename = "username")]
    pub id: BuggyId,
    #[serde(default)]
    pub user_id: Option<u64>,
    #[serde(default = "default_flag_color")]
    pub flag_color: String,
    #[serde(default = "default_flag_color_secondary")]
    pub flag_color_secondary: String,
    #[serde(default)]
    pub flag_pattern: FlagPattern,
    /// Negative positions mean the buggy never started.
    #[serde(default)]
    pub race_position: i32,
}

fn default_flag_color() -> String {
    "white".into()
}

fn default_flag_color_secondary() -> String {
    "black".into()
}

impl BuggyEntry {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: BuggyId::new(id),
            user_id: None,
            flag_color: default_flag_color(),
            flag_color_secondary: default_flag_color_secondary(),
            flag_pattern: FlagPattern::Plain,
            race_position: 0,
        }
    }

    pub fn is_starter(&self) -> bool {
        self.race_position >= 0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum EventKind {
    Move,
    Finish,
    Attack { target: Option<BuggyId> },
    None,
}

/// One actor's contribution to a step.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "RawBuggyEvent")]
pub struct BuggyEvent {
    pub buggy: Option<BuggyId>,
    pub kind: EventKind,
    pub delta: Option<f64>,
    pub narration: Option<String>,
}

impl BuggyEvent {
    pub fn moving(buggy: impl Into<String>, delta: f64) -> Self {
        Self {
            buggy: Some(BuggyId::new(buggy)),
            kind: EventKind::Move,
            delta: Some(delta),
            narration: None,
        }
    }

    pub fn finishing(buggy: impl Into<String>, delta: Option<f64>) -> Self {
        Self {
            buggy: Some(BuggyId::new(buggy)),
            kind: EventKind::Finish,
            delta,
            narration: None,
        }
    }

    pub fn narration_only(buggy: Option<&str>, text: impl Into<String>) -> Self {
        Self {
            buggy: buggy.map(BuggyId::new),
            kind: EventKind::None,
            delta: None,
            narration: Some(text.into()),
        }
    }

    pub fn with_narration(mut self, text: impl Into<String>) -> Self {
        self.narration = Some(text.into());
        self
    }

    /// Positive delta carried by this event, if any.
    pub fn motion_delta(&self) -> Option<f64> {
        self.delta.filter(|d| *d > 0.0)
    }
}

#[derive(Deserialize)]
struct RawBuggyEvent {
    #[serde(default)]
    b: Option<BuggyId>,
    #[serde(default)]
    e: Option<String>,
    #[serde(default, deserialize_with = "lenient_delta")]
    d: Option<f64>,
    #[serde(default)]
    s: Option<String>,
    #[serde(default)]
    t: Option<BuggyId>,
}

impl From<RawBuggyEvent> for BuggyEvent {
    fn from(raw: RawBuggyEvent) -> Self {
        let kind = match raw.e.as_deref() {
            Some("f") | Some("finish") => EventKind::Finish,
            Some(code) if code.starts_with('a') => EventKind::Attack { target: raw.t },
            _ if raw.d.is_some() => EventKind::Move,
            _ => EventKind::None,
        };
        Self {
            buggy: raw.b,
            kind,
            delta: raw.d,
            narration: raw.s,
        }
    }
}

/// Race logs written by older tooling carry deltas as strings.
fn lenient_delta<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Delta {
        Number(f64),
        Text(String),
    }

    match Option::<Delta>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Delta::Number(d)) => Ok(Some(d)),
        Some(Delta::Text(s)) => s
            .trim()
            .parse::<f64>()
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}

/// The immutable race: who starts and what happens at every step.
#[derive(Debug, Clone, Deserialize)]
pub struct RaceDefinition {
    #[serde(default = "default_title")]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, alias = "results")]
    pub buggies: Vec<BuggyEntry>,
    #[serde(default)]
    pub events: Vec<Vec<BuggyEvent>>,
    /// Track file reference, relative to the race file.
    #[serde(default, alias = "track_svg_url")]
    pub track_path: Option<String>,
}

fn default_title() -> String {
    "Untitled race".into()
}

impl RaceDefinition {
    pub fn new(
        title: impl Into<String>,
        buggies: Vec<BuggyEntry>,
        events: Vec<Vec<BuggyEvent>>,
    ) -> Self {
        Self {
            title: title.into(),
            description: String::new(),
            buggies,
            events,
            track_path: None,
        }
    }

    /// Buggies that take part in the replay, in results order.
    pub fn starters(&self) -> impl Iterator<Item = &BuggyEntry> {
        self.buggies.iter().filter(|b| b.is_starter())
    }

    pub fn total_steps(&self) -> usize {
        self.events.len()
    }

    /// Rejects deltas that would move a buggy backwards or are not numbers.
    pub fn validate(&self) -> Result<(), LoadError> {
        for (step, events) in self.events.iter().enumerate() {
            for event in events {
                if let Some(delta) = event.delta {
                    if !delta.is_finite() || delta < 0.0 {
                        return Err(LoadError::InvalidDelta {
                            step,
                            buggy: event
                                .buggy
                                .as_ref()
                                .map(ToString::to_string)
                                .unwrap_or_default(),
                            delta,
                        });
                    }
                }
            }
        }
        Ok(())
    }
}
