//! Race sources hand the engine a validated race and its track.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, instrument};

use crate::race::RaceDefinition;
use crate::track::{TrackDefinition, TrackGeometry};
use crate::LoadError;

/// A race that passed validation, ready for replay.
#[derive(Debug, Clone)]
pub struct LoadedRace {
    pub race: Arc<RaceDefinition>,
    pub track: Arc<dyn TrackGeometry>,
}

impl LoadedRace {
    pub fn new(race: RaceDefinition, track: Arc<dyn TrackGeometry>) -> Result<Self, LoadError> {
        race.validate()?;
        Ok(Self {
            race: Arc::new(race),
            track,
        })
    }
}

#[async_trait]
pub trait RaceSource: Send + Sync {
    async fn load(&self) -> Result<LoadedRace, LoadError>;
}

/// Reads the race JSON and the track file it refers to.
#[derive(Debug, Clone)]
pub struct FileRaceSource {
    race_path: PathBuf,
    track_override: Option<PathBuf>,
}

impl FileRaceSource {
    pub fn new(race_path: impl Into<PathBuf>) -> Self {
        Self {
            race_path: race_path.into(),
            track_override: None,
        }
    }

    /// Uses `track_path` instead of the track referenced in the race JSON.
    pub fn with_track(mut self, track_path: impl Into<PathBuf>) -> Self {
        self.track_override = Some(track_path.into());
        self
    }

    fn resolve_track(&self, race: &RaceDefinition) -> Result<PathBuf, LoadError> {
        if let Some(path) = &self.track_override {
            return Ok(path.clone());
        }
        let reference = race
            .track_path
            .as_deref()
            .filter(|r| !r.trim().is_empty())
            .ok_or(LoadError::MissingTrackReference)?;
        let base = self.race_path.parent().unwrap_or_else(|| Path::new(""));
        Ok(base.join(reference))
    }
}

#[async_trait]
impl RaceSource for FileRaceSource {
    #[instrument(level = "debug", skip(self), fields(race = %self.race_path.display()))]
    async fn load(&self) -> Result<LoadedRace, LoadError> {
        if !tokio::fs::try_exists(&self.race_path).await? {
            return Err(LoadError::RaceNotFound(self.race_path.clone()));
        }
        let content = tokio::fs::read_to_string(&self.race_path).await?;
        let race: RaceDefinition =
            serde_json::from_str(&content).map_err(LoadError::MalformedRace)?;

        let track_path = self.resolve_track(&race)?;
        debug!("Loading track from {}", track_path.display());
        if !tokio::fs::try_exists(&track_path).await? {
            return Err(LoadError::TrackNotFound(track_path));
        }
        let content = tokio::fs::read_to_string(&track_path).await?;
        let track: TrackDefinition =
            serde_json::from_str(&content).map_err(LoadError::MalformedTrack)?;

        LoadedRace::new(race, Arc::new(track.into_geometry()?))
    }
}

/// In-memory source for callers that already hold parsed race data.
#[derive(Debug, Clone)]
pub struct StaticRaceSource {
    race: RaceDefinition,
    track: TrackDefinition,
}

impl StaticRaceSource {
    pub fn new(race: RaceDefinition, track: TrackDefinition) -> Self {
        Self { race, track }
    }
}

#[async_trait]
impl RaceSource for StaticRaceSource {
    async fn load(&self) -> Result<LoadedRace, LoadError> {
        let track = self.track.clone().into_geometry()?;
        LoadedRace::new(self.race.clone(), Arc::new(track))
    }
}
