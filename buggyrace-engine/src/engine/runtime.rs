//! Replay runtime - owns every buggy, the playback state and the step loop.
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinError;
use tokio::time::Instant;
use tracing::{debug, info, instrument, trace};

use buggyrace_config::{BuggyraceConfig, ReplayConfig};
use buggyrace_core::clock::RaceClock;
use buggyrace_core::motion::{BuggyState, Motion};
use buggyrace_core::race::{BuggyId, EventKind, RaceDefinition};
use buggyrace_core::source::{LoadedRace, RaceSource};
use buggyrace_core::track::TrackGeometry;
use buggyrace_telemetry::{logging::EventLogger, MetricsRecorder};

use crate::engine::control::{Control, ReplayHandle};
use crate::engine::error::ReplayError;
use crate::engine::fingerprint::replay_fingerprint;
use crate::engine::leader::LeaderTracker;
use crate::engine::output::{EffectKind, Narration, NarrationLevel, OutputSink, ReplayOutput};
use crate::engine::randomized_driver::RandomizedSteps;
use crate::engine::runtime_trait::StepSource;
use crate::engine::scheduler::{MotionSample, MotionScheduler};
use crate::engine::scripted_driver::ScriptedSteps;
use crate::engine::state::{PlaybackSpeed, PlaybackState};

/// What woke the engine while a step was in flight.
enum Wake {
    Sample(MotionSample),
    Control(Option<Control>),
    Joined(Option<Result<Option<Motion>, JoinError>>),
}

/// Replays one race.
///
/// The engine is the only owner of mutable replay state. Controls arrive
/// through a [`ReplayHandle`] or direct method calls; everything the engine
/// produces leaves through its [`OutputSink`].
pub struct ReplayEngine {
    race: Arc<RaceDefinition>,
    track: Arc<dyn TrackGeometry>,
    steps: Box<dyn StepSource>,
    config: ReplayConfig,
    scheduler: MotionScheduler,
    output: OutputSink,
    controls: mpsc::UnboundedReceiver<Control>,
    controls_open: bool,
    metrics: Option<Arc<MetricsRecorder>>,

    buggies: BTreeMap<BuggyId, BuggyState>,
    leader: LeaderTracker,
    state: PlaybackState,
    speed: PlaybackSpeed,
    step_index: usize,
    lap_count: u32,
    pause_requested: bool,
    has_reset: bool,
}

impl ReplayEngine {
    /// Loads a race through `source` and prepares an engine for it.
    ///
    /// Load failures are narrated as a single alert and returned; no engine
    /// exists for a race that failed to load.
    #[instrument(level = "info", skip_all)]
    pub async fn load<S>(
        source: &S,
        config: &BuggyraceConfig,
        output: OutputSink,
    ) -> Result<(Self, ReplayHandle), ReplayError>
    where
        S: RaceSource + ?Sized,
    {
        output.narrate(Narration::new(NarrationLevel::System, "loading race JSON"));
        let loaded = match source.load().await {
            Ok(loaded) => loaded,
            Err(e) => {
                let err = ReplayError::from(e);
                output.narrate(Narration::new(NarrationLevel::Alert, err.to_string()));
                EventLogger::log_event("race_load_failed", &err.to_string());
                return Err(err);
            }
        };

        output.narrate(Narration::new(NarrationLevel::System, "preparing race"));
        let steps: Box<dyn StepSource> = if config.randomizer.enabled {
            let starters = loaded.race.starters().map(|b| b.id.clone()).collect();
            Box::new(RandomizedSteps::new(&config.randomizer, starters))
        } else {
            Box::new(ScriptedSteps::new(loaded.race.clone()))
        };

        let (mut engine, handle) = Self::new(loaded, steps, config.replay.clone(), output);
        if let Some(id) = config.replay.tracked_buggy.as_deref() {
            engine.select_tracked(Some(BuggyId::new(id)));
        }
        EventLogger::log_event("race_loaded", &engine.race.title);
        Ok((engine, handle))
    }

    /// Builds an engine over an already validated race and resets it, so
    /// the starting grid is emitted before this returns.
    pub fn new(
        loaded: LoadedRace,
        steps: Box<dyn StepSource>,
        config: ReplayConfig,
        output: OutputSink,
    ) -> (Self, ReplayHandle) {
        let (tx, controls) = mpsc::unbounded_channel();
        debug!("Replay config: {:?}", config);

        let mut engine = Self {
            race: loaded.race,
            track: loaded.track,
            steps,
            scheduler: MotionScheduler::new(config.frame_interval()),
            config,
            output,
            controls,
            controls_open: true,
            metrics: None,
            buggies: BTreeMap::new(),
            leader: LeaderTracker::default(),
            state: PlaybackState::Idle,
            speed: PlaybackSpeed::Normal,
            step_index: 0,
            lap_count: 1,
            pause_requested: false,
            has_reset: false,
        };
        engine.reset();
        (engine, ReplayHandle::new(tx))
    }

    pub fn with_metrics(mut self, metrics: Arc<MetricsRecorder>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn speed(&self) -> PlaybackSpeed {
        self.speed
    }

    pub fn step_index(&self) -> usize {
        self.step_index
    }

    pub fn total_steps(&self) -> usize {
        self.steps.total_steps()
    }

    pub fn lap_count(&self) -> u32 {
        self.lap_count
    }

    pub fn race(&self) -> &RaceDefinition {
        &self.race
    }

    pub fn track(&self) -> &dyn TrackGeometry {
        self.track.as_ref()
    }

    pub fn buggy(&self, id: &BuggyId) -> Option<&BuggyState> {
        self.buggies.get(id)
    }

    /// Every starting buggy, ordered by id.
    pub fn buggies(&self) -> impl Iterator<Item = &BuggyState> {
        self.buggies.values()
    }

    pub fn leader(&self) -> Option<&BuggyId> {
        self.leader.leader()
    }

    pub fn tracked(&self) -> Option<&BuggyId> {
        self.buggies.values().find(|s| s.is_tracked).map(|s| &s.id)
    }

    pub fn clock(&self) -> RaceClock {
        RaceClock::new(self.step_index, self.lap_count)
    }

    pub fn fingerprint(&self) -> String {
        replay_fingerprint(self.step_index, &self.buggies)
    }

    /// Starts or resumes the replay. Ignored while running or after the end.
    pub fn play(&mut self) -> bool {
        if !matches!(self.state, PlaybackState::Idle | PlaybackState::Paused) {
            debug!(state = %self.state, "Play ignored");
            return false;
        }
        self.speed = PlaybackSpeed::Normal;
        if self.step_index == 0 {
            self.narrate(Narration::event(self.clock(), None, "race starts"));
        }
        self.set_state(PlaybackState::Running);
        true
    }

    /// Requests a pause at the next step boundary. Once requested, the
    /// pause cannot be cancelled before the boundary.
    pub fn pause(&mut self) -> bool {
        if self.state != PlaybackState::Running || self.pause_requested {
            debug!(state = %self.state, "Pause ignored");
            return false;
        }
        self.pause_requested = true;
        self.narrate(Narration::new(NarrationLevel::UserAction, "Paused replay"));
        true
    }

    /// Puts every starter back on the grid. Rejected while running.
    pub fn reset(&mut self) -> bool {
        if self.state == PlaybackState::Running {
            debug!("Reset rejected while running");
            return false;
        }

        self.buggies = self
            .race
            .starters()
            .map(|b| (b.id.clone(), BuggyState::at_start(b.id.clone())))
            .collect();
        self.leader.reset();
        self.step_index = 0;
        self.lap_count = 1;
        self.pause_requested = false;
        self.speed = PlaybackSpeed::Normal;
        self.steps.rewind();

        if self.has_reset {
            self.output.emit(ReplayOutput::LogCleared);
            self.output.emit(ReplayOutput::FocusCleared);
        }
        self.has_reset = true;

        let start = self.track.point_at_distance(0.0);
        for id in self.buggies.keys() {
            self.output.emit(ReplayOutput::Position {
                buggy: id.clone(),
                distance: 0.0,
                point: start,
            });
        }
        self.output.emit(ReplayOutput::Clock(self.clock()));

        let detail = match self.buggies.len() {
            1 => "1 starting buggy".to_string(),
            n => format!("{n} starting buggies"),
        };
        self.narrate(Narration::new(NarrationLevel::Title, self.race.title.clone()).with_detail(detail));

        if self.steps.total_steps() == 0 {
            self.end_replay("race didn't start: no events to replay");
        } else {
            self.set_state(PlaybackState::Idle);
        }
        true
    }

    /// Switches between normal pace and fast-forward. Only honoured while
    /// running; takes effect from the next step.
    pub fn set_speed(&mut self, speed: PlaybackSpeed) -> bool {
        if self.state != PlaybackState::Running {
            debug!(state = %self.state, "Speed change ignored");
            return false;
        }
        if self.speed != speed {
            debug!(?speed, "Playback speed changed");
            self.speed = speed;
        }
        true
    }

    /// Tracks `buggy`, or clears tracking with `None`. Unknown ids are ignored.
    pub fn select_tracked(&mut self, buggy: Option<BuggyId>) -> bool {
        let Some(id) = buggy else {
            for state in self.buggies.values_mut() {
                state.is_tracked = false;
            }
            self.output.emit(ReplayOutput::FocusCleared);
            return true;
        };

        let Some(distance) = self.buggies.get(&id).map(|s| s.distance) else {
            debug!(buggy = %id, "Cannot track unknown buggy");
            return false;
        };
        for state in self.buggies.values_mut() {
            state.is_tracked = state.id == id;
        }
        self.narrate(Narration::new(NarrationLevel::UserAction, format!("Tracking {id}")));
        self.output.emit(ReplayOutput::Focus {
            point: self.track.point_at_distance(distance),
            buggy: id,
        });
        true
    }

    /// Drives the replay from controls until the handle is dropped and the
    /// replay is no longer running.
    #[instrument(level = "info", skip(self))]
    pub async fn run(&mut self) -> Result<(), ReplayError> {
        loop {
            if self.state == PlaybackState::Running {
                self.advance_step().await?;
                continue;
            }
            if !self.controls_open {
                return Ok(());
            }
            match self.controls.recv().await {
                Some(control) => self.apply(control),
                None => self.controls_open = false,
            }
        }
    }

    /// Advances steps until the replay pauses or ends.
    pub async fn run_until_settled(&mut self) -> Result<PlaybackState, ReplayError> {
        while self.state == PlaybackState::Running {
            self.advance_step().await?;
        }
        Ok(self.state)
    }

    /// Replays the next step. Resolves only once every motion of the step
    /// has been committed. Does nothing unless the replay is running.
    #[instrument(level = "debug", skip(self), fields(step = self.step_index))]
    pub async fn advance_step(&mut self) -> Result<(), ReplayError> {
        if self.state != PlaybackState::Running {
            debug!(state = %self.state, "Step ignored");
            return Ok(());
        }
        self.output.emit(ReplayOutput::Clock(self.clock()));
        if self.step_index >= self.steps.total_steps() {
            self.end_replay("race ended: no more events in log");
            return Ok(());
        }

        let started = Instant::now();
        let clock = self.clock();
        let events = self.steps.events_for(self.step_index);

        let mut deltas: BTreeMap<BuggyId, f64> = BTreeMap::new();
        for event in &events {
            let known = event.buggy.as_ref().filter(|id| self.buggies.contains_key(*id));
            if let (Some(id), Some(delta)) = (known, event.motion_delta()) {
                *deltas.entry(id.clone()).or_default() += delta;
            }
            match (&event.kind, known) {
                (EventKind::Finish, Some(id)) => {
                    self.leader.record_finish();
                    self.output.emit(ReplayOutput::Effect {
                        buggy: id.clone(),
                        kind: EffectKind::Finish,
                        target: None,
                    });
                }
                (EventKind::Attack { target }, Some(id)) => {
                    self.output.emit(ReplayOutput::Effect {
                        buggy: id.clone(),
                        kind: EffectKind::Attack,
                        target: target.clone(),
                    });
                }
                _ => {}
            }
            if let Some(text) = &event.narration {
                self.narrate(Narration::event(clock, event.buggy.clone(), text.clone()));
            }
        }

        let motions: Vec<Motion> = deltas
            .into_iter()
            .filter_map(|(id, delta)| self.buggies.get(&id).map(|s| Motion::plan(s, delta)))
            .collect();
        let duration = self.config.step_duration()
            / self.speed.multiplier(self.config.fast_forward_multiplier);
        trace!(motions = motions.len(), ?duration, "Scheduling step");

        let moved = self.run_motions(motions, duration).await?;

        let length = self.track.length();
        self.lap_count = self.buggies.values().map(|s| s.lap(length)).max().unwrap_or(1);
        if self.step_index > 0 && !self.leader.has_finisher() {
            self.update_leader();
        }
        self.step_index += 1;

        if let Some(metrics) = &self.metrics {
            metrics.steps.inc();
            metrics
                .step_wall_ms
                .observe(started.elapsed().as_secs_f64() * 1_000.0);
        }

        if self.config.stall_detection && moved <= 0.0 {
            self.end_replay("race ended: no buggy moved");
        } else if self.pause_requested {
            self.pause_requested = false;
            self.speed = PlaybackSpeed::Normal;
            self.set_state(PlaybackState::Paused);
        }
        Ok(())
    }

    /// Runs one step's motions to completion, reporting samples and applying
    /// controls as they arrive. Motions are committed only once the whole
    /// step has joined. Returns the total distance moved.
    async fn run_motions(
        &mut self,
        motions: Vec<Motion>,
        duration: Duration,
    ) -> Result<f64, ReplayError> {
        let mut join = self.scheduler.launch(motions, duration);
        let mut finished = Vec::new();

        loop {
            let wake = tokio::select! {
                biased;
                Some(sample) = join.samples.recv() => Wake::Sample(sample),
                control = self.controls.recv(), if self.controls_open => Wake::Control(control),
                joined = join.tasks.join_next() => Wake::Joined(joined),
            };
            match wake {
                Wake::Sample(sample) => self.report(sample),
                Wake::Control(Some(control)) => self.apply(control),
                Wake::Control(None) => self.controls_open = false,
                Wake::Joined(Some(result)) => {
                    if let Some(motion) = result? {
                        finished.push(motion);
                    }
                }
                Wake::Joined(None) => break,
            }
        }

        while let Ok(sample) = join.samples.try_recv() {
            self.report(sample);
        }
        Ok(finished.iter().map(|motion| self.commit(motion)).sum())
    }

    fn apply(&mut self, control: Control) {
        trace!(?control, "Applying control");
        match control {
            Control::Play => self.play(),
            Control::Pause => self.pause(),
            Control::Reset => self.reset(),
            Control::SetSpeed(speed) => self.set_speed(speed),
            Control::SelectTracked(buggy) => self.select_tracked(buggy),
        };
    }

    fn report(&self, sample: MotionSample) {
        let point = self.track.point_at_distance(sample.distance);
        let tracked = self
            .buggies
            .get(&sample.buggy)
            .is_some_and(|s| s.is_tracked);
        if tracked {
            self.output.emit(ReplayOutput::Focus {
                buggy: sample.buggy.clone(),
                point,
            });
        }
        self.output.emit(ReplayOutput::Position {
            buggy: sample.buggy,
            distance: sample.distance,
            point,
        });
    }

    fn commit(&mut self, motion: &Motion) -> f64 {
        let Some(state) = self.buggies.get_mut(&motion.buggy) else {
            return 0.0;
        };
        let moved = state.commit(motion);
        trace!(buggy = %motion.buggy, distance = state.distance, "Motion committed");
        if let Some(metrics) = &self.metrics {
            metrics.motions.inc();
        }
        moved
    }

    fn update_leader(&mut self) {
        let standings = self.buggies.iter().map(|(id, s)| (id, s.distance));
        if let Some(leader) = self.leader.evaluate(standings) {
            self.narrate(Narration::event(
                self.clock(),
                Some(leader.clone()),
                "takes the lead",
            ));
            self.output.emit(ReplayOutput::Leader { buggy: leader });
            if let Some(metrics) = &self.metrics {
                metrics.lead_changes.inc();
            }
        }
    }

    fn end_replay(&mut self, reason: &str) {
        self.pause_requested = false;
        self.speed = PlaybackSpeed::Normal;
        self.narrate(Narration {
            clock: Some(self.clock()),
            ..Narration::new(NarrationLevel::Terminal, reason)
        });
        info!(step = self.step_index, "{reason}");
        EventLogger::log_event("race_ended", reason);
        self.set_state(PlaybackState::Ended);
    }

    fn set_state(&mut self, state: PlaybackState) {
        self.state = state;
        self.output.emit(ReplayOutput::State(state));
    }

    fn narrate(&self, narration: Narration) {
        if let Some(metrics) = &self.metrics {
            metrics.narrations.inc();
        }
        self.output.narrate(narration);
    }
}
