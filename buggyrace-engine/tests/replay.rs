use std::sync::Arc;
use std::time::Duration;

use proptest::prelude::*;
use tokio::time::Instant;

use buggyrace_config::{BuggyraceConfig, ReplayConfig};
use buggyrace_core::race::{BuggyEntry, BuggyEvent, BuggyId, RaceDefinition};
use buggyrace_core::source::{LoadedRace, StaticRaceSource};
use buggyrace_core::track::TrackDefinition;
use buggyrace_core::LoadError;
use buggyrace_engine::engine::{NarrationLevel, ScriptedSteps};
use buggyrace_engine::output::{self, EffectKind, Narration, OutputStream};
use buggyrace_engine::{
    PlaybackSpeed, PlaybackState, ReplayEngine, ReplayError, ReplayHandle, ReplayOutput,
};

/// Square with a 100 unit lap.
fn square_track() -> TrackDefinition {
    TrackDefinition::single(vec![[0.0, 0.0], [25.0, 0.0], [25.0, 25.0], [0.0, 25.0]])
}

fn race(buggies: &[&str], events: Vec<Vec<BuggyEvent>>) -> RaceDefinition {
    RaceDefinition::new(
        "Test Heat",
        buggies.iter().map(|id| BuggyEntry::new(*id)).collect(),
        events,
    )
}

fn engine_with(
    race: RaceDefinition,
    config: ReplayConfig,
) -> (ReplayEngine, ReplayHandle, OutputStream) {
    let track = square_track().into_geometry().unwrap();
    let loaded = LoadedRace::new(race, Arc::new(track)).unwrap();
    let steps = Box::new(ScriptedSteps::new(loaded.race.clone()));
    let (sink, stream) = output::channel();
    let (engine, handle) = ReplayEngine::new(loaded, steps, config, sink);
    (engine, handle, stream)
}

fn engine_for(race: RaceDefinition) -> (ReplayEngine, ReplayHandle, OutputStream) {
    engine_with(race, ReplayConfig::default())
}

fn drain(stream: &mut OutputStream) -> Vec<ReplayOutput> {
    let mut outputs = Vec::new();
    while let Ok(output) = stream.try_recv() {
        outputs.push(output);
    }
    outputs
}

fn narrations(outputs: &[ReplayOutput]) -> Vec<&Narration> {
    outputs
        .iter()
        .filter_map(|o| match o {
            ReplayOutput::Narration(n) => Some(n),
            _ => None,
        })
        .collect()
}

fn lead_changes(outputs: &[ReplayOutput]) -> Vec<BuggyId> {
    narrations(outputs)
        .into_iter()
        .filter(|n| n.text == "takes the lead")
        .filter_map(|n| n.buggy.clone())
        .collect()
}

fn distance(engine: &ReplayEngine, id: &str) -> f64 {
    engine.buggy(&BuggyId::from(id)).unwrap().distance
}

fn steady_race(steps: usize) -> RaceDefinition {
    let events = (0..steps)
        .map(|_| vec![BuggyEvent::moving("ada", 10.0), BuggyEvent::moving("bob", 5.0)])
        .collect();
    race(&["ada", "bob"], events)
}

#[tokio::test(start_paused = true)]
async fn two_buggies_three_steps() {
    let (mut engine, _handle, mut stream) = engine_for(steady_race(3));

    assert!(engine.play());
    let settled = engine.run_until_settled().await.unwrap();
    let outputs = drain(&mut stream);

    assert_eq!(settled, PlaybackState::Ended);
    assert_eq!(distance(&engine, "ada"), 30.0);
    assert_eq!(distance(&engine, "bob"), 15.0);
    assert_eq!(engine.lap_count(), 1);
    assert_eq!(engine.leader(), Some(&BuggyId::from("ada")));
    assert_eq!(lead_changes(&outputs), vec![BuggyId::from("ada")]);

    let texts: Vec<&str> = narrations(&outputs).iter().map(|n| n.text.as_str()).collect();
    assert!(texts.contains(&"race starts"));
    assert_eq!(texts.last(), Some(&"race ended: no more events in log"));
}

#[tokio::test(start_paused = true)]
async fn empty_race_ends_on_reset() {
    let (mut engine, _handle, mut stream) = engine_for(race(&["ada", "bob"], vec![]));
    let outputs = drain(&mut stream);

    assert_eq!(engine.state(), PlaybackState::Ended);
    let terminal = narrations(&outputs)
        .into_iter()
        .find(|n| n.level == NarrationLevel::Terminal)
        .unwrap();
    assert!(terminal.text.contains("no events to replay"));
    assert!(!outputs
        .iter()
        .any(|o| matches!(o, ReplayOutput::Position { distance, .. } if *distance > 0.0)));
    assert!(!engine.play());
}

#[tokio::test(start_paused = true)]
async fn two_path_track_fails_to_load() {
    let track: TrackDefinition = serde_json::from_str(
        r#"{"paths": [{"points": [[0, 0], [10, 0]]}, {"points": [[0, 5], [10, 5]]}]}"#,
    )
    .unwrap();
    let source = StaticRaceSource::new(steady_race(3), track);
    let (sink, mut stream) = output::channel();

    let result = ReplayEngine::load(&source, &BuggyraceConfig::default(), sink).await;
    assert!(matches!(
        result,
        Err(ReplayError::Load(LoadError::PathCount(2)))
    ));

    let outputs = drain(&mut stream);
    let alerts: Vec<_> = narrations(&outputs)
        .into_iter()
        .filter(|n| n.level == NarrationLevel::Alert)
        .collect();
    assert_eq!(alerts.len(), 1);
    assert_eq!(
        alerts[0].text,
        "cannot load race - error in racetrack (expected single path, found 2)"
    );
    assert!(!outputs.iter().any(|o| matches!(o, ReplayOutput::State(_))));
}

#[tokio::test(start_paused = true)]
async fn empty_step_still_takes_a_step() {
    let events = vec![
        vec![BuggyEvent::moving("ada", 10.0)],
        vec![],
        vec![BuggyEvent::moving("ada", 5.0)],
    ];
    let (mut engine, _handle, mut stream) = engine_for(race(&["ada"], events));
    engine.play();

    engine.advance_step().await.unwrap();
    let started = Instant::now();
    engine.advance_step().await.unwrap();

    assert!(started.elapsed() >= Duration::from_millis(1_000));
    assert_eq!(engine.step_index(), 2);
    assert_eq!(engine.clock().label(), "00:02");
    assert_eq!(distance(&engine, "ada"), 10.0);
    assert_eq!(engine.state(), PlaybackState::Running);

    let clocks: Vec<usize> = drain(&mut stream)
        .iter()
        .filter_map(|o| match o {
            ReplayOutput::Clock(clock) => Some(clock.step),
            _ => None,
        })
        .collect();
    assert_eq!(clocks, vec![0, 0, 1]);
}

#[tokio::test(start_paused = true)]
async fn pause_takes_effect_at_step_boundary() {
    let (mut engine, handle, mut stream) = engine_for(steady_race(3));
    engine.play();
    handle.pause().unwrap();

    let settled = engine.run_until_settled().await.unwrap();
    assert_eq!(settled, PlaybackState::Paused);
    assert_eq!(engine.step_index(), 1);
    assert_eq!(distance(&engine, "ada"), 10.0);
    assert_eq!(distance(&engine, "bob"), 5.0);

    let outputs = drain(&mut stream);
    assert!(narrations(&outputs)
        .iter()
        .any(|n| n.level == NarrationLevel::UserAction && n.text == "Paused replay"));
    assert_eq!(
        outputs.last(),
        Some(&ReplayOutput::State(PlaybackState::Paused))
    );

    assert!(engine.play());
    assert_eq!(engine.run_until_settled().await.unwrap(), PlaybackState::Ended);
    assert_eq!(distance(&engine, "ada"), 30.0);
    let texts: Vec<_> = narrations(&drain(&mut stream))
        .iter()
        .map(|n| n.text.clone())
        .collect();
    assert!(!texts.contains(&"race starts".to_string()));
}

#[tokio::test(start_paused = true)]
async fn reset_is_rejected_while_running() {
    let (mut engine, handle, mut stream) = engine_for(steady_race(2));
    engine.play();
    assert!(!engine.reset());
    assert_eq!(engine.state(), PlaybackState::Running);

    handle.reset().unwrap();
    handle.select_tracked(Some("bob".into())).unwrap();
    assert_eq!(engine.run_until_settled().await.unwrap(), PlaybackState::Ended);
    assert_eq!(distance(&engine, "ada"), 20.0);
    assert_eq!(engine.tracked(), Some(&BuggyId::from("bob")));
    drain(&mut stream);

    assert!(engine.reset());
    let outputs = drain(&mut stream);
    assert_eq!(engine.state(), PlaybackState::Idle);
    assert_eq!(engine.step_index(), 0);
    assert_eq!(engine.lap_count(), 1);
    assert_eq!(distance(&engine, "ada"), 0.0);
    assert_eq!(distance(&engine, "bob"), 0.0);
    assert!(engine.tracked().is_none());
    assert!(engine.leader().is_none());
    assert_eq!(outputs.first(), Some(&ReplayOutput::LogCleared));
    assert!(outputs.contains(&ReplayOutput::FocusCleared));
}

#[tokio::test(start_paused = true)]
async fn first_reset_does_not_clear_the_log() {
    let (_engine, _handle, mut stream) = engine_for(steady_race(1));
    let outputs = drain(&mut stream);
    assert!(!outputs.contains(&ReplayOutput::LogCleared));

    let title = narrations(&outputs)
        .into_iter()
        .find(|n| n.level == NarrationLevel::Title)
        .unwrap();
    assert_eq!(title.text, "Test Heat");
    assert_eq!(title.detail.as_deref(), Some("2 starting buggies"));
    assert_eq!(
        outputs.last(),
        Some(&ReplayOutput::State(PlaybackState::Idle))
    );
}

#[tokio::test(start_paused = true)]
async fn fast_forward_only_changes_wall_clock_time() {
    let (mut normal, _h1, _s1) = engine_for(steady_race(3));
    let started = Instant::now();
    normal.play();
    normal.run_until_settled().await.unwrap();
    let normal_elapsed = started.elapsed();

    let (mut fast, _h2, _s2) = engine_for(steady_race(3));
    let started = Instant::now();
    fast.play();
    assert!(fast.set_speed(PlaybackSpeed::FastForward));
    fast.run_until_settled().await.unwrap();
    let fast_elapsed = started.elapsed();

    assert!(normal_elapsed >= Duration::from_millis(2_900));
    assert!(fast_elapsed < Duration::from_secs(1));
    assert_eq!(normal.fingerprint(), fast.fingerprint());
    assert_eq!(fast.speed(), PlaybackSpeed::Normal);
}

#[tokio::test(start_paused = true)]
async fn speed_change_mid_step_applies_from_the_next_step() {
    let (mut engine, handle, _stream) = engine_for(steady_race(3));
    engine.play();
    handle.set_speed(PlaybackSpeed::FastForward).unwrap();

    let started = Instant::now();
    engine.advance_step().await.unwrap();
    let first = started.elapsed();
    assert_eq!(engine.speed(), PlaybackSpeed::FastForward);

    let started = Instant::now();
    engine.advance_step().await.unwrap();
    let second = started.elapsed();

    assert!(first >= Duration::from_millis(1_000));
    assert!(first < Duration::from_millis(1_100));
    assert!(second >= Duration::from_millis(125));
    assert!(second < Duration::from_millis(200));

    engine.run_until_settled().await.unwrap();
    let (mut normal, _h, _s) = engine_for(steady_race(3));
    normal.play();
    normal.run_until_settled().await.unwrap();
    assert_eq!(engine.fingerprint(), normal.fingerprint());
}

#[tokio::test(start_paused = true)]
async fn stepping_requires_a_running_replay() {
    let (mut engine, handle, mut stream) = engine_for(steady_race(2));
    drain(&mut stream);

    engine.advance_step().await.unwrap();
    assert_eq!(engine.state(), PlaybackState::Idle);
    assert_eq!(engine.step_index(), 0);
    assert_eq!(distance(&engine, "ada"), 0.0);
    assert!(drain(&mut stream).is_empty());

    engine.play();
    handle.pause().unwrap();
    assert_eq!(engine.run_until_settled().await.unwrap(), PlaybackState::Paused);
    drain(&mut stream);
    engine.advance_step().await.unwrap();
    assert_eq!(engine.step_index(), 1);
    assert_eq!(distance(&engine, "ada"), 10.0);
    assert!(drain(&mut stream).is_empty());

    engine.play();
    assert_eq!(engine.run_until_settled().await.unwrap(), PlaybackState::Ended);
    drain(&mut stream);
    engine.advance_step().await.unwrap();
    engine.advance_step().await.unwrap();
    assert_eq!(engine.state(), PlaybackState::Ended);
    assert!(drain(&mut stream).is_empty());
}

#[tokio::test(start_paused = true)]
async fn speed_change_is_ignored_when_not_running() {
    let (mut engine, _handle, _stream) = engine_for(steady_race(1));
    assert!(!engine.set_speed(PlaybackSpeed::FastForward));
    assert_eq!(engine.speed(), PlaybackSpeed::Normal);
}

#[tokio::test(start_paused = true)]
async fn tracked_buggy_positions_are_focused() {
    let (mut engine, _handle, mut stream) = engine_for(steady_race(1));
    assert!(!engine.select_tracked(Some("zed".into())));
    assert!(engine.select_tracked(Some("bob".into())));
    assert_eq!(engine.tracked(), Some(&BuggyId::from("bob")));

    engine.play();
    engine.advance_step().await.unwrap();
    let outputs = drain(&mut stream);

    assert!(narrations(&outputs)
        .iter()
        .any(|n| n.text == "Tracking bob"));
    let focused: Vec<&BuggyId> = outputs
        .iter()
        .filter_map(|o| match o {
            ReplayOutput::Focus { buggy, .. } => Some(buggy),
            _ => None,
        })
        .collect();
    assert!(focused.len() > 1);
    assert!(focused.iter().all(|b| b.as_str() == "bob"));

    assert!(engine.select_tracked(None));
    assert!(engine.tracked().is_none());
    assert_eq!(drain(&mut stream), vec![ReplayOutput::FocusCleared]);
}

#[tokio::test(start_paused = true)]
async fn finish_freezes_the_leader() {
    let events = vec![
        vec![BuggyEvent::moving("ada", 10.0), BuggyEvent::moving("bob", 5.0)],
        vec![BuggyEvent::moving("ada", 10.0), BuggyEvent::moving("bob", 5.0)],
        vec![
            BuggyEvent::finishing("ada", Some(1.0)).with_narration("crosses the line"),
            BuggyEvent::moving("bob", 100.0),
        ],
        vec![BuggyEvent::moving("bob", 10.0)],
    ];
    let (mut engine, _handle, mut stream) = engine_for(race(&["ada", "bob"], events));
    engine.play();
    engine.run_until_settled().await.unwrap();
    let outputs = drain(&mut stream);

    assert_eq!(lead_changes(&outputs), vec![BuggyId::from("ada")]);
    assert_eq!(engine.leader(), Some(&BuggyId::from("ada")));
    assert_eq!(distance(&engine, "bob"), 120.0);
    assert_eq!(engine.lap_count(), 2);
    assert!(outputs.contains(&ReplayOutput::Effect {
        buggy: BuggyId::from("ada"),
        kind: EffectKind::Finish,
        target: None,
    }));
}

#[tokio::test(start_paused = true)]
async fn stalled_step_ends_the_race_when_enabled() {
    let events = vec![
        vec![BuggyEvent::moving("ada", 10.0)],
        vec![BuggyEvent::narration_only(Some("ada"), "stops for fuel")],
        vec![BuggyEvent::moving("ada", 5.0)],
    ];
    let config = ReplayConfig {
        stall_detection: true,
        ..ReplayConfig::default()
    };
    let (mut engine, _handle, mut stream) = engine_with(race(&["ada"], events), config);
    engine.play();

    assert_eq!(engine.run_until_settled().await.unwrap(), PlaybackState::Ended);
    assert_eq!(engine.step_index(), 2);
    assert_eq!(distance(&engine, "ada"), 10.0);
    let last = narrations(&drain(&mut stream)).last().map(|n| n.text.clone());
    assert_eq!(last.as_deref(), Some("race ended: no buggy moved"));
}

#[tokio::test(start_paused = true)]
async fn step_narration_precedes_lead_change() {
    let events = vec![
        vec![BuggyEvent::moving("ada", 10.0), BuggyEvent::moving("bob", 5.0)],
        vec![BuggyEvent::moving("bob", 20.0).with_narration("[bob] overtakes [ada]")],
    ];
    let (mut engine, _handle, mut stream) = engine_for(race(&["ada", "bob"], events));
    engine.play();
    engine.run_until_settled().await.unwrap();
    let outputs = drain(&mut stream);
    let texts: Vec<&str> = narrations(&outputs).iter().map(|n| n.text.as_str()).collect();

    let overtakes = texts.iter().position(|t| *t == "[bob] overtakes [ada]").unwrap();
    let lead = texts.iter().position(|t| *t == "takes the lead").unwrap();
    assert!(overtakes < lead);
    assert_eq!(lead_changes(&outputs), vec![BuggyId::from("bob")]);
}

#[tokio::test(start_paused = true)]
async fn handle_drives_the_replay() {
    let (mut engine, handle, _stream) = engine_for(steady_race(2));
    handle.play().unwrap();
    handle.select_tracked(Some("ada".into())).unwrap();
    drop(handle);

    engine.run().await.unwrap();
    assert_eq!(engine.state(), PlaybackState::Ended);
    assert_eq!(engine.tracked(), Some(&BuggyId::from("ada")));
    assert_eq!(distance(&engine, "ada"), 20.0);
}

#[tokio::test(start_paused = true)]
async fn detached_handle_reports_error() {
    let (engine, handle, _stream) = engine_for(steady_race(1));
    drop(engine);
    assert!(matches!(handle.play(), Err(ReplayError::Detached)));
}

#[tokio::test(start_paused = true)]
async fn randomized_fallback_with_tracking_from_config() {
    let mut config = BuggyraceConfig::default();
    config.randomizer.enabled = true;
    config.randomizer.max_steps = 4;
    config.replay.tracked_buggy = Some("bob".into());
    let source = StaticRaceSource::new(race(&["ada", "bob"], vec![]), square_track());
    let (sink, mut stream) = output::channel();

    let (mut engine, _handle) = ReplayEngine::load(&source, &config, sink).await.unwrap();
    assert_eq!(engine.total_steps(), 4);
    assert_eq!(engine.tracked(), Some(&BuggyId::from("bob")));

    engine.play();
    engine.run_until_settled().await.unwrap();
    assert!(engine.buggies().all(|b| b.distance >= 16.0));

    let texts: Vec<String> = narrations(&drain(&mut stream))
        .iter()
        .map(|n| n.text.clone())
        .collect();
    assert_eq!(texts[0], "loading race JSON");
    assert_eq!(texts[1], "preparing race");
}

fn replay_to_end(deltas: &[(u8, u8)]) -> (String, Vec<ReplayOutput>) {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .start_paused(true)
        .build()
        .unwrap();
    runtime.block_on(async {
        let events = deltas
            .iter()
            .map(|(a, b)| {
                vec![
                    BuggyEvent::moving("ada", f64::from(*a)),
                    BuggyEvent::moving("bob", f64::from(*b)),
                ]
            })
            .collect();
        let config = ReplayConfig {
            step_duration_ms: 100,
            ..ReplayConfig::default()
        };
        let (mut engine, _handle, mut stream) = engine_with(race(&["ada", "bob"], events), config);
        engine.play();
        engine.run_until_settled().await.unwrap();
        (engine.fingerprint(), drain(&mut stream))
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn replay_is_deterministic_and_monotonic(deltas in prop::collection::vec((0u8..60, 0u8..60), 1..6)) {
        let (first, outputs) = replay_to_end(&deltas);
        let (second, _) = replay_to_end(&deltas);
        prop_assert_eq!(first, second);

        let mut last = std::collections::HashMap::new();
        for output in &outputs {
            if let ReplayOutput::Position { buggy, distance, .. } = output {
                let previous = last.insert(buggy.clone(), *distance).unwrap_or(0.0);
                prop_assert!(*distance >= previous);
            }
        }
    }
}
