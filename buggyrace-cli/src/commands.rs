use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::watch;
use tracing::{debug, info};

use buggyrace_config::BuggyraceConfig;
use buggyrace_core::race::BuggyId;
use buggyrace_core::source::{FileRaceSource, RaceSource};
use buggyrace_engine::engine::Control;
use buggyrace_engine::output;
use buggyrace_engine::{PlaybackSpeed, PlaybackState, ReplayEngine, ReplayHandle};
use buggyrace_telemetry::metrics::MetricsRecorder;

use crate::render;

#[derive(Parser)]
#[command(version, about)]
pub struct Cli {
    /// Configuration file; defaults to config/buggyrace.yaml when present
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Replay a race log and print its narration
    Replay(ReplayArgs),
    /// Load a race log and its track without replaying it
    Check(CheckArgs),
}

#[derive(Args, Debug, Clone)]
pub struct ReplayArgs {
    /// Race JSON file
    #[arg(short, long)]
    pub race: PathBuf,
    /// Track file, instead of the one referenced by the race
    #[arg(short, long)]
    pub track: Option<PathBuf>,
    /// Start in fast-forward
    #[arg(long)]
    pub fast: bool,
    /// Buggy to track from the start
    #[arg(long)]
    pub track_buggy: Option<String>,
    /// Read controls from stdin: p play/pause, r reset, f speed, t [id] track, q quit
    #[arg(short, long)]
    pub interactive: bool,
    /// Replace the race events with randomly generated steps
    #[arg(long)]
    pub randomize: bool,
    #[arg(long)]
    pub seed: Option<u64>,
    /// Print prometheus metrics after the replay
    #[arg(long)]
    pub metrics: bool,
    /// Fail unless the final standings hash to this fingerprint
    #[arg(long)]
    pub expect_fingerprint: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct CheckArgs {
    #[arg(short, long)]
    pub race: PathBuf,
    #[arg(short, long)]
    pub track: Option<PathBuf>,
}

fn source_for(race: PathBuf, track: Option<PathBuf>) -> FileRaceSource {
    let source = FileRaceSource::new(race);
    match track {
        Some(track) => source.with_track(track),
        None => source,
    }
}

pub async fn run_replay(
    args: ReplayArgs,
    mut config: BuggyraceConfig,
    metrics: Arc<MetricsRecorder>,
) -> anyhow::Result<()> {
    if args.randomize {
        config.randomizer.enabled = true;
    }
    if let Some(seed) = args.seed {
        config.randomizer.seed = seed;
    }
    if let Some(id) = args.track_buggy.clone() {
        config.replay.tracked_buggy = Some(id);
    }

    let source = source_for(args.race.clone(), args.track.clone());
    let (sink, stream) = output::channel();
    let (state_tx, state_rx) = watch::channel(PlaybackState::Idle);
    let printer = tokio::spawn(render::print_outputs(stream, state_tx));

    let loaded = ReplayEngine::load(&source, &config, sink).await;
    let (engine, handle) = match loaded {
        Ok(loaded) => loaded,
        Err(e) => {
            printer.await?;
            return Err(e).with_context(|| format!("replaying {}", args.race.display()));
        }
    };
    let mut engine = engine.with_metrics(metrics.clone());

    if args.interactive {
        let input = tokio::spawn(read_controls(handle, state_rx, args.fast));
        engine.run().await?;
        input.abort();
    } else {
        drop(handle);
        engine.play();
        if args.fast {
            engine.set_speed(PlaybackSpeed::FastForward);
        }
        engine.run_until_settled().await?;
    }

    let standings = render::standings(&engine);
    let fingerprint = engine.fingerprint();
    drop(engine);
    printer.await?;

    println!();
    for line in standings {
        println!("{line}");
    }
    println!("fingerprint: {fingerprint}");

    if args.metrics {
        println!("{}", metrics.gather_metrics()?);
    }
    if let Some(expected) = args.expect_fingerprint {
        if expected != fingerprint {
            bail!("replay fingerprint mismatch: expected {expected}, got {fingerprint}");
        }
        info!("Replay fingerprint matches");
    }
    Ok(())
}

/// One line of interactive input.
#[derive(Debug, PartialEq)]
enum Input {
    Send(Vec<Control>),
    Quit,
    Ignore,
}

/// Maps an input line to controls. `fast` is the speed the user asked for;
/// it only changes while the replay is running.
fn interpret(line: &str, state: PlaybackState, fast: &mut bool) -> Input {
    let mut words = line.split_whitespace();
    match (words.next(), words.next()) {
        (Some("p"), _) if state == PlaybackState::Running => Input::Send(vec![Control::Pause]),
        (Some("p"), _) => {
            let mut controls = vec![Control::Play];
            if *fast {
                controls.push(Control::SetSpeed(PlaybackSpeed::FastForward));
            }
            Input::Send(controls)
        }
        (Some("r"), _) => Input::Send(vec![Control::Reset]),
        (Some("f"), _) if state != PlaybackState::Running => {
            debug!("Speed can only change while the replay is running");
            Input::Ignore
        }
        (Some("f"), _) => {
            *fast = !*fast;
            let speed = if *fast {
                PlaybackSpeed::FastForward
            } else {
                PlaybackSpeed::Normal
            };
            Input::Send(vec![Control::SetSpeed(speed)])
        }
        (Some("t"), id) => Input::Send(vec![Control::SelectTracked(id.map(BuggyId::new))]),
        (Some("q"), _) => Input::Quit,
        (Some(other), _) => {
            debug!("Unknown control {other:?}");
            Input::Ignore
        }
        (None, _) => Input::Ignore,
    }
}

/// Translates stdin lines into controls until `q` or end of input.
async fn read_controls(
    handle: ReplayHandle,
    state: watch::Receiver<PlaybackState>,
    mut fast: bool,
) -> anyhow::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let current = *state.borrow();
        match interpret(&line, current, &mut fast) {
            Input::Send(controls) => {
                for control in controls {
                    handle.send(control)?;
                }
            }
            Input::Quit => {
                handle.pause()?;
                break;
            }
            Input::Ignore => {}
        }
    }
    Ok(())
}

pub async fn run_check(args: CheckArgs) -> anyhow::Result<()> {
    let race_path = args.race.clone();
    let loaded = source_for(args.race, args.track)
        .load()
        .await
        .with_context(|| format!("cannot load race {}", race_path.display()))?;

    let race = &loaded.race;
    println!("{}", race.title);
    if !race.description.is_empty() {
        println!("{}", race.description);
    }
    println!("starting buggies: {}", race.starters().count());
    println!("steps: {}", race.total_steps());
    println!("track length: {:.1}", loaded.track.length());
    Ok(())
}
