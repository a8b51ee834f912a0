//! Terminal rendering of the replay output stream.

use tokio::sync::watch;
use tracing::trace;

use buggyrace_engine::engine::output::{Narration, NarrationLevel, NarrationSegment, OutputStream};
use buggyrace_engine::{PlaybackState, ReplayEngine, ReplayOutput};

/// Prints narration until the engine drops its end of the stream, and
/// publishes every playback state change to `state`.
pub async fn print_outputs(mut stream: OutputStream, state: watch::Sender<PlaybackState>) {
    while let Some(output) = stream.recv().await {
        match output {
            ReplayOutput::Narration(narration) => println!("{}", render_narration(&narration)),
            ReplayOutput::State(next) => {
                state.send_replace(next);
            }
            ReplayOutput::LogCleared => println!("----"),
            ReplayOutput::Leader { buggy } => trace!(%buggy, "Leader changed"),
            // Positions and effects are for graphical renderers.
            _ => {}
        }
    }
}

pub fn render_narration(narration: &Narration) -> String {
    let text: String = narration
        .segments()
        .into_iter()
        .map(|segment| match segment {
            NarrationSegment::Text(text) => text.to_string(),
            NarrationSegment::Buggy(id) => id.to_string(),
        })
        .collect();

    match narration.level {
        NarrationLevel::Title => match &narration.detail {
            Some(detail) => format!("== {text} ({detail}) =="),
            None => format!("== {text} =="),
        },
        NarrationLevel::Alert => format!("!! {text}"),
        NarrationLevel::UserAction => format!("> {text}"),
        NarrationLevel::System => format!("... {text}"),
        NarrationLevel::Event | NarrationLevel::Terminal => {
            let mut line = String::new();
            if let Some(clock) = &narration.clock {
                line.push_str(&format!("[{}] ", clock.label()));
            }
            if let Some(buggy) = &narration.buggy {
                line.push_str(&format!("{buggy} "));
            }
            line.push_str(&text);
            line
        }
    }
}

/// Final standings, furthest first. Equal distances are listed by id.
pub fn standings(engine: &ReplayEngine) -> Vec<String> {
    let length = engine.track().length();
    let mut buggies: Vec<_> = engine.buggies().collect();
    buggies.sort_by(|a, b| {
        b.distance
            .total_cmp(&a.distance)
            .then_with(|| a.id.cmp(&b.id))
    });
    buggies
        .iter()
        .enumerate()
        .map(|(place, state)| {
            format!(
                "{:>2}. {:<16} {:>8.0}  lap {}",
                place + 1,
                state.id.as_str(),
                state.distance,
                state.lap(length)
            )
        })
        .collect()
}
