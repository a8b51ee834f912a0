//! ## buggyrace-telemetry::logging
//! **Structured logging with `tracing`**
//!
//! Narration is the user-facing output of a replay; this module covers the
//! operator-facing side: subscriber setup and lifecycle events.

use tracing::info_span;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Clone)]
pub struct EventLogger;

impl EventLogger {
    /// Installs the global subscriber. `RUST_LOG` wins over `default_level`.
    pub fn init(default_level: &str) {
        fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
            )
            .with_writer(std::io::stderr)
            .with_span_events(FmtSpan::CLOSE)
            .init()
    }

    /// Records a replay lifecycle event (race loaded, race ended, ...).
    pub fn log_event(event_type: &str, detail: &str) {
        let span = info_span!("replay_event", event_type = event_type);
        let _entered = span.enter();
        tracing::info!(detail = detail, "Replay event occurred");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_test::traced_test;

    #[traced_test]
    #[test]
    fn test_logging() {
        EventLogger::log_event("race_ended", "no more events in log");
        assert!(logs_contain("Replay event occurred"));
        assert!(logs_contain("no more events in log"));
    }
}
