//! ## buggyrace-telemetry::metrics
//! **Prometheus counters for replay progress**

use prometheus::{Counter, Histogram, HistogramOpts, Registry};

#[derive(Debug, Clone)]
pub struct MetricsRecorder {
    pub registry: prometheus::Registry,
    pub steps: prometheus::Counter,
    pub motions: prometheus::Counter,
    pub narrations: prometheus::Counter,
    pub lead_changes: prometheus::Counter,
    pub step_wall_ms: prometheus::Histogram,
}

impl Default for MetricsRecorder {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsRecorder {
    pub fn new() -> Self {
        let registry = Registry::new();
        let steps = Counter::new("buggyrace_steps_total", "Race steps replayed")
            .expect("static metric definition");
        let motions = Counter::new("buggyrace_motions_total", "Buggy motions committed")
            .expect("static metric definition");
        let narrations = Counter::new("buggyrace_narrations_total", "Narration entries emitted")
            .expect("static metric definition");
        let lead_changes = Counter::new("buggyrace_lead_changes_total", "Lead changes announced")
            .expect("static metric definition");

        let step_wall_ms = Histogram::with_opts(
            HistogramOpts::new(
                "buggyrace_step_wall_ms",
                "Wall-clock time from scheduling a step to its join",
            )
            .buckets(vec![50.0, 125.0, 250.0, 500.0, 1_000.0, 2_000.0]),
        )
        .expect("static metric definition");

        for collector in [&steps, &motions, &narrations, &lead_changes] {
            registry
                .register(Box::new(collector.clone()))
                .expect("metric names are unique");
        }
        registry
            .register(Box::new(step_wall_ms.clone()))
            .expect("metric names are unique");

        Self {
            registry,
            steps,
            motions,
            narrations,
            lead_changes,
            step_wall_ms,
        }
    }

    pub fn gather_metrics(&self) -> Result<String, prometheus::Error> {
        use prometheus::Encoder;
        let encoder = prometheus::TextEncoder::new();
        let mut buffer = Vec::<u8>::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}
