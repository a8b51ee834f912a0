//! # Buggy Race Telemetry
//!
//! Crate for logging and metrics of the replay engine.

pub mod logging;
pub mod metrics;

pub use logging::EventLogger;
pub use metrics::MetricsRecorder;
