//! Custom validation functions for configuration.

use validator::ValidationError;

use crate::RandomizerConfig;

/// Validate that a log level is one `tracing` understands.
pub fn validate_log_level(level: &str) -> Result<(), ValidationError> {
    let valid = ["trace", "debug", "info", "warn", "error"].contains(&level.to_lowercase().as_str());
    if valid {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_log_level"))
    }
}

/// Validate that the random delta range is not inverted.
pub fn validate_delta_range(config: &RandomizerConfig) -> Result<(), ValidationError> {
    if config.min_delta <= config.max_delta {
        Ok(())
    } else {
        Err(ValidationError::new("min_delta_exceeds_max_delta"))
    }
}
