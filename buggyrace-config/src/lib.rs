//! # Buggy Race Configuration
//!
//! Layered configuration for the replay engine and its tooling.
//!
//! ## Features
//! - **Unified Configuration**: one `BuggyraceConfig` shared by the engine and the CLI
//! - **Validation**: ranges and cross-field checks via `validator`
//! - **Environment Awareness**: per-environment YAML overrides and `BUGGYRACE_*` variables

#![warn(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format, Serialized, Yaml},
    Figment,
};
use serde::{Deserialize, Serialize};
use tracing::debug;
use validator::Validate;

mod error;
mod randomizer;
mod replay;
mod telemetry;
mod validation;

pub use error::ConfigError;
pub use randomizer::RandomizerConfig;
pub use replay::ReplayConfig;
pub use telemetry::TelemetryConfig;

/// Top-level configuration container.
#[derive(Debug, Serialize, Deserialize, Validate, Default, Clone)]
pub struct BuggyraceConfig {
    /// Playback pacing and engine behaviour.
    #[serde(default)]
    #[validate(nested)]
    pub replay: ReplayConfig,

    /// Randomized fallback race generation.
    #[serde(default)]
    #[validate(nested)]
    pub randomizer: RandomizerConfig,

    /// Logging configuration.
    #[serde(default)]
    #[validate(nested)]
    pub telemetry: TelemetryConfig,
}

impl BuggyraceConfig {
    /// Load configuration from default files and environment.
    ///
    /// Hierarchy:
    /// 1. Default Values
    /// 2. `config/buggyrace.yaml` - Base settings. If missing, defaults are used.
    /// 3. `config/<environment>.yaml` - Environment-specific overrides (`BUGGYRACE_ENV`).
    /// 4. `BUGGYRACE_*` environment variables, nested with `__`.
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(BuggyraceConfig::default()));

        if Path::new("config/buggyrace.yaml").exists() {
            figment = figment.merge(Yaml::file("config/buggyrace.yaml"));
        } else {
            debug!("config/buggyrace.yaml not found, using default configuration");
        }

        let env = std::env::var("BUGGYRACE_ENV").unwrap_or_else(|_| "development".into());
        let env_file = format!("config/{}.yaml", env);
        if Path::new(&env_file).exists() {
            figment = figment.merge(Yaml::file(env_file));
        }

        Self::extract_validated(figment.merge(Env::prefixed("BUGGYRACE_").split("__")))
    }

    /// Load configuration from a specific path, still honouring environment overrides.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::FileNotFound(PathBuf::from(path)));
        }

        Self::extract_validated(
            Figment::from(Serialized::defaults(BuggyraceConfig::default()))
                .merge(Yaml::file(path))
                .merge(Env::prefixed("BUGGYRACE_").split("__")),
        )
    }

    fn extract_validated(figment: Figment) -> Result<Self, ConfigError> {
        figment
            .extract()
            .map_err(ConfigError::from)
            .and_then(|config: Self| {
                config.validate()?;
                Ok(config)
            })
    }
}
