use thiserror::Error;
use tokio::task::JoinError;

use buggyrace_core::LoadError;

#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("cannot load race - {0}")]
    Load(#[from] LoadError),

    #[error("motion task failed: {0}")]
    Motion(#[from] JoinError),

    #[error("replay engine is no longer running")]
    Detached,
}
