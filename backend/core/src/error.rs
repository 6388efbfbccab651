use thiserror::Error;

/// Top-level error type for the heartlog runtime.
#[derive(Debug, Error)]
pub enum HeartlogError {
    #[error("persistence error: {0}")]
    Persistence(String),

    #[error("invalid event type: {0}")]
    InvalidEventType(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl HeartlogError {
    /// Wrap any storage-layer failure as a persistence error.
    pub fn persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }
}
