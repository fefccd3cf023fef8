use thiserror::Error;

#[derive(Error, Debug)]
pub enum LivesError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid refill period: {seconds}s (must be a finite value > 0)")]
    InvalidRefillPeriod { seconds: f64 },

    #[error("Invalid max count: {max_count} (must be > 0)")]
    InvalidMaxCount { max_count: u32 },

    #[error("Malformed save record field '{key}': {reason}")]
    MalformedRecord { key: String, reason: String },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl LivesError {
    /// Configuration errors are fatal: the caller must fix its input,
    /// retrying the same call can never succeed.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::InvalidRefillPeriod { .. } | Self::InvalidMaxCount { .. }
        )
    }
}

pub type LivesResult<T> = Result<T, LivesError>;
