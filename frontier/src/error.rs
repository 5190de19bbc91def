use frontier_config::ConfigError;
use frontier_store::StoreError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FrontierError {
    /// Malformed candidate. Dropped at the fingerprint stage, never retried.
    #[error("Invalid request {url:?}: {reason}")]
    InvalidRequest { url: String, reason: String },
    /// The shared store is unreachable or timed out; retry with backoff.
    #[error("Store unavailable: {0}")]
    StoreUnavailable(StoreError),
    #[error("Store error: {0}")]
    Store(StoreError),
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl FrontierError {
    pub fn invalid(url: &str, reason: impl ToString) -> Self {
        FrontierError::InvalidRequest {
            url: url.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, FrontierError::StoreUnavailable(_))
    }
}

impl From<StoreError> for FrontierError {
    fn from(err: StoreError) -> Self {
        if err.is_transient() {
            FrontierError::StoreUnavailable(err)
        } else {
            FrontierError::Store(err)
        }
    }
}
