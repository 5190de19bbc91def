pub mod backend;
pub mod params;
pub mod store;

pub use crate::backend::InMemoryStore;
#[cfg(feature = "redis")]
pub use crate::backend::RedisStore;
pub use crate::params::{StoreParams, StoreParamsBuilder, StoreParamsBuilderError};
pub use crate::store::{AbstractStore, AtomicQueue, AtomicSet, SharedStore};

use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Store unavailable: {0}")]
    Unavailable(String),
    #[error("Store call timed out after {0:?}")]
    Timeout(Duration),
    #[error("Store error: {0}")]
    Backend(String),
}

impl StoreError {
    /// Errors worth retrying with backoff: the store may come back.
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Unavailable(_) | StoreError::Timeout(_))
    }
}

#[cfg(feature = "redis")]
impl From<rustis::Error> for StoreError {
    fn from(err: rustis::Error) -> Self {
        match err {
            rustis::Error::Redis(e) => StoreError::Backend(e.to_string()),
            other => StoreError::Unavailable(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_errors() {
        assert!(StoreError::Unavailable("refused".into()).is_transient());
        assert!(StoreError::Timeout(Duration::from_secs(30)).is_transient());
        assert!(!StoreError::Backend("WRONGTYPE".into()).is_transient());
    }
}
