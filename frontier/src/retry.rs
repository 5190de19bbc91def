//! Backoff for store calls.
//!
//! All frontier state lives in the shared store, so a worker that cannot
//! reach it has nothing to fall back on. Transient failures are retried with
//! exponential backoff; once the elapsed budget is spent the last error is
//! returned and the job is expected to halt.
use backoff::{ExponentialBackoff, ExponentialBackoffBuilder};
use frontier_config::RetrySettings;
use std::{future::Future, time::Duration};
use tracing::warn;

use crate::FrontierError;

#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub initial_interval: Duration,
    pub max_interval: Duration,
    pub max_elapsed: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_settings(&RetrySettings::default())
    }
}

impl RetryPolicy {
    pub fn from_settings(settings: &RetrySettings) -> Self {
        Self {
            initial_interval: settings.initial_interval(),
            max_interval: settings.max_interval(),
            max_elapsed: settings.max_elapsed(),
        }
    }

    /// Give up on the first failure.
    pub fn no_retry() -> Self {
        Self {
            initial_interval: Duration::from_millis(1),
            max_interval: Duration::from_millis(1),
            max_elapsed: Duration::ZERO,
        }
    }

    fn backoff(&self) -> ExponentialBackoff {
        ExponentialBackoffBuilder::new()
            .with_initial_interval(self.initial_interval)
            .with_max_interval(self.max_interval)
            .with_max_elapsed_time(Some(self.max_elapsed))
            .build()
    }

    /// Run `op` until it succeeds, fails permanently, or the budget runs out.
    /// Only `FrontierError::StoreUnavailable` is retried.
    pub async fn run<T, F, Fut>(&self, what: &str, mut op: F) -> Result<T, FrontierError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, FrontierError>>,
    {
        let operation = || {
            let fut = op();
            async move {
                fut.await.map_err(|e| {
                    if e.is_transient() {
                        backoff::Error::transient(e)
                    } else {
                        backoff::Error::permanent(e)
                    }
                })
            }
        };
        let notify = |err: FrontierError, wait: Duration| {
            warn!("{what} failed, retrying in {wait:?}: {err}");
        };

        backoff::future::retry_notify(self.backoff(), operation, notify).await
    }
}
