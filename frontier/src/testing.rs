use async_trait::async_trait;
use frontier_config::FrontierSettings;
use frontier_store::{AbstractStore, AtomicQueue, AtomicSet, StoreError};
use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use crate::{DupeFilter, FrontierQueue, RetryPolicy, Scheduler};

/// A store that is down: every call fails with `Unavailable`.
#[derive(Debug, Default)]
pub(crate) struct UnreachableStore {
    pub calls: AtomicUsize,
}

impl UnreachableStore {
    fn refuse<T>(&self) -> Result<T, StoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(StoreError::Unavailable("connection refused".to_string()))
    }
}

#[async_trait]
impl AtomicSet for UnreachableStore {
    async fn add(&self, _key: &str, _member: &str) -> Result<bool, StoreError> {
        self.refuse()
    }

    async fn add_many(
        &self,
        _key: &str,
        _members: &[String],
    ) -> Result<Vec<bool>, StoreError> {
        self.refuse()
    }

    async fn contains(&self, _key: &str, _member: &str) -> Result<bool, StoreError> {
        self.refuse()
    }

    async fn cardinality(&self, _key: &str) -> Result<u64, StoreError> {
        self.refuse()
    }

    async fn pop_member(&self, _key: &str) -> Result<Option<String>, StoreError> {
        self.refuse()
    }

    async fn delete(&self, _key: &str) -> Result<(), StoreError> {
        self.refuse()
    }
}

#[async_trait]
impl AtomicQueue for UnreachableStore {
    async fn push(&self, _key: &str, _value: &str) -> Result<(), StoreError> {
        self.refuse()
    }

    async fn push_many(&self, _key: &str, _values: &[String]) -> Result<(), StoreError> {
        self.refuse()
    }

    async fn pop(&self, _key: &str) -> Result<Option<String>, StoreError> {
        self.refuse()
    }

    async fn len(&self, _key: &str) -> Result<u64, StoreError> {
        self.refuse()
    }

    async fn clear(&self, _key: &str) -> Result<(), StoreError> {
        self.refuse()
    }
}

/// Scheduler over an unreachable store that gives up on the first failure.
pub(crate) fn unreachable_scheduler() -> (Arc<UnreachableStore>, Scheduler) {
    let down = Arc::new(UnreachableStore::default());
    let store: AbstractStore = down.clone();
    let settings = FrontierSettings::for_namespace("club_pages");
    let scheduler = Scheduler::new(
        settings.namespace.clone(),
        settings.keys.clone(),
        DupeFilter::for_namespace(store.clone(), &settings),
        FrontierQueue::for_namespace(store, &settings),
        RetryPolicy::no_retry(),
    );
    (down, scheduler)
}
