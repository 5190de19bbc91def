//! Frontier queue: the shared FIFO backlog of pending requests.
//!
//! Requests travel as JSON strings. `pop` removes the head in one atomic
//! store call, so every entry is handed to exactly one caller. Order is FIFO
//! for pushes that do not overlap; concurrent pushes land in store-arrival
//! order.
use frontier_config::FrontierSettings;
use frontier_store::AbstractStore;
use tracing::error;

use crate::{FrontierError, Request};

#[derive(Clone)]
pub struct FrontierQueue {
    store: AbstractStore,
    key: String,
}

impl FrontierQueue {
    pub fn new(store: AbstractStore, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
        }
    }

    pub fn for_namespace(store: AbstractStore, settings: &FrontierSettings) -> Self {
        Self::new(store, settings.queue_key())
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub async fn push(&self, request: &Request) -> Result<(), FrontierError> {
        let entry = encode(request)?;
        Ok(self.store.push(&self.key, &entry).await?)
    }

    pub async fn push_many(&self, requests: &[Request]) -> Result<(), FrontierError> {
        let entries = requests.iter().map(encode).collect::<Result<Vec<_>, _>>()?;
        Ok(self.store.push_many(&self.key, &entries).await?)
    }

    /// Remove and return the head request, `None` once the backlog is empty.
    ///
    /// An entry that no longer decodes is logged and dropped; popping moves on
    /// to the next one instead of wedging every worker on the same entry.
    pub async fn pop(&self) -> Result<Option<Request>, FrontierError> {
        loop {
            let Some(entry) = self.store.pop(&self.key).await? else {
                return Ok(None);
            };
            match serde_json::from_str::<Request>(&entry) {
                Ok(request) => return Ok(Some(request)),
                Err(e) => {
                    error!(key = %self.key, "Dropping undecodable queue entry {entry:?}: {e}");
                }
            }
        }
    }

    pub async fn len(&self) -> Result<u64, FrontierError> {
        Ok(self.store.len(&self.key).await?)
    }

    pub async fn is_empty(&self) -> Result<bool, FrontierError> {
        Ok(self.len().await? == 0)
    }

    /// Delete the whole backlog. Operator action between jobs only.
    pub async fn clear(&self) -> Result<(), FrontierError> {
        Ok(self.store.clear(&self.key).await?)
    }
}

fn encode(request: &Request) -> Result<String, FrontierError> {
    serde_json::to_string(request).map_err(|e| FrontierError::Serialization(e.to_string()))
}

impl std::fmt::Debug for FrontierQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrontierQueue").field("key", &self.key).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use frontier_store::{AtomicQueue, InMemoryStore};
    use std::sync::Arc;

    fn setup() -> (Arc<InMemoryStore>, FrontierQueue) {
        let store = Arc::new(InMemoryStore::new());
        let queue = FrontierQueue::new(store.clone(), "club_queue");
        (store, queue)
    }

    #[tokio::test]
    async fn test_push_and_pop() {
        let (_, queue) = setup();
        let request = Request::get("https://sofifa.com/team/1").with_depth(1);

        queue.push(&request).await.unwrap();
        assert_eq!(queue.len().await.unwrap(), 1);

        let popped = queue.pop().await.unwrap().unwrap();
        assert_eq!(popped, request);
        assert!(queue.is_empty().await.unwrap());
    }

    #[tokio::test]
    async fn test_pop_empty_is_none() {
        let (_, queue) = setup();
        assert!(queue.pop().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_fifo_order() {
        let (_, queue) = setup();
        let r1 = Request::get("https://sofifa.com/team/1");
        let r2 = Request::get("https://sofifa.com/team/2");
        let r3 = Request::get("https://sofifa.com/team/3");

        queue.push(&r1).await.unwrap();
        queue.push_many(&[r2.clone(), r3.clone()]).await.unwrap();

        assert_eq!(queue.pop().await.unwrap(), Some(r1));
        assert_eq!(queue.pop().await.unwrap(), Some(r2));
        assert_eq!(queue.pop().await.unwrap(), Some(r3));
        assert_eq!(queue.pop().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_undecodable_entry_skipped() {
        let (store, queue) = setup();
        let good = Request::get("https://sofifa.com/team/1");

        store.push("club_queue", "{not json").await.unwrap();
        queue.push(&good).await.unwrap();

        assert_eq!(queue.pop().await.unwrap(), Some(good));
        assert_eq!(queue.len().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_clear() {
        let (_, queue) = setup();
        queue.push(&Request::get("https://sofifa.com/")).await.unwrap();
        queue.clear().await.unwrap();
        assert_eq!(queue.len().await.unwrap(), 0);
    }
}
