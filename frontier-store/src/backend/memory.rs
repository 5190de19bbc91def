//! In-memory implementation of the store capabilities. Every operation takes
//! its lock exactly once, which makes it atomic with respect to any other
//! caller sharing the same instance. Visibility ends at the process boundary,
//! so this backend serves tests and single-host crawls.
use crate::{AtomicQueue, AtomicSet, StoreError};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Mutex, MutexGuard};

#[derive(Default)]
pub struct InMemoryStore {
    pub sets: Mutex<HashMap<String, HashSet<String>>>,
    pub lists: Mutex<HashMap<String, VecDeque<String>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn sets(
        &self,
    ) -> Result<MutexGuard<'_, HashMap<String, HashSet<String>>>, StoreError> {
        self.sets
            .lock()
            .map_err(|e| StoreError::Backend(e.to_string()))
    }

    fn lists(
        &self,
    ) -> Result<MutexGuard<'_, HashMap<String, VecDeque<String>>>, StoreError> {
        self.lists
            .lock()
            .map_err(|e| StoreError::Backend(e.to_string()))
    }
}

#[async_trait]
impl AtomicSet for InMemoryStore {
    async fn add(&self, key: &str, member: &str) -> Result<bool, StoreError> {
        let mut sets = self.sets()?;
        Ok(sets
            .entry(key.to_string())
            .or_default()
            .insert(member.to_string()))
    }

    async fn add_many(
        &self,
        key: &str,
        members: &[String],
    ) -> Result<Vec<bool>, StoreError> {
        let mut sets = self.sets()?;
        let set = sets.entry(key.to_string()).or_default();
        Ok(members.iter().map(|m| set.insert(m.clone())).collect())
    }

    async fn contains(&self, key: &str, member: &str) -> Result<bool, StoreError> {
        let sets = self.sets()?;
        Ok(sets.get(key).is_some_and(|set| set.contains(member)))
    }

    async fn cardinality(&self, key: &str) -> Result<u64, StoreError> {
        let sets = self.sets()?;
        Ok(sets.get(key).map_or(0, |set| set.len() as u64))
    }

    async fn pop_member(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut sets = self.sets()?;
        let Some(set) = sets.get_mut(key) else {
            return Ok(None);
        };
        let member = set.iter().next().cloned();
        if let Some(member) = &member {
            set.remove(member);
        }
        if set.is_empty() {
            sets.remove(key);
        }
        Ok(member)
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.sets()?.remove(key);
        self.lists()?.remove(key);
        Ok(())
    }
}

#[async_trait]
impl AtomicQueue for InMemoryStore {
    async fn push(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut lists = self.lists()?;
        lists
            .entry(key.to_string())
            .or_default()
            .push_back(value.to_string());
        Ok(())
    }

    async fn push_many(&self, key: &str, values: &[String]) -> Result<(), StoreError> {
        if values.is_empty() {
            return Ok(());
        }
        let mut lists = self.lists()?;
        lists
            .entry(key.to_string())
            .or_default()
            .extend(values.iter().cloned());
        Ok(())
    }

    async fn pop(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut lists = self.lists()?;
        let Some(list) = lists.get_mut(key) else {
            return Ok(None);
        };
        let value = list.pop_front();
        if list.is_empty() {
            lists.remove(key);
        }
        Ok(value)
    }

    async fn len(&self, key: &str) -> Result<u64, StoreError> {
        let lists = self.lists()?;
        Ok(lists.get(key).map_or(0, |list| list.len() as u64))
    }

    async fn clear(&self, key: &str) -> Result<(), StoreError> {
        self.lists()?.remove(key);
        Ok(())
    }
}

impl std::fmt::Debug for InMemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sets = self.sets.lock().map(|s| s.len()).unwrap_or_default();
        let lists = self.lists.lock().map(|l| l.len()).unwrap_or_default();

        f.debug_struct("InMemoryStore")
            .field("sets", &sets)
            .field("lists", &lists)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_add_reports_first_insert_only() {
        let store = InMemoryStore::new();

        assert!(store.add("job:dupefilter", "abc").await.unwrap());
        assert!(!store.add("job:dupefilter", "abc").await.unwrap());
        assert!(store.contains("job:dupefilter", "abc").await.unwrap());
        assert_eq!(store.cardinality("job:dupefilter").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_add_many_within_batch() {
        let store = InMemoryStore::new();
        store.add("s", "b").await.unwrap();

        let members = vec!["a".to_string(), "b".to_string(), "a".to_string()];
        let outcome = store.add_many("s", &members).await.unwrap();

        assert_eq!(outcome, vec![true, false, false]);
        assert_eq!(store.cardinality("s").await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_sets_are_namespaced_by_key() {
        let store = InMemoryStore::new();

        assert!(store.add("one:dupefilter", "x").await.unwrap());
        assert!(store.add("two:dupefilter", "x").await.unwrap());
        assert!(!store.contains("three:dupefilter", "x").await.unwrap());
    }

    #[tokio::test]
    async fn test_pop_member_drains_set() {
        let store = InMemoryStore::new();
        let members = vec!["u1".to_string(), "u2".to_string()];
        store.add_many("club_urls", &members).await.unwrap();

        let mut popped = vec![
            store.pop_member("club_urls").await.unwrap().unwrap(),
            store.pop_member("club_urls").await.unwrap().unwrap(),
        ];
        popped.sort();

        assert_eq!(popped, members);
        assert_eq!(store.pop_member("club_urls").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_push_and_pop_fifo() {
        let store = InMemoryStore::new();

        store.push("q", "1").await.unwrap();
        store
            .push_many("q", &["2".to_string(), "3".to_string()])
            .await
            .unwrap();
        assert_eq!(store.len("q").await.unwrap(), 3);

        for expected in ["1", "2", "3"] {
            assert_eq!(store.pop("q").await.unwrap().as_deref(), Some(expected));
        }
        assert_eq!(store.pop("q").await.unwrap(), None);
        assert_eq!(store.len("q").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_delete_and_clear() {
        let store = InMemoryStore::new();
        store.add("k", "m").await.unwrap();
        store.push("q", "v").await.unwrap();

        store.delete("k").await.unwrap();
        store.clear("q").await.unwrap();

        assert_eq!(store.cardinality("k").await.unwrap(), 0);
        assert_eq!(store.len("q").await.unwrap(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_add_admits_exactly_once() {
        let store = Arc::new(InMemoryStore::new());
        let barrier = Arc::new(tokio::sync::Barrier::new(2));

        let handles: Vec<_> = (0..2)
            .map(|_| {
                let store = store.clone();
                let barrier = barrier.clone();
                tokio::spawn(async move {
                    barrier.wait().await;
                    store.add("race:dupefilter", "same").await.unwrap()
                })
            })
            .collect();

        let mut admitted = 0;
        for handle in handles {
            if handle.await.unwrap() {
                admitted += 1;
            }
        }
        assert_eq!(admitted, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_pop_delivers_each_entry_once() {
        let store = Arc::new(InMemoryStore::new());
        let values: Vec<String> = (0..200).map(|i| i.to_string()).collect();
        store.push_many("q", &values).await.unwrap();

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move {
                    let mut got = Vec::new();
                    while let Some(v) = store.pop("q").await.unwrap() {
                        got.push(v);
                    }
                    got
                })
            })
            .collect();

        let mut all = Vec::new();
        for handle in handles {
            all.extend(handle.await.unwrap());
        }
        all.sort_by_key(|v| v.parse::<u32>().unwrap());
        assert_eq!(all, values);
    }
}
