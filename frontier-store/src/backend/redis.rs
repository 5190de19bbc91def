//! Redis implementation of the store capabilities.
//!
//! Sets map to `SADD`/`SISMEMBER`/`SCARD`/`SPOP`, queues to `RPUSH` on the
//! tail and `LPOP` on the head. Each of these is atomic on the server, which
//! is the only serialization point between workers.
use async_trait::async_trait;
use rustis::client::{BatchPreparedCommand, Client, IntoConfig};
use rustis::commands::{GenericCommands, ListCommands, SetCommands};
use std::future::{Future, IntoFuture};
use tracing::{debug, error};

use crate::{AtomicQueue, AtomicSet, StoreError, StoreParams};

pub struct RedisStore {
    pub client: Client,
    pub params: StoreParams,
}

impl RedisStore {
    /// Connect using `params`, applying its timeouts to the client.
    pub async fn connect(params: StoreParams) -> Result<Self, StoreError> {
        let mut config = params.uri.as_str().into_config()?;
        config.connect_timeout = params.connect_timeout;
        config.command_timeout = params.socket_timeout;
        config.retry_on_error = params.retry_on_timeout;

        let client = match tokio::time::timeout(
            params.connect_timeout,
            Client::connect(config),
        )
        .await
        {
            Ok(client) => client?,
            Err(_) => {
                error!("Connection to {} timed out", params.uri);
                return Err(StoreError::Timeout(params.connect_timeout));
            }
        };
        debug!("Connected to {}", params.uri);

        Ok(Self { client, params })
    }

    /// Wrap an existing client, e.g. one shared with other components.
    pub fn with_client(client: Client, params: StoreParams) -> Self {
        Self { client, params }
    }

    // Bound every round-trip so a hung store surfaces as an error.
    async fn bounded<T>(
        &self,
        command: impl Future<Output = Result<T, rustis::Error>> + Send,
    ) -> Result<T, StoreError> {
        match tokio::time::timeout(self.params.socket_timeout, command).await {
            Ok(result) => result.map_err(StoreError::from),
            Err(_) => Err(StoreError::Timeout(self.params.socket_timeout)),
        }
    }
}

#[async_trait]
impl AtomicSet for RedisStore {
    async fn add(&self, key: &str, member: &str) -> Result<bool, StoreError> {
        let added: usize = self
            .bounded(self.client.sadd(key, member).into_future())
            .await?;
        Ok(added == 1)
    }

    async fn add_many(
        &self,
        key: &str,
        members: &[String],
    ) -> Result<Vec<bool>, StoreError> {
        if members.is_empty() {
            return Ok(Vec::new());
        }
        // One SADD per member keeps the per-member outcome; the pipeline keeps
        // it to a single round-trip.
        let mut pipeline = self.client.create_pipeline();
        for member in members {
            pipeline.sadd(key, member.as_str()).queue();
        }
        let added: Vec<usize> = self.bounded(pipeline.execute()).await?;
        Ok(added.into_iter().map(|n| n == 1).collect())
    }

    async fn contains(&self, key: &str, member: &str) -> Result<bool, StoreError> {
        self.bounded(self.client.sismember(key, member).into_future()).await
    }

    async fn cardinality(&self, key: &str) -> Result<u64, StoreError> {
        let count: usize = self.bounded(self.client.scard(key).into_future()).await?;
        Ok(count as u64)
    }

    async fn pop_member(&self, key: &str) -> Result<Option<String>, StoreError> {
        let members: Vec<String> = self
            .bounded(self.client.spop(key, 1).into_future())
            .await?;
        Ok(members.into_iter().next())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        let _: usize = self.bounded(self.client.del(key).into_future()).await?;
        Ok(())
    }
}

#[async_trait]
impl AtomicQueue for RedisStore {
    async fn push(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let _: usize = self
            .bounded(self.client.rpush(key, value).into_future())
            .await?;
        Ok(())
    }

    async fn push_many(&self, key: &str, values: &[String]) -> Result<(), StoreError> {
        if values.is_empty() {
            return Ok(());
        }
        let values: Vec<&str> = values.iter().map(String::as_str).collect();
        let _: usize = self
            .bounded(self.client.rpush(key, values).into_future())
            .await?;
        Ok(())
    }

    async fn pop(&self, key: &str) -> Result<Option<String>, StoreError> {
        let values: Vec<String> = self
            .bounded(self.client.lpop(key, 1).into_future())
            .await?;
        Ok(values.into_iter().next())
    }

    async fn len(&self, key: &str) -> Result<u64, StoreError> {
        let count: usize = self.bounded(self.client.llen(key).into_future()).await?;
        Ok(count as u64)
    }

    async fn clear(&self, key: &str) -> Result<(), StoreError> {
        let _: usize = self.bounded(self.client.del(key).into_future()).await?;
        Ok(())
    }
}

impl std::fmt::Debug for RedisStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisStore")
            .field("uri", &self.params.uri)
            .field("socket_timeout", &self.params.socket_timeout)
            .finish()
    }
}
