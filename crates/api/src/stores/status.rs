//! Redis reachability check.

use anyhow::Result;
use async_trait::async_trait;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StatusStore: Send + Sync {
    /// Health check - verify Redis answers PING.
    async fn ping(&self) -> Result<bool>;
}

#[derive(Clone)]
pub struct RedisStatusStore {
    client: redis::Client,
}

impl RedisStatusStore {
    pub fn new(client: redis::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl StatusStore for RedisStatusStore {
    async fn ping(&self) -> Result<bool> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let reply: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(reply == "PONG")
    }
}
