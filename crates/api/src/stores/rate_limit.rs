//! Rate limiting for Redis.

use anyhow::Result;
use async_trait::async_trait;

/// Rate limiter trait for checking and releasing counters.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RateLimiter: Send + Sync {
    /// Check rate limit with simple TTL-based expiry. The window starts at
    /// the first hit for `key`.
    async fn check_simple(&self, key: &str, limit: i64, ttl_secs: u64) -> Result<RateLimitResult>;

    /// Give back one hit, so that requests which succeeded do not count
    /// against the caller.
    async fn release(&self, key: &str) -> Result<()>;
}

/// Result of a rate limit check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RateLimitResult {
    /// Under the limit, includes current count.
    Allowed(i64),
    /// Over the limit, includes current count.
    Exceeded(i64),
}

impl RateLimitResult {
    pub fn is_allowed(&self) -> bool {
        matches!(self, RateLimitResult::Allowed(_))
    }
}

/// Redis implementation of RateLimiter.
#[derive(Clone)]
pub struct RedisRateLimiter {
    client: redis::Client,
}

impl RedisRateLimiter {
    pub fn new(client: redis::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl RateLimiter for RedisRateLimiter {
    async fn check_simple(&self, key: &str, limit: i64, ttl_secs: u64) -> Result<RateLimitResult> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        let count: i64 = redis::cmd("INCR").arg(key).query_async(&mut conn).await?;

        if count == 1 {
            let _: () = redis::cmd("EXPIRE")
                .arg(key)
                .arg(ttl_secs)
                .query_async(&mut conn)
                .await?;
        }

        if count > limit {
            Ok(RateLimitResult::Exceeded(count))
        } else {
            Ok(RateLimitResult::Allowed(count))
        }
    }

    async fn release(&self, key: &str) -> Result<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        // Only decrement a live counter; DECR on a missing key would create
        // one without a TTL.
        let exists: bool = redis::cmd("EXISTS").arg(key).query_async(&mut conn).await?;
        if exists {
            let count: i64 = redis::cmd("DECR").arg(key).query_async(&mut conn).await?;
            if count <= 0 {
                let _: () = redis::cmd("DEL").arg(key).query_async(&mut conn).await?;
            }
        }

        Ok(())
    }
}
