//! Ephemeral stores (Redis).
//!
//! Everything kept here expires on its own; losing Redis resets the rate
//! limits and nothing else.
//!
//! ## Redis Key Patterns
//!
//! ```text
//! ratelimit:login:{ip}    → Failed login attempts (15 min window)
//! ratelimit:otp:{ip}      → Failed OTP requests/verifications (15 min window)
//! ```

mod rate_limit;
mod status;

pub use rate_limit::{RateLimitResult, RateLimiter, RedisRateLimiter};
pub use status::{RedisStatusStore, StatusStore};

#[cfg(test)]
pub use rate_limit::MockRateLimiter;
#[cfg(test)]
pub use status::MockStatusStore;

use std::sync::Arc;

/// Collection of all ephemeral stores.
#[derive(Clone)]
pub struct Stores {
    pub rate_limiter: Arc<dyn RateLimiter>,
    pub status: Arc<dyn StatusStore>,
}
