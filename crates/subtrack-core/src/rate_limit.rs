//! Fixed-window rate limiting over an external counter store
//!
//! The limiter keeps no state of its own. Counters live in whatever
//! implements [`RateLimitStore`] (the SQLite database in production), so
//! limits survive restarts and are shared between processes.

use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::error::{Error, Result};

pub trait RateLimitStore: Send + Sync {
    /// Increment the counter for `key` in the window starting at
    /// `window_start` (unix seconds) and return the new count
    fn increment(&self, key: &str, window_start: i64) -> Result<u32>;
}

#[derive(Debug, Clone, Copy)]
pub struct RateLimiter {
    pub limit: u32,
    pub window: Duration,
}

impl RateLimiter {
    pub fn new(limit: u32, window: Duration) -> Self {
        Self { limit, window }
    }

    /// Start of the window containing `now`, in unix seconds
    pub fn window_start(&self, now: DateTime<Utc>) -> i64 {
        let window = self.window.as_secs().max(1) as i64;
        now.timestamp().div_euclid(window) * window
    }

    /// Count one attempt for `key`; `Error::RateLimited` once over the limit
    pub fn check(&self, store: &dyn RateLimitStore, key: &str, now: DateTime<Utc>) -> Result<()> {
        let count = store.increment(key, self.window_start(now))?;
        if count > self.limit {
            return Err(Error::RateLimited(format!(
                "{} requests allowed per {} seconds",
                self.limit,
                self.window.as_secs()
            )));
        }
        Ok(())
    }
}
