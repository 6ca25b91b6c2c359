//! Fixed-window rate limiting keyed by an arbitrary bucket name
//! (e.g. `"login:alice@example.com"` or `"rpc:42"`).

use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use sharepool_db::queries::rate_limits;
use sharepool_types::Timestamp;

use crate::{MarketError, Result};

/// Window length and allowance. Defaults to 100 hits per 15 minutes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimit {
    pub window_secs: u64,
    pub max_hits: u32,
}

impl Default for RateLimit {
    fn default() -> Self {
        Self {
            window_secs: 15 * 60,
            max_hits: 100,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Decision {
    pub allowed: bool,
    pub hits: u32,
    pub remaining: u32,
    /// When the current window closes.
    pub reset_at: Timestamp,
}

impl RateLimit {
    fn window_start(&self, now: Timestamp) -> Timestamp {
        let window = self.window_secs.max(1);
        now - now % window
    }

    /// Count a hit on `bucket` and report whether it is within the allowance.
    pub fn check(&self, conn: &Connection, bucket: &str, now: Timestamp) -> Result<Decision> {
        let start = self.window_start(now);
        let hits = rate_limits::hit(conn, bucket, start)?;
        Ok(Decision {
            allowed: hits <= self.max_hits,
            hits,
            remaining: self.max_hits.saturating_sub(hits),
            reset_at: start + self.window_secs.max(1),
        })
    }

    /// Like [`RateLimit::check`] but fails once the allowance is spent.
    ///
    /// # Errors
    ///
    /// - [`MarketError::RateLimited`] carrying the seconds until the window resets
    pub fn enforce(&self, conn: &Connection, bucket: &str, now: Timestamp) -> Result<Decision> {
        let decision = self.check(conn, bucket, now)?;
        if !decision.allowed {
            tracing::warn!(bucket, hits = decision.hits, "rate limit exceeded");
            return Err(MarketError::RateLimited {
                retry_after: decision.reset_at.saturating_sub(now),
            });
        }
        Ok(decision)
    }

    /// Drop counters from windows that have already closed.
    pub fn purge(&self, conn: &Connection, now: Timestamp) -> Result<usize> {
        Ok(rate_limits::purge_before(conn, self.window_start(now))?)
    }
}
