//! Tiered cache validity.
//!
//! Terminal sessions stop changing, so their cached copy can be trusted for
//! longer and eventually forever. Active sessions are re-checked almost
//! immediately.

use chrono::{DateTime, Utc};
use jules_types::CachedSession;
use std::fmt;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheTier {
    /// Non-terminal session; trusted for `hot_ttl`.
    Hot,
    /// Recently finished session; trusted for `warm_ttl`.
    Warm,
    /// Finished long ago; always trusted.
    Frozen,
}

impl fmt::Display for CacheTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CacheTier::Hot => "hot",
            CacheTier::Warm => "warm",
            CacheTier::Frozen => "frozen",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheValidityPolicy {
    pub hot_ttl: Duration,
    pub warm_ttl: Duration,
    pub frozen_after: Duration,
}

impl Default for CacheValidityPolicy {
    fn default() -> Self {
        Self {
            hot_ttl: Duration::from_secs(30),
            warm_ttl: Duration::from_secs(5 * 60),
            frozen_after: Duration::from_secs(24 * 60 * 60),
        }
    }
}

impl CacheValidityPolicy {
    pub fn new(hot_ttl: Duration, warm_ttl: Duration, frozen_after: Duration) -> Self {
        Self {
            hot_ttl,
            warm_ttl,
            frozen_after,
        }
    }

    /// A terminal session is frozen once either its last refresh or its last
    /// remote update is older than `frozen_after`.
    pub fn classify(&self, cached: &CachedSession, now: DateTime<Utc>) -> CacheTier {
        if !cached.summary.state.is_terminal() {
            return CacheTier::Hot;
        }

        let synced_age = age(cached.last_synced_at, now);
        let updated_age = age(cached.summary.update_time, now);
        if synced_age > self.frozen_after || updated_age > self.frozen_after {
            CacheTier::Frozen
        } else {
            CacheTier::Warm
        }
    }

    /// Whether the cached copy may be served without a network round-trip.
    pub fn is_valid(&self, cached: Option<&CachedSession>, now: DateTime<Utc>) -> bool {
        let Some(cached) = cached else {
            return false;
        };

        let synced_age = age(cached.last_synced_at, now);
        match self.classify(cached, now) {
            CacheTier::Frozen => true,
            CacheTier::Warm => synced_age < self.warm_ttl,
            CacheTier::Hot => synced_age < self.hot_ttl,
        }
    }
}

/// Elapsed time since `then`. A timestamp in the future (clock skew) counts as zero.
fn age(then: DateTime<Utc>, now: DateTime<Utc>) -> Duration {
    (now - then).to_std().unwrap_or(Duration::ZERO)
}
