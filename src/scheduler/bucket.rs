//! Token bucket metering the remote API's rate budget.
//!
//! Refill happens on a fixed timer driven by the scheduler (see `worker`),
//! not lazily on access. The bucket starts full.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for the token bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenBucketConfig {
    /// Bucket capacity.
    pub max_tokens: u64,
    /// Tokens added per refill interval.
    pub refill_rate: u64,
    pub refill_interval_ms: u64,
}

impl Default for TokenBucketConfig {
    fn default() -> Self {
        Self {
            max_tokens: 1200,
            refill_rate: 20,
            refill_interval_ms: 1000,
        }
    }
}

impl TokenBucketConfig {
    pub fn refill_interval(&self) -> Duration {
        Duration::from_millis(self.refill_interval_ms)
    }
}

/// Weighted token bucket.
///
/// `available` stays within `[0, max_tokens]` for any sequence of
/// `refill` and `try_reserve` calls.
#[derive(Debug)]
pub struct TokenBucket {
    available: u64,
    max_tokens: u64,
    refill_rate: u64,
}

impl TokenBucket {
    pub fn new(config: &TokenBucketConfig) -> Self {
        Self {
            available: config.max_tokens,
            max_tokens: config.max_tokens,
            refill_rate: config.refill_rate,
        }
    }

    /// Add one interval's worth of tokens, clamped to capacity.
    /// Returns the new level.
    pub fn refill(&mut self) -> u64 {
        self.available = self
            .available
            .saturating_add(self.refill_rate)
            .min(self.max_tokens);
        self.available
    }

    /// Debit `weight` tokens if available. No-op on failure.
    pub fn try_reserve(&mut self, weight: u64) -> bool {
        if self.available >= weight {
            self.available -= weight;
            true
        } else {
            false
        }
    }

    pub fn available(&self) -> u64 {
        self.available
    }

    pub fn max_tokens(&self) -> u64 {
        self.max_tokens
    }
}
