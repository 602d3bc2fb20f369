// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Retry backoff policies.
//!
//! The original queue retried failed items whenever the next drain happened
//! to run. Here the timing is an explicit strategy the engine consults: a
//! previously-failed item becomes eligible again only once
//! `last_attempt + delay_for(retry_count)` has passed.

use chrono::Duration;
use serde::{Deserialize, Serialize};

/// Strategy deciding how long a failed item waits before its next attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum BackoffPolicy {
    /// No delay: a failed item is eligible on the very next drain.
    Immediate,
    /// Doubling delay starting at `initial_delay_ms`, capped at
    /// `max_delay_ms`.
    Exponential { initial_delay_ms: u64, max_delay_ms: u64 },
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        BackoffPolicy::Immediate
    }
}

impl BackoffPolicy {
    /// Creates an exponential policy.
    pub fn exponential(initial_delay_ms: u64, max_delay_ms: u64) -> Self {
        BackoffPolicy::Exponential { initial_delay_ms, max_delay_ms }
    }

    /// Returns the wait before the attempt following `retry_count` failures.
    ///
    /// A `retry_count` of zero means no attempt has failed yet, so the delay
    /// is always zero.
    pub fn delay_for(&self, retry_count: u32) -> Duration {
        match self {
            BackoffPolicy::Immediate => Duration::zero(),
            BackoffPolicy::Exponential { initial_delay_ms, max_delay_ms } => {
                if retry_count == 0 {
                    return Duration::zero();
                }
                let doublings = retry_count.saturating_sub(1).min(32);
                let delay_ms = initial_delay_ms
                    .saturating_mul(1u64 << doublings)
                    .min(*max_delay_ms)
                    .min(i64::MAX as u64);
                Duration::milliseconds(delay_ms as i64)
            }
        }
    }
}

#[cfg(test)]
#[path = "retry_tests.rs"]
mod tests;
