//! Per-caller sliding-window rate limiting.
//!
//! Each caller has an ordered list of admission timestamps. On every check
//! the list is pruned to the trailing window, so the quota is recomputed per
//! call rather than per fixed bucket. Pruning happens lazily on the caller's
//! own next check; [`SlidingWindow::sweep`] reclaims callers that went quiet.

use std::collections::{HashMap, VecDeque};

use serde::{Deserialize, Serialize};

use crate::definition::RateLimit;

/// Outcome of a rate-limit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum RateLimitDecision {
    /// Call admitted and recorded.
    Allowed,
    /// Call rejected; nothing recorded.
    Limited {
        /// Milliseconds until the oldest retained call leaves the window.
        retry_after_ms: u64,
    },
}

impl RateLimitDecision {
    /// Returns true when the call was admitted.
    #[must_use]
    pub fn is_allowed(self) -> bool {
        matches!(self, Self::Allowed)
    }

    /// Returns the retry hint for rejected calls.
    #[must_use]
    pub fn retry_after_ms(self) -> Option<u64> {
        match self {
            Self::Allowed => None,
            Self::Limited { retry_after_ms } => Some(retry_after_ms),
        }
    }
}

/// Admission timestamps keyed by caller id.
#[derive(Debug, Default)]
pub struct SlidingWindow {
    callers: HashMap<String, VecDeque<u64>>,
}

impl SlidingWindow {
    /// Creates an empty window.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Admits or rejects a call by `caller_id` at `now_ms`.
    ///
    /// Admitted calls are appended to the caller's history; rejected calls
    /// are not, so retrying early does not extend the penalty.
    pub fn check(&mut self, caller_id: &str, limit: RateLimit, now_ms: u64) -> RateLimitDecision {
        let window_ms = limit.window_ms();
        let timestamps = self.callers.entry(caller_id.to_owned()).or_default();
        prune(timestamps, now_ms, window_ms);

        if timestamps.len() >= limit.max_calls_usize() {
            let oldest = timestamps.front().copied().unwrap_or(now_ms);
            let elapsed = now_ms.saturating_sub(oldest);
            return RateLimitDecision::Limited {
                retry_after_ms: window_ms.saturating_sub(elapsed),
            };
        }

        timestamps.push_back(now_ms);
        RateLimitDecision::Allowed
    }

    /// Drops callers with no admissions inside the window, returning how many
    /// were removed.
    pub fn sweep(&mut self, window_ms: u64, now_ms: u64) -> usize {
        let before = self.callers.len();
        self.callers.retain(|_, timestamps| {
            prune(timestamps, now_ms, window_ms);
            !timestamps.is_empty()
        });
        before - self.callers.len()
    }

    /// Returns the number of callers currently tracked.
    #[must_use]
    pub fn tracked_callers(&self) -> usize {
        self.callers.len()
    }
}

fn prune(timestamps: &mut VecDeque<u64>, now_ms: u64, window_ms: u64) {
    while let Some(&front) = timestamps.front() {
        if now_ms.saturating_sub(front) >= window_ms {
            timestamps.pop_front();
        } else {
            break;
        }
    }
}
