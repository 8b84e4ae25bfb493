//! Rate Limiter Module
//!
//! Sliding-window limiter guarding producer calls on cache misses.

use std::collections::VecDeque;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;

use crate::clock::{Clock, SystemClock};

/// Result of a limiter check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    /// Call admitted; `remaining` more fit in the current window
    Allowed { remaining: u32 },
    /// Window exhausted; the oldest call ages out after `retry_after_secs`
    Denied { retry_after_secs: u64 },
}

impl RateDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, RateDecision::Allowed { .. })
    }
}

/// Decides whether `identifier` may make another call.
///
/// An admitted call counts against the window.
pub trait RateLimiter: Send + Sync {
    fn check(&self, identifier: &str, limit: u32, timeframe: Duration) -> RateDecision;

    /// Forgets identifiers with no call left in their window. Returns how many.
    fn purge_idle(&self) -> usize {
        0
    }
}

#[derive(Debug)]
struct Window {
    calls: VecDeque<DateTime<Utc>>,
    timeframe: Duration,
}

impl Window {
    fn prune(&mut self, now: DateTime<Utc>) {
        while self
            .calls
            .front()
            .is_some_and(|first| now - *first >= self.timeframe)
        {
            self.calls.pop_front();
        }
    }
}

// == Window Rate Limiter ==
/// Sliding-window log per identifier.
///
/// Identifiers stay tracked until [`purge_idle`](RateLimiter::purge_idle)
/// finds their window empty; the expiry sweeper calls it.
#[derive(Debug, Clone)]
pub struct WindowRateLimiter {
    windows: Arc<DashMap<String, Window>>,
    clock: Arc<dyn Clock>,
}

impl WindowRateLimiter {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            windows: Arc::new(DashMap::new()),
            clock,
        }
    }

    /// Number of identifiers currently tracked.
    pub fn tracked(&self) -> usize {
        self.windows.len()
    }
}

impl Default for WindowRateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

fn retry_secs(wait: Duration) -> u64 {
    u64::try_from(wait.num_seconds()).unwrap_or(0).max(1)
}

impl RateLimiter for WindowRateLimiter {
    fn check(&self, identifier: &str, limit: u32, timeframe: Duration) -> RateDecision {
        if limit == 0 {
            return RateDecision::Denied {
                retry_after_secs: retry_secs(timeframe),
            };
        }

        let now = self.clock.now();
        let mut window = self
            .windows
            .entry(identifier.to_string())
            .or_insert_with(|| Window {
                calls: VecDeque::new(),
                timeframe,
            });
        window.timeframe = timeframe;
        window.prune(now);

        let used = u32::try_from(window.calls.len()).unwrap_or(u32::MAX);
        if used >= limit {
            let retry_after = window
                .calls
                .front()
                .map(|first| timeframe - (now - *first))
                .unwrap_or(timeframe);
            return RateDecision::Denied {
                retry_after_secs: retry_secs(retry_after),
            };
        }

        window.calls.push_back(now);
        RateDecision::Allowed {
            remaining: limit - used - 1,
        }
    }

    fn purge_idle(&self) -> usize {
        let now = self.clock.now();
        let mut purged = 0;
        self.windows.retain(|_, window| {
            window.prune(now);
            let keep = !window.calls.is_empty();
            if !keep {
                purged += 1;
            }
            keep
        });
        purged
    }
}
