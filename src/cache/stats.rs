//! Cache Statistics Module
//!
//! Per-resource-type hit/miss counters and the recorder trait the gate reports to.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

use crate::cache::ResourceType;

// == Outcome ==
/// Event recorded against a resource type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// Served from the cache
    Hit,
    /// Producer invoked (miss or bypass)
    Miss,
    /// Miss rejected by the rate limiter
    RateLimited,
    /// Background refresh stored a fresh value
    Revalidated,
}

// == Metrics Recorder ==
/// Sink for cache events, for external aggregation.
pub trait MetricsRecorder: Send + Sync {
    fn record(&self, resource: ResourceType, outcome: Outcome);
}

#[derive(Debug, Default)]
struct TypeCounters {
    hits: AtomicU64,
    misses: AtomicU64,
    rate_limited: AtomicU64,
    revalidations: AtomicU64,
}

// == Cache Metrics ==
/// Lock-free counters, one set per resource type.
#[derive(Debug, Default)]
pub struct CacheMetrics {
    counters: [TypeCounters; ResourceType::ALL.len()],
}

impl CacheMetrics {
    // == Constructor ==
    /// Creates a new CacheMetrics with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current value of one counter.
    pub fn count(&self, resource: ResourceType, outcome: Outcome) -> u64 {
        self.counter(resource, outcome).load(Ordering::Relaxed)
    }

    fn counter(&self, resource: ResourceType, outcome: Outcome) -> &AtomicU64 {
        let counters = &self.counters[resource.index()];
        match outcome {
            Outcome::Hit => &counters.hits,
            Outcome::Miss => &counters.misses,
            Outcome::RateLimited => &counters.rate_limited,
            Outcome::Revalidated => &counters.revalidations,
        }
    }

    // == Snapshot ==
    /// Point-in-time copy of every counter.
    ///
    /// Types that have seen no traffic are left out of `types`.
    pub fn snapshot(&self) -> MetricsSnapshot {
        let types: Vec<TypeStats> = ResourceType::ALL
            .into_iter()
            .map(|resource| TypeStats {
                resource,
                hits: self.count(resource, Outcome::Hit),
                misses: self.count(resource, Outcome::Miss),
                rate_limited: self.count(resource, Outcome::RateLimited),
                revalidations: self.count(resource, Outcome::Revalidated),
            })
            .filter(|stats| {
                stats.hits + stats.misses + stats.rate_limited + stats.revalidations > 0
            })
            .collect();

        MetricsSnapshot {
            hits: types.iter().map(|s| s.hits).sum(),
            misses: types.iter().map(|s| s.misses).sum(),
            rate_limited: types.iter().map(|s| s.rate_limited).sum(),
            types,
        }
    }
}

impl MetricsRecorder for CacheMetrics {
    fn record(&self, resource: ResourceType, outcome: Outcome) {
        self.counter(resource, outcome)
            .fetch_add(1, Ordering::Relaxed);
    }
}

// == Snapshot Types ==
/// Counters for one resource type.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TypeStats {
    pub resource: ResourceType,
    pub hits: u64,
    pub misses: u64,
    pub rate_limited: u64,
    pub revalidations: u64,
}

impl TypeStats {
    // == Hit Rate ==
    /// Returns hits / (hits + misses), or 0.0 if no requests have been made.
    pub fn hit_rate(&self) -> f64 {
        hit_rate(self.hits, self.misses)
    }
}

/// Totals and per-type counters.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsSnapshot {
    pub hits: u64,
    pub misses: u64,
    pub rate_limited: u64,
    pub types: Vec<TypeStats>,
}

impl MetricsSnapshot {
    /// Overall hit rate across all types.
    pub fn hit_rate(&self) -> f64 {
        hit_rate(self.hits, self.misses)
    }

    /// Counters for one type, if it has seen traffic.
    pub fn for_type(&self, resource: ResourceType) -> Option<&TypeStats> {
        self.types.iter().find(|stats| stats.resource == resource)
    }
}

fn hit_rate(hits: u64, misses: u64) -> f64 {
    let total = hits + misses;
    if total == 0 {
        0.0
    } else {
        hits as f64 / total as f64
    }
}
