//! Cache Module
//!
//! Read-through resource cache with per-type TTL policy, invalidation,
//! warming and rate-limited misses.

mod entry;
mod gate;
mod invalidate;
mod keys;
mod limiter;
mod policy;
mod stats;
mod store;
mod warm;

#[cfg(test)]
pub(crate) mod test_support;

// Re-export public types
pub use entry::{CacheEntry, MAX_TTL_SECONDS};
pub use gate::{CacheBuilder, ReadOptions, ResourceCache, ResourceQuery, BYPASS_CACHE_HEADER};
pub use invalidate::{LoggingRevalidator, PageRevalidator};
pub use keys::{CacheKey, KeyBuilder, ParamBag, ParamValue, ResourceType};
pub use limiter::{RateDecision, RateLimiter, WindowRateLimiter};
pub use policy::TtlPolicy;
pub use stats::{CacheMetrics, MetricsRecorder, MetricsSnapshot, Outcome, TypeStats};
pub use store::{EntryStore, MemoryStore};
pub use warm::WarmReport;

// == Public Constants ==
/// Namespace prefixed to every key unless configured otherwise
pub const DEFAULT_NAMESPACE: &str = "edu";

/// Ids fetched concurrently per warming batch
pub const DEFAULT_WARM_BATCH_SIZE: usize = 10;
