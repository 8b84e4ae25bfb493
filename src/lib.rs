//! Edu Cache - In-process resource cache for an education platform
//!
//! Read-through caching keyed by resource type, id and parameters, with
//! per-type TTL policy, invalidation, warming, stale-while-revalidate and
//! rate-limited misses. A small admin API exposes metrics and invalidation.

pub mod api;
pub mod cache;
pub mod clock;
pub mod config;
pub mod error;
pub mod models;
pub mod tasks;

pub use api::AppState;
pub use cache::{ReadOptions, ResourceCache, ResourceQuery, ResourceType};
pub use config::Config;
pub use error::{CacheError, LimitedError};
pub use tasks::spawn_cleanup_task;
