//! Background Tasks Module
//!
//! Contains background tasks that run periodically while the cache is live.
//!
//! # Tasks
//! - Expiry sweep: purges expired cache entries at configured intervals

mod cleanup;

pub use cleanup::spawn_cleanup_task;
