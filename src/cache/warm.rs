//! Cache Warming Module
//!
//! Pre-populates entries for known resource ids in bounded batches.

use std::fmt::Display;
use std::future::Future;

use futures::future::join_all;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::cache::{ResourceCache, ResourceType};

/// Tally of a warming run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct WarmReport {
    /// Ids passed in
    pub requested: usize,
    /// Already cached and unexpired
    pub skipped: usize,
    /// Fetched and stored
    pub warmed: usize,
    /// Fetch or store failed; left uncached
    pub failed: usize,
}

enum WarmOutcome {
    Skipped,
    Warmed,
    Failed,
}

impl ResourceCache {
    // == Warm ==
    /// Fetches and caches every id of `resource` not already cached.
    ///
    /// Ids are fetched concurrently within a batch and batches run one after
    /// another, so at most `warm_batch_size` fetches are in flight. Entries
    /// get the type's default TTL. A failing id is logged and skipped.
    pub async fn warm<I, T, E, F, Fut>(
        &self,
        resource: ResourceType,
        ids: I,
        fetcher: F,
    ) -> WarmReport
    where
        I: IntoIterator,
        I::Item: Into<String>,
        T: Serialize,
        E: Display,
        F: Fn(String) -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let ids: Vec<String> = ids.into_iter().map(Into::into).collect();
        let mut report = WarmReport {
            requested: ids.len(),
            ..WarmReport::default()
        };
        if self.is_closed() {
            debug!("Cache closed, skipping warm of {} {} ids", ids.len(), resource);
            report.skipped = ids.len();
            return report;
        }

        let ttl = self.inner.ttl.ttl_for(resource);
        for batch in ids.chunks(self.inner.warm_batch_size) {
            let outcomes = join_all(
                batch
                    .iter()
                    .map(|id| self.warm_one(resource, id, ttl, &fetcher)),
            )
            .await;

            for outcome in outcomes {
                match outcome {
                    WarmOutcome::Skipped => report.skipped += 1,
                    WarmOutcome::Warmed => report.warmed += 1,
                    WarmOutcome::Failed => report.failed += 1,
                }
            }
        }

        info!(
            "Warmed {} cache: {} stored, {} already cached, {} failed",
            resource, report.warmed, report.skipped, report.failed
        );
        report
    }

    async fn warm_one<T, E, F, Fut>(
        &self,
        resource: ResourceType,
        id: &str,
        ttl: u64,
        fetcher: &F,
    ) -> WarmOutcome
    where
        T: Serialize,
        E: Display,
        F: Fn(String) -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let key = self.inner.keys.build(resource, Some(id), None);
        match self.inner.store.get(key.as_str()).await {
            Ok(Some(_)) => return WarmOutcome::Skipped,
            Ok(None) => {}
            Err(err) => warn!("Cache read failed for {} while warming: {}", key, err),
        }

        match fetcher(id.to_string()).await {
            Ok(value) => {
                let raw = Self::encode(&key, &value);
                if self.write(&key, raw, ttl).await {
                    WarmOutcome::Warmed
                } else {
                    WarmOutcome::Failed
                }
            }
            Err(err) => {
                warn!("Failed to warm {}: {}", key, err);
                WarmOutcome::Failed
            }
        }
    }
}
