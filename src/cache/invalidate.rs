//! Invalidation Module
//!
//! Removes entries made stale by writes and tells the rendering layer which
//! pages to rebuild.

use tracing::{info, warn};

use crate::cache::{ResourceCache, ResourceType};

// == Page Revalidator ==
/// Hook into the page-rendering layer.
pub trait PageRevalidator: Send + Sync {
    /// Marks the page at `path` stale.
    fn revalidate(&self, path: &str);
}

/// Revalidator that only logs the request; used when no rendering layer is wired in.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingRevalidator;

impl PageRevalidator for LoggingRevalidator {
    fn revalidate(&self, path: &str) {
        info!("Page revalidation requested for {}", path);
    }
}

impl ResourceCache {
    // == Invalidate One ==
    /// Drops one resource and every list that may embed it.
    ///
    /// Removes the `(type, id)` entry, its parameterized variants and all
    /// entries of the type's dependent list types, then signals `path` if given.
    /// Never fails: store errors are logged and the cache may stay stale.
    ///
    /// Returns the number of entries removed.
    pub async fn invalidate_one(
        &self,
        resource: ResourceType,
        id: &str,
        path: Option<&str>,
    ) -> usize {
        let key = self.inner.keys.build(resource, Some(id), None);
        let mut removed = self.delete_key(key.as_str()).await;
        removed += self.delete_prefix(&format!("{}:", key)).await;
        for list in resource.list_types() {
            removed += self.delete_type(*list).await;
        }

        if let Some(path) = path {
            self.inner.revalidator.revalidate(path);
        }
        info!("Invalidated {} ({} entries removed)", key, removed);
        removed
    }

    // == Invalidate All ==
    /// Drops every entry of a type.
    ///
    /// Signals `path`, or the type's default page when none is given.
    /// Returns the number of entries removed.
    pub async fn invalidate_all(&self, resource: ResourceType, path: Option<&str>) -> usize {
        let removed = self.delete_type(resource).await;

        if let Some(path) = path.or(resource.default_path()) {
            self.inner.revalidator.revalidate(path);
        }
        info!(
            "Invalidated all {} entries ({} removed)",
            resource, removed
        );
        removed
    }

    /// `<ns>:<type>` itself plus everything under `<ns>:<type>:`, so that
    /// `course` never reaches into `courses`.
    async fn delete_type(&self, resource: ResourceType) -> usize {
        let root = self.inner.keys.type_prefix(resource);
        self.delete_key(&root).await + self.delete_prefix(&format!("{}:", root)).await
    }

    async fn delete_prefix(&self, prefix: &str) -> usize {
        let keys = match self.inner.store.keys_with_prefix(prefix).await {
            Ok(keys) => keys,
            Err(err) => {
                warn!("Failed to scan keys under {}: {}", prefix, err);
                return 0;
            }
        };

        let mut removed = 0;
        for key in keys {
            removed += self.delete_key(&key).await;
        }
        removed
    }

    async fn delete_key(&self, key: &str) -> usize {
        match self.inner.store.delete(key).await {
            Ok(true) => 1,
            Ok(false) => 0,
            Err(err) => {
                warn!("Failed to delete {}: {}", key, err);
                0
            }
        }
    }
}
