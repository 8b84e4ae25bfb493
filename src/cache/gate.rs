//! Cache Gate Module
//!
//! Read-through access to the entry store: the handle route handlers hold.

use std::fmt::Display;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};

use axum::http::HeaderMap;
use dashmap::DashSet;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tokio::task::AbortHandle;
use tracing::{debug, info, warn};

use crate::cache::{
    CacheKey, CacheMetrics, EntryStore, KeyBuilder, LoggingRevalidator, MemoryStore,
    MetricsRecorder, Outcome, PageRevalidator, ParamBag, RateDecision, RateLimiter, ResourceType,
    TtlPolicy, WindowRateLimiter, DEFAULT_NAMESPACE, DEFAULT_WARM_BATCH_SIZE, MAX_TTL_SECONDS,
};
use crate::clock::{Clock, SystemClock};
use crate::config::Config;
use crate::error::{LimitedError, Result};

/// Header a caller sets to force a fresh read.
pub const BYPASS_CACHE_HEADER: &str = "x-bypass-cache";

// == Resource Query ==
/// What is being read: a resource type, optionally narrowed by id and parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceQuery {
    pub resource: ResourceType,
    pub id: Option<String>,
    pub params: Option<ParamBag>,
}

impl ResourceQuery {
    pub fn new(resource: ResourceType) -> Self {
        Self {
            resource,
            id: None,
            params: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_params(mut self, params: ParamBag) -> Self {
        self.params = Some(params);
        self
    }
}

// == Read Options ==
/// Per-call knobs for [`ResourceCache::read_through`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReadOptions {
    /// Lifetime for this write, replacing the type's default
    pub ttl: Option<u64>,
    /// Skip the lookup, always call the producer and overwrite the entry
    pub bypass_cache: bool,
    /// On a hit, refresh the entry in the background
    pub stale_while_revalidate: bool,
}

impl ReadOptions {
    pub fn with_ttl(mut self, ttl_seconds: u64) -> Self {
        self.ttl = Some(ttl_seconds);
        self
    }

    pub fn bypass(mut self) -> Self {
        self.bypass_cache = true;
        self
    }

    pub fn stale_while_revalidate(mut self) -> Self {
        self.stale_while_revalidate = true;
        self
    }

    /// Default options, with `bypass_cache` set when the request carries
    /// `x-bypass-cache: true` (or `1`).
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let bypass_cache = headers
            .get(BYPASS_CACHE_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(|value| {
                let value = value.trim();
                value.eq_ignore_ascii_case("true") || value == "1"
            })
            .unwrap_or(false);

        Self {
            bypass_cache,
            ..Self::default()
        }
    }
}

// == Builder ==
/// Assembles a [`ResourceCache`] from its collaborators.
pub struct CacheBuilder {
    namespace: String,
    clock: Arc<dyn Clock>,
    store: Option<Arc<dyn EntryStore>>,
    ttl: TtlPolicy,
    limiter: Option<Arc<dyn RateLimiter>>,
    revalidator: Arc<dyn PageRevalidator>,
    recorder: Option<Arc<dyn MetricsRecorder>>,
    warm_batch_size: usize,
}

impl CacheBuilder {
    pub fn new() -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_string(),
            clock: Arc::new(SystemClock),
            store: None,
            ttl: TtlPolicy::default(),
            limiter: None,
            revalidator: Arc::new(LoggingRevalidator),
            recorder: None,
            warm_batch_size: DEFAULT_WARM_BATCH_SIZE,
        }
    }

    /// Starts from environment configuration.
    ///
    /// Fails on TTL overrides naming an unknown resource type.
    pub fn from_config(config: &Config) -> Result<Self> {
        let ttl = TtlPolicy::with_overrides(
            config
                .ttl_overrides
                .iter()
                .map(|(name, secs)| (name.as_str(), *secs)),
        )?;
        Ok(Self::new()
            .namespace(config.namespace.clone())
            .ttl_policy(ttl)
            .warm_batch_size(config.warm_batch_size))
    }

    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    /// Clock for the default store and limiter. Ignored by ones supplied explicitly.
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn store(mut self, store: Arc<dyn EntryStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn ttl_policy(mut self, ttl: TtlPolicy) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn rate_limiter(mut self, limiter: Arc<dyn RateLimiter>) -> Self {
        self.limiter = Some(limiter);
        self
    }

    pub fn revalidator(mut self, revalidator: Arc<dyn PageRevalidator>) -> Self {
        self.revalidator = revalidator;
        self
    }

    /// Extra sink receiving every hit/miss event alongside the built-in counters.
    pub fn metrics_recorder(mut self, recorder: Arc<dyn MetricsRecorder>) -> Self {
        self.recorder = Some(recorder);
        self
    }

    /// Ids fetched concurrently per warming batch; zero is treated as one.
    pub fn warm_batch_size(mut self, size: usize) -> Self {
        self.warm_batch_size = size.max(1);
        self
    }

    pub fn build(self) -> ResourceCache {
        let store = self
            .store
            .unwrap_or_else(|| Arc::new(MemoryStore::with_clock(self.clock.clone())));
        let limiter = self
            .limiter
            .unwrap_or_else(|| Arc::new(WindowRateLimiter::with_clock(self.clock.clone())));

        ResourceCache {
            inner: Arc::new(CacheInner {
                keys: KeyBuilder::new(self.namespace),
                store,
                ttl: self.ttl,
                metrics: CacheMetrics::new(),
                recorder: self.recorder,
                limiter,
                revalidator: self.revalidator,
                revalidating: DashSet::new(),
                warm_batch_size: self.warm_batch_size,
                closed: AtomicBool::new(false),
                sweepers: Mutex::new(Vec::new()),
            }),
        }
    }
}

impl Default for CacheBuilder {
    fn default() -> Self {
        Self::new()
    }
}

pub(crate) struct CacheInner {
    pub(crate) keys: KeyBuilder,
    pub(crate) store: Arc<dyn EntryStore>,
    pub(crate) ttl: TtlPolicy,
    metrics: CacheMetrics,
    recorder: Option<Arc<dyn MetricsRecorder>>,
    limiter: Arc<dyn RateLimiter>,
    pub(crate) revalidator: Arc<dyn PageRevalidator>,
    /// Keys with a background refresh running
    revalidating: DashSet<String>,
    pub(crate) warm_batch_size: usize,
    closed: AtomicBool,
    /// Background sweeps stopped by `close`
    sweepers: Mutex<Vec<AbortHandle>>,
}

// == Resource Cache ==
/// Shared handle to the cache. Clones refer to the same entries.
///
/// Concurrent misses on one key may each call their producer; the last
/// write wins. Only wrap reads: a producer must be safe to run repeatedly.
#[derive(Clone)]
pub struct ResourceCache {
    pub(crate) inner: Arc<CacheInner>,
}

impl ResourceCache {
    pub fn builder() -> CacheBuilder {
        CacheBuilder::new()
    }

    /// In-memory cache with default policy.
    pub fn new() -> Self {
        CacheBuilder::new().build()
    }

    pub fn keys(&self) -> &KeyBuilder {
        &self.inner.keys
    }

    pub fn ttl_policy(&self) -> &TtlPolicy {
        &self.inner.ttl
    }

    pub fn metrics(&self) -> &CacheMetrics {
        &self.inner.metrics
    }

    pub fn store(&self) -> &Arc<dyn EntryStore> {
        &self.inner.store
    }

    /// Key under which `query` is cached.
    pub fn key_for(&self, query: &ResourceQuery) -> CacheKey {
        self.inner
            .keys
            .build(query.resource, query.id.as_deref(), query.params.as_ref())
    }

    // == Read Through ==
    /// Returns the cached value for `query`, calling `producer` on a miss.
    ///
    /// A producer error is returned unchanged and nothing is cached. A failing
    /// store only costs the cache: the producer runs and its value is returned.
    ///
    /// With `stale_while_revalidate`, a hit returns immediately and the
    /// producer runs on a detached task (at most one per key) whose result
    /// replaces the entry. Dropping the returned future does not cancel it.
    pub async fn read_through<T, E, F, Fut>(
        &self,
        query: &ResourceQuery,
        options: ReadOptions,
        producer: F,
    ) -> std::result::Result<T, E>
    where
        T: Serialize + DeserializeOwned + Send + 'static,
        E: Display + Send + 'static,
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = std::result::Result<T, E>> + Send + 'static,
    {
        let key = self.key_for(query);
        let ttl = options
            .ttl
            .unwrap_or_else(|| self.inner.ttl.ttl_for(query.resource));

        if !options.bypass_cache {
            if let Some(value) = self.lookup::<T>(&key).await {
                debug!("Cache hit: {}", key);
                self.record(query.resource, Outcome::Hit);
                if options.stale_while_revalidate {
                    self.spawn_revalidation(query.resource, key, ttl, producer);
                }
                return Ok(value);
            }
        }

        debug!("Cache miss: {} (bypass={})", key, options.bypass_cache);
        self.record(query.resource, Outcome::Miss);
        let value = producer().await?;
        let raw = Self::encode(&key, &value);
        self.write(&key, raw, ttl).await;
        Ok(value)
    }

    // == Rate-Limited Read Through ==
    /// Like [`read_through`](Self::read_through), but misses are throttled.
    ///
    /// Hits are never limited. On a miss, `identifier` must have made fewer than
    /// `limit` producer calls in the last `timeframe_secs`, otherwise the producer
    /// is skipped and [`LimitedError::RateLimited`] is returned.
    pub async fn read_through_limited<T, E, F, Fut>(
        &self,
        query: &ResourceQuery,
        identifier: &str,
        limit: u32,
        timeframe_secs: u64,
        producer: F,
    ) -> std::result::Result<T, LimitedError<E>>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
    {
        let key = self.key_for(query);

        if let Some(value) = self.lookup::<T>(&key).await {
            debug!("Cache hit: {}", key);
            self.record(query.resource, Outcome::Hit);
            return Ok(value);
        }

        let timeframe = chrono::Duration::seconds(timeframe_secs.min(MAX_TTL_SECONDS) as i64);
        if let RateDecision::Denied { retry_after_secs } =
            self.inner.limiter.check(identifier, limit, timeframe)
        {
            warn!(
                "Rate limit reached for {} ({} per {}s), rejecting miss on {}",
                identifier, limit, timeframe_secs, key
            );
            self.record(query.resource, Outcome::RateLimited);
            return Err(LimitedError::RateLimited {
                identifier: identifier.to_string(),
                retry_after_secs,
            });
        }

        debug!("Cache miss: {}", key);
        self.record(query.resource, Outcome::Miss);
        let value = producer().await.map_err(LimitedError::Producer)?;
        let raw = Self::encode(&key, &value);
        self.write(&key, raw, self.inner.ttl.ttl_for(query.resource))
            .await;
        Ok(value)
    }

    // == Lifecycle ==
    /// Drops every entry, stops attached sweepers and stops caching.
    ///
    /// Reads after close call their producer directly. Background refreshes
    /// already running finish without writing.
    pub async fn close(&self) {
        if self.inner.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        let sweepers = std::mem::take(
            &mut *self
                .inner
                .sweepers
                .lock()
                .unwrap_or_else(PoisonError::into_inner),
        );
        for sweeper in sweepers {
            sweeper.abort();
        }
        if let Err(err) = self.inner.store.clear().await {
            warn!("Failed to clear cache on close: {}", err);
        }
        info!("Resource cache closed");
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }

    /// Number of stored entries.
    pub async fn entry_count(&self) -> Result<usize> {
        self.inner.store.len().await
    }

    /// Purges expired entries and idle rate-limit windows.
    ///
    /// Returns the number of entries removed; a store failure is logged and
    /// counts as none.
    pub async fn sweep(&self) -> usize {
        let removed = match self.inner.store.purge_expired().await {
            Ok(0) => {
                debug!("Expiry sweep: no expired entries found");
                0
            }
            Ok(removed) => {
                info!("Expiry sweep: removed {} expired entries", removed);
                removed
            }
            Err(err) => {
                warn!("Expiry sweep failed: {}", err);
                0
            }
        };

        let idle = self.inner.limiter.purge_idle();
        if idle > 0 {
            debug!("Expiry sweep: forgot {} idle rate-limit windows", idle);
        }
        removed
    }

    /// Ties a background sweep to this cache so `close` aborts it.
    pub(crate) fn attach_sweeper(&self, sweeper: AbortHandle) {
        if self.is_closed() {
            sweeper.abort();
            return;
        }
        self.inner
            .sweepers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(sweeper);
    }

    pub(crate) fn downgrade(&self) -> Weak<CacheInner> {
        Arc::downgrade(&self.inner)
    }

    pub(crate) fn upgrade(inner: &Weak<CacheInner>) -> Option<Self> {
        inner.upgrade().map(|inner| Self { inner })
    }

    // == Internals ==
    pub(crate) fn record(&self, resource: ResourceType, outcome: Outcome) {
        self.inner.metrics.record(resource, outcome);
        if let Some(recorder) = &self.inner.recorder {
            recorder.record(resource, outcome);
        }
    }

    /// Cached value, or `None` on a miss, a closed cache, a store failure or
    /// an entry that no longer deserializes as `T`.
    pub(crate) async fn lookup<T: DeserializeOwned>(&self, key: &CacheKey) -> Option<T> {
        if self.is_closed() {
            return None;
        }
        match self.inner.store.get(key.as_str()).await {
            Ok(Some(raw)) => match serde_json::from_value(raw) {
                Ok(value) => Some(value),
                Err(err) => {
                    warn!("Cached value for {} has unexpected shape: {}", key, err);
                    None
                }
            },
            Ok(None) => None,
            Err(err) => {
                warn!("Cache read failed for {}, calling producer directly: {}", key, err);
                None
            }
        }
    }

    /// JSON form of a value, or `None` (logged) if it cannot be cached.
    pub(crate) fn encode<T: Serialize>(key: &CacheKey, value: &T) -> Option<Value> {
        match serde_json::to_value(value) {
            Ok(raw) => Some(raw),
            Err(err) => {
                warn!("Value for {} is not cacheable: {}", key, err);
                None
            }
        }
    }

    /// Stores an encoded value, logging instead of failing.
    ///
    /// Returns whether the entry is in the store. A write racing `close` is
    /// removed again so nothing outlives the clear.
    pub(crate) async fn write(&self, key: &CacheKey, raw: Option<Value>, ttl: u64) -> bool {
        let Some(raw) = raw else { return false };
        if self.is_closed() {
            return false;
        }
        if let Err(err) = self.inner.store.set(key.as_str(), raw, ttl).await {
            warn!("Cache write failed for {}: {}", key, err);
            return false;
        }
        if self.is_closed() {
            if let Err(err) = self.inner.store.delete(key.as_str()).await {
                warn!("Failed to drop {} written during close: {}", key, err);
            }
            return false;
        }
        true
    }

    fn spawn_revalidation<T, E, F, Fut>(
        &self,
        resource: ResourceType,
        key: CacheKey,
        ttl: u64,
        producer: F,
    ) where
        T: Serialize + Send + 'static,
        E: Display + Send + 'static,
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = std::result::Result<T, E>> + Send + 'static,
    {
        if !self.inner.revalidating.insert(key.to_string()) {
            debug!("Revalidation already running for {}", key);
            return;
        }
        let guard = InFlight {
            cache: self.clone(),
            key: key.to_string(),
        };

        tokio::spawn(async move {
            match producer().await {
                Ok(value) => {
                    let raw = Self::encode(&key, &value);
                    if guard.cache.write(&key, raw, ttl).await {
                        guard.cache.record(resource, Outcome::Revalidated);
                        debug!("Revalidated {}", key);
                    }
                }
                Err(err) => warn!("Background revalidation of {} failed: {}", key, err),
            }
            drop(guard);
        });
    }
}

impl Default for ResourceCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Clears a key's in-flight mark, even if the refresh task panics.
struct InFlight {
    cache: ResourceCache,
    key: String,
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.cache.inner.revalidating.remove(&self.key);
    }
}
