//! API Handlers
//!
//! HTTP request handlers for each cache admin endpoint.

use axum::{
    extract::{Path, Query, State},
    Json,
};

use crate::cache::{ResourceCache, ResourceType};
use crate::error::{CacheError, Result};
use crate::models::{HealthResponse, InvalidateParams, InvalidateResponse, MetricsResponse};

/// Application state shared across all handlers.
///
/// The cache handle is internally reference-counted and synchronized.
#[derive(Clone)]
pub struct AppState {
    /// Shared resource cache
    pub cache: ResourceCache,
}

impl AppState {
    /// Creates a new AppState with the given cache.
    pub fn new(cache: ResourceCache) -> Self {
        Self { cache }
    }
}

/// Handler for GET /metrics
///
/// Returns per-type hit/miss counters and the current entry count.
pub async fn metrics_handler(State(state): State<AppState>) -> Result<Json<MetricsResponse>> {
    let entries = state.cache.entry_count().await?;
    let snapshot = state.cache.metrics().snapshot();

    Ok(Json(MetricsResponse::new(&snapshot, entries)))
}

/// Handler for DELETE /cache/:resource
///
/// Drops every entry of a resource type.
pub async fn invalidate_all_handler(
    State(state): State<AppState>,
    Path(resource): Path<String>,
    Query(params): Query<InvalidateParams>,
) -> Result<Json<InvalidateResponse>> {
    if let Some(error_msg) = params.validate() {
        return Err(CacheError::InvalidRequest(error_msg));
    }
    let resource: ResourceType = resource.parse()?;

    let removed = state
        .cache
        .invalidate_all(resource, params.path.as_deref())
        .await;

    Ok(Json(InvalidateResponse::all(resource, removed)))
}

/// Handler for DELETE /cache/:resource/:id
///
/// Drops one resource and the lists that may embed it.
pub async fn invalidate_one_handler(
    State(state): State<AppState>,
    Path((resource, id)): Path<(String, String)>,
    Query(params): Query<InvalidateParams>,
) -> Result<Json<InvalidateResponse>> {
    if let Some(error_msg) = params.validate() {
        return Err(CacheError::InvalidRequest(error_msg));
    }
    let resource: ResourceType = resource.parse()?;

    let removed = state
        .cache
        .invalidate_one(resource, &id, params.path.as_deref())
        .await;

    Ok(Json(InvalidateResponse::one(resource, id, removed)))
}

/// Handler for GET /health
///
/// Returns health status of the cache.
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    if state.cache.is_closed() {
        Json(HealthResponse::closed())
    } else {
        Json(HealthResponse::healthy())
    }
}
