//! Response DTOs for the cache admin API
//!
//! Defines the structure of outgoing HTTP response bodies.

use serde::Serialize;

use crate::cache::{MetricsSnapshot, ResourceType, TypeStats};

/// Response body for the invalidation endpoints
#[derive(Debug, Clone, Serialize)]
pub struct InvalidateResponse {
    /// Human-readable summary
    pub message: String,
    /// Invalidated resource type
    pub resource: ResourceType,
    /// Invalidated id, absent for type-wide invalidation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Number of entries removed
    pub removed: usize,
}

impl InvalidateResponse {
    /// Creates a response for a single-resource invalidation
    pub fn one(resource: ResourceType, id: impl Into<String>, removed: usize) -> Self {
        let id = id.into();
        Self {
            message: format!("Invalidated {} '{}'", resource, id),
            resource,
            id: Some(id),
            removed,
        }
    }

    /// Creates a response for a type-wide invalidation
    pub fn all(resource: ResourceType, removed: usize) -> Self {
        Self {
            message: format!("Invalidated all {} entries", resource),
            resource,
            id: None,
            removed,
        }
    }
}

/// Per-type counters in the metrics response
#[derive(Debug, Clone, Serialize)]
pub struct TypeMetricsResponse {
    pub resource: ResourceType,
    pub hits: u64,
    pub misses: u64,
    pub rate_limited: u64,
    pub revalidations: u64,
    pub hit_rate: f64,
}

impl From<&TypeStats> for TypeMetricsResponse {
    fn from(stats: &TypeStats) -> Self {
        Self {
            resource: stats.resource,
            hits: stats.hits,
            misses: stats.misses,
            rate_limited: stats.rate_limited,
            revalidations: stats.revalidations,
            hit_rate: stats.hit_rate(),
        }
    }
}

/// Response body for GET /metrics
#[derive(Debug, Clone, Serialize)]
pub struct MetricsResponse {
    /// Entries currently stored
    pub entries: usize,
    /// Total cache hits
    pub hits: u64,
    /// Total cache misses
    pub misses: u64,
    /// Total misses rejected by the rate limiter
    pub rate_limited: u64,
    /// Overall hit rate (0.0 to 1.0)
    pub hit_rate: f64,
    /// Counters per resource type that has seen traffic
    pub types: Vec<TypeMetricsResponse>,
}

impl MetricsResponse {
    /// Creates a MetricsResponse from a snapshot
    pub fn new(snapshot: &MetricsSnapshot, entries: usize) -> Self {
        Self {
            entries,
            hits: snapshot.hits,
            misses: snapshot.misses,
            rate_limited: snapshot.rate_limited,
            hit_rate: snapshot.hit_rate(),
            types: snapshot.types.iter().map(TypeMetricsResponse::from).collect(),
        }
    }
}

/// Response body for GET /health
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status ("healthy" or "closed")
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy() -> Self {
        Self::with_status("healthy")
    }

    /// Reported once the cache has been closed
    pub fn closed() -> Self {
        Self::with_status("closed")
    }

    fn with_status(status: &str) -> Self {
        Self {
            status: status.to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CacheMetrics, MetricsRecorder, Outcome};

    #[test]
    fn test_invalidate_one_response_serialize() {
        let resp = InvalidateResponse::one(ResourceType::Course, "c1", 2);
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains(r#""resource":"course""#));
        assert!(json.contains(r#""id":"c1""#));
        assert!(json.contains(r#""removed":2"#));
    }

    #[test]
    fn test_invalidate_all_response_omits_id() {
        let resp = InvalidateResponse::all(ResourceType::Forum, 0);
        let json = serde_json::to_string(&resp).unwrap();
        assert!(!json.contains(r#""id""#));
    }

    #[test]
    fn test_metrics_response_hit_rate() {
        let metrics = CacheMetrics::new();
        for _ in 0..4 {
            metrics.record(ResourceType::Course, Outcome::Hit);
        }
        metrics.record(ResourceType::Course, Outcome::Miss);

        let resp = MetricsResponse::new(&metrics.snapshot(), 1);
        assert!((resp.hit_rate - 0.8).abs() < 0.001);
        assert_eq!(resp.types.len(), 1);
        assert_eq!(resp.entries, 1);
    }

    #[test]
    fn test_metrics_response_zero_requests() {
        let resp = MetricsResponse::new(&CacheMetrics::new().snapshot(), 0);
        assert_eq!(resp.hit_rate, 0.0);
        assert!(resp.types.is_empty());
    }

    #[test]
    fn test_health_response_serialize() {
        let resp = HealthResponse::healthy();
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("healthy"));
        assert!(json.contains("timestamp"));
    }
}
