//! Error types for the resource cache
//!
//! Provides unified error handling using thiserror.

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for the cache layer.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Backing entry store failed
    #[error("Store error: {0}")]
    Store(String),

    /// Value could not be converted to or from its cached form
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid policy or environment configuration
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Caller exceeded its allowed miss rate
    #[error("Rate limit exceeded for `{identifier}`, retry after {retry_after_secs}s")]
    RateLimited {
        identifier: String,
        retry_after_secs: u64,
    },
}

// == IntoResponse Implementation ==
impl IntoResponse for CacheError {
    fn into_response(self) -> Response {
        let status = match &self {
            CacheError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            CacheError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            CacheError::Store(_) | CacheError::Serialization(_) | CacheError::Configuration(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        let retry_after = match &self {
            CacheError::RateLimited {
                retry_after_secs, ..
            } => Some(*retry_after_secs),
            _ => None,
        };

        let body = Json(json!({
            "error": self.to_string()
        }));

        let mut response = (status, body).into_response();
        if let Some(secs) = retry_after {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(secs));
        }
        response
    }
}

// == Limited Error ==
/// Outcome of a rate-limited read that did not produce a value.
///
/// Keeps the producer's own error type intact so business failures reach the
/// caller unchanged, while rate-limit rejections stay distinguishable.
#[derive(Error, Debug)]
pub enum LimitedError<E> {
    /// The identifier exhausted its window; the producer was not called
    #[error("Rate limit exceeded for `{identifier}`, retry after {retry_after_secs}s")]
    RateLimited {
        identifier: String,
        retry_after_secs: u64,
    },

    /// The producer failed
    #[error("{0}")]
    Producer(E),
}

impl<E> LimitedError<E> {
    /// Returns true if this is a rate-limit rejection.
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, LimitedError::RateLimited { .. })
    }

    /// Returns the producer error, if any.
    pub fn into_producer(self) -> Option<E> {
        match self {
            LimitedError::Producer(err) => Some(err),
            LimitedError::RateLimited { .. } => None,
        }
    }
}

impl<E: IntoResponse> IntoResponse for LimitedError<E> {
    fn into_response(self) -> Response {
        match self {
            LimitedError::RateLimited {
                identifier,
                retry_after_secs,
            } => CacheError::RateLimited {
                identifier,
                retry_after_secs,
            }
            .into_response(),
            LimitedError::Producer(err) => err.into_response(),
        }
    }
}

// == Result Type Alias ==
/// Convenience Result type for the cache layer.
pub type Result<T> = std::result::Result<T, CacheError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limited_maps_to_429_with_retry_after() {
        let response = CacheError::RateLimited {
            identifier: "rate-limit:search".to_string(),
            retry_after_secs: 42,
        }
        .into_response();

        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()[header::RETRY_AFTER], "42");
    }

    #[test]
    fn test_invalid_request_maps_to_400() {
        let response = CacheError::InvalidRequest("bad".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_limited_error_accessors() {
        let limited: LimitedError<String> = LimitedError::RateLimited {
            identifier: "x".to_string(),
            retry_after_secs: 1,
        };
        assert!(limited.is_rate_limited());
        assert!(limited.into_producer().is_none());

        let failed: LimitedError<String> = LimitedError::Producer("db down".to_string());
        assert!(!failed.is_rate_limited());
        assert_eq!(failed.to_string(), "db down");
        assert_eq!(failed.into_producer().as_deref(), Some("db down"));
    }
}
