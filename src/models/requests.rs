//! Request DTOs for the cache admin API
//!
//! Defines the structure of incoming query strings.

use serde::Deserialize;

/// Query string for the invalidation endpoints (DELETE /cache/...)
///
/// # Fields
/// - `path`: Optional page path to re-render after invalidation
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InvalidateParams {
    /// Page to mark stale
    #[serde(default)]
    pub path: Option<String>,
}

impl InvalidateParams {
    /// Validates the request data
    ///
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self) -> Option<String> {
        match self.path.as_deref() {
            Some(path) if !path.starts_with('/') => {
                Some("Path must start with '/'".to_string())
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalidate_params_deserialize() {
        let params: InvalidateParams = serde_json::from_str(r#"{"path": "/courses/1"}"#).unwrap();
        assert_eq!(params.path.as_deref(), Some("/courses/1"));
    }

    #[test]
    fn test_invalidate_params_without_path() {
        let params: InvalidateParams = serde_json::from_str("{}").unwrap();
        assert!(params.path.is_none());
        assert!(params.validate().is_none());
    }

    #[test]
    fn test_validate_relative_path() {
        let params = InvalidateParams {
            path: Some("courses".to_string()),
        };
        assert!(params.validate().is_some());
    }
}
