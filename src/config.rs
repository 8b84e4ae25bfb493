//! Configuration Module
//!
//! Handles loading cache and admin server configuration from environment variables.

use std::env;

use crate::cache::{DEFAULT_NAMESPACE, DEFAULT_WARM_BATCH_SIZE};

/// Prefix of per-type TTL override variables, e.g. `CACHE_TTL_COURSE=120`.
pub const TTL_OVERRIDE_PREFIX: &str = "CACHE_TTL_";

/// Cache and server configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Namespace prefixed to every cache key
    pub namespace: String,
    /// Admin HTTP server port
    pub server_port: u16,
    /// Background expiry sweep interval in seconds
    pub cleanup_interval: u64,
    /// Ids fetched concurrently per warming batch
    pub warm_batch_size: usize,
    /// `(resource type, seconds)` TTL overrides, validated when the cache is built
    pub ttl_overrides: Vec<(String, u64)>,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_NAMESPACE` - Key namespace (default: edu)
    /// - `SERVER_PORT` - Admin HTTP server port (default: 3000)
    /// - `CLEANUP_INTERVAL` - Expiry sweep frequency in seconds (default: 60)
    /// - `WARM_BATCH_SIZE` - Warming batch size (default: 10)
    /// - `CACHE_TTL_<TYPE>` - TTL override in seconds for one resource type
    ///
    /// An override whose value does not parse is kept as `0` so that the TTL
    /// policy rejects it instead of it being silently ignored.
    pub fn from_env() -> Self {
        Self::from_vars(env::vars())
    }

    /// Builds a Config from an explicit set of variables.
    pub fn from_vars<I>(vars: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut config = Self::default();
        for (name, value) in vars {
            match name.as_str() {
                "CACHE_NAMESPACE" if !value.trim().is_empty() => {
                    config.namespace = value.trim().to_string();
                }
                "SERVER_PORT" => {
                    if let Ok(port) = value.parse() {
                        config.server_port = port;
                    }
                }
                "CLEANUP_INTERVAL" => {
                    if let Ok(interval) = value.parse() {
                        config.cleanup_interval = interval;
                    }
                }
                "WARM_BATCH_SIZE" => {
                    if let Ok(size) = value.parse() {
                        config.warm_batch_size = size;
                    }
                }
                _ => {
                    if let Some(resource) = name.strip_prefix(TTL_OVERRIDE_PREFIX) {
                        let secs = value.trim().parse().unwrap_or(0);
                        config
                            .ttl_overrides
                            .push((resource.to_ascii_lowercase(), secs));
                    }
                }
            }
        }
        config
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_string(),
            server_port: 3000,
            cleanup_interval: 60,
            warm_batch_size: DEFAULT_WARM_BATCH_SIZE,
            ttl_overrides: Vec::new(),
        }
    }
}
