//! Remote client configuration.
//!
//! All settings can be configured via environment variables:
//! - `FRIEND_API_KEY`: API key sent with every call
//! - `FRIEND_API_BASE_URL`: Base URL (default: http://api.steampowered.com)
//! - `RESPONSE_CACHE_TTL_SECS`: Response cache TTL (default: 900)
//! - `PROFILE_CACHE_TTL_SECS`: Profile cache TTL (default: 900)
//! - `CACHE_MAX_ENTRIES`: Entry bound per cache (default: 10000)
//! - `PROFILE_CHUNK_SIZE`: Identities per profile batch (default: 100)
//! - `MAX_CONCURRENCY`: Remote calls in flight per operation (default: 16)
//! - `REQUEST_TIMEOUT_SECS`: Per-call HTTP timeout (default: 10)
//! - `OPERATION_TIMEOUT_SECS`: Deadline for a whole expansion or resolution (default: 60)
//! - `EVICTION_INTERVAL_SECS`: Cache sweep period (default: 30)

use std::time::Duration;

use crate::cache::CacheConfig;

/// Largest batch the profile endpoint accepts.
pub const MAX_PROFILE_BATCH: usize = 100;

/// Default remote base URL.
pub const DEFAULT_BASE_URL: &str = "http://api.steampowered.com";

/// Configuration for [`RemoteClient`](super::RemoteClient).
#[derive(Debug, Clone)]
pub struct RemoteConfig {
    /// API key sent with every call.
    pub api_key: String,
    /// Base URL of the remote API.
    pub base_url: String,
    /// Response cache settings (keyed by request).
    pub response_cache: CacheConfig,
    /// Profile cache settings (keyed by identity).
    pub profile_cache: CacheConfig,
    /// Identities per profile batch call (clamped to 1..=100).
    pub chunk_size: usize,
    /// Maximum remote calls in flight for one fan-out.
    pub max_concurrency: usize,
    /// Per-call HTTP timeout.
    pub request_timeout: Duration,
    /// Deadline for a whole expansion or profile resolution.
    pub operation_timeout: Duration,
    /// Period of the background cache sweep.
    pub eviction_interval: Duration,
}

fn env_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

impl RemoteConfig {
    /// Load configuration from environment variables with production defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let max_entries = env_or("CACHE_MAX_ENTRIES", defaults.response_cache.max_entries);

        let api_key = std::env::var("FRIEND_API_KEY").unwrap_or_default();
        if api_key.is_empty() {
            tracing::warn!("FRIEND_API_KEY not set, remote calls will be unauthenticated");
        }

        Self {
            api_key,
            base_url: std::env::var("FRIEND_API_BASE_URL").unwrap_or(defaults.base_url),
            response_cache: CacheConfig {
                ttl: Duration::from_secs(env_or("RESPONSE_CACHE_TTL_SECS", 900)),
                max_entries,
                enabled: true,
            },
            profile_cache: CacheConfig {
                ttl: Duration::from_secs(env_or("PROFILE_CACHE_TTL_SECS", 900)),
                max_entries,
                enabled: true,
            },
            chunk_size: env_or("PROFILE_CHUNK_SIZE", defaults.chunk_size),
            max_concurrency: env_or("MAX_CONCURRENCY", defaults.max_concurrency),
            request_timeout: Duration::from_secs(env_or("REQUEST_TIMEOUT_SECS", 10)),
            operation_timeout: Duration::from_secs(env_or("OPERATION_TIMEOUT_SECS", 60)),
            eviction_interval: Duration::from_secs(env_or("EVICTION_INTERVAL_SECS", 30)),
        }
    }

    /// Chunk size clamped to what the profile endpoint accepts.
    pub fn effective_chunk_size(&self) -> usize {
        self.chunk_size.clamp(1, MAX_PROFILE_BATCH)
    }
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            response_cache: CacheConfig::default(),
            profile_cache: CacheConfig::default(),
            chunk_size: MAX_PROFILE_BATCH,
            max_concurrency: 16,
            request_timeout: Duration::from_secs(10),
            operation_timeout: Duration::from_secs(60),
            eviction_interval: Duration::from_secs(30),
        }
    }
}
