//! Service state management.
//!
//! One [`RemoteClient`] is shared by every connection; its caches and call
//! counter live as long as the process. Sessions are per connection and are
//! created by the websocket handler, not stored here.

use std::sync::Arc;

use crate::error::RemoteError;
use crate::remote::{HttpTransport, RemoteClient, RemoteConfig, Transport};

/// Default ceiling on issued remote calls.
pub const DEFAULT_CALL_CEILING: u64 = 100_000;

/// Shared service state.
#[derive(Debug, Clone)]
pub struct ServiceState {
    /// Process-wide remote client.
    pub client: Arc<RemoteClient>,
    call_ceiling: u64,
}

impl ServiceState {
    /// Create service state around an existing client.
    pub fn new(client: Arc<RemoteClient>, call_ceiling: u64) -> Self {
        Self {
            client,
            call_ceiling,
        }
    }

    /// Create service state with an explicit transport.
    pub fn with_transport(config: RemoteConfig, transport: Arc<dyn Transport>, call_ceiling: u64) -> Self {
        Self::new(Arc::new(RemoteClient::new(config, transport)), call_ceiling)
    }

    /// Create service state from environment variables.
    ///
    /// Reads [`RemoteConfig::from_env`] plus `CALL_CEILING`.
    pub fn from_env() -> Result<Self, RemoteError> {
        let config = RemoteConfig::from_env();
        let transport = HttpTransport::new(&config)?;
        let call_ceiling = std::env::var("CALL_CEILING")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_CALL_CEILING);

        Ok(Self::with_transport(config, Arc::new(transport), call_ceiling))
    }

    /// Ceiling on issued remote calls.
    pub fn call_ceiling(&self) -> u64 {
        self.call_ceiling
    }

    /// Whether new expansions should be refused.
    pub fn ceiling_reached(&self) -> bool {
        self.client.call_count() >= self.call_ceiling
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::InMemoryTransport;

    #[test]
    fn test_ceiling_zero_is_reached_immediately() {
        let state = ServiceState::with_transport(
            RemoteConfig::default(),
            Arc::new(InMemoryTransport::new()),
            0,
        );
        assert!(state.ceiling_reached());
    }

    #[test]
    fn test_ceiling_not_reached_on_fresh_client() {
        let state = ServiceState::with_transport(
            RemoteConfig::default(),
            Arc::new(InMemoryTransport::new()),
            DEFAULT_CALL_CEILING,
        );
        assert!(!state.ceiling_reached());
        assert_eq!(state.call_ceiling(), DEFAULT_CALL_CEILING);
    }
}
