//! Remote client for the friend API.
//!
//! ## Responsibilities
//!
//! - Resolve aliases to canonical identities
//! - Fetch connection lists and batch-fetch profiles in bounded, concurrent chunks
//! - Cache raw responses by request key and resolved profiles by identity,
//!   each with its own TTL
//! - Count every remote call actually issued (cache hits are free)
//!
//! The call counter is informational: refusing work once it crosses a
//! ceiling is the caller's job.

pub mod config;
pub mod request;
pub mod transport;
pub mod wire;

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;

use crate::cache::{CacheStats, Clock, SystemClock, TtlCache};
use crate::error::{GraphError, RemoteError};
use crate::fanout::{fork_join, Deadline};
use crate::types::{FriendEdge, Identity, Profile, UserId, ValidationError};

pub use config::{RemoteConfig, MAX_PROFILE_BATCH, DEFAULT_BASE_URL};
pub use request::{ApiMethod, ApiRequest};
pub use transport::{HttpTransport, InMemoryTransport, Transport};

/// Callback receiving each batch of profiles as it arrives.
pub type ProfileSink = Arc<dyn Fn(Vec<Profile>) + Send + Sync>;

/// Partition identities into ordered chunks of at most `chunk_size`.
///
/// `chunk_size` is clamped to `1..=MAX_PROFILE_BATCH`.
pub fn chunk_ids(ids: &BTreeSet<UserId>, chunk_size: usize) -> Vec<Vec<UserId>> {
    let size = chunk_size.clamp(1, MAX_PROFILE_BATCH);
    let ordered: Vec<UserId> = ids.iter().cloned().collect();
    ordered.chunks(size).map(<[UserId]>::to_vec).collect()
}

/// Client for the remote friend API.
///
/// Created once per process and shared by every session through an `Arc`;
/// its caches and call counter outlive any single session.
pub struct RemoteClient {
    transport: Arc<dyn Transport>,
    config: RemoteConfig,
    responses: TtlCache<String, Arc<[u8]>>,
    profiles: TtlCache<UserId, Profile>,
    calls: AtomicU64,
    limiter: Arc<Semaphore>,
}

impl RemoteClient {
    /// Create a client using the system clock.
    pub fn new(config: RemoteConfig, transport: Arc<dyn Transport>) -> Self {
        Self::with_clock(config, transport, Arc::new(SystemClock))
    }

    /// Create a client with an explicit cache clock.
    pub fn with_clock(config: RemoteConfig, transport: Arc<dyn Transport>, clock: Arc<dyn Clock>) -> Self {
        let responses = TtlCache::new(&config.response_cache, Arc::clone(&clock));
        let profiles = TtlCache::new(&config.profile_cache, clock);
        let limiter = Arc::new(Semaphore::new(config.max_concurrency.max(1)));
        Self {
            transport,
            config,
            responses,
            profiles,
            calls: AtomicU64::new(0),
            limiter,
        }
    }

    /// Create an HTTP-backed client from environment configuration.
    pub fn from_env() -> Result<Self, RemoteError> {
        let config = RemoteConfig::from_env();
        let transport = HttpTransport::new(&config)?;
        Ok(Self::new(config, Arc::new(transport)))
    }

    /// Client configuration.
    pub fn config(&self) -> &RemoteConfig {
        &self.config
    }

    /// Number of remote calls issued so far. Cache hits are not counted.
    pub fn call_count(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }

    /// Response cache statistics.
    pub fn response_cache_stats(&self) -> CacheStats {
        self.responses.stats()
    }

    /// Profile cache statistics.
    pub fn profile_cache_stats(&self) -> CacheStats {
        self.profiles.stats()
    }

    /// Start a deadline for one expansion or resolution.
    pub fn deadline(&self) -> Deadline {
        Deadline::after(self.config.operation_timeout)
    }

    pub(crate) fn limiter(&self) -> &Arc<Semaphore> {
        &self.limiter
    }

    /// Issue a request, answering from the response cache when possible.
    async fn get(&self, request: &ApiRequest) -> Result<Arc<[u8]>, RemoteError> {
        let key = request.cache_key();
        if let Some(body) = self.responses.get(&key) {
            tracing::debug!(method = %request.method(), "Response cache hit");
            return Ok(body);
        }

        self.calls.fetch_add(1, Ordering::SeqCst);
        let body: Arc<[u8]> = self.transport.execute(request).await?.into();
        self.responses.insert(key, Arc::clone(&body));
        tracing::debug!(method = %request.method(), bytes = body.len(), "Remote call completed");
        Ok(body)
    }

    /// Resolve a token to a canonical identity.
    ///
    /// Canonical tokens come back unchanged without a remote call. Aliases are
    /// resolved remotely; the not-found sentinel yields
    /// `ValidationError::Unresolvable`.
    pub async fn resolve_identity(&self, token: &str) -> Result<UserId, GraphError> {
        let alias = match Identity::classify(token)? {
            Identity::Canonical(id) => return Ok(id),
            Identity::Alias(alias) => alias,
        };

        let body = self.get(&ApiRequest::resolve_alias(&alias)).await?;
        let decoded: wire::AliasResponse = serde_json::from_slice(&body).map_err(RemoteError::from)?;

        if decoded.response.success == wire::ALIAS_NOT_FOUND {
            return Err(ValidationError::Unresolvable(alias).into());
        }
        let resolved = decoded.response.user_id.unwrap_or_default();
        UserId::parse(&resolved).ok_or_else(|| {
            RemoteError::Decode(format!(
                "alias {} resolved to non-canonical identity {:?} (success={})",
                alias, resolved, decoded.response.success
            ))
            .into()
        })
    }

    /// Fetch one identity's connection list.
    pub async fn fetch_connections(&self, id: &UserId) -> Result<Vec<FriendEdge>, RemoteError> {
        let body = self.get(&ApiRequest::friend_list(id)).await?;
        let decoded: wire::FriendListResponse = serde_json::from_slice(&body)?;
        Ok(decoded.into_edges(id))
    }

    /// Fetch one batch of profiles with a single remote call.
    ///
    /// Every returned profile refreshes the profile cache.
    pub async fn fetch_profile_chunk(&self, ids: &[UserId]) -> Result<Vec<Profile>, RemoteError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let body = self.get(&ApiRequest::profile_summaries(ids)).await?;
        let decoded: wire::ProfileResponse = serde_json::from_slice(&body)?;
        for profile in &decoded.response.players {
            self.profiles.insert(profile.user_id.clone(), profile.clone());
        }
        Ok(decoded.response.players)
    }

    /// Fetch profiles using the configured chunk size.
    pub async fn fetch_profiles(self: &Arc<Self>, ids: &BTreeSet<UserId>) -> Result<Vec<Profile>, RemoteError> {
        self.fetch_profiles_chunked(ids, self.config.chunk_size).await
    }

    /// Fetch profiles in chunks of at most `chunk_size` identities.
    ///
    /// Results are merged regardless of chunk completion order. Identities
    /// the remote side does not know are simply absent from the result.
    pub async fn fetch_profiles_chunked(
        self: &Arc<Self>,
        ids: &BTreeSet<UserId>,
        chunk_size: usize,
    ) -> Result<Vec<Profile>, RemoteError> {
        let merged = Arc::new(Mutex::new(Vec::with_capacity(ids.len())));
        let sink: ProfileSink = {
            let merged = Arc::clone(&merged);
            Arc::new(move |batch: Vec<Profile>| merged.lock().extend(batch))
        };
        self.fetch_profiles_into(ids, chunk_size, self.deadline(), sink).await?;

        let mut profiles = std::mem::take(&mut *merged.lock());
        profiles.sort_by(|a, b| a.user_id.cmp(&b.user_id));
        Ok(profiles)
    }

    /// Resolve profiles, handing every batch to `sink` as it completes.
    ///
    /// Fresh profile-cache entries are delivered first without a remote
    /// call. The rest are chunked and fetched concurrently under the client's
    /// concurrency limit and the given deadline. Returns the number of
    /// profiles delivered.
    pub async fn fetch_profiles_into(
        self: &Arc<Self>,
        ids: &BTreeSet<UserId>,
        chunk_size: usize,
        deadline: Deadline,
        sink: ProfileSink,
    ) -> Result<usize, RemoteError> {
        let mut hits = Vec::new();
        let mut misses = BTreeSet::new();
        for id in ids {
            match self.profiles.get(id) {
                Some(profile) => hits.push(profile),
                None => {
                    misses.insert(id.clone());
                }
            }
        }

        let cached = hits.len();
        if !hits.is_empty() {
            sink(hits);
        }

        let chunks = chunk_ids(&misses, chunk_size);
        tracing::debug!(
            requested = ids.len(),
            cached = cached,
            chunks = chunks.len(),
            "Resolving profiles"
        );

        let fetched = fork_join(chunks, &self.limiter, deadline, |chunk| {
            let client = Arc::clone(self);
            let sink = Arc::clone(&sink);
            async move {
                let batch = client.fetch_profile_chunk(&chunk).await?;
                let n = batch.len();
                sink(batch);
                Ok(n)
            }
        })
        .await?;

        Ok(cached + fetched.into_iter().sum::<usize>())
    }

    /// Drop every expired entry from both caches. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let responses = self.responses.purge_expired();
        let profiles = self.profiles.purge_expired();
        if responses + profiles > 0 {
            tracing::debug!(responses, profiles, "Evicted expired cache entries");
        }
        responses + profiles
    }

    /// Spawn the cache eviction scheduler.
    ///
    /// The task sweeps both caches every `eviction_interval` and exits once
    /// the client has been dropped.
    pub fn spawn_eviction(self: &Arc<Self>) -> JoinHandle<()> {
        let weak: Weak<Self> = Arc::downgrade(self);
        let period = self.config.eviction_interval.max(std::time::Duration::from_millis(10));
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                match weak.upgrade() {
                    Some(client) => {
                        client.purge_expired();
                    }
                    None => break,
                }
            }
        })
    }
}

impl std::fmt::Debug for RemoteClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteClient")
            .field("base_url", &self.config.base_url)
            .field("call_count", &self.call_count())
            .field("responses", &self.responses)
            .field("profiles", &self.profiles)
            .finish_non_exhaustive()
    }
}
