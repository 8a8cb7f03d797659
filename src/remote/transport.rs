//! Transports that carry [`ApiRequest`]s to a friend API.

use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::config::RemoteConfig;
use super::request::{ApiMethod, ApiRequest};
use super::wire::{
    AliasBody, AliasResponse, FriendListBody, FriendListResponse, ProfileBody, ProfileResponse,
    WireFriend, ALIAS_NOT_FOUND, ALIAS_RESOLVED,
};
use crate::error::RemoteError;
use crate::types::{Profile, Relationship, UserId};

/// Issues one remote call and returns the raw response body.
///
/// Implementations must not cache; caching and call counting belong to
/// the client.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Execute a request.
    async fn execute(&self, request: &ApiRequest) -> Result<Vec<u8>, RemoteError>;
}

/// HTTP transport backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl HttpTransport {
    /// Create a transport from client configuration.
    pub fn new(config: &RemoteConfig) -> Result<Self, RemoteError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| RemoteError::Network(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self::with_client(client, config))
    }

    /// Create a transport around an existing client.
    pub fn with_client(client: reqwest::Client, config: &RemoteConfig) -> Self {
        Self {
            client,
            base_url: config.base_url.clone(),
            api_key: config.api_key.clone(),
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn execute(&self, request: &ApiRequest) -> Result<Vec<u8>, RemoteError> {
        let url = request.url(&self.base_url, &self.api_key)?;
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(RemoteError::Status(status.as_u16()));
        }

        let body = response.bytes().await?;
        Ok(body.to_vec())
    }
}

/// Scripted in-memory friend API for testing.
///
/// Serves aliases, connection lists and profiles from fixtures, records every
/// request it receives, and can be told to fail, stall or return garbage
/// for specific identities.
#[derive(Debug, Default)]
pub struct InMemoryTransport {
    aliases: BTreeMap<String, UserId>,
    friends: BTreeMap<UserId, Vec<WireFriend>>,
    profiles: BTreeMap<UserId, Profile>,
    failing: BTreeSet<UserId>,
    malformed: BTreeSet<UserId>,
    latency: Option<Duration>,
    delays: BTreeMap<UserId, Duration>,
    requests: Mutex<Vec<ApiRequest>>,
}

impl InMemoryTransport {
    /// Create a new empty transport.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an alias.
    pub fn add_alias(&mut self, alias: impl Into<String>, id: UserId) {
        self.aliases.insert(alias.into(), id);
    }

    /// Register a connection list. Every connection gets `friend_since = 0`.
    pub fn add_friends(&mut self, owner: UserId, friends: &[UserId]) {
        let list = friends
            .iter()
            .map(|id| WireFriend {
                user_id: id.clone(),
                relationship: Relationship::Friend,
                friend_since: 0,
            })
            .collect();
        self.friends.insert(owner, list);
    }

    /// Register a profile.
    pub fn add_profile(&mut self, profile: Profile) {
        self.profiles.insert(profile.user_id.clone(), profile);
    }

    /// Register a profile with just a display name.
    pub fn add_named_profile(&mut self, id: UserId, name: &str) {
        let mut profile = Profile::placeholder(id);
        profile.display_name = Some(name.to_string());
        self.add_profile(profile);
    }

    /// Make every request that mentions `id` fail with a network error.
    pub fn fail_on(&mut self, id: UserId) {
        self.failing.insert(id);
    }

    /// Make the connection list of `id` come back undecodable.
    pub fn malformed_on(&mut self, id: UserId) {
        self.malformed.insert(id);
    }

    /// Delay every response.
    pub fn set_latency(&mut self, latency: Duration) {
        self.latency = Some(latency);
    }

    /// Delay every request that mentions `id`. A request mentioning several
    /// delayed identities waits for the longest of their delays.
    pub fn delay_on(&mut self, id: UserId, delay: Duration) {
        self.delays.insert(id, delay);
    }

    fn delay_for(&self, request: &ApiRequest) -> Option<Duration> {
        Self::ids_in(request)
            .iter()
            .filter_map(|id| self.delays.get(id).copied())
            .chain(self.latency)
            .max()
    }

    /// All requests received so far, in arrival order.
    pub fn requests(&self) -> Vec<ApiRequest> {
        self.requests.lock().clone()
    }

    /// Number of requests received for one method.
    pub fn count(&self, method: ApiMethod) -> usize {
        self.requests
            .lock()
            .iter()
            .filter(|r| r.method() == method)
            .count()
    }

    fn ids_in(request: &ApiRequest) -> Vec<UserId> {
        request
            .param("steamid")
            .into_iter()
            .chain(request.param("steamids").into_iter().flat_map(|s| s.split(',')))
            .filter_map(UserId::parse)
            .collect()
    }

    fn respond(&self, request: &ApiRequest) -> Result<Vec<u8>, RemoteError> {
        let ids = Self::ids_in(request);
        if let Some(id) = ids.iter().find(|id| self.failing.contains(*id)) {
            return Err(RemoteError::Network(format!("connection reset while fetching {}", id)));
        }

        match request.method() {
            ApiMethod::ResolveAlias => {
                let alias = request.param("vanityurl").unwrap_or_default();
                let body = match self.aliases.get(alias) {
                    Some(id) => AliasBody {
                        success: ALIAS_RESOLVED,
                        user_id: Some(id.to_string()),
                        message: None,
                    },
                    None => AliasBody {
                        success: ALIAS_NOT_FOUND,
                        user_id: None,
                        message: Some("No match".to_string()),
                    },
                };
                Ok(serde_json::to_vec(&AliasResponse { response: body })?)
            }
            ApiMethod::FriendList => {
                let owner = ids
                    .first()
                    .ok_or_else(|| RemoteError::Status(400))?;
                if self.malformed.contains(owner) {
                    return Ok(b"<html>upstream error</html>".to_vec());
                }
                let friends = self.friends.get(owner).cloned().unwrap_or_default();
                Ok(serde_json::to_vec(&FriendListResponse {
                    friends_list: FriendListBody { friends },
                })?)
            }
            ApiMethod::ProfileSummaries => {
                let players = ids
                    .iter()
                    .rev()
                    .filter_map(|id| self.profiles.get(id).cloned())
                    .collect();
                Ok(serde_json::to_vec(&ProfileResponse {
                    response: ProfileBody { players },
                })?)
            }
        }
    }
}

#[async_trait]
impl Transport for InMemoryTransport {
    async fn execute(&self, request: &ApiRequest) -> Result<Vec<u8>, RemoteError> {
        self.requests.lock().push(request.clone());
        if let Some(delay) = self.delay_for(request) {
            tokio::time::sleep(delay).await;
        }
        self.respond(request)
    }
}
