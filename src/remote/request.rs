//! Remote API requests and their deterministic cache keys.

use std::collections::BTreeMap;
use std::fmt;

use crate::error::RemoteError;
use crate::types::UserId;

/// Remote operations used by the friend graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ApiMethod {
    /// Resolve an alias to a canonical identity.
    ResolveAlias,
    /// Fetch one identity's connection list.
    FriendList,
    /// Batch-fetch profile summaries.
    ProfileSummaries,
}

impl ApiMethod {
    /// Path of the method relative to the API base URL.
    pub fn path(&self) -> &'static str {
        match self {
            Self::ResolveAlias => "ISteamUser/ResolveVanityURL/v0001/",
            Self::FriendList => "ISteamUser/GetFriendList/v0001/",
            Self::ProfileSummaries => "ISteamUser/GetPlayerSummaries/v0002/",
        }
    }
}

impl fmt::Display for ApiMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ResolveAlias => write!(f, "resolve_alias"),
            Self::FriendList => write!(f, "friend_list"),
            Self::ProfileSummaries => write!(f, "profile_summaries"),
        }
    }
}

/// A single remote call: method plus query parameters.
///
/// Parameters live in a `BTreeMap` so the rendered key is sorted and
/// identical requests always produce identical cache keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiRequest {
    method: ApiMethod,
    params: BTreeMap<&'static str, String>,
}

impl ApiRequest {
    fn new(method: ApiMethod) -> Self {
        Self {
            method,
            params: BTreeMap::new(),
        }
    }

    fn param_value(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.params.insert(name, value.into());
        self
    }

    /// Alias resolution request.
    pub fn resolve_alias(alias: &str) -> Self {
        Self::new(ApiMethod::ResolveAlias).param_value("vanityurl", alias)
    }

    /// Connection list request.
    pub fn friend_list(id: &UserId) -> Self {
        Self::new(ApiMethod::FriendList)
            .param_value("steamid", id.as_str())
            .param_value("relationship", "friend")
    }

    /// Profile batch request. Identities are comma-joined in the given order.
    pub fn profile_summaries(ids: &[UserId]) -> Self {
        let joined = ids
            .iter()
            .map(UserId::as_str)
            .collect::<Vec<_>>()
            .join(",");
        Self::new(ApiMethod::ProfileSummaries).param_value("steamids", joined)
    }

    /// The remote method.
    pub fn method(&self) -> ApiMethod {
        self.method
    }

    /// Look up a query parameter.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    /// Deterministic cache key: method path plus sorted, joined parameters.
    pub fn cache_key(&self) -> String {
        let query = self
            .params
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join("&");
        format!("{}?{}", self.method.path(), query)
    }

    /// Fully-formed URL including the API key.
    pub fn url(&self, base_url: &str, api_key: &str) -> Result<reqwest::Url, RemoteError> {
        let endpoint = format!("{}/{}", base_url.trim_end_matches('/'), self.method.path());
        let params = std::iter::once(("key", api_key))
            .chain(self.params.iter().map(|(k, v)| (*k, v.as_str())));
        reqwest::Url::parse_with_params(&endpoint, params)
            .map_err(|e| RemoteError::Network(format!("invalid request URL {}: {}", endpoint, e)))
    }
}
