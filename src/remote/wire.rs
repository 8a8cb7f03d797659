//! Remote payload formats.
//!
//! Only the fields the graph needs are modelled; everything else in the
//! remote responses is ignored by serde.

use serde::{Deserialize, Serialize};

use crate::types::{FriendEdge, Profile, Relationship, UserId};

/// `success` value the remote service uses for "no match".
pub const ALIAS_NOT_FOUND: i32 = 42;

/// `success` value for a resolved alias.
pub const ALIAS_RESOLVED: i32 = 1;

/// Alias resolution response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AliasResponse {
    /// Response envelope.
    pub response: AliasBody,
}

/// Body of an alias resolution response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AliasBody {
    /// Status code (1 = resolved, 42 = not found).
    pub success: i32,
    /// Resolved identity, present on success.
    #[serde(rename = "steamid", default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    /// Diagnostic message, present on failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Connection list response.
///
/// Private lists come back as `{}`; the defaults decode that as empty.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FriendListResponse {
    /// Response envelope.
    #[serde(rename = "friendslist", default)]
    pub friends_list: FriendListBody,
}

/// Body of a connection list response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FriendListBody {
    /// Connections in remote order.
    #[serde(default)]
    pub friends: Vec<WireFriend>,
}

/// One `{identity, relationship, friendSince}` triple.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireFriend {
    /// Connected identity.
    #[serde(rename = "steamid")]
    pub user_id: UserId,
    /// Relationship kind.
    #[serde(default)]
    pub relationship: Relationship,
    /// Friends-since time (unix seconds).
    #[serde(default)]
    pub friend_since: i64,
}

impl FriendListResponse {
    /// Convert to edges owned by `owner`.
    pub fn into_edges(self, owner: &UserId) -> Vec<FriendEdge> {
        self.friends_list
            .friends
            .into_iter()
            .map(|f| FriendEdge::new(owner.clone(), f.user_id, f.relationship, f.friend_since))
            .collect()
    }
}

/// Profile batch response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileResponse {
    /// Response envelope.
    pub response: ProfileBody,
}

/// Body of a profile batch response. Order does not follow the request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileBody {
    /// Profiles found.
    #[serde(default)]
    pub players: Vec<Profile>,
}
