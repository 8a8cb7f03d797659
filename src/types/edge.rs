//! Friend edge types.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use super::identity::UserId;

/// Relationship kind reported on a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Relationship {
    /// Mutual friendship.
    Friend,
    /// Anything else the remote side reports.
    #[serde(other)]
    Other,
}

impl Default for Relationship {
    fn default() -> Self {
        Self::Friend
    }
}

impl std::fmt::Display for Relationship {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Friend => write!(f, "friend"),
            Self::Other => write!(f, "other"),
        }
    }
}

/// Connection between two users, attached to the side it was fetched for.
///
/// The relationship itself is directionless; `owner` only records whose
/// connection list produced the edge.
/// Implements `Ord` for deterministic ordering: (owner, friend, since).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FriendEdge {
    /// Identity whose connection list contained this edge.
    pub owner: UserId,
    /// The connected identity.
    pub friend: UserId,
    /// Relationship kind.
    pub relationship: Relationship,
    /// Friends-since time (unix seconds).
    pub friend_since: i64,
}

impl FriendEdge {
    /// Create a new edge.
    pub fn new(owner: UserId, friend: UserId, relationship: Relationship, friend_since: i64) -> Self {
        Self {
            owner,
            friend,
            relationship,
            friend_since,
        }
    }

    /// Create a plain friendship edge.
    pub fn friend(owner: UserId, friend: UserId, friend_since: i64) -> Self {
        Self::new(owner, friend, Relationship::Friend, friend_since)
    }

    /// Friends-since as a UTC timestamp.
    pub fn since(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_opt(self.friend_since, 0).single()
    }

    /// Deterministic edge identifier: `owner-friend`.
    pub fn edge_id(&self) -> String {
        format!("{}-{}", self.owner, self.friend)
    }
}

impl PartialOrd for FriendEdge {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FriendEdge {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.owner
            .cmp(&other.owner)
            .then_with(|| self.friend.cmp(&other.friend))
            .then_with(|| self.friend_since.cmp(&other.friend_since))
            .then_with(|| self.relationship.cmp(&other.relationship))
    }
}
