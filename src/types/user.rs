//! User records held by an acquisition session.

use serde::{Deserialize, Serialize};

use super::edge::FriendEdge;
use super::identity::UserId;
use super::profile::Profile;

/// A profile paired with its connection list.
///
/// `friends` is `None` until this identity's own connection list has been
/// fetched, and is populated at most once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    /// Profile attributes (possibly a placeholder).
    pub profile: Profile,
    /// Connection list, once fetched.
    pub friends: Option<Vec<FriendEdge>>,
}

impl UserRecord {
    /// Create a placeholder record for an identity.
    pub fn placeholder(user_id: UserId) -> Self {
        Self {
            profile: Profile::placeholder(user_id),
            friends: None,
        }
    }

    /// Identity of this record.
    pub fn user_id(&self) -> &UserId {
        &self.profile.user_id
    }

    /// Whether the connection list has been fetched.
    pub fn has_friends(&self) -> bool {
        self.friends.is_some()
    }

    /// Populate the connection list. Returns `false` when it was already set.
    pub fn set_friends(&mut self, friends: Vec<FriendEdge>) -> bool {
        if self.friends.is_some() {
            return false;
        }
        self.friends = Some(friends);
        true
    }

    /// Replace the profile attributes, keeping the identity fixed.
    ///
    /// Profiles for a different identity are ignored.
    pub fn update_profile(&mut self, profile: Profile) -> bool {
        if profile.user_id != self.profile.user_id {
            return false;
        }
        self.profile = profile;
        true
    }
}
