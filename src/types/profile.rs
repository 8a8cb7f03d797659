//! Profile attributes for a single user.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use super::identity::UserId;

/// Presence state reported by the remote service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "u8", into = "u8")]
pub enum PersonaState {
    /// Offline or private.
    Offline,
    /// Online.
    Online,
    /// Busy.
    Busy,
    /// Away.
    Away,
    /// Snooze.
    Snooze,
    /// Looking to trade.
    LookingToTrade,
    /// Looking to play.
    LookingToPlay,
    /// Code this crate does not know about.
    Unknown(u8),
}

impl From<u8> for PersonaState {
    fn from(code: u8) -> Self {
        match code {
            0 => Self::Offline,
            1 => Self::Online,
            2 => Self::Busy,
            3 => Self::Away,
            4 => Self::Snooze,
            5 => Self::LookingToTrade,
            6 => Self::LookingToPlay,
            other => Self::Unknown(other),
        }
    }
}

impl From<PersonaState> for u8 {
    fn from(state: PersonaState) -> Self {
        match state {
            PersonaState::Offline => 0,
            PersonaState::Online => 1,
            PersonaState::Busy => 2,
            PersonaState::Away => 3,
            PersonaState::Snooze => 4,
            PersonaState::LookingToTrade => 5,
            PersonaState::LookingToPlay => 6,
            PersonaState::Unknown(code) => code,
        }
    }
}

impl Default for PersonaState {
    fn default() -> Self {
        Self::Offline
    }
}

/// Profile attributes keyed by canonical identity.
///
/// Attributes are sparse. A placeholder (discovered through a friend edge and
/// not yet resolved) carries only its identity. Field names follow the remote
/// wire format so the same struct decodes batch responses and serializes
/// back out to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    /// Canonical identity.
    #[serde(rename = "steamid")]
    pub user_id: UserId,
    /// Display name.
    #[serde(rename = "personaname", default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    /// Public profile URL.
    #[serde(rename = "profileurl", default, skip_serializing_if = "Option::is_none")]
    pub profile_url: Option<String>,
    /// Small avatar URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    /// Medium avatar URL.
    #[serde(rename = "avatarmedium", default, skip_serializing_if = "Option::is_none")]
    pub avatar_medium: Option<String>,
    /// Full-size avatar URL.
    #[serde(rename = "avatarfull", default, skip_serializing_if = "Option::is_none")]
    pub avatar_full: Option<String>,
    /// Presence state.
    #[serde(rename = "personastate", default, skip_serializing_if = "Option::is_none")]
    pub persona_state: Option<PersonaState>,
    /// Real name, when the user shares it.
    #[serde(rename = "realname", default, skip_serializing_if = "Option::is_none")]
    pub real_name: Option<String>,
    /// ISO country code, when the user shares it.
    #[serde(rename = "loccountrycode", default, skip_serializing_if = "Option::is_none")]
    pub country_code: Option<String>,
    /// Account creation time (unix seconds).
    #[serde(rename = "timecreated", default, skip_serializing_if = "Option::is_none")]
    pub time_created: Option<i64>,
}

impl Profile {
    /// Create a placeholder profile carrying only an identity.
    pub fn placeholder(user_id: UserId) -> Self {
        Self {
            user_id,
            display_name: None,
            profile_url: None,
            avatar: None,
            avatar_medium: None,
            avatar_full: None,
            persona_state: None,
            real_name: None,
            country_code: None,
            time_created: None,
        }
    }

    /// Whether this profile has not been resolved yet.
    pub fn is_placeholder(&self) -> bool {
        self.display_name.is_none()
            && self.profile_url.is_none()
            && self.avatar.is_none()
            && self.avatar_medium.is_none()
            && self.avatar_full.is_none()
            && self.persona_state.is_none()
    }

    /// Account creation time as a UTC timestamp.
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.time_created
            .and_then(|secs| Utc.timestamp_opt(secs, 0).single())
    }

    /// Display name, ignoring empty strings.
    pub fn name(&self) -> Option<&str> {
        self.display_name.as_deref().filter(|s| !s.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id() -> UserId {
        UserId::parse("76561197960287930").unwrap()
    }

    #[test]
    fn test_placeholder() {
        let profile = Profile::placeholder(id());
        assert!(profile.is_placeholder());
        assert!(profile.name().is_none());
    }

    #[test]
    fn test_decode_wire_profile() {
        let json = r#"{
            "steamid": "76561197960287930",
            "personaname": "Rabscuttle",
            "profileurl": "https://example.com/id/rabscuttle/",
            "avatarmedium": "https://example.com/a_medium.jpg",
            "personastate": 3,
            "realname": "Gabe",
            "loccountrycode": "US",
            "timecreated": 1063407589,
            "communityvisibilitystate": 3
        }"#;
        let profile: Profile = serde_json::from_str(json).unwrap();
        assert_eq!(profile.user_id, id());
        assert_eq!(profile.name(), Some("Rabscuttle"));
        assert_eq!(profile.persona_state, Some(PersonaState::Away));
        assert_eq!(profile.country_code.as_deref(), Some("US"));
        assert!(!profile.is_placeholder());
        assert_eq!(profile.created_at().unwrap().timestamp(), 1063407589);
    }

    #[test]
    fn test_unknown_persona_state_round_trips_code() {
        let state = PersonaState::from(42);
        assert_eq!(state, PersonaState::Unknown(42));
        assert_eq!(u8::from(state), 42);
    }

    #[test]
    fn test_placeholder_serializes_identity_only() {
        let json = serde_json::to_value(Profile::placeholder(id())).unwrap();
        assert_eq!(json, serde_json::json!({ "steamid": "76561197960287930" }));
    }
}
