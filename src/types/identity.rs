//! Identity types for the friend graph.
//!
//! Every user is keyed by a canonical identity: a 17 digit numeric string
//! with the fixed `765611` prefix. Anything else a caller hands us is an
//! alias that has to be resolved remotely before it can be used as a key.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

/// Prefix shared by every canonical identity.
pub const CANONICAL_PREFIX: &str = "765611";

/// Length of a canonical identity in characters.
pub const CANONICAL_LEN: usize = 17;

fn canonical_pattern() -> &'static regex_lite::Regex {
    static PATTERN: OnceLock<regex_lite::Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        regex_lite::Regex::new(r"^765611[0-9]{11}$").expect("canonical identity pattern is valid")
    })
}

/// Error raised when a token cannot be turned into a canonical identity.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// Empty or whitespace-only token.
    #[error("identity token is empty")]
    Empty,
    /// The remote service reported the alias as not resolvable.
    #[error("identity could not be resolved: {0}")]
    Unresolvable(String),
    /// Numeric token that is not in canonical form.
    #[error("numeric identity is not canonical: {0}")]
    NonCanonicalNumeric(String),
    /// Only one-hop expansion is supported.
    #[error("unsupported expansion depth {0} (only 1 is supported)")]
    UnsupportedDepth(u32),
}

/// Canonical user identity.
///
/// Implements `Ord` so session state and graph output iterate deterministically.
/// Deserialization validates the canonical form, so a malformed identity in a
/// remote payload surfaces as a decode error instead of a bogus map key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UserId(String);

impl UserId {
    /// Parse a canonical identity. Returns `None` for anything non-canonical.
    pub fn parse(token: &str) -> Option<Self> {
        if canonical_pattern().is_match(token) {
            Some(Self(token.to_string()))
        } else {
            None
        }
    }

    /// Canonical identity built from its 64-bit numeric form.
    pub fn from_u64(value: u64) -> Option<Self> {
        Self::parse(&value.to_string())
    }

    /// Get the identity as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for UserId {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if canonical_pattern().is_match(&value) {
            Ok(Self(value))
        } else {
            Err(format!("not a canonical identity: {:?}", value))
        }
    }
}

impl From<UserId> for String {
    fn from(id: UserId) -> Self {
        id.0
    }
}

impl AsRef<str> for UserId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Classification of a caller-supplied identity token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identity {
    /// Already canonical, usable as a key without a remote call.
    Canonical(UserId),
    /// Needs alias resolution.
    Alias(String),
}

impl Identity {
    /// Classify a raw token.
    ///
    /// Numeric tokens that are not canonical are rejected without a remote
    /// call; they are never sent to alias resolution.
    pub fn classify(token: &str) -> Result<Self, ValidationError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(ValidationError::Empty);
        }
        if let Some(id) = UserId::parse(token) {
            return Ok(Self::Canonical(id));
        }
        if token.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ValidationError::NonCanonicalNumeric(token.to_string()));
        }
        Ok(Self::Alias(token.to_string()))
    }
}
