//! Core types for the friend graph.

pub mod identity;
pub mod profile;
pub mod edge;
pub mod user;

pub use identity::{UserId, Identity, ValidationError, CANONICAL_PREFIX, CANONICAL_LEN};
pub use profile::{Profile, PersonaState};
pub use edge::{FriendEdge, Relationship};
pub use user::UserRecord;
