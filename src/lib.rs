//! # friend-graph
//!
//! One-hop social graph acquisition over a remote friend API.
//!
//! Given a root identity (canonical 17-digit id or alias), the engine
//! answers one question:
//!
//! > Who is directly connected to this person, and what do their profiles say?
//!
//! ## Core Contract
//!
//! 1. Resolve the root to a canonical identity, fetch its connection list, then
//!    fetch the lists of its direct connections concurrently
//! 2. Batch-fetch profiles for every discovered identity in bounded, concurrent chunks
//! 3. Assemble a node/edge graph, labels, and per-identity connection views
//!
//! ## Architecture
//!
//! ```text
//! token → Identity::classify → RemoteClient ──→ Transport (HTTP or in-memory)
//!                                   │  ↑
//!                      TtlCache (responses, profiles)
//!                                   ↓
//!                        AcquisitionSession → build_graph / label_index
//! ```
//!
//! ## Determinism Guarantees
//!
//! - Same session state → identical graph and [`Graph::fingerprint`]
//! - Nodes ordered by identity, edge ids are `owner-target`
//! - Every identity appears at most once per session

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cache;
pub mod canonical;
pub mod error;
pub mod fanout;
pub mod graph;
pub mod remote;
pub mod session;
pub mod types;

#[cfg(feature = "service")]
pub mod service;

// Re-exports
pub use cache::{CacheConfig, CacheStats, Clock, ManualClock, SystemClock, TtlCache};
pub use canonical::Fingerprinter;
pub use error::{GraphError, RemoteError};
pub use fanout::Deadline;
pub use graph::{build_graph, label_for, label_index, Graph, GraphEdge, Node};
pub use remote::{
    chunk_ids, ApiMethod, ApiRequest, HttpTransport, InMemoryTransport, ProfileSink, RemoteClient,
    RemoteConfig, Transport, MAX_PROFILE_BATCH,
};
pub use session::{AcquisitionSession, FriendsOf, SUPPORTED_DEPTH};
pub use types::{
    FriendEdge, Identity, PersonaState, Profile, Relationship, UserId, UserRecord,
    ValidationError,
};

// Service re-exports (when service feature is enabled)
#[cfg(feature = "service")]
pub use service::{create_router, ServiceState};

/// Wire protocol version reported by the service health check.
pub const PROTOCOL_VERSION: &str = "1.0.0";
