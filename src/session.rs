//! Acquisition session: one-hop expansion and profile resolution.
//!
//! A session owns the identity → record map for one client interaction.
//! It drives a shared [`RemoteClient`] through alias resolution, connection
//! fetches and batched profile fetches, and answers queries over what it has
//! accumulated.
//!
//! ## Merge Discipline
//!
//! The map sits behind one lock. Registering identities and updating
//! profiles are the only mutations, and each happens in a single critical
//! section, so a reader never sees a record mid-update. Network I/O always
//! happens outside the lock.
//!
//! ## Failure
//!
//! The first failing worker aborts its fan-out and becomes the operation's
//! error. Records merged before the failure stay in the map; nothing is
//! rolled back.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::error::GraphError;
use crate::fanout::{fork_join, Deadline};
use crate::graph::{build_graph, Graph};
use crate::remote::{ProfileSink, RemoteClient};
use crate::types::{FriendEdge, Profile, UserId, UserRecord, ValidationError};

/// Only supported expansion depth.
pub const SUPPORTED_DEPTH: u32 = 1;

type Records = Arc<Mutex<BTreeMap<UserId, UserRecord>>>;

/// Result of [`AcquisitionSession::friends_of`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FriendsOf {
    /// Profiles of known connections present in the session, ordered by identity.
    pub friends: Vec<Profile>,
    /// The requested identity's own profile.
    pub profile: Profile,
    /// Whether the identity's own connection list has been fetched.
    pub connections_fetched: bool,
}

/// Per-interaction orchestrator over a shared remote client.
pub struct AcquisitionSession {
    client: Arc<RemoteClient>,
    records: Records,
    root: Mutex<Option<UserId>>,
}

impl AcquisitionSession {
    /// Create an empty session bound to a client.
    pub fn new(client: Arc<RemoteClient>) -> Self {
        Self {
            client,
            records: Arc::new(Mutex::new(BTreeMap::new())),
            root: Mutex::new(None),
        }
    }

    /// The shared remote client.
    pub fn client(&self) -> &Arc<RemoteClient> {
        &self.client
    }

    /// Expand one hop around `root_token`.
    ///
    /// Resolves the root, registers it and fetches its connections. Every
    /// record still lacking a connection list is then fetched concurrently,
    /// which fills in the lists of the root's direct connections. Identities
    /// first seen in those lists are registered as placeholders and not
    /// fetched themselves. Only `depth == 1` is accepted.
    ///
    /// Returns the canonical root identity.
    pub async fn expand(&self, root_token: &str, depth: u32) -> Result<UserId, GraphError> {
        if depth != SUPPORTED_DEPTH {
            return Err(ValidationError::UnsupportedDepth(depth).into());
        }

        let started = Instant::now();
        let calls_before = self.client.call_count();
        let deadline = self.client.deadline();

        let root = deadline.run(self.client.resolve_identity(root_token)).await?;
        register(&self.records, std::slice::from_ref(&root));
        *self.root.lock() = Some(root.clone());

        let direct = self.fetch_missing(vec![root.clone()], deadline).await?;
        tracing::debug!(root = %root, connections = direct.len(), "Root connections merged");

        let pending: Vec<UserId> = self
            .records
            .lock()
            .values()
            .filter(|r| !r.has_friends())
            .map(|r| r.user_id().clone())
            .collect();
        let beyond = self.fetch_missing(pending, deadline).await?;

        let record_count = self.records.lock().len();
        tracing::info!(
            root = %root,
            records = record_count,
            beyond_hop = beyond.len(),
            remote_calls = self.client.call_count() - calls_before,
            latency_ms = started.elapsed().as_millis() as u64,
            "Expansion complete"
        );

        Ok(root)
    }

    /// Fetch and merge the connection lists of `ids` that have none yet.
    /// Returns identities registered for the first time.
    async fn fetch_missing(&self, ids: Vec<UserId>, deadline: Deadline) -> Result<Vec<UserId>, GraphError> {
        let pending: Vec<UserId> = {
            let records = self.records.lock();
            ids.into_iter()
                .filter(|id| records.get(id).map_or(false, |r| !r.has_friends()))
                .collect()
        };

        let discovered = fork_join(pending, self.client.limiter(), deadline, |id| {
            let client = Arc::clone(&self.client);
            let records = Arc::clone(&self.records);
            async move {
                let edges = client.fetch_connections(&id).await?;
                Ok(merge_connections(&records, &id, edges))
            }
        })
        .await?;

        Ok(discovered.into_iter().flatten().collect())
    }

    /// Resolve every placeholder profile in the session.
    ///
    /// Fresh profile-cache entries are used first; the rest are fetched in
    /// concurrent chunks and merged under the session lock as each chunk
    /// lands. Returns every profile now known, ordered by identity.
    pub async fn resolve_profiles(&self) -> Result<Vec<Profile>, GraphError> {
        let pending: BTreeSet<UserId> = self
            .records
            .lock()
            .values()
            .filter(|r| r.profile.is_placeholder())
            .map(|r| r.user_id().clone())
            .collect();

        if !pending.is_empty() {
            let started = Instant::now();
            let records = Arc::clone(&self.records);
            let sink: ProfileSink = Arc::new(move |batch: Vec<Profile>| {
                let mut records = records.lock();
                for profile in batch {
                    if let Some(record) = records.get_mut(&profile.user_id) {
                        record.update_profile(profile);
                    }
                }
            });

            let chunk_size = self.client.config().effective_chunk_size();
            let resolved = self
                .client
                .fetch_profiles_into(&pending, chunk_size, self.client.deadline(), sink)
                .await?;

            tracing::info!(
                pending = pending.len(),
                resolved,
                latency_ms = started.elapsed().as_millis() as u64,
                "Profile resolution complete"
            );
        }

        Ok(self.profiles())
    }

    /// Profiles of `token` and of its known connections.
    ///
    /// Connections are taken from both directions: edges in the identity's own
    /// list and edges other records hold that point at it. Only connections
    /// present in the session are returned. An identity whose own list was
    /// never fetched still gets the connections known from other records,
    /// with `connections_fetched` set to `false`.
    pub async fn friends_of(&self, token: &str) -> Result<FriendsOf, GraphError> {
        let id = self.client.deadline().run(self.client.resolve_identity(token)).await?;
        if !self.records.lock().contains_key(&id) {
            return Err(GraphError::NotFound(id));
        }

        self.resolve_profiles().await?;

        let records = self.records.lock();
        let record = records.get(&id).ok_or_else(|| GraphError::NotFound(id.clone()))?;

        let mut connected: BTreeSet<&UserId> = record
            .friends
            .iter()
            .flatten()
            .map(|edge| &edge.friend)
            .collect();
        connected.extend(
            records
                .values()
                .filter_map(|r| r.friends.as_ref())
                .flatten()
                .filter(|edge| edge.friend == id)
                .map(|edge| &edge.owner),
        );
        connected.remove(&id);

        let friends = connected
            .into_iter()
            .filter_map(|friend| records.get(friend))
            .map(|r| r.profile.clone())
            .collect();

        Ok(FriendsOf {
            friends,
            profile: record.profile.clone(),
            connections_fetched: record.has_friends(),
        })
    }

    /// Every profile known to the session, ordered by identity.
    pub fn profiles(&self) -> Vec<Profile> {
        self.records
            .lock()
            .values()
            .map(|r| r.profile.clone())
            .collect()
    }

    /// Snapshot of the identity → record map.
    pub fn records(&self) -> BTreeMap<UserId, UserRecord> {
        self.records.lock().clone()
    }

    /// Root of the most recent expansion.
    pub fn root(&self) -> Option<UserId> {
        self.root.lock().clone()
    }

    /// Assemble the graph for the most recent expansion.
    pub fn graph(&self) -> Option<Graph> {
        let root = self.root()?;
        Some(build_graph(&self.records.lock(), &root))
    }

    /// Number of records in the session.
    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    /// Check if the session holds no records.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Discard all session state before a new traversal.
    pub fn reset(&self) {
        self.records.lock().clear();
        *self.root.lock() = None;
    }
}

impl std::fmt::Debug for AcquisitionSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AcquisitionSession")
            .field("root", &self.root())
            .field("records", &self.len())
            .finish_non_exhaustive()
    }
}

/// Insert placeholders for unknown identities. Returns the newly inserted ones.
fn register(records: &Records, ids: &[UserId]) -> Vec<UserId> {
    let mut records = records.lock();
    ids.iter()
        .filter(|id| {
            if records.contains_key(*id) {
                return false;
            }
            records.insert((*id).clone(), UserRecord::placeholder((*id).clone()));
            true
        })
        .cloned()
        .collect()
}

/// Attach a fetched connection list to its owner and register every
/// connection, in one critical section. Returns newly registered identities.
fn merge_connections(records: &Records, owner: &UserId, edges: Vec<FriendEdge>) -> Vec<UserId> {
    let mut records = records.lock();
    let record = records
        .entry(owner.clone())
        .or_insert_with(|| UserRecord::placeholder(owner.clone()));
    if record.has_friends() {
        return Vec::new();
    }

    let friend_ids: Vec<UserId> = edges.iter().map(|e| e.friend.clone()).collect();
    record.set_friends(edges);

    let mut discovered = Vec::new();
    for id in friend_ids {
        if !records.contains_key(&id) {
            records.insert(id.clone(), UserRecord::placeholder(id.clone()));
            discovered.push(id);
        }
    }
    discovered
}
