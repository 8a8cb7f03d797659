//! Graph assembly from session state.
//!
//! Pure transforms with no state of their own:
//!
//! - [`build_graph`] turns an identity → record map into nodes and edges
//! - [`label_index`] derives human-readable labels from profiles
//!
//! ## Determinism Guarantees
//!
//! - Nodes are ordered by identity (the map is a `BTreeMap`)
//! - Edges follow node order, then the owner's connection list order
//! - Edge IDs are `owner-target`, so assembling the same state twice yields
//!   identical IDs and an identical [`Graph::fingerprint`]

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::canonical::Fingerprinter;
use crate::types::{Profile, UserId, UserRecord};

/// Graph node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    /// Canonical identity.
    pub id: UserId,
    /// Derived label, or the bare identity when no display name is known.
    pub label: String,
}

/// Graph edge, one per fetched friend edge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphEdge {
    /// `source-target`.
    pub id: String,
    /// Owner of the connection list the edge came from.
    pub source: UserId,
    /// Connected identity.
    pub target: UserId,
}

/// Node/edge graph rooted at one identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Graph {
    /// One node per record.
    pub nodes: Vec<Node>,
    /// One edge per friend edge of records whose connections were fetched.
    pub edges: Vec<GraphEdge>,
    /// Root identity, carried for rendering.
    pub root_id: UserId,
}

impl Graph {
    /// Number of nodes.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of edges.
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Whether a node exists for `id`.
    pub fn contains_node(&self, id: &UserId) -> bool {
        self.nodes.iter().any(|n| &n.id == id)
    }

    /// Deterministic fingerprint of the whole graph.
    ///
    /// Covers the root, every node with its label, and every edge.
    pub fn fingerprint(&self) -> String {
        let mut fp = Fingerprinter::new("graph");
        fp.field(self.root_id.as_str()).count(self.nodes.len());
        for node in &self.nodes {
            fp.field(node.id.as_str()).field(&node.label);
        }
        fp.count(self.edges.len());
        for edge in &self.edges {
            fp.field(&edge.id);
        }
        fp.finish_hex()
    }
}

/// Build the graph for a set of records.
pub fn build_graph(records: &BTreeMap<UserId, UserRecord>, root_id: &UserId) -> Graph {
    let mut nodes = Vec::with_capacity(records.len());
    let mut edges = Vec::new();

    for (id, record) in records {
        nodes.push(Node {
            id: id.clone(),
            label: label_for(&record.profile).unwrap_or_else(|| id.to_string()),
        });

        let Some(friends) = &record.friends else {
            continue;
        };
        edges.extend(friends.iter().map(|edge| GraphEdge {
            id: edge.edge_id(),
            source: edge.owner.clone(),
            target: edge.friend.clone(),
        }));
    }

    Graph {
        nodes,
        edges,
        root_id: root_id.clone(),
    }
}

/// Label for a profile: display name, then `(real name)`, then `(country)`.
///
/// `None` when there is no display name.
pub fn label_for(profile: &Profile) -> Option<String> {
    let mut label = profile.name()?.to_string();
    if let Some(real_name) = profile.real_name.as_deref().filter(|s| !s.is_empty()) {
        label.push_str(&format!(" ({})", real_name));
    }
    if let Some(country) = profile.country_code.as_deref().filter(|s| !s.is_empty()) {
        label.push_str(&format!(" ({})", country));
    }
    Some(label)
}

/// Labels keyed by identity. Profiles without a display name are omitted.
pub fn label_index<'a>(profiles: impl IntoIterator<Item = &'a Profile>) -> BTreeMap<UserId, String> {
    profiles
        .into_iter()
        .filter_map(|p| label_for(p).map(|label| (p.user_id.clone(), label)))
        .collect()
}
