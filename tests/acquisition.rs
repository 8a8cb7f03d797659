//! Integration tests for one-hop acquisition.
//!
//! These tests drive the public API end to end against scripted
//! `InMemoryTransport` fixtures:
//! 1. Identity resolution and call accounting
//! 2. One-hop expansion boundary and connection fan-out
//! 3. Chunked profile resolution
//! 4. Cache TTL behaviour
//! 5. Graph assembly determinism
//! 6. Failure and deadline propagation

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use friend_graph::{
    build_graph, label_index, AcquisitionSession, ApiMethod, CacheConfig, Clock, GraphError,
    InMemoryTransport, ManualClock, Profile, ProfileSink, RemoteClient, RemoteConfig, RemoteError,
    Transport, UserId, ValidationError,
};

// ─────────────────────────────────────────────────────────────────────────────
// Test Helpers
// ─────────────────────────────────────────────────────────────────────────────

const BASE_ID: u64 = 76561197960265728;

fn uid(n: u64) -> UserId {
    UserId::from_u64(BASE_ID + n).unwrap()
}

struct Harness {
    session: AcquisitionSession,
    client: Arc<RemoteClient>,
    transport: Arc<InMemoryTransport>,
    clock: Arc<ManualClock>,
}

fn harness_with(transport: InMemoryTransport, config: RemoteConfig) -> Harness {
    let transport = Arc::new(transport);
    let clock = Arc::new(ManualClock::new());
    let client = Arc::new(RemoteClient::with_clock(
        config,
        Arc::clone(&transport) as Arc<dyn Transport>,
        Arc::clone(&clock) as Arc<dyn Clock>,
    ));
    Harness {
        session: AcquisitionSession::new(Arc::clone(&client)),
        client,
        transport,
        clock,
    }
}

fn harness(transport: InMemoryTransport) -> Harness {
    harness_with(transport, RemoteConfig::default())
}

/// A → [B, C], B → [A, D], C → [A], everyone named after their letter.
fn scenario() -> InMemoryTransport {
    let (a, b, c, d) = (uid(1), uid(2), uid(3), uid(4));
    let mut transport = InMemoryTransport::new();
    transport.add_alias("A", a.clone());
    transport.add_alias("B", b.clone());
    transport.add_alias("C", c.clone());
    transport.add_alias("D", d.clone());
    transport.add_friends(a.clone(), &[b.clone(), c.clone()]);
    transport.add_friends(b.clone(), &[a.clone(), d.clone()]);
    transport.add_friends(c.clone(), &[a.clone()]);
    for (id, name) in [(a, "A"), (b, "B"), (c, "C"), (d, "D")] {
        transport.add_named_profile(id, name);
    }
    transport
}

// ─────────────────────────────────────────────────────────────────────────────
// Identity Resolution
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_canonical_token_resolves_without_call() {
    let h = harness(InMemoryTransport::new());

    for _ in 0..3 {
        let id = h.client.resolve_identity(uid(7).as_str()).await.unwrap();
        assert_eq!(id, uid(7));
    }
    assert_eq!(h.client.call_count(), 0);
    assert!(h.transport.requests().is_empty());
}

#[tokio::test]
async fn test_unresolvable_alias_stops_expansion() {
    let h = harness(scenario());

    let err = h.session.expand("ghost", 1).await.unwrap_err();

    assert_eq!(
        err,
        GraphError::Validation(ValidationError::Unresolvable("ghost".to_string()))
    );
    assert_eq!(h.transport.requests().len(), 1);
    assert_eq!(h.transport.count(ApiMethod::ResolveAlias), 1);
    assert!(h.session.is_empty());
}

#[tokio::test]
async fn test_numeric_non_canonical_rejected_without_call() {
    let h = harness(scenario());

    let err = h.session.expand("12345", 1).await.unwrap_err();

    assert!(matches!(
        err,
        GraphError::Validation(ValidationError::NonCanonicalNumeric(_))
    ));
    assert_eq!(h.client.call_count(), 0);
}

// ─────────────────────────────────────────────────────────────────────────────
// One-Hop Expansion
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_expand_yields_n_plus_one_records() {
    let friends: Vec<UserId> = (2..=11).map(uid).collect();
    let mut transport = InMemoryTransport::new();
    transport.add_friends(uid(1), &friends);
    let h = harness(transport);

    let root = h.session.expand(uid(1).as_str(), 1).await.unwrap();

    assert_eq!(root, uid(1));
    let records = h.session.records();
    assert_eq!(records.len(), friends.len() + 1);
    // Root list plus one (empty) list per connection
    assert_eq!(h.transport.count(ApiMethod::FriendList), friends.len() + 1);
    assert!(records.values().all(|r| r.has_friends()));
}

#[tokio::test]
async fn test_second_hop_identities_stay_placeholders() {
    let friends: Vec<UserId> = (2..=11).map(uid).collect();
    let mut transport = InMemoryTransport::new();
    transport.add_friends(uid(1), &friends);
    for id in &friends {
        transport.add_friends(id.clone(), &[uid(99)]);
    }
    transport.add_friends(uid(99), &[uid(100)]);
    let h = harness(transport);

    h.session.expand(uid(1).as_str(), 1).await.unwrap();

    let records = h.session.records();
    assert_eq!(records.len(), friends.len() + 2);
    for id in &friends {
        assert!(records[id].has_friends(), "{} list should be fetched", id);
    }
    assert!(!records[&uid(99)].has_friends());
    assert!(!records.contains_key(&uid(100)));
    assert_eq!(h.transport.count(ApiMethod::FriendList), friends.len() + 1);
}

#[tokio::test]
async fn test_scenario_graph_and_friends_of() {
    let h = harness(scenario());
    let (a, b, c, d) = (uid(1), uid(2), uid(3), uid(4));

    let root = h.session.expand("A", 1).await.unwrap();
    h.session.resolve_profiles().await.unwrap();
    let graph = h.session.graph().unwrap();

    assert_eq!(root, a);
    assert_eq!(h.transport.count(ApiMethod::FriendList), 3);
    let nodes: BTreeSet<UserId> = graph.nodes.iter().map(|n| n.id.clone()).collect();
    assert_eq!(
        nodes,
        [a.clone(), b.clone(), c.clone(), d.clone()].into_iter().collect()
    );
    let edges: Vec<&str> = graph.edges.iter().map(|e| e.id.as_str()).collect();
    assert_eq!(
        edges,
        vec![
            format!("{}-{}", a, b),
            format!("{}-{}", a, c),
            format!("{}-{}", b, a),
            format!("{}-{}", b, d),
            format!("{}-{}", c, a),
        ]
    );

    // D is known only through B's list and is not expanded
    let records = h.session.records();
    assert!(records[&d].friends.is_none());
    assert_eq!(records[&d].profile.name(), Some("D"));

    let of_a = h.session.friends_of("A").await.unwrap();
    assert_eq!(of_a.profile.name(), Some("A"));
    let names: Vec<_> = of_a.friends.iter().filter_map(|p| p.name()).collect();
    assert_eq!(names, vec!["B", "C"]);
    assert!(of_a.connections_fetched);

    let of_b = h.session.friends_of("B").await.unwrap();
    let names: Vec<_> = of_b.friends.iter().filter_map(|p| p.name()).collect();
    assert_eq!(names, vec!["A", "D"]);
    assert!(of_b.connections_fetched);

    // D's own list was never fetched; B's edge to D is the only known connection.
    let of_d = h.session.friends_of("D").await.unwrap();
    assert_eq!(of_d.friends.len(), 1);
    assert_eq!(of_d.friends[0].user_id, b);
    assert!(!of_d.connections_fetched);
}

#[tokio::test]
async fn test_shared_connection_appears_once() {
    let h = harness(scenario());
    let d = uid(4);

    h.session.expand("A", 1).await.unwrap();
    h.session.expand("B", 1).await.unwrap();
    h.session.expand("C", 1).await.unwrap();
    h.session.resolve_profiles().await.unwrap();

    let records = h.session.records();
    assert_eq!(records.len(), 4);
    assert_eq!(records.keys().filter(|id| **id == d).count(), 1);

    let graph = build_graph(&records, &uid(1));
    let d_nodes = graph.nodes.iter().filter(|n| n.id == d).count();
    assert_eq!(d_nodes, 1);
}

#[tokio::test]
async fn test_repeat_expansion_fetches_only_missing_lists() {
    let h = harness(scenario());

    h.session.expand("A", 1).await.unwrap();
    let calls = h.client.call_count();

    // Alias cached and A, B, C populated; only D still lacks a list
    h.session.expand("A", 1).await.unwrap();
    assert_eq!(h.client.call_count(), calls + 1);
    assert!(h.session.records()[&uid(4)].has_friends());

    h.session.expand("A", 1).await.unwrap();
    assert_eq!(h.client.call_count(), calls + 1);
}

#[tokio::test]
async fn test_edge_count_matches_fetched_lists() {
    let h = harness(scenario());

    h.session.expand("A", 1).await.unwrap();

    let records = h.session.records();
    let expected: usize = records
        .values()
        .filter_map(|r| r.friends.as_ref())
        .map(Vec::len)
        .sum();
    let graph = build_graph(&records, &uid(1));
    assert_eq!(graph.edge_count(), expected);
    // A → [B, C], B → [A, D], C → [A]
    assert_eq!(expected, 5);
}

#[tokio::test]
async fn test_reset_between_traversals() {
    let h = harness(scenario());

    h.session.expand("A", 1).await.unwrap();
    h.session.reset();
    h.session.expand("C", 1).await.unwrap();

    let graph = h.session.graph().unwrap();
    assert_eq!(graph.root_id, uid(3));
    // C → [A], then A's list brings in B
    assert_eq!(graph.node_count(), 3);
    assert!(!graph.contains_node(&uid(4)));
}

// ─────────────────────────────────────────────────────────────────────────────
// Profile Resolution
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_250_profiles_take_three_calls() {
    let friends: Vec<UserId> = (2..=250).map(uid).collect();
    let mut transport = InMemoryTransport::new();
    transport.add_friends(uid(1), &friends);
    for n in 1..=250 {
        transport.add_named_profile(uid(n), &format!("user{}", n));
    }
    let h = harness(transport);

    h.session.expand(uid(1).as_str(), 1).await.unwrap();
    let profiles = h.session.resolve_profiles().await.unwrap();

    assert_eq!(profiles.len(), 250);
    assert!(profiles.iter().all(|p| !p.is_placeholder()));
    assert_eq!(h.transport.count(ApiMethod::ProfileSummaries), 3);

    let mut sizes: Vec<usize> = h
        .transport
        .requests()
        .iter()
        .filter(|r| r.method() == ApiMethod::ProfileSummaries)
        .filter_map(|r| r.param("steamids"))
        .map(|ids| ids.split(',').count())
        .collect();
    sizes.sort_unstable();
    assert_eq!(sizes, vec![50, 100, 100]);
}

#[tokio::test(start_paused = true)]
async fn test_slow_first_chunk_still_merges() {
    let friends: Vec<UserId> = (2..=250).map(uid).collect();
    let mut transport = InMemoryTransport::new();
    transport.add_friends(uid(1), &friends);
    for n in 1..=250 {
        transport.add_named_profile(uid(n), &format!("user{}", n));
    }
    // First chunk slowest, last chunk immediate
    transport.delay_on(uid(50), Duration::from_secs(3));
    transport.delay_on(uid(150), Duration::from_secs(2));
    let h = harness(transport);

    h.session.expand(uid(1).as_str(), 1).await.unwrap();
    let profiles = h.session.resolve_profiles().await.unwrap();

    assert_eq!(profiles.len(), 250);
    assert!(profiles.iter().all(|p| !p.is_placeholder()));
    assert_eq!(h.transport.count(ApiMethod::ProfileSummaries), 3);
    assert_eq!(h.session.records()[&uid(50)].profile.name(), Some("user50"));
}

#[tokio::test(start_paused = true)]
async fn test_chunks_land_in_completion_order() {
    let mut transport = InMemoryTransport::new();
    for n in 1..=250 {
        transport.add_named_profile(uid(n), &format!("user{}", n));
    }
    transport.delay_on(uid(50), Duration::from_secs(3));
    transport.delay_on(uid(150), Duration::from_secs(2));
    let h = harness(transport);

    let landed = Arc::new(Mutex::new(Vec::new()));
    let sink: ProfileSink = {
        let landed = Arc::clone(&landed);
        Arc::new(move |batch: Vec<Profile>| {
            if let Some(first) = batch.iter().map(|p| p.user_id.clone()).min() {
                landed.lock().push(first);
            }
        })
    };

    let ids: BTreeSet<UserId> = (1..=250).map(uid).collect();
    let merged = h
        .client
        .fetch_profiles_into(&ids, 100, h.client.deadline(), sink)
        .await
        .unwrap();

    assert_eq!(merged, 250);
    assert_eq!(*landed.lock(), vec![uid(201), uid(101), uid(1)]);
}

#[tokio::test]
async fn test_fetch_profiles_direct() {
    let mut transport = InMemoryTransport::new();
    for n in 1..=250 {
        transport.add_named_profile(uid(n), &format!("user{}", n));
    }
    let h = harness(transport);

    let ids: BTreeSet<UserId> = (1..=250).map(uid).collect();
    let profiles = h.client.fetch_profiles(&ids).await.unwrap();

    assert_eq!(profiles.len(), 250);
    assert_eq!(h.client.call_count(), 3);
    // Sorted by identity even though the transport answers in reverse
    assert!(profiles.windows(2).all(|w| w[0].user_id < w[1].user_id));
}

#[tokio::test]
async fn test_profile_cache_shared_across_sessions() {
    let h = harness(scenario());

    h.session.expand("A", 1).await.unwrap();
    h.session.resolve_profiles().await.unwrap();
    let profile_calls = h.transport.count(ApiMethod::ProfileSummaries);

    let second = AcquisitionSession::new(Arc::clone(&h.client));
    second.expand("A", 1).await.unwrap();
    let profiles = second.resolve_profiles().await.unwrap();

    assert_eq!(profiles.len(), 4);
    assert_eq!(h.transport.count(ApiMethod::ProfileSummaries), profile_calls);
}

#[tokio::test]
async fn test_labels_from_session_profiles() {
    let h = harness(scenario());

    h.session.expand("A", 1).await.unwrap();
    h.session.resolve_profiles().await.unwrap();
    let labels = label_index(&h.session.profiles());

    assert_eq!(labels.len(), 4);
    assert_eq!(labels[&uid(2)], "B");
    assert_eq!(labels[&uid(4)], "D");
}

// ─────────────────────────────────────────────────────────────────────────────
// Cache TTL
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_ttl_governs_call_count() {
    let mut config = RemoteConfig::default();
    config.response_cache = CacheConfig::with_ttl(Duration::from_secs(60));
    let h = harness_with(scenario(), config);

    h.client.fetch_connections(&uid(1)).await.unwrap();
    h.client.fetch_connections(&uid(1)).await.unwrap();
    assert_eq!(h.client.call_count(), 1);

    h.clock.advance(Duration::from_secs(59));
    h.client.fetch_connections(&uid(1)).await.unwrap();
    assert_eq!(h.client.call_count(), 1);

    h.clock.advance(Duration::from_secs(2));
    h.client.fetch_connections(&uid(1)).await.unwrap();
    assert_eq!(h.client.call_count(), 2);
}

#[tokio::test]
async fn test_purge_drops_expired_entries() {
    let h = harness(scenario());

    h.session.expand("A", 1).await.unwrap();
    h.session.resolve_profiles().await.unwrap();
    assert!(h.client.response_cache_stats().len > 0);

    h.clock.advance(Duration::from_secs(16 * 60));
    let removed = h.client.purge_expired();

    assert!(removed > 0);
    assert_eq!(h.client.response_cache_stats().len, 0);
    assert_eq!(h.client.profile_cache_stats().len, 0);
}

// ─────────────────────────────────────────────────────────────────────────────
// Determinism
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_graph_fingerprint_idempotent() {
    let h = harness(scenario());

    h.session.expand("A", 1).await.unwrap();
    h.session.resolve_profiles().await.unwrap();

    let first = h.session.graph().unwrap();
    let second = h.session.graph().unwrap();
    assert_eq!(first.fingerprint(), second.fingerprint());

    // Fresh session over the same cached data assembles the same graph
    let other = AcquisitionSession::new(Arc::clone(&h.client));
    other.expand("A", 1).await.unwrap();
    other.resolve_profiles().await.unwrap();
    assert_eq!(other.graph().unwrap().fingerprint(), first.fingerprint());
}

// ─────────────────────────────────────────────────────────────────────────────
// Failure Propagation
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_connection_failure_keeps_root() {
    let mut transport = scenario();
    transport.fail_on(uid(1));
    let h = harness(transport);

    let err = h.session.expand(uid(1).as_str(), 1).await.unwrap_err();

    assert!(matches!(err, GraphError::Remote(RemoteError::Network(_))));
    assert_eq!(h.session.len(), 1);
    assert!(!h.session.records()[&uid(1)].has_friends());
}

#[tokio::test]
async fn test_profile_chunk_failure_surfaces() {
    // D's list is never requested, so only its profile chunk fails
    let mut transport = scenario();
    transport.fail_on(uid(4));
    let mut config = RemoteConfig::default();
    config.chunk_size = 1;
    let h = harness_with(transport, config);

    h.session.expand("A", 1).await.unwrap();
    let err = h.session.resolve_profiles().await.unwrap_err();

    assert!(matches!(err, GraphError::Remote(RemoteError::Network(_))));
    // Nothing rolled back
    assert_eq!(h.session.len(), 4);
}

#[tokio::test]
async fn test_malformed_list_is_decode_error() {
    let mut transport = scenario();
    transport.malformed_on(uid(1));
    let h = harness(transport);

    let err = h.session.expand("A", 1).await.unwrap_err();
    assert_eq!(err.code(), "REMOTE_DECODE");
}

#[tokio::test(start_paused = true)]
async fn test_slow_remote_hits_deadline() {
    let mut transport = scenario();
    transport.set_latency(Duration::from_secs(30));
    let mut config = RemoteConfig::default();
    config.operation_timeout = Duration::from_secs(5);
    let h = harness_with(transport, config);

    let err = h.session.expand(uid(1).as_str(), 1).await.unwrap_err();

    assert!(matches!(
        err,
        GraphError::Remote(RemoteError::DeadlineExceeded(_))
    ));
    assert_eq!(err.code(), "REMOTE_DEADLINE");
    assert_eq!(h.session.len(), 1);
}
