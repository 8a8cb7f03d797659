//! Performance benchmarks for graph assembly and acquisition.
//!
//! Run with: `cargo bench --bench graph_assembly`
//!
//! ## Performance Targets
//!
//! | Operation | Target | Notes |
//! |-----------|--------|-------|
//! | build_graph (1k records) | <1ms | Pure transform |
//! | label_index (1k profiles) | <1ms | String formatting only |
//! | Cached expansion | <5ms | All responses served from cache |

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::collections::BTreeMap;
use std::sync::Arc;

use friend_graph::{
    build_graph, label_index, AcquisitionSession, FriendEdge, InMemoryTransport, Profile,
    RemoteClient, RemoteConfig, Transport, UserId, UserRecord,
};

const BASE_ID: u64 = 76561197960265728;

fn uid(n: u64) -> UserId {
    UserId::from_u64(BASE_ID + n).expect("bench ids are canonical")
}

fn named_profile(n: u64) -> Profile {
    let mut profile = Profile::placeholder(uid(n));
    profile.display_name = Some(format!("user{}", n));
    profile.real_name = Some(format!("Real {}", n));
    profile.country_code = Some("SE".to_string());
    profile
}

/// Root plus `n` connections, all profiles resolved.
fn make_records(n: u64) -> BTreeMap<UserId, UserRecord> {
    let mut records = BTreeMap::new();
    let mut root = UserRecord::placeholder(uid(0));
    root.update_profile(named_profile(0));
    root.set_friends((1..=n).map(|i| FriendEdge::friend(uid(0), uid(i), 0)).collect());
    records.insert(uid(0), root);

    for i in 1..=n {
        let mut record = UserRecord::placeholder(uid(i));
        record.update_profile(named_profile(i));
        records.insert(uid(i), record);
    }
    records
}

fn make_transport(n: u64) -> InMemoryTransport {
    let mut transport = InMemoryTransport::new();
    let friends: Vec<UserId> = (1..=n).map(uid).collect();
    transport.add_friends(uid(0), &friends);
    for i in 0..=n {
        transport.add_profile(named_profile(i));
    }
    transport
}

/// Benchmark graph assembly over pre-built records.
fn bench_build_graph(c: &mut Criterion) {
    let mut group = c.benchmark_group("build_graph");

    for n in [10, 100, 1_000] {
        let records = make_records(n);
        group.throughput(Throughput::Elements(n));
        group.bench_with_input(BenchmarkId::new("records", n), &records, |b, records| {
            b.iter(|| build_graph(black_box(records), &uid(0)))
        });
    }

    group.finish();
}

/// Benchmark label derivation.
fn bench_label_index(c: &mut Criterion) {
    let mut group = c.benchmark_group("label_index");

    for n in [100, 1_000] {
        let profiles: Vec<Profile> = (0..n).map(named_profile).collect();
        group.throughput(Throughput::Elements(n));
        group.bench_with_input(BenchmarkId::new("profiles", n), &profiles, |b, profiles| {
            b.iter(|| label_index(black_box(profiles)))
        });
    }

    group.finish();
}

/// Benchmark a full expansion once every response is cached.
fn bench_cached_expansion(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().expect("runtime");
    let mut group = c.benchmark_group("cached_expansion");

    for n in [100, 500] {
        let client = Arc::new(RemoteClient::new(
            RemoteConfig::default(),
            Arc::new(make_transport(n)) as Arc<dyn Transport>,
        ));

        // Warm both caches.
        rt.block_on(async {
            let session = AcquisitionSession::new(Arc::clone(&client));
            session.expand(uid(0).as_str(), 1).await.expect("warmup expand");
            session.resolve_profiles().await.expect("warmup profiles");
        });

        group.throughput(Throughput::Elements(n));
        group.bench_with_input(BenchmarkId::new("connections", n), &client, |b, client| {
            b.iter(|| {
                rt.block_on(async {
                    let session = AcquisitionSession::new(Arc::clone(client));
                    session.expand(uid(0).as_str(), 1).await.expect("expand");
                    session.resolve_profiles().await.expect("profiles");
                    session.graph()
                })
            })
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_build_graph,
    bench_label_index,
    bench_cached_expansion,
);

criterion_main!(benches);
