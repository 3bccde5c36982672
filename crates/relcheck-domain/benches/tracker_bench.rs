//! Benchmarks for the path tracker and the resolver ring.
//!
//! Run with: cargo bench -p relcheck-domain --bench tracker_bench
//!
//! These benchmarks measure:
//! - Hit recording on a hot path and across many scopes
//! - Flush cost for a populated tracker
//! - A full check through cycle detection, tracking and local evaluation

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use tokio::runtime::Runtime;

use relcheck_domain::error::{DomainError, DomainResult};
use relcheck_domain::model::{RelationDefinition, TupleKey, Userset};
use relcheck_domain::resolver::{
    CheckContext, CheckResolver, CycleDetectionCheckResolver, LocalChecker, ModelReader,
    RequestMetadata, ResolveCheckRequest, StoredTupleRef, TrackerConfig, TrackingCheckResolver,
    TupleReader,
};

// =============================================================================
// Benchmark-specific readers
// =============================================================================

/// Group chain: group:i member group:(i+1)#member, last group holds user:jon.
struct ChainTupleReader {
    tuples: HashMap<String, Vec<StoredTupleRef>>,
}

impl ChainTupleReader {
    fn new(length: usize) -> Self {
        let mut tuples = HashMap::new();
        for i in 0..length {
            tuples.insert(
                format!("group:{i}:member"),
                vec![StoredTupleRef::new(
                    "group",
                    (i + 1).to_string(),
                    Some("member".to_string()),
                )],
            );
        }
        tuples.insert(
            format!("group:{length}:member"),
            vec![StoredTupleRef::new("user", "jon", None)],
        );
        Self { tuples }
    }
}

#[async_trait]
impl TupleReader for ChainTupleReader {
    async fn read_tuples(
        &self,
        _store_id: &str,
        object_type: &str,
        object_id: &str,
        relation: &str,
    ) -> DomainResult<Vec<StoredTupleRef>> {
        let key = format!("{object_type}:{object_id}:{relation}");
        Ok(self.tuples.get(&key).cloned().unwrap_or_default())
    }
}

struct GroupModelReader;

#[async_trait]
impl ModelReader for GroupModelReader {
    async fn get_relation_definition(
        &self,
        _store_id: &str,
        _authorization_model_id: &str,
        type_name: &str,
        relation: &str,
    ) -> DomainResult<RelationDefinition> {
        if type_name != "group" || relation != "member" {
            return Err(DomainError::RelationNotFound {
                type_name: type_name.to_string(),
                relation: relation.to_string(),
            });
        }
        Ok(RelationDefinition {
            name: "member".to_string(),
            type_constraints: vec!["user".to_string(), "group#member".to_string()],
            rewrite: Userset::This,
        })
    }
}

fn idle_config() -> TrackerConfig {
    TrackerConfig::default().with_flush_interval(Duration::from_secs(3600))
}

fn request(store_id: &str, object: &str, user: &str) -> ResolveCheckRequest {
    ResolveCheckRequest::new(
        store_id,
        "model",
        TupleKey::new(object, "member", user),
        RequestMetadata::new(25),
    )
}

// =============================================================================
// Benchmarks
// =============================================================================

fn record_hit_benchmark(c: &mut Criterion) {
    let rt = Runtime::new().expect("runtime");
    let mut group = c.benchmark_group("tracker_record_hit");
    group.throughput(Throughput::Elements(1));

    let tracker = rt.block_on(async { TrackingCheckResolver::new(idle_config()) });

    let hot = request("store", "group:1", "user:jon");
    group.bench_function("hot_path", |b| {
        b.iter(|| tracker.record_hit(black_box(&hot)))
    });

    for scopes in [10usize, 1_000] {
        let requests: Vec<_> = (0..scopes)
            .map(|_| request(&ulid::Ulid::new().to_string(), "group:1", "group:2#member"))
            .collect();
        group.bench_with_input(BenchmarkId::new("scopes", scopes), &requests, |b, requests| {
            let mut next = 0;
            b.iter(|| {
                tracker.record_hit(black_box(&requests[next % requests.len()]));
                next += 1;
            })
        });
    }

    group.finish();
    rt.block_on(tracker.close());
}

fn flush_benchmark(c: &mut Criterion) {
    let rt = Runtime::new().expect("runtime");
    let mut group = c.benchmark_group("tracker_flush");

    for paths in [100usize, 10_000] {
        let requests: Vec<_> = (0..paths)
            .map(|i| {
                ResolveCheckRequest::new(
                    "store",
                    "model",
                    TupleKey::new(format!("type{i}:1"), "member", "user:jon"),
                    RequestMetadata::new(25),
                )
            })
            .collect();

        group.throughput(Throughput::Elements(paths as u64));
        group.bench_with_input(BenchmarkId::new("forced", paths), &requests, |b, requests| {
            let tracker = rt.block_on(async {
                TrackingCheckResolver::new(idle_config().with_log_limit(0.0, 0))
            });
            b.iter(|| {
                for request in requests {
                    tracker.record_hit(request);
                }
                black_box(tracker.flush_scopes(true))
            });
            rt.block_on(tracker.close());
        });
    }

    group.finish();
}

fn ring_check_benchmark(c: &mut Criterion) {
    let rt = Runtime::new().expect("runtime");
    let mut group = c.benchmark_group("ring_check");

    for length in [1usize, 10] {
        let (entry, tracker, local) = rt.block_on(async {
            let entry = Arc::new(CycleDetectionCheckResolver::new());
            let tracker = Arc::new(TrackingCheckResolver::new(idle_config()));
            let local = Arc::new(LocalChecker::new(
                Arc::new(ChainTupleReader::new(length)),
                Arc::new(GroupModelReader),
            ));
            entry.set_delegate(Arc::clone(&tracker) as Arc<dyn CheckResolver>);
            tracker.set_delegate(Arc::clone(&local) as Arc<dyn CheckResolver>);
            local.set_delegate(Arc::clone(&entry) as Arc<dyn CheckResolver>);
            (entry, tracker, local)
        });

        group.bench_with_input(BenchmarkId::new("chain", length), &length, |b, _| {
            b.to_async(&rt).iter(|| async {
                let response = entry
                    .resolve_check(&CheckContext::new(), &request("store", "group:0", "user:jon"))
                    .await
                    .expect("check");
                black_box(response.allowed)
            })
        });

        rt.block_on(async {
            entry.close().await;
            tracker.close().await;
            local.close().await;
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    record_hit_benchmark,
    flush_benchmark,
    ring_check_benchmark
);
criterion_main!(benches);
