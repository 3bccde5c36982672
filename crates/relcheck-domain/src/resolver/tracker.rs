//! Path-tracking stage of the resolver ring.
//!
//! Every check that passes through records the edge it traverses, keyed as
//! `{objectType}#{relation}@{userKind}`, in a per (store, model) scope.
//! A background task periodically evicts paths older than the tracker
//! interval and logs their hit counts through a shared token bucket.
//!
//! # Design
//!
//! - **Sharded maps**: scopes and paths live in `DashMap`s, so unrelated
//!   paths never contend on one lock. Node creation goes through the entry
//!   API, so two first touches of a path cannot create two nodes.
//! - **Time-of-flush eviction**: nodes are never refreshed. A node is
//!   removed by the first flush that finds it expired, whether or not its
//!   diagnostic was emitted. The limiter bounds log volume only.
//! - **Joined shutdown**: `close` cancels the lifetime token and awaits the
//!   flush task's `JoinHandle`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn, Dispatch};

use crate::error::DomainResult;
use crate::model::{is_typed_wildcard, is_userset, type_of, TupleKey};

use super::config::TrackerConfig;
use super::context::CheckContext;
use super::delegate::DelegateSlot;
use super::limiter::LogLimiter;
use super::traits::CheckResolver;
use super::types::{ResolveCheckRequest, ResolveCheckResponse};

/// User kind recorded for usersets and typed wildcards.
pub const USERSET_KIND: &str = "userset";

/// Returns `"userset"` for `type:id#relation` and `type:*` references,
/// otherwise the bare user type.
pub fn user_kind(user: &str) -> &str {
    if is_userset(user) || is_typed_wildcard(user) {
        USERSET_KIND
    } else {
        type_of(user)
    }
}

/// Builds the tracked path for a tuple key: `{objectType}#{relation}@{userKind}`.
pub fn path_key(tuple_key: &TupleKey) -> String {
    format!(
        "{}#{}@{}",
        tuple_key.object_type(),
        tuple_key.relation,
        user_kind(&tuple_key.user)
    )
}

/// One tracking scope.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct TrackerKey {
    pub(crate) store: String,
    pub(crate) model: String,
}

impl TrackerKey {
    pub(crate) fn for_request(request: &ResolveCheckRequest) -> Self {
        Self {
            store: request.store_id.clone(),
            model: request.authorization_model_id.clone(),
        }
    }
}

/// A tracked path: when it was first seen and how often since.
#[derive(Debug)]
pub(crate) struct ResolutionNode {
    created: Instant,
    hits: AtomicU64,
}

impl ResolutionNode {
    /// A node for a path traversed for the first time at `created`.
    pub(crate) fn new(created: Instant) -> Self {
        Self {
            created,
            hits: AtomicU64::new(1),
        }
    }

    fn hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub(crate) fn is_expired(&self, now: Instant, window: Duration) -> bool {
        now.saturating_duration_since(self.created) > window
    }
}

pub(crate) type PathMap = DashMap<String, ResolutionNode>;

/// Counts one traversal of `path`, creating its node on first touch.
fn touch(paths: &PathMap, path: String) {
    if let Some(node) = paths.get(&path) {
        node.hit();
        return;
    }

    match paths.entry(path) {
        Entry::Occupied(entry) => entry.get().hit(),
        Entry::Vacant(entry) => {
            entry.insert(ResolutionNode::new(Instant::now()));
        }
    };
}

/// Outcome of one flush pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushReport {
    /// Nodes removed from their scope.
    pub flushed: usize,
    /// Diagnostics actually emitted.
    pub logged: usize,
}

/// State shared between the resolver and its flush task.
pub(crate) struct TrackerState {
    pub(crate) scopes: DashMap<TrackerKey, Arc<PathMap>>,
    pub(crate) limiter: LogLimiter,
    pub(crate) tracker_interval: Duration,
    dispatch: Option<Dispatch>,
}

impl TrackerState {
    /// The scope guard stays held while its path map is touched: pruning an
    /// empty scope needs the write side of the same shard.
    fn record_hit(&self, request: &ResolveCheckRequest) {
        let key = TrackerKey::for_request(request);
        let path = path_key(&request.tuple_key);

        if let Some(paths) = self.scopes.get(&key) {
            touch(paths.value(), path);
            return;
        }

        match self.scopes.entry(key) {
            Entry::Occupied(entry) => touch(entry.get(), path),
            Entry::Vacant(entry) => {
                let paths = PathMap::new();
                paths.insert(path, ResolutionNode::new(Instant::now()));
                entry.insert(Arc::new(paths));
            }
        }
    }

    fn flush(&self, force: bool) -> FlushReport {
        let now = Instant::now();
        let window = self.tracker_interval;
        let selected = |node: &ResolutionNode| force || node.is_expired(now, window);

        let scopes: Vec<(TrackerKey, Arc<PathMap>)> = self
            .scopes
            .iter()
            .map(|entry| (entry.key().clone(), Arc::clone(entry.value())))
            .collect();

        let mut report = FlushReport::default();
        for (key, paths) in scopes {
            // Collect first: removing while iterating a DashMap deadlocks.
            let expired: Vec<String> = paths
                .iter()
                .filter(|entry| selected(entry.value()))
                .map(|entry| entry.key().clone())
                .collect();

            for path in expired {
                let Some((path, node)) = paths.remove_if(&path, |_, node| selected(node)) else {
                    continue;
                };
                report.flushed += 1;
                if self.limiter.allow() {
                    self.emit(&key, &path, node.hits());
                    report.logged += 1;
                }
            }

            self.scopes.remove_if(&key, |_, paths| paths.is_empty());
        }
        report
    }

    fn emit(&self, key: &TrackerKey, path: &str, hits: u64) {
        let log = || {
            info!(
                store_id = %key.store,
                authorization_model_id = %key.model,
                path = %path,
                hits,
                "execution path hits"
            )
        };
        match &self.dispatch {
            Some(dispatch) => tracing::dispatcher::with_default(dispatch, log),
            None => log(),
        }
    }
}

/// Records every traversed path, then delegates unchanged.
///
/// The decision and any error from the delegate are returned verbatim.
pub struct TrackingCheckResolver {
    state: Arc<TrackerState>,
    delegate: DelegateSlot,
    lifetime: CancellationToken,
    flush_interval: Duration,
    flush_task: Mutex<Option<JoinHandle<()>>>,
}

impl TrackingCheckResolver {
    /// Creates the resolver and starts its background flush.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(config: TrackerConfig) -> Self {
        let lifetime = config
            .lifetime
            .as_ref()
            .map_or_else(CancellationToken::new, CancellationToken::child_token);

        let tracker = Self {
            state: Arc::new(TrackerState {
                scopes: DashMap::new(),
                limiter: LogLimiter::new(config.log_rate, config.log_burst),
                tracker_interval: config.tracker_interval,
                dispatch: config.dispatch,
            }),
            delegate: DelegateSlot::new("tracking resolver"),
            lifetime,
            flush_interval: config.flush_interval.max(Duration::from_millis(1)),
            flush_task: Mutex::new(None),
        };
        tracker.launch_flush();
        tracker
    }

    /// Records one traversal of the request's path.
    pub fn record_hit(&self, request: &ResolveCheckRequest) {
        self.state.record_hit(request);
    }

    /// Flushes every scope. With `force`, every node is selected,
    /// otherwise only expired ones. Selected nodes are always removed.
    pub fn flush_scopes(&self, force: bool) -> FlushReport {
        self.state.flush(force)
    }

    /// Starts the background flush unless it is already running or the
    /// lifetime is over. Returns whether a task was started.
    pub fn launch_flush(&self) -> bool {
        let mut task = self.flush_task.lock().unwrap_or_else(PoisonError::into_inner);
        if task.as_ref().is_some_and(|handle| !handle.is_finished()) {
            return false;
        }
        if self.lifetime.is_cancelled() {
            return false;
        }

        *task = Some(tokio::spawn(run_flush(
            Arc::clone(&self.state),
            self.flush_interval,
            self.lifetime.clone(),
        )));
        true
    }

    /// True while the background flush task is alive.
    pub fn is_flush_running(&self) -> bool {
        self.flush_task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// The shared diagnostic limiter.
    pub fn limiter(&self) -> &LogLimiter {
        &self.state.limiter
    }

    pub(crate) fn state(&self) -> &TrackerState {
        &self.state
    }
}

async fn run_flush(state: Arc<TrackerState>, period: Duration, lifetime: CancellationToken) {
    let mut tick = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
    tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = lifetime.cancelled() => break,
            _ = tick.tick() => {
                let report = state.flush(false);
                if report.flushed > 0 {
                    debug!(
                        flushed = report.flushed,
                        logged = report.logged,
                        "flushed tracked paths"
                    );
                }
            }
        }
    }
}

#[async_trait]
impl CheckResolver for TrackingCheckResolver {
    async fn resolve_check(
        &self,
        ctx: &CheckContext,
        request: &ResolveCheckRequest,
    ) -> DomainResult<ResolveCheckResponse> {
        ctx.check()?;
        self.record_hit(request);

        let delegate = self.delegate.get()?;
        ctx.run(delegate.resolve_check(ctx, request)).await
    }

    fn set_delegate(&self, delegate: Arc<dyn CheckResolver>) {
        self.delegate.set(delegate);
    }

    async fn close(&self) {
        self.lifetime.cancel();

        let task = self
            .flush_task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(task) = task {
            if let Err(err) = task.await {
                warn!(error = %err, "path tracker flush task did not exit cleanly");
            }
        }

        self.delegate.clear();
    }
}

impl Drop for TrackingCheckResolver {
    fn drop(&mut self) {
        self.lifetime.cancel();
    }
}
