//! Request and response contracts passed through the resolver ring.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use crate::model::TupleKey;

/// Remaining-depth budget and dispatch counters for one resolution branch.
///
/// The counters are shared by every request derived from the same
/// top-level check; the depth is per branch and only ever decreases.
#[derive(Debug, Clone)]
pub struct RequestMetadata {
    /// Remaining resolution depth. Zero means the branch is exhausted.
    pub depth: u32,
    /// The budget the top-level check started with.
    pub max_depth: u32,
    dispatch_counter: Arc<AtomicU32>,
    datastore_query_count: Arc<AtomicU32>,
}

impl RequestMetadata {
    /// Creates metadata for a top-level check with the given depth budget.
    pub fn new(max_depth: u32) -> Self {
        Self {
            depth: max_depth,
            max_depth,
            dispatch_counter: Arc::new(AtomicU32::new(0)),
            datastore_query_count: Arc::new(AtomicU32::new(0)),
        }
    }

    /// True when no depth budget remains on this branch.
    pub fn is_exhausted(&self) -> bool {
        self.depth == 0
    }

    /// Metadata for a nested dispatch: one less depth, same counters.
    pub fn descend(&self) -> Self {
        Self {
            depth: self.depth.saturating_sub(1),
            max_depth: self.max_depth,
            dispatch_counter: Arc::clone(&self.dispatch_counter),
            datastore_query_count: Arc::clone(&self.datastore_query_count),
        }
    }

    /// Number of nested dispatches issued under the top-level check.
    pub fn dispatch_count(&self) -> u32 {
        self.dispatch_counter.load(Ordering::Relaxed)
    }

    /// Number of datastore reads issued under the top-level check.
    pub fn datastore_query_count(&self) -> u32 {
        self.datastore_query_count.load(Ordering::Relaxed)
    }

    pub(crate) fn record_dispatch(&self) {
        self.dispatch_counter.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_datastore_query(&self) {
        self.datastore_query_count.fetch_add(1, Ordering::Relaxed);
    }
}

/// Request for one check flowing through the resolver ring.
///
/// Stages never mutate a request they receive; they derive new ones.
#[derive(Debug, Clone)]
pub struct ResolveCheckRequest {
    /// The store ID to check against.
    pub store_id: String,
    /// The authorization model ID the check is evaluated with.
    pub authorization_model_id: String,
    /// The (object, relation, user) being checked.
    pub tuple_key: TupleKey,
    /// Depth budget and counters for this branch.
    pub request_metadata: RequestMetadata,
    /// Path signatures already entered on this branch.
    /// Shared by `Arc` and cloned only when extended (copy-on-write).
    pub visited_paths: Arc<HashSet<String>>,
    /// Request-scoped tuples consulted before the datastore.
    pub contextual_tuples: Arc<Vec<TupleKey>>,
}

impl ResolveCheckRequest {
    /// Creates a top-level request.
    pub fn new(
        store_id: impl Into<String>,
        authorization_model_id: impl Into<String>,
        tuple_key: TupleKey,
        request_metadata: RequestMetadata,
    ) -> Self {
        Self {
            store_id: store_id.into(),
            authorization_model_id: authorization_model_id.into(),
            tuple_key,
            request_metadata,
            visited_paths: Arc::new(HashSet::new()),
            contextual_tuples: Arc::new(Vec::new()),
        }
    }

    /// Attaches contextual tuples.
    pub fn with_contextual_tuples(mut self, contextual_tuples: Vec<TupleKey>) -> Self {
        self.contextual_tuples = Arc::new(contextual_tuples);
        self
    }

    /// Returns a copy whose visited set also contains `key`.
    /// The receiver's set is left untouched for sibling branches.
    pub fn with_visited(&self, key: impl Into<String>) -> Self {
        let mut visited = (*self.visited_paths).clone();
        visited.insert(key.into());
        Self {
            visited_paths: Arc::new(visited),
            ..self.clone()
        }
    }

    /// Builds the request for a nested check of `tuple_key` on this branch.
    pub fn dispatch(&self, tuple_key: TupleKey) -> Self {
        self.request_metadata.record_dispatch();
        Self {
            store_id: self.store_id.clone(),
            authorization_model_id: self.authorization_model_id.clone(),
            tuple_key,
            request_metadata: self.request_metadata.descend(),
            visited_paths: Arc::clone(&self.visited_paths),
            contextual_tuples: Arc::clone(&self.contextual_tuples),
        }
    }
}

/// How a decision was reached.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolutionMetadata {
    /// Deepest nested dispatch level used below this check.
    pub depth: u32,
    /// The denial was produced by cutting a cycle on this branch.
    pub cycle_detected: bool,
}

/// Result of one check.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolveCheckResponse {
    /// Whether the relation holds.
    pub allowed: bool,
    pub resolution_metadata: ResolutionMetadata,
}

impl ResolveCheckResponse {
    /// A plain allow.
    pub fn allowed() -> Self {
        Self {
            allowed: true,
            resolution_metadata: ResolutionMetadata::default(),
        }
    }

    /// A plain denial.
    pub fn denied() -> Self {
        Self::default()
    }

    /// The conservative denial returned when a branch revisits itself.
    pub fn cycle() -> Self {
        Self {
            allowed: false,
            resolution_metadata: ResolutionMetadata {
                depth: 0,
                cycle_detected: true,
            },
        }
    }

    /// Returns whether the relation holds.
    pub fn get_allowed(&self) -> bool {
        self.allowed
    }

    /// True when a cycle cut this branch.
    pub fn cycle_detected(&self) -> bool {
        self.resolution_metadata.cycle_detected
    }
}

/// Reference to a stored tuple for resolver use.
#[derive(Debug, Clone)]
pub struct StoredTupleRef {
    pub user_type: String,
    pub user_id: String,
    pub user_relation: Option<String>,
}

impl StoredTupleRef {
    /// Creates a new StoredTupleRef.
    pub fn new(
        user_type: impl Into<String>,
        user_id: impl Into<String>,
        user_relation: Option<String>,
    ) -> Self {
        Self {
            user_type: user_type.into(),
            user_id: user_id.into(),
            user_relation,
        }
    }

    /// Renders the stored user as a user reference
    /// (`user:alice`, `user:*` or `group:eng#member`).
    pub fn user(&self) -> String {
        match &self.user_relation {
            Some(relation) => format!("{}:{}#{}", self.user_type, self.user_id, relation),
            None => format!("{}:{}", self.user_type, self.user_id),
        }
    }
}
