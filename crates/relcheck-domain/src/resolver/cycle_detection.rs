//! Cycle detection stage of the resolver ring.
//!
//! Relation graphs are not guaranteed to be acyclic: a group can contain a
//! userset that, through nesting, refers back to itself. Each branch carries
//! the set of path signatures it has already entered. Re-entering one ends
//! the branch with a denial marked `cycle_detected` instead of recursing.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::trace;

use crate::error::{DomainError, DomainResult};

use super::context::CheckContext;
use super::delegate::DelegateSlot;
use super::traits::CheckResolver;
use super::types::{ResolveCheckRequest, ResolveCheckResponse};

/// Stops a branch that revisits a path signature already on it.
pub struct CycleDetectionCheckResolver {
    delegate: DelegateSlot,
}

impl CycleDetectionCheckResolver {
    pub fn new() -> Self {
        Self {
            delegate: DelegateSlot::new("cycle detection resolver"),
        }
    }

    /// Signature of a request within its (store, model) scope.
    ///
    /// The visited set never leaves a single request tree, which is bound
    /// to one store and one model, so the tuple key alone identifies it.
    pub fn path_signature(request: &ResolveCheckRequest) -> String {
        request.tuple_key.to_string()
    }
}

impl Default for CycleDetectionCheckResolver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CheckResolver for CycleDetectionCheckResolver {
    async fn resolve_check(
        &self,
        ctx: &CheckContext,
        request: &ResolveCheckRequest,
    ) -> DomainResult<ResolveCheckResponse> {
        ctx.check()?;

        let signature = Self::path_signature(request);
        if request.visited_paths.contains(&signature) {
            trace!(
                store_id = %request.store_id,
                path = %signature,
                "cycle detected, denying branch"
            );
            return Ok(ResolveCheckResponse::cycle());
        }

        // Cycle first: it is structural and needs no budget.
        if request.request_metadata.is_exhausted() {
            return Err(DomainError::DepthLimitExceeded {
                max_depth: request.request_metadata.max_depth,
            });
        }

        let delegate = self.delegate.get()?;
        let request = request.with_visited(signature);
        ctx.run(delegate.resolve_check(ctx, &request)).await
    }

    fn set_delegate(&self, delegate: Arc<dyn CheckResolver>) {
        self.delegate.set(delegate);
    }

    async fn close(&self) {
        self.delegate.clear();
    }
}
