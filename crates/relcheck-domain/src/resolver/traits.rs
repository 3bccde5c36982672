//! Traits at the seams of the resolver ring.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::DomainResult;
use crate::model::RelationDefinition;

use super::context::CheckContext;
use super::types::{ResolveCheckRequest, ResolveCheckResponse, StoredTupleRef};

/// A stage of the check resolution ring.
///
/// Stages are wired at startup with [`CheckResolver::set_delegate`] and
/// may form a cycle back to themselves, so nested checks issued deep in
/// the evaluator re-enter the whole pipeline.
#[async_trait]
pub trait CheckResolver: Send + Sync {
    /// Evaluates or delegates `request`.
    ///
    /// Fails fast with a cancellation error when `ctx` is already done.
    async fn resolve_check(
        &self,
        ctx: &CheckContext,
        request: &ResolveCheckRequest,
    ) -> DomainResult<ResolveCheckResponse>;

    /// Wires the next stage. Call before the resolver serves traffic.
    fn set_delegate(&self, delegate: Arc<dyn CheckResolver>);

    /// Releases everything owned by this stage, including its delegate.
    /// No background task of the stage is running once this returns.
    async fn close(&self);
}

/// Trait for tuple storage operations needed by the resolver.
#[async_trait]
pub trait TupleReader: Send + Sync {
    /// Reads tuples matching the given criteria.
    async fn read_tuples(
        &self,
        store_id: &str,
        object_type: &str,
        object_id: &str,
        relation: &str,
    ) -> DomainResult<Vec<StoredTupleRef>>;
}

/// Trait for authorization model operations needed by the resolver.
#[async_trait]
pub trait ModelReader: Send + Sync {
    /// Gets a relation definition from a type of the given model.
    async fn get_relation_definition(
        &self,
        store_id: &str,
        authorization_model_id: &str,
        type_name: &str,
        relation: &str,
    ) -> DomainResult<RelationDefinition>;
}
