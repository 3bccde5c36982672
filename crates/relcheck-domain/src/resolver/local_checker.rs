//! Local graph evaluator.
//!
//! Evaluates relation rewrites against the tuple and model readers. Every
//! nested check (computed usersets, userset tuples, tuple-to-userset) is
//! dispatched through the delegate so it re-enters the whole ring.
//!
//! # Architecture Decisions
//!
//! - **Parallel Execution**: Union, intersection and exclusion evaluate
//!   their branches concurrently with `FuturesUnordered`, short-circuiting
//!   as soon as the outcome is known.
//! - **Errors vs. decisions**: a branch error only surfaces when no other
//!   branch decides the outcome.
//! - **Cycles**: a denial cut by a cycle keeps its `cycle_detected` marker
//!   through unions and intersections. An exclusion whose subtract branch
//!   was cut by a cycle denies.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::{FuturesUnordered, StreamExt};

use crate::error::{DomainError, DomainResult};
use crate::model::{
    is_typed_wildcard, is_userset, is_valid_type_id, Object, TupleKey, Userset,
    TYPE_SEPARATOR, USERSET_SEPARATOR, WILDCARD,
};

use super::context::CheckContext;
use super::delegate::DelegateSlot;
use super::traits::{CheckResolver, ModelReader, TupleReader};
use super::types::{ResolutionMetadata, ResolveCheckRequest, ResolveCheckResponse};

/// Type alias for boxed future to handle async recursion.
type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

type CheckFuture<'a> = BoxFuture<'a, DomainResult<ResolveCheckResponse>>;

/// Evaluates relation rewrites for a single check.
pub struct LocalChecker<T, M> {
    tuple_reader: Arc<T>,
    model_reader: Arc<M>,
    delegate: DelegateSlot,
}

impl<T, M> LocalChecker<T, M>
where
    T: TupleReader + 'static,
    M: ModelReader + 'static,
{
    /// Creates a checker that dispatches nested checks to itself until a
    /// delegate is set.
    pub fn new(tuple_reader: Arc<T>, model_reader: Arc<M>) -> Self {
        Self {
            tuple_reader,
            model_reader,
            delegate: DelegateSlot::new("local checker"),
        }
    }

    fn validate_request(&self, tuple_key: &TupleKey) -> DomainResult<()> {
        if !is_valid_type_id(&tuple_key.object) || is_userset(&tuple_key.object) {
            return Err(DomainError::InvalidObjectFormat {
                value: tuple_key.object.clone(),
            });
        }

        if tuple_key.relation.is_empty() {
            return Err(DomainError::InvalidRelationFormat {
                value: tuple_key.relation.clone(),
            });
        }

        let user_object = tuple_key
            .user
            .split_once(USERSET_SEPARATOR)
            .map_or(tuple_key.user.as_str(), |(object, _)| object);
        if !is_valid_type_id(user_object) {
            return Err(DomainError::InvalidUserFormat {
                value: tuple_key.user.clone(),
            });
        }

        Ok(())
    }

    /// Resolves a userset rewrite (boxed for recursion).
    fn resolve_userset<'a>(
        &'a self,
        ctx: &'a CheckContext,
        request: &'a ResolveCheckRequest,
        object: &'a Object,
        userset: &'a Userset,
        type_constraints: &'a [String],
    ) -> CheckFuture<'a> {
        Box::pin(async move {
            match userset {
                Userset::This => {
                    self.resolve_direct(ctx, request, object, type_constraints)
                        .await
                }

                Userset::ComputedUserset { relation } => {
                    let tuple_key = TupleKey::new(
                        request.tuple_key.object.clone(),
                        relation.clone(),
                        request.tuple_key.user.clone(),
                    );
                    self.dispatch(ctx, request, tuple_key).await
                }

                Userset::TupleToUserset {
                    tupleset,
                    computed_userset,
                } => {
                    self.resolve_tuple_to_userset(ctx, request, object, tupleset, computed_userset)
                        .await
                }

                Userset::Union { children } => {
                    union(
                        children
                            .iter()
                            .map(|child| {
                                self.resolve_userset(ctx, request, object, child, type_constraints)
                            })
                            .collect(),
                    )
                    .await
                }

                Userset::Intersection { children } => {
                    intersection(
                        children
                            .iter()
                            .map(|child| {
                                self.resolve_userset(ctx, request, object, child, type_constraints)
                            })
                            .collect(),
                    )
                    .await
                }

                Userset::Exclusion { base, subtract } => {
                    let (base, subtract) = futures::future::join(
                        self.resolve_userset(ctx, request, object, base, type_constraints),
                        self.resolve_userset(ctx, request, object, subtract, type_constraints),
                    )
                    .await;
                    exclusion(base, subtract)
                }
            }
        })
    }

    /// Resolves a direct assignment: contextual tuples first, then storage.
    async fn resolve_direct(
        &self,
        ctx: &CheckContext,
        request: &ResolveCheckRequest,
        object: &Object,
        type_constraints: &[String],
    ) -> DomainResult<ResolveCheckResponse> {
        let tuple_key = &request.tuple_key;

        let mut users: Vec<String> = request
            .contextual_tuples
            .iter()
            .filter(|ct| ct.object == tuple_key.object && ct.relation == tuple_key.relation)
            .map(|ct| ct.user.clone())
            .collect();

        request.request_metadata.record_datastore_query();
        let stored = ctx
            .run(self.tuple_reader.read_tuples(
                &request.store_id,
                &object.object_type,
                &object.object_id,
                &tuple_key.relation,
            ))
            .await?;
        users.extend(stored.iter().map(|t| t.user()));

        let mut nested = Vec::new();
        for user in users {
            if !type_constraints.is_empty() && !user_matches_type_constraints(&user, type_constraints)
            {
                continue;
            }

            if user_matches(&tuple_key.user, &user) {
                return Ok(ResolveCheckResponse::allowed());
            }

            // Userset reference (e.g., "group:eng#member"): resolve membership
            if let Some((user_object, user_relation)) = user.split_once(USERSET_SEPARATOR) {
                let nested_key =
                    TupleKey::new(user_object, user_relation, tuple_key.user.clone());
                nested.push(self.dispatch(ctx, request, nested_key));
            }
        }

        union(nested).await
    }

    /// Resolves a relation inherited from related objects.
    async fn resolve_tuple_to_userset(
        &self,
        ctx: &CheckContext,
        request: &ResolveCheckRequest,
        object: &Object,
        tupleset: &str,
        computed_userset: &str,
    ) -> DomainResult<ResolveCheckResponse> {
        let mut parents: Vec<String> = request
            .contextual_tuples
            .iter()
            .filter(|ct| ct.object == request.tuple_key.object && ct.relation == tupleset)
            .map(|ct| ct.user.clone())
            .collect();

        request.request_metadata.record_datastore_query();
        let stored = ctx
            .run(self.tuple_reader.read_tuples(
                &request.store_id,
                &object.object_type,
                &object.object_id,
                tupleset,
            ))
            .await?;
        parents.extend(stored.iter().map(|t| t.user()));

        let nested = parents
            .into_iter()
            .filter(|parent| !is_userset(parent) && !is_typed_wildcard(parent))
            .map(|parent| {
                let nested_key =
                    TupleKey::new(parent, computed_userset, request.tuple_key.user.clone());
                self.dispatch(ctx, request, nested_key)
            })
            .collect();

        union(nested).await
    }

    /// Issues a nested check through the ring.
    fn dispatch<'a>(
        &'a self,
        ctx: &'a CheckContext,
        request: &ResolveCheckRequest,
        tuple_key: TupleKey,
    ) -> CheckFuture<'a> {
        let nested = request.dispatch(tuple_key);
        Box::pin(async move {
            let mut response = match self.delegate.current() {
                Some(delegate) => ctx.run(delegate.resolve_check(ctx, &nested)).await?,
                None => self.resolve_check(ctx, &nested).await?,
            };
            response.resolution_metadata.depth += 1;
            Ok(response)
        })
    }
}

#[async_trait]
impl<T, M> CheckResolver for LocalChecker<T, M>
where
    T: TupleReader + 'static,
    M: ModelReader + 'static,
{
    async fn resolve_check(
        &self,
        ctx: &CheckContext,
        request: &ResolveCheckRequest,
    ) -> DomainResult<ResolveCheckResponse> {
        ctx.check()?;

        if request.request_metadata.is_exhausted() {
            return Err(DomainError::DepthLimitExceeded {
                max_depth: request.request_metadata.max_depth,
            });
        }

        self.validate_request(&request.tuple_key)?;
        let object = Object::parse(&request.tuple_key.object)?;

        let relation_def = ctx
            .run(self.model_reader.get_relation_definition(
                &request.store_id,
                &request.authorization_model_id,
                &object.object_type,
                &request.tuple_key.relation,
            ))
            .await?;

        self.resolve_userset(
            ctx,
            request,
            &object,
            &relation_def.rewrite,
            &relation_def.type_constraints,
        )
        .await
    }

    fn set_delegate(&self, delegate: Arc<dyn CheckResolver>) {
        self.delegate.set(delegate);
    }

    async fn close(&self) {
        self.delegate.clear();
    }
}

/// Any branch allowing allows.
async fn union(branches: Vec<CheckFuture<'_>>) -> DomainResult<ResolveCheckResponse> {
    let mut pending: FuturesUnordered<_> = branches.into_iter().collect();
    let mut first_error = None;
    let mut denial = ResolutionMetadata::default();

    while let Some(result) = pending.next().await {
        match result {
            Ok(response) if response.allowed => return Ok(response),
            Ok(response) => merge_denial(&mut denial, &response),
            Err(err) => {
                first_error.get_or_insert(err);
            }
        }
    }

    match first_error {
        Some(err) => Err(err),
        None => Ok(ResolveCheckResponse {
            allowed: false,
            resolution_metadata: denial,
        }),
    }
}

/// Every branch must allow.
async fn intersection(branches: Vec<CheckFuture<'_>>) -> DomainResult<ResolveCheckResponse> {
    if branches.is_empty() {
        return Ok(ResolveCheckResponse::denied());
    }

    let mut pending: FuturesUnordered<_> = branches.into_iter().collect();
    let mut first_error = None;
    let mut depth = 0;

    while let Some(result) = pending.next().await {
        match result {
            Ok(response) if !response.allowed => return Ok(response),
            Ok(response) => depth = depth.max(response.resolution_metadata.depth),
            Err(err) => {
                first_error.get_or_insert(err);
            }
        }
    }

    match first_error {
        Some(err) => Err(err),
        None => Ok(ResolveCheckResponse {
            allowed: true,
            resolution_metadata: ResolutionMetadata {
                depth,
                cycle_detected: false,
            },
        }),
    }
}

/// Base must allow and subtract must deny.
fn exclusion(
    base: DomainResult<ResolveCheckResponse>,
    subtract: DomainResult<ResolveCheckResponse>,
) -> DomainResult<ResolveCheckResponse> {
    let base = base?;
    if !base.allowed {
        return Ok(base);
    }

    let subtract = subtract?;
    let depth = base
        .resolution_metadata
        .depth
        .max(subtract.resolution_metadata.depth);
    let resolution_metadata = ResolutionMetadata {
        depth,
        cycle_detected: subtract.cycle_detected(),
    };

    Ok(ResolveCheckResponse {
        allowed: !subtract.allowed && !subtract.cycle_detected(),
        resolution_metadata,
    })
}

fn merge_denial(denial: &mut ResolutionMetadata, response: &ResolveCheckResponse) {
    denial.depth = denial.depth.max(response.resolution_metadata.depth);
    denial.cycle_detected |= response.cycle_detected();
}

/// Direct match, or a typed wildcard of the requesting user's type.
fn user_matches(requesting_user: &str, tuple_user: &str) -> bool {
    // A request for "user:*" never matches as a concrete user.
    if is_typed_wildcard(requesting_user) {
        return requesting_user == tuple_user;
    }

    if requesting_user == tuple_user {
        return true;
    }

    if let Some((tuple_type, WILDCARD)) = tuple_user.split_once(TYPE_SEPARATOR) {
        if let Some((user_type, _)) = requesting_user.split_once(TYPE_SEPARATOR) {
            return tuple_type == user_type && !is_userset(requesting_user);
        }
    }

    false
}

/// Checks a user reference against constraints such as "user",
/// "group#member" or "user:*".
fn user_matches_type_constraints(user: &str, type_constraints: &[String]) -> bool {
    let (user_object, user_relation) = match user.split_once(USERSET_SEPARATOR) {
        Some((object, relation)) => (object, Some(relation)),
        None => (user, None),
    };
    let Some((user_type, user_id)) = user_object.split_once(TYPE_SEPARATOR) else {
        return false;
    };

    type_constraints.iter().any(|constraint| {
        if let Some((constraint_type, constraint_relation)) =
            constraint.split_once(USERSET_SEPARATOR)
        {
            return constraint_type == user_type && user_relation == Some(constraint_relation);
        }
        if let Some((constraint_type, WILDCARD)) = constraint.split_once(TYPE_SEPARATOR) {
            return constraint_type == user_type && user_id == WILDCARD && user_relation.is_none();
        }
        constraint == user_type && user_relation.is_none() && user_id != WILDCARD
    })
}
