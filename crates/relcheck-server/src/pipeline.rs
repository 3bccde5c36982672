//! Resolver ring assembly.
//!
//! ```text
//!   check() ──► CycleDetection ──► Tracking (optional) ──► LocalChecker
//!                    ▲                                          │
//!                    └──────────── nested dispatch ─────────────┘
//! ```

use std::sync::Arc;

use relcheck_domain::error::DomainResult;
use relcheck_domain::model::TupleKey;
use relcheck_domain::resolver::{
    CheckContext, CheckResolver, CycleDetectionCheckResolver, LocalChecker, ModelReader,
    RequestMetadata, ResolveCheckRequest, ResolveCheckResponse, ResolverConfig, TrackerConfig,
    TrackingCheckResolver, TupleReader,
};
use tracing::debug;

use crate::config::PipelineConfig;

/// A wired resolver ring.
///
/// The stages reference each other in a cycle; `close` must be awaited to
/// break it and stop the tracker's background flush.
pub struct CheckPipeline<T, M>
where
    T: TupleReader,
    M: ModelReader,
{
    entry: Arc<CycleDetectionCheckResolver>,
    tracker: Option<Arc<TrackingCheckResolver>>,
    local: Arc<LocalChecker<T, M>>,
    config: ResolverConfig,
}

impl<T, M> CheckPipeline<T, M>
where
    T: TupleReader + 'static,
    M: ModelReader + 'static,
{
    /// Wires the ring. A tracking stage is included when `tracker` is set.
    ///
    /// Must be called from within a tokio runtime when tracking is enabled.
    pub fn new(
        config: ResolverConfig,
        tracker: Option<TrackerConfig>,
        tuple_reader: Arc<T>,
        model_reader: Arc<M>,
    ) -> Self {
        let entry = Arc::new(CycleDetectionCheckResolver::new());
        let local = Arc::new(LocalChecker::new(tuple_reader, model_reader));
        let tracker = tracker.map(|config| Arc::new(TrackingCheckResolver::new(config)));

        match &tracker {
            Some(tracker) => {
                entry.set_delegate(Arc::clone(tracker) as Arc<dyn CheckResolver>);
                tracker.set_delegate(Arc::clone(&local) as Arc<dyn CheckResolver>);
            }
            None => entry.set_delegate(Arc::clone(&local) as Arc<dyn CheckResolver>),
        }
        local.set_delegate(Arc::clone(&entry) as Arc<dyn CheckResolver>);

        debug!(
            max_depth = config.max_depth,
            tracking = tracker.is_some(),
            "check pipeline wired"
        );

        Self {
            entry,
            tracker,
            local,
            config,
        }
    }

    /// Wires the ring from loaded configuration.
    pub fn from_config(
        config: &PipelineConfig,
        tuple_reader: Arc<T>,
        model_reader: Arc<M>,
    ) -> Self {
        Self::new(
            config.resolver_config(),
            config.tracker_config(),
            tuple_reader,
            model_reader,
        )
    }

    /// Checks whether `tuple_key` holds in the given store and model.
    pub async fn check(
        &self,
        ctx: &CheckContext,
        store_id: &str,
        authorization_model_id: &str,
        tuple_key: TupleKey,
    ) -> DomainResult<ResolveCheckResponse> {
        let request = ResolveCheckRequest::new(
            store_id,
            authorization_model_id,
            tuple_key,
            RequestMetadata::new(self.config.max_depth),
        );
        self.resolve(ctx, &request).await
    }

    /// Runs a prepared top-level request, e.g. one carrying contextual
    /// tuples, under the configured timeout.
    pub async fn resolve(
        &self,
        ctx: &CheckContext,
        request: &ResolveCheckRequest,
    ) -> DomainResult<ResolveCheckResponse> {
        let ctx = if self.config.timeout.is_zero() {
            ctx.child()
        } else {
            ctx.child().with_timeout(self.config.timeout)
        };
        self.entry.resolve_check(&ctx, request).await
    }

    /// The tracking stage, when enabled.
    pub fn tracker(&self) -> Option<&TrackingCheckResolver> {
        self.tracker.as_deref()
    }

    pub fn resolver_config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Closes every stage, joining the tracker's flush task.
    pub async fn close(&self) {
        self.entry.close().await;
        if let Some(tracker) = &self.tracker {
            tracker.close().await;
        }
        self.local.close().await;
    }
}
