//! Check resolution pipeline.
//!
//! Resolvers implement one capability, [`CheckResolver`], and are wired
//! into a ring at startup:
//!
//! ```text
//!   ┌──────────────────────┐     ┌──────────────────────┐     ┌──────────────┐
//!   │ CycleDetection       │ ──▶ │ TrackingCheck        │ ──▶ │ LocalChecker │
//!   │ (visited paths)      │     │ (path hits, flush)   │     │ (rewrites)   │
//!   └──────────────────────┘     └──────────────────────┘     └──────┬───────┘
//!              ▲                                                     │
//!              └──────────────── nested checks ──────────────────────┘
//! ```
//!
//! Nested checks issued by the local checker re-enter the ring, so every
//! hop is cycle-checked and tracked. No stage hard-codes its successor.
//!
//! # Example
//!
//! ```ignore
//! let cycle = Arc::new(CycleDetectionCheckResolver::new());
//! let tracker = Arc::new(TrackingCheckResolver::new(TrackerConfig::default()));
//! let local = Arc::new(LocalChecker::new(tuple_reader, model_reader));
//!
//! cycle.set_delegate(tracker.clone());
//! tracker.set_delegate(local.clone());
//! local.set_delegate(cycle.clone());
//!
//! let response = cycle.resolve_check(&CheckContext::new(), &request).await?;
//! ```
//!
//! Call `close` on every stage on shutdown: it stops background work and
//! releases the delegate, which breaks the `Arc` ring.

mod config;
mod context;
mod cycle_detection;
mod delegate;
mod limiter;
mod local_checker;
mod tracker;
mod traits;
mod types;

#[cfg(test)]
mod tests;

pub use config::{
    ResolverConfig, TrackerConfig, DEFAULT_LOG_BURST, DEFAULT_LOG_RATE, DEFAULT_MAX_DEPTH,
    DEFAULT_TRACKER_INTERVAL,
};
pub use context::CheckContext;
pub use cycle_detection::CycleDetectionCheckResolver;
pub use limiter::LogLimiter;
pub use local_checker::LocalChecker;
pub use tracker::{path_key, user_kind, FlushReport, TrackingCheckResolver, USERSET_KIND};
pub use traits::{CheckResolver, ModelReader, TupleReader};
pub use types::{
    RequestMetadata, ResolutionMetadata, ResolveCheckRequest, ResolveCheckResponse,
    StoredTupleRef,
};
