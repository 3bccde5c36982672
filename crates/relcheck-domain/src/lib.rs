//! relcheck-domain: check resolution core
//!
//! This crate contains:
//! - Authorization model and tuple key types
//! - The `CheckResolver` capability and its request/response contracts
//! - Cycle detection and path tracking stages
//! - A local graph evaluator dispatching nested checks through the ring
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │               relcheck-domain               │
//! ├─────────────────────────────────────────────┤
//! │  model/    - Tuple keys & model types       │
//! │  resolver/ - Resolver ring & its stages     │
//! │  error.rs  - Domain errors                  │
//! └─────────────────────────────────────────────┘
//! ```

pub mod error;
pub mod model;
pub mod resolver;

// Re-export commonly used types at the crate root
pub use error::{DomainError, DomainResult};
pub use resolver::{
    CheckContext, CheckResolver, CycleDetectionCheckResolver, LocalChecker, RequestMetadata,
    ResolveCheckRequest, ResolveCheckResponse, TrackerConfig, TrackingCheckResolver,
};
