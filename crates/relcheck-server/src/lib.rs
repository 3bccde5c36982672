//! relcheck-server: configuration, logging and resolver ring wiring
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │               relcheck-server               │
//! ├─────────────────────────────────────────────┤
//! │  config.rs   - Configuration loading        │
//! │  logging.rs  - Subscriber initialisation    │
//! │  pipeline.rs - Resolver ring assembly       │
//! └─────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod logging;
pub mod pipeline;

// Re-exports for convenience
pub use config::{ConfigLoadError, PipelineConfig};
pub use logging::{init_logging, LogFormat, LoggingConfig};
pub use pipeline::CheckPipeline;
