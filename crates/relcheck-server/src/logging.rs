//! Structured logging setup.
//!
//! Path diagnostics from the tracking stage are emitted as `tracing` events
//! with `store_id`, `authorization_model_id`, `path` and `hits` fields. With
//! JSON formatting enabled each one is a single line:
//!
//! ```json
//! {"timestamp":"...","level":"INFO","fields":{"message":"execution path hits","store_id":"s1","authorization_model_id":"m1","path":"group#member@user","hits":3},"target":"relcheck_domain::resolver::tracker"}
//! ```

use tracing::{Dispatch, Level};
use tracing_subscriber::{fmt, fmt::MakeWriter, prelude::*, EnvFilter};

/// Output format of the global subscriber.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// One JSON object per line.
    Json,
    /// Multi-line human readable output.
    #[default]
    Pretty,
}

/// Global subscriber settings. `RUST_LOG`, when set, overrides `level`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    pub format: LogFormat,
    pub level: Level,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self::new(LogFormat::default(), Level::INFO)
    }
}

impl LoggingConfig {
    pub fn new(format: LogFormat, level: Level) -> Self {
        Self { format, level }
    }
}

/// Installs the global subscriber.
///
/// Returns false when a global subscriber was already installed, in which
/// case the existing one is kept.
pub fn init_logging(config: &LoggingConfig) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.to_string()));
    let registry = tracing_subscriber::registry().with(filter);

    let installed = match config.format {
        LogFormat::Json => tracing::subscriber::set_global_default(
            registry.with(fmt::layer().json().with_current_span(true)),
        ),
        LogFormat::Pretty => tracing::subscriber::set_global_default(
            registry.with(fmt::layer().pretty()),
        ),
    };
    installed.is_ok()
}

/// Creates a JSON subscriber writing every event to `writer`.
pub fn create_json_layer<W>(writer: W) -> impl tracing::Subscriber + Send + Sync
where
    W: for<'writer> MakeWriter<'writer> + Send + Sync + 'static,
{
    tracing_subscriber::registry()
        .with(EnvFilter::new("trace"))
        .with(fmt::layer().json().with_writer(writer))
}

/// A logger sink for the tracking stage that writes JSON to `writer`
/// instead of the global subscriber.
pub fn json_dispatch<W>(writer: W) -> Dispatch
where
    W: for<'writer> MakeWriter<'writer> + Send + Sync + 'static,
{
    Dispatch::new(create_json_layer(writer))
}
