//! Configuration for the resolver stages.

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::Dispatch;

/// Default resolution depth budget (matches OpenFGA default of 25).
pub const DEFAULT_MAX_DEPTH: u32 = 25;

/// Age after which a tracked path is flushed.
pub const DEFAULT_TRACKER_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Default diagnostic emission rate, in log entries per second.
pub const DEFAULT_LOG_RATE: f64 = 1.0;

/// Default diagnostic burst.
pub const DEFAULT_LOG_BURST: u32 = 100;

/// Configuration for a check resolution.
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    /// Maximum depth for graph traversal.
    pub max_depth: u32,
    /// Timeout for check operations.
    pub timeout: Duration,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            timeout: Duration::from_secs(30),
        }
    }
}

impl ResolverConfig {
    /// Creates a new configuration with the specified max depth.
    pub fn with_max_depth(mut self, max_depth: u32) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Creates a new configuration with the specified timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Configuration for the path-tracking resolver.
#[derive(Debug, Clone)]
pub struct TrackerConfig {
    /// A tracked path older than this is evicted by the next flush.
    pub tracker_interval: Duration,
    /// Period of the background flush.
    pub flush_interval: Duration,
    /// Diagnostic log entries per second.
    pub log_rate: f64,
    /// Diagnostic log entries allowed in a burst.
    pub log_burst: u32,
    /// Parent lifetime. Cancelling it stops the background flush.
    pub lifetime: Option<CancellationToken>,
    /// Logger sink for path diagnostics. The global subscriber when unset.
    pub dispatch: Option<Dispatch>,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            tracker_interval: DEFAULT_TRACKER_INTERVAL,
            flush_interval: DEFAULT_TRACKER_INTERVAL,
            log_rate: DEFAULT_LOG_RATE,
            log_burst: DEFAULT_LOG_BURST,
            lifetime: None,
            dispatch: None,
        }
    }
}

impl TrackerConfig {
    pub fn with_tracker_interval(mut self, interval: Duration) -> Self {
        self.tracker_interval = interval;
        self
    }

    pub fn with_flush_interval(mut self, interval: Duration) -> Self {
        self.flush_interval = interval;
        self
    }

    /// Sets the diagnostic token bucket.
    pub fn with_log_limit(mut self, rate: f64, burst: u32) -> Self {
        self.log_rate = rate;
        self.log_burst = burst;
        self
    }

    pub fn with_lifetime(mut self, lifetime: CancellationToken) -> Self {
        self.lifetime = Some(lifetime);
        self
    }

    pub fn with_dispatch(mut self, dispatch: Dispatch) -> Self {
        self.dispatch = Some(dispatch);
        self
    }
}
