//! Token bucket gating diagnostic log emission.

use std::sync::{Mutex, PoisonError};
use std::time::Instant;

struct Bucket {
    rate: f64,
    burst: u32,
    tokens: f64,
    last_refill: Instant,
}

impl Bucket {
    /// Refill tokens based on elapsed time and try to consume one.
    fn refill_and_try_consume(&mut self, now: Instant) -> bool {
        let elapsed = now.saturating_duration_since(self.last_refill);
        self.last_refill = now;

        let refill = elapsed.as_secs_f64() * self.rate;
        self.tokens = (self.tokens + refill).min(f64::from(self.burst));

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

/// Single shared token bucket: `rate` tokens per second, at most `burst`
/// stored.
///
/// A non-finite or negative rate never refills. A burst of zero never
/// allows. Neither is an error.
pub struct LogLimiter {
    bucket: Mutex<Bucket>,
}

impl LogLimiter {
    /// Creates a full bucket.
    pub fn new(rate: f64, burst: u32) -> Self {
        let rate = sanitize_rate(rate);
        Self {
            bucket: Mutex::new(Bucket {
                rate,
                burst,
                tokens: f64::from(burst),
                last_refill: Instant::now(),
            }),
        }
    }

    /// Consumes a token if one is available.
    pub fn allow(&self) -> bool {
        self.lock().refill_and_try_consume(Instant::now())
    }

    pub fn burst(&self) -> u32 {
        self.lock().burst
    }

    /// Changes the burst, dropping stored tokens above it.
    pub fn set_burst(&self, burst: u32) {
        let mut bucket = self.lock();
        bucket.burst = burst;
        bucket.tokens = bucket.tokens.min(f64::from(burst));
    }

    pub fn rate(&self) -> f64 {
        self.lock().rate
    }

    pub fn set_rate(&self, rate: f64) {
        let now = Instant::now();
        let mut bucket = self.lock();
        // Settle tokens earned at the old rate first.
        let elapsed = now.saturating_duration_since(bucket.last_refill);
        bucket.tokens = (bucket.tokens + elapsed.as_secs_f64() * bucket.rate)
            .min(f64::from(bucket.burst));
        bucket.last_refill = now;
        bucket.rate = sanitize_rate(rate);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Bucket> {
        self.bucket.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for LogLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let bucket = self.lock();
        f.debug_struct("LogLimiter")
            .field("rate", &bucket.rate)
            .field("burst", &bucket.burst)
            .finish()
    }
}

fn sanitize_rate(rate: f64) -> f64 {
    if rate.is_finite() && rate > 0.0 {
        rate
    } else {
        0.0
    }
}
