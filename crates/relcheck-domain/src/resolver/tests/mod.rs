//! Tests for the resolver ring.
//!
//! Organized by stage:
//! - Path tracking (keys, eviction, background flush, shutdown)
//! - Cycle detection
//! - Local evaluation and the assembled ring


#[cfg(test)]
mod cycle_detection_tests;
