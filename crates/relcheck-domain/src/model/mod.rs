//! Authorization model types.
//!
//! This module contains:
//! - Tuple keys and object references
//! - User reference helpers (usersets, typed wildcards)
//! - Authorization model structures consumed by the local checker

mod types;
#[cfg(test)]
mod types_proptest;

pub use types::*;
