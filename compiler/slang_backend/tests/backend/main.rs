//! Backend Integration Tests
//!
//! Each module drives whole translation units through a `Backend` with a
//! toy IR generator and a recording target:
//! - `lifecycle`: state transitions, abandonment, hooks and customizers
//! - `emission`: the five output formats
//! - `target_config`: target machine configuration derived from options

#![allow(clippy::unwrap_used, clippy::expect_used, reason = "Tests can panic")]

pub mod lifecycle;

// Re-export test utilities
pub mod util;
