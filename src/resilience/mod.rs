//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Startup dependency (storage):
//!     → backoff.rs (attempt, log failure, sleep fixed delay, repeat)
//!     → handle returned to the bootstrap sequence
//! ```
//!
//! # Design Decisions
//! - Transient unavailability at startup is absorbed, not surfaced
//! - Retry policy is a value, so tests can cap attempts

pub mod backoff;

pub use backoff::{BackoffConnector, BackoffError};
