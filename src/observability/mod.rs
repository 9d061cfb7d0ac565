//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events via tracing)
//!     → metrics.rs (counters, histograms)
//!
//! Consumers:
//!     → stderr (pretty or JSON lines)
//!     → admin listener `/metrics` (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Structured logging (JSON) for machine parsing
//! - Request ID flows through the application listener's trace spans
//! - Metrics are cheap (atomic increments)

pub mod logging;
pub mod metrics;
