//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! Application listener connection
//!     → server.rs (axum router, request ID, timeout, trace layers)
//!     → endpoints.rs (typed request/response, latency histogram)
//!     → service (business logic, storage reads)
//!     → JSON response or {"err": ...}
//! ```

pub mod endpoints;
pub mod server;

pub use endpoints::Endpoints;
pub use server::app_router;
