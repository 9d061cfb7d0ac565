//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Bootstrap:
//!     listener.rs bind (fails fast on a taken port)
//!     → ListenerActor (socket + router)
//!     → registered with the actor group
//!
//! Actor group:
//!     run()       → axum accept/serve loop
//!     interrupt() → stop accepting, drain in-flight, return
//! ```

pub mod listener;

pub use listener::{bind, ListenerActor, ListenerError};
