//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Config → Connect storage (retry) → Migrate → Build service → Bind listeners
//!
//! Run (group.rs):
//!     admin listener ┐
//!     app listener   ├─ first to stop → interrupt the rest → join all → Outcome
//!     signal watcher ┘
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → signal watcher stops → group shuts down
//! ```
//!
//! # Design Decisions
//! - Ordered startup: config first, then storage, then listeners
//! - Any actor stopping stops the process; no restarts
//! - The first actor to stop decides the exit status

pub mod actor;
pub mod group;
pub mod shutdown;
pub mod signals;
pub mod startup;

pub use actor::{Actor, ActorError, ActorResult, Exit, Outcome};
pub use group::ActorGroup;
pub use shutdown::Shutdown;
pub use signals::{Signal, SignalActor};
pub use startup::StartupError;
