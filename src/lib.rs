//! Films service library.
//!
//! Bootstraps storage, then runs the admin listener, the application listener
//! and the signal watcher as one actor group: when any of them stops, all stop.

// Core subsystems
pub mod config;
pub mod http;
pub mod net;
pub mod service;
pub mod storage;

// Admin surface
pub mod admin;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;
pub mod resilience;

pub use config::ServiceConfig;
pub use lifecycle::{Actor, ActorGroup, Outcome};
