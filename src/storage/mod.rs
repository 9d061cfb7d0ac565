//! Storage subsystem.
//!
//! # Data Flow
//! ```text
//! Startup:
//!     postgres.rs connect (wrapped in resilience::backoff)
//!     → PgPool (shared handle, cloned into dependents)
//!     → migrate.rs (ledger diff, apply pending units)
//!     → migrations.rs (the release's units, embedded from migrations/)
//! ```
//!
//! # Design Decisions
//! - The pool is created once and never closed before process exit
//! - Migration bookkeeping is behind `MigrationStore` so it runs against any ledger
//! - The Postgres ledger is sqlx's; only group ids are stored alongside it

pub mod migrate;
pub mod migrations;
pub mod postgres;

pub use migrate::{migrate, AppliedMigration, MigrationError, MigrationReport, MigrationStore};
pub use migrations::{release_units, MIGRATOR};
pub use postgres::PgMigrationStore;
