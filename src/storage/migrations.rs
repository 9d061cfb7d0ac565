//! Schema migrations shipped with this release.
//!
//! Embedded from `migrations/` at compile time. Append only: never edit,
//! reorder or remove a file once it has been released.

use sqlx::migrate::{Migration, Migrator};

pub static MIGRATOR: Migrator = sqlx::migrate!();

/// Every unit of this release, in ascending version order.
pub fn release_units() -> &'static [Migration] {
    MIGRATOR.iter().as_slice()
}
