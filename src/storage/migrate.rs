//! Schema migration runner.
//!
//! # Responsibilities
//! - Initialize the ledger on first use
//! - Diff the ordered unit list against the ledger
//! - Apply pending units in ascending version order, one transaction each
//! - Report whether anything changed, and under which group
//!
//! # Design Decisions
//! - Units are sqlx migrations; their SHA-384 checksums detect edited history
//! - The runner owns ordering, grouping and bookkeeping; the store owns atomicity
//! - A ledger row whose checksum disagrees with the unit of the same version aborts the run
//! - Ledger rows with no matching unit are tolerated with a warning

use std::collections::BTreeMap;

use async_trait::async_trait;
use sqlx::migrate::Migration;

use crate::observability::metrics;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// A ledger row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedMigration {
    pub version: i64,
    pub checksum: Vec<u8>,
    /// Run that applied the unit; 0 when applied outside this service.
    pub group_id: i64,
}

/// Outcome of a successful [`migrate`] run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationReport {
    /// Group assigned to this run's units; `None` when nothing was pending.
    pub group_id: Option<i64>,
    /// Descriptions of the units applied, in order.
    pub applied: Vec<String>,
}

impl MigrationReport {
    pub fn changed(&self) -> bool {
        !self.applied.is_empty()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum MigrationError {
    #[error("migration {version} is listed after {previous}; versions must strictly increase")]
    InvalidSequence { previous: i64, version: i64 },

    #[error("migration ledger unavailable: {0}")]
    Ledger(#[source] BoxError),

    #[error("migration {version} was partially applied and left the ledger dirty")]
    Dirty { version: i64 },

    #[error("migration {version} ({description}) was edited after it was applied")]
    LedgerMismatch { version: i64, description: String },

    #[error("migration {version} ({description}) failed: {source}")]
    Apply {
        version: i64,
        description: String,
        #[source]
        source: BoxError,
    },
}

/// Storage-side half of the migration contract.
#[async_trait]
pub trait MigrationStore: Send + Sync {
    /// Create the ledger if it does not exist yet.
    async fn init_ledger(&self) -> Result<(), MigrationError>;

    /// Every recorded unit.
    async fn applied(&self) -> Result<Vec<AppliedMigration>, MigrationError>;

    /// Run `unit` and record it under `group_id` as one atomic step.
    async fn apply(&self, unit: &Migration, group_id: i64) -> Result<(), MigrationError>;
}

/// Bring the store up to date with `units`.
pub async fn migrate<S>(store: &S, units: &[Migration]) -> Result<MigrationReport, MigrationError>
where
    S: MigrationStore + ?Sized,
{
    check_sequence(units)?;
    store.init_ledger().await?;

    let ledger: BTreeMap<i64, AppliedMigration> = store
        .applied()
        .await?
        .into_iter()
        .map(|row| (row.version, row))
        .collect();

    let mut pending = Vec::new();
    for unit in units {
        match ledger.get(&unit.version) {
            Some(row) if row.checksum.as_slice() != unit.checksum.as_ref() => {
                return Err(MigrationError::LedgerMismatch {
                    version: unit.version,
                    description: unit.description.to_string(),
                });
            }
            Some(_) => {}
            None => pending.push(unit),
        }
    }

    for row in ledger.values() {
        if !units.iter().any(|unit| unit.version == row.version) {
            tracing::warn!(version = row.version, "Ledger contains a migration unknown to this release");
        }
    }

    tracing::info!(applied = ledger.len(), pending = pending.len(), "Migration check");
    if pending.is_empty() {
        return Ok(MigrationReport::default());
    }

    let group_id = ledger.values().map(|row| row.group_id).max().unwrap_or(0) + 1;
    let mut report = MigrationReport {
        group_id: Some(group_id),
        applied: Vec::with_capacity(pending.len()),
    };

    for unit in pending {
        tracing::info!(
            version = unit.version,
            migration = %unit.description,
            group_id,
            "Applying migration"
        );
        store.apply(unit, group_id).await?;
        report.applied.push(unit.description.to_string());
        metrics::record_migrations_applied(1);
    }

    Ok(report)
}

fn check_sequence(units: &[Migration]) -> Result<(), MigrationError> {
    for pair in units.windows(2) {
        if let [previous, next] = pair {
            if next.version <= previous.version {
                return Err(MigrationError::InvalidSequence {
                    previous: previous.version,
                    version: next.version,
                });
            }
        }
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::borrow::Cow;
    use std::sync::Mutex;

    use sqlx::migrate::MigrationType;

    pub(crate) fn unit(version: i64, description: &'static str, sql: &'static str) -> Migration {
        Migration::new(
            version,
            Cow::Borrowed(description),
            MigrationType::Simple,
            Cow::Borrowed(sql),
            false,
        )
    }

    /// Ledger and "schema" kept in memory; `fail_on` makes one unit's effect fail.
    #[derive(Default)]
    pub(crate) struct MemoryStore {
        pub(crate) ledger: Mutex<Vec<AppliedMigration>>,
        pub(crate) effects: Mutex<Vec<i64>>,
        pub(crate) fail_on: Mutex<Option<i64>>,
        pub(crate) init_calls: Mutex<u32>,
    }

    #[async_trait]
    impl MigrationStore for MemoryStore {
        async fn init_ledger(&self) -> Result<(), MigrationError> {
            *self.init_calls.lock().unwrap() += 1;
            Ok(())
        }

        async fn applied(&self) -> Result<Vec<AppliedMigration>, MigrationError> {
            Ok(self.ledger.lock().unwrap().clone())
        }

        async fn apply(&self, unit: &Migration, group_id: i64) -> Result<(), MigrationError> {
            if *self.fail_on.lock().unwrap() == Some(unit.version) {
                return Err(MigrationError::Apply {
                    version: unit.version,
                    description: unit.description.to_string(),
                    source: "syntax error at or near \"TABEL\"".into(),
                });
            }
            self.effects.lock().unwrap().push(unit.version);
            self.ledger.lock().unwrap().push(AppliedMigration {
                version: unit.version,
                checksum: unit.checksum.to_vec(),
                group_id,
            });
            Ok(())
        }
    }

    pub(crate) fn units() -> Vec<Migration> {
        vec![
            unit(1, "create a", "CREATE TABLE a (id INT);"),
            unit(2, "create b", "CREATE TABLE b (id INT);"),
            unit(5, "index b", "CREATE INDEX b_idx ON b (id);"),
        ]
    }

    #[tokio::test]
    async fn second_run_is_a_no_op() {
        let store = MemoryStore::default();

        let first = migrate(&store, &units()).await.unwrap();
        assert!(first.changed());
        assert_eq!(first.group_id, Some(1));
        assert_eq!(first.applied, vec!["create a", "create b", "index b"]);

        let second = migrate(&store, &units()).await.unwrap();
        assert!(!second.changed());
        assert_eq!(second.group_id, None);

        assert_eq!(*store.effects.lock().unwrap(), vec![1, 2, 5]);
        assert_eq!(*store.init_calls.lock().unwrap(), 2);
    }

    #[tokio::test]
    async fn appended_units_get_a_new_group() {
        let store = MemoryStore::default();
        migrate(&store, &units()[..2]).await.unwrap();

        let report = migrate(&store, &units()).await.unwrap();
        assert_eq!(report.group_id, Some(2));
        assert_eq!(report.applied, vec!["index b"]);
        assert_eq!(*store.effects.lock().unwrap(), vec![1, 2, 5]);
    }

    #[tokio::test]
    async fn failed_unit_stops_the_run_and_resumes_later() {
        let store = MemoryStore::default();
        *store.fail_on.lock().unwrap() = Some(2);

        let err = migrate(&store, &units()).await.unwrap_err();
        assert!(matches!(err, MigrationError::Apply { version: 2, .. }));
        assert_eq!(*store.effects.lock().unwrap(), vec![1]);

        *store.fail_on.lock().unwrap() = None;
        let report = migrate(&store, &units()).await.unwrap();
        assert_eq!(report.applied, vec!["create b", "index b"]);
        assert_eq!(*store.effects.lock().unwrap(), vec![1, 2, 5]);
    }

    #[tokio::test]
    async fn edited_unit_is_corruption() {
        let store = MemoryStore::default();
        migrate(&store, &units()).await.unwrap();

        let mut edited = units();
        edited[1] = unit(2, "create b", "CREATE TABLE b (id BIGINT);");

        let err = migrate(&store, &edited).await.unwrap_err();
        assert!(matches!(err, MigrationError::LedgerMismatch { version: 2, .. }));
        assert_eq!(*store.effects.lock().unwrap(), vec![1, 2, 5]);
    }

    #[tokio::test]
    async fn unordered_units_are_rejected_before_touching_storage() {
        let store = MemoryStore::default();
        let all = units();
        let reversed = [all[1].clone(), all[0].clone()];

        let err = migrate(&store, &reversed).await.unwrap_err();
        assert!(matches!(
            err,
            MigrationError::InvalidSequence { previous: 2, version: 1 }
        ));
        assert_eq!(*store.init_calls.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn unknown_ledger_rows_are_ignored() {
        let store = MemoryStore::default();
        store.ledger.lock().unwrap().push(AppliedMigration {
            version: 99,
            checksum: vec![0; 48],
            group_id: 4,
        });

        let report = migrate(&store, &units()).await.unwrap();
        assert_eq!(report.group_id, Some(5));
        assert_eq!(report.applied.len(), 3);
    }
}
