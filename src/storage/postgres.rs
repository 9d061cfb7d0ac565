//! Postgres pool creation and the migration ledger backed by it.
//!
//! The ledger is sqlx's own `_sqlx_migrations` table. Group ids, which sqlx
//! does not track, live in `films_migration_groups` and are written in the
//! same transaction as the unit they describe.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;

use async_trait::async_trait;
use sqlx::migrate::{Migrate, Migration};
use sqlx::postgres::{PgConnection, PgPoolOptions};
use sqlx::PgPool;
use url::Url;

use crate::config::StorageConfig;
use crate::storage::migrate::{AppliedMigration, BoxError, MigrationError, MigrationStore};

const CREATE_GROUPS: &str = r#"
    CREATE TABLE IF NOT EXISTS films_migration_groups (
        version  BIGINT PRIMARY KEY REFERENCES _sqlx_migrations (version),
        group_id BIGINT NOT NULL
    )
"#;

/// Open a pool and prove it with one live connection.
pub async fn connect(config: &StorageConfig) -> Result<PgPool, sqlx::Error> {
    tracing::debug!(url = %redact(&config.url), "Connecting to Postgres");
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(config.acquire_timeout())
        .connect(&config.url)
        .await
}

/// Connection URL with the password masked, for log lines.
pub fn redact(raw: &str) -> String {
    let Ok(mut url) = Url::parse(raw) else {
        return "<invalid url>".to_string();
    };
    if url.password().is_some() && url.set_password(Some("***")).is_err() {
        return "<invalid url>".to_string();
    }
    url.to_string()
}

fn ledger_error(e: impl Into<BoxError>) -> MigrationError {
    MigrationError::Ledger(e.into())
}

fn record_group(
    conn: &mut PgConnection,
    version: i64,
    group_id: i64,
) -> Pin<Box<dyn Future<Output = Result<(), sqlx::Error>> + Send + '_>> {
    Box::pin(async move {
        sqlx::query("INSERT INTO films_migration_groups (version, group_id) VALUES ($1, $2)")
            .bind(version)
            .bind(group_id)
            .execute(conn)
            .await?;
        Ok(())
    })
}

/// Migration ledger on a Postgres pool.
#[derive(Debug, Clone)]
pub struct PgMigrationStore {
    pool: PgPool,
}

impl PgMigrationStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MigrationStore for PgMigrationStore {
    async fn init_ledger(&self) -> Result<(), MigrationError> {
        let mut conn = self.pool.acquire().await.map_err(ledger_error)?;
        conn.ensure_migrations_table().await.map_err(ledger_error)?;
        drop(conn);

        sqlx::query(CREATE_GROUPS)
            .execute(&self.pool)
            .await
            .map_err(ledger_error)?;
        Ok(())
    }

    async fn applied(&self) -> Result<Vec<AppliedMigration>, MigrationError> {
        let mut conn = self.pool.acquire().await.map_err(ledger_error)?;
        if let Some(version) = conn.dirty_version().await.map_err(ledger_error)? {
            return Err(MigrationError::Dirty { version });
        }
        let rows = conn.list_applied_migrations().await.map_err(ledger_error)?;
        drop(conn);

        let groups: HashMap<i64, i64> =
            sqlx::query_as::<_, (i64, i64)>("SELECT version, group_id FROM films_migration_groups")
                .fetch_all(&self.pool)
                .await
                .map_err(ledger_error)?
                .into_iter()
                .collect();

        Ok(rows
            .into_iter()
            .map(|row| AppliedMigration {
                version: row.version,
                group_id: groups.get(&row.version).copied().unwrap_or(0),
                checksum: row.checksum.into_owned(),
            })
            .collect())
    }

    async fn apply(&self, unit: &Migration, group_id: i64) -> Result<(), MigrationError> {
        let failed = |source: BoxError| MigrationError::Apply {
            version: unit.version,
            description: unit.description.to_string(),
            source,
        };

        let mut tx = self.pool.begin().await.map_err(|e| failed(e.into()))?;
        // sqlx runs the unit in a savepoint of `tx`; the group row commits with it.
        // The ledger's primary key turns a concurrent second apply into a rollback.
        tx.apply(unit).await.map_err(|e| failed(e.into()))?;
        record_group(&mut tx, unit.version, group_id)
            .await
            .map_err(|e| failed(e.into()))?;
        tx.commit().await.map_err(|e| failed(e.into()))?;
        Ok(())
    }
}
