//! Startup orchestration.
//!
//! # Responsibilities
//! - Connect to storage, retrying until it answers
//! - Apply pending schema migrations before any traffic
//! - Build the service layers and bind every listener
//! - Run the actor group and turn its outcome into an exit status
//!
//! # Design Decisions
//! - Fail fast: migration and bind errors are fatal, storage unavailability is not
//! - Subsystems initialize in order, not concurrently
//! - Signal handlers and listeners start last (traffic only when ready)
//! - Storage setup is generic over the handle and ledger so the order is testable
//! - Every collaborator receives only the handles it needs

use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::process::ExitCode;

use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use sqlx::migrate::Migration;
use sqlx::PgPool;
use tracing::Instrument;

use crate::admin::{setup_admin_router, AdminState};
use crate::config::{ListenersConfig, ServiceConfig};
use crate::http::{app_router, Endpoints};
use crate::lifecycle::actor::Outcome;
use crate::lifecycle::group::ActorGroup;
use crate::lifecycle::signals::SignalActor;
use crate::net::{ListenerActor, ListenerError};
use crate::observability::metrics::{init_metrics, RequestDuration, ServiceCounters};
use crate::resilience::{BackoffConnector, BackoffError};
use crate::service::FilmsService;
use crate::storage::{self, migrate, MigrationError, MigrationStore, PgMigrationStore};

/// A failure that stops the process before the actor group runs.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("storage unavailable: {0}")]
    Storage(#[from] BackoffError<sqlx::Error>),

    #[error("migration failed: {0}")]
    Migration(#[from] MigrationError),

    #[error("cannot install signal handlers: {0}")]
    Signals(#[source] io::Error),

    #[error(transparent)]
    Bind(#[from] ListenerError),
}

/// Routers for the two listeners.
pub struct Routers {
    pub admin: Router,
    pub app: Router,
}

/// A ready-to-run group plus the addresses its listeners hold.
pub struct Assembled {
    pub group: ActorGroup,
    pub admin_addr: SocketAddr,
    pub app_addr: SocketAddr,
}

/// Connect (with retries), then migrate through the store built on the new handle.
pub async fn prepare_storage<T, C, Fut, S>(
    connector: &BackoffConnector,
    connect: C,
    store: impl FnOnce(&T) -> S,
    units: &[Migration],
) -> Result<T, StartupError>
where
    C: FnMut() -> Fut,
    Fut: Future<Output = Result<T, sqlx::Error>>,
    S: MigrationStore,
{
    let handle = connector.connect(connect).await?;
    tracing::info!("Storage connected");

    let report = migrate(&store(&handle), units).await?;
    match report.group_id {
        None => tracing::info!("Migrations: no change"),
        Some(group_id) => tracing::info!(
            group_id,
            applied = ?report.applied,
            "Migrations: updated"
        ),
    }

    Ok(handle)
}

/// Build the service "onion" from the inside out and the routers on top of it.
pub fn build_routers(config: &ServiceConfig, pool: PgPool, metrics: PrometheusHandle) -> Routers {
    let service = FilmsService::new(pool, ServiceCounters::register());
    let endpoints = Endpoints::new(service, RequestDuration);

    Routers {
        admin: setup_admin_router(AdminState::new(metrics, &config.service)),
        app: app_router(endpoints, config.listeners.request_timeout()),
    }
}

/// Bind both listeners and register them with the signal watcher in one group.
pub async fn assemble(
    config: &ListenersConfig,
    routers: Routers,
    signals: SignalActor,
) -> Result<Assembled, StartupError> {
    let admin = ListenerActor::bind("admin", &config.admin_address, routers.admin)
        .await?
        .with_drain_timeout(config.drain_timeout());
    let app = ListenerActor::bind("app", &config.app_address, routers.app)
        .await?
        .with_drain_timeout(config.drain_timeout());
    let (admin_addr, app_addr) = (admin.local_addr(), app.local_addr());

    let mut group = ActorGroup::new();
    group.add(admin).add(app).add(signals);

    Ok(Assembled {
        group,
        admin_addr,
        app_addr,
    })
}

/// Storage first, then routers, signal handlers and listeners, then the group.
///
/// Nothing is bound unless `storage` succeeds.
pub async fn launch<T>(
    storage: impl Future<Output = Result<T, StartupError>>,
    listeners: &ListenersConfig,
    routers: impl FnOnce(T) -> Routers,
    signals: impl FnOnce() -> io::Result<SignalActor>,
) -> Result<Outcome, StartupError> {
    let handle = storage.await?;
    let routers = routers(handle);
    let signals = signals().map_err(StartupError::Signals)?;
    let assembled = assemble(listeners, routers, signals).await?;

    tracing::info!(
        admin = %assembled.admin_addr,
        app = %assembled.app_addr,
        "Service ready"
    );
    Ok(assembled.group.run().await)
}

/// The whole bootstrap sequence, from a validated config to the group outcome.
pub async fn run(config: ServiceConfig) -> Result<Outcome, StartupError> {
    let span = tracing::info_span!(
        "films",
        channel = %config.service.channel,
        env = %config.service.env
    );

    async move {
        let metrics = init_metrics();
        let connector = BackoffConnector::new(config.storage.retry_delay())
            .with_max_attempts(config.storage.max_connect_attempts);
        tracing::info!(url = %storage::postgres::redact(&config.storage.url), "Opening storage");

        let ready_storage = prepare_storage(
            &connector,
            || storage::postgres::connect(&config.storage),
            |pool: &PgPool| PgMigrationStore::new(pool.clone()),
            storage::release_units(),
        );
        launch(
            ready_storage,
            &config.listeners,
            |pool| build_routers(&config, pool, metrics),
            SignalActor::new,
        )
        .await
    }
    .instrument(span)
    .await
}

/// Log the final line and pick the process exit status.
pub fn exit_status(result: &Result<Outcome, StartupError>) -> ExitCode {
    match result {
        Ok(outcome) if outcome.is_error() => {
            tracing::error!(exit = %outcome, "Service stopped after a failure");
            outcome.exit_code()
        }
        Ok(outcome) => {
            tracing::info!(exit = %outcome, "Service stopped");
            outcome.exit_code()
        }
        Err(e) => {
            tracing::error!(error = %e, "Startup failed");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use tokio::sync::mpsc;

    use crate::lifecycle::signals::Signal;
    use crate::storage::migrate::tests::{units, MemoryStore};

    fn loopback() -> ListenersConfig {
        ListenersConfig {
            admin_address: "127.0.0.1:0".into(),
            app_address: "127.0.0.1:0".into(),
            ..ListenersConfig::default()
        }
    }

    fn empty_routers(calls: &Arc<AtomicU32>) -> impl FnOnce(()) -> Routers {
        let calls = calls.clone();
        move |()| {
            calls.fetch_add(1, Ordering::SeqCst);
            Routers {
                admin: Router::new(),
                app: Router::new(),
            }
        }
    }

    fn ok_connect(attempts: &Arc<AtomicU32>) -> impl FnMut() -> std::future::Ready<Result<(), sqlx::Error>> {
        let attempts = attempts.clone();
        move || {
            attempts.fetch_add(1, Ordering::SeqCst);
            std::future::ready(Ok(()))
        }
    }

    #[tokio::test]
    async fn migration_failure_stops_before_any_listener() {
        let connector = BackoffConnector::new(Duration::from_millis(10));
        let attempts = Arc::new(AtomicU32::new(0));
        let router_calls = Arc::new(AtomicU32::new(0));
        let signal_calls = Arc::new(AtomicU32::new(0));

        let units = units();
        let storage = prepare_storage(
            &connector,
            ok_connect(&attempts),
            |_: &()| {
                let store = MemoryStore::default();
                *store.fail_on.lock().unwrap() = Some(2);
                store
            },
            &units,
        );
        let result = launch(storage, &loopback(), empty_routers(&router_calls), {
            let signal_calls = signal_calls.clone();
            move || {
                signal_calls.fetch_add(1, Ordering::SeqCst);
                let (_tx, rx) = mpsc::channel(1);
                Ok(SignalActor::from_channel(rx))
            }
        })
        .await;

        assert!(matches!(
            result,
            Err(StartupError::Migration(MigrationError::Apply { version: 2, .. }))
        ));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
        assert_eq!(router_calls.load(Ordering::SeqCst), 0);
        assert_eq!(signal_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn exhausted_connect_never_reaches_migrations() {
        let connector =
            BackoffConnector::new(Duration::from_millis(5)).with_max_attempts(Some(2));
        let migrated = Arc::new(AtomicU32::new(0));

        let result = prepare_storage(
            &connector,
            || std::future::ready(Err::<(), _>(sqlx::Error::PoolTimedOut)),
            {
                let migrated = migrated.clone();
                move |_: &()| {
                    migrated.fetch_add(1, Ordering::SeqCst);
                    MemoryStore::default()
                }
            },
            &units(),
        )
        .await;

        match result {
            Err(StartupError::Storage(err)) => assert_eq!(err.attempts, 2),
            other => panic!("unexpected result: {other:?}"),
        }
        assert_eq!(migrated.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn ready_storage_runs_the_group_until_signalled() {
        let connector = BackoffConnector::new(Duration::from_millis(10));
        let attempts = Arc::new(AtomicU32::new(0));
        let router_calls = Arc::new(AtomicU32::new(0));

        let (tx, rx) = mpsc::channel(1);
        tx.send(Signal::Interrupt).await.unwrap();

        let units = units();
        let storage = prepare_storage(
            &connector,
            ok_connect(&attempts),
            |_: &()| MemoryStore::default(),
            &units,
        );
        let outcome = tokio::time::timeout(
            Duration::from_secs(2),
            launch(storage, &loopback(), empty_routers(&router_calls), move || {
                Ok(SignalActor::from_channel(rx))
            }),
        )
        .await
        .expect("group stopped")
        .unwrap();

        assert_eq!(outcome.actor, "signals");
        assert_eq!(outcome.signal(), Some(Signal::Interrupt));
        assert_eq!(router_calls.load(Ordering::SeqCst), 1);
    }
}
