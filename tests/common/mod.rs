//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::time::Duration;

use films_service::config::ServiceConfig;
use films_service::lifecycle::startup::{self, Routers};
use films_service::observability::metrics::init_metrics;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

/// A pool that never connects until a query runs. Needs a runtime.
pub fn offline_pool() -> PgPool {
    PgPoolOptions::new()
        .acquire_timeout(Duration::from_millis(200))
        .connect_lazy("postgres://films@127.0.0.1:1/films")
        .unwrap()
}

/// Config with both listeners on ephemeral loopback ports.
pub fn loopback_config() -> ServiceConfig {
    let mut config = ServiceConfig::default();
    config.listeners.admin_address = "127.0.0.1:0".into();
    config.listeners.app_address = "127.0.0.1:0".into();
    config
}

pub fn routers(config: &ServiceConfig) -> Routers {
    startup::build_routers(config, offline_pool(), init_metrics())
}

/// HTTP client without connection reuse or proxies.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .timeout(Duration::from_secs(5))
        .build()
        .unwrap()
}
