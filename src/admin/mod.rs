//! Admin listener routes.
//!
//! `/metrics` is always open so scrapers need no credentials; `/admin/*` sits
//! behind the bearer token when one is configured.

pub mod auth;
pub mod handlers;

use std::sync::Arc;

use axum::{middleware, routing::get, Router};
use metrics_exporter_prometheus::PrometheusHandle;

use self::auth::admin_auth_middleware;
use self::handlers::{get_metrics, get_status};
use crate::config::AppConfig;

#[derive(Clone)]
pub struct AdminState {
    pub metrics: PrometheusHandle,
    pub token: Option<Arc<str>>,
    pub env: Arc<str>,
    pub channel: Arc<str>,
}

impl AdminState {
    pub fn new(metrics: PrometheusHandle, app: &AppConfig) -> Self {
        Self {
            metrics,
            token: app.token.as_deref().map(Arc::from),
            env: Arc::from(app.env.as_str()),
            channel: Arc::from(app.channel.as_str()),
        }
    }
}

pub fn setup_admin_router(state: AdminState) -> Router {
    let guarded = Router::new()
        .route("/admin/status", get(get_status))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            admin_auth_middleware,
        ));

    Router::new()
        .route("/metrics", get(get_metrics))
        .merge(guarded)
        .with_state(state)
}
