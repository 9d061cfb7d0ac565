//! Application HTTP transport.
//!
//! # Responsibilities
//! - Create the axum Router served by the application listener
//! - Decode JSON requests, encode JSON responses and errors
//! - Wire up middleware (request ID, timeout, tracing)

use std::time::Duration;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::http::endpoints::{
    ConcatRequest, ConcatResponse, Endpoints, FilmCountResponse, SumRequest, SumResponse,
};
use crate::service::ServiceError;

#[derive(Serialize)]
struct ErrorBody {
    err: String,
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = if self.is_client_error() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::SERVICE_UNAVAILABLE
        };
        (status, Json(ErrorBody { err: self.to_string() })).into_response()
    }
}

/// Build the application router with all middleware layers.
#[allow(deprecated)]
pub fn app_router(endpoints: Endpoints, request_timeout: Duration) -> Router {
    Router::new()
        .route("/sum", post(sum))
        .route("/concat", post(concat))
        .route("/films/count", get(film_count))
        .with_state(endpoints)
        .layer(TimeoutLayer::new(request_timeout))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
}

async fn sum(
    State(endpoints): State<Endpoints>,
    Json(req): Json<SumRequest>,
) -> Result<Json<SumResponse>, ServiceError> {
    endpoints.sum(req).map(Json)
}

async fn concat(
    State(endpoints): State<Endpoints>,
    Json(req): Json<ConcatRequest>,
) -> Result<Json<ConcatResponse>, ServiceError> {
    endpoints.concat(req).map(Json)
}

async fn film_count(
    State(endpoints): State<Endpoints>,
) -> Result<Json<FilmCountResponse>, ServiceError> {
    endpoints.film_count().await.map(Json)
}
