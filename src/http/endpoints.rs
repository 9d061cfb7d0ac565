//! Endpoint layer: request/response types around the service, with timing.

use std::future::Future;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::observability::metrics::RequestDuration;
use crate::service::{FilmsService, ServiceError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct SumRequest {
    pub a: i64,
    pub b: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct SumResponse {
    pub v: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ConcatRequest {
    pub a: String,
    pub b: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ConcatResponse {
    pub v: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct FilmCountResponse {
    pub count: i64,
}

/// Every method of the service, each timed into the duration histogram.
#[derive(Clone)]
pub struct Endpoints {
    service: FilmsService,
    duration: RequestDuration,
}

impl Endpoints {
    pub fn new(service: FilmsService, duration: RequestDuration) -> Self {
        Self { service, duration }
    }

    pub fn sum(&self, req: SumRequest) -> Result<SumResponse, ServiceError> {
        self.timed("sum", || self.service.sum(req.a, req.b).map(|v| SumResponse { v }))
    }

    pub fn concat(&self, req: ConcatRequest) -> Result<ConcatResponse, ServiceError> {
        self.timed("concat", || {
            self.service
                .concat(&req.a, &req.b)
                .map(|v| ConcatResponse { v })
        })
    }

    pub async fn film_count(&self) -> Result<FilmCountResponse, ServiceError> {
        self.timed_async("film_count", async {
            self.service
                .film_count()
                .await
                .map(|count| FilmCountResponse { count })
        })
        .await
    }

    fn timed<T>(
        &self,
        method: &'static str,
        call: impl FnOnce() -> Result<T, ServiceError>,
    ) -> Result<T, ServiceError> {
        let started = Instant::now();
        let result = call();
        self.duration.record(method, result.is_ok(), started.elapsed());
        result
    }

    async fn timed_async<T>(
        &self,
        method: &'static str,
        call: impl Future<Output = Result<T, ServiceError>>,
    ) -> Result<T, ServiceError> {
        let started = Instant::now();
        let result = call.await;
        self.duration.record(method, result.is_ok(), started.elapsed());
        result
    }
}
