//! Films business logic.
//!
//! # Responsibilities
//! - `sum` and `concat`, the arithmetic/string methods exposed over HTTP
//! - `film_count`, a read against the storage handle
//! - Count integers summed and characters concatenated
//!
//! # Design Decisions
//! - Built once by the bootstrap sequence with the shared pool and its counters
//! - Cheap to clone: every field is a handle

use metrics::Counter;
use sqlx::PgPool;

use crate::observability::metrics::ServiceCounters;

/// Longest string `concat` may produce.
pub const MAX_CONCAT_LEN: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ServiceError {
    #[error("can't sum two zeroes")]
    TwoZeroes,

    #[error("integer overflow")]
    IntOverflow,

    #[error("result exceeds maximum size of {MAX_CONCAT_LEN} characters")]
    MaxSizeExceeded,

    #[error("storage error: {0}")]
    Storage(String),
}

impl ServiceError {
    /// True for errors caused by the caller's input.
    pub fn is_client_error(&self) -> bool {
        !matches!(self, ServiceError::Storage(_))
    }
}

#[derive(Clone)]
pub struct FilmsService {
    pool: PgPool,
    ints: Counter,
    chars: Counter,
}

impl FilmsService {
    pub fn new(pool: PgPool, counters: ServiceCounters) -> Self {
        Self {
            pool,
            ints: counters.ints,
            chars: counters.chars,
        }
    }

    pub fn sum(&self, a: i64, b: i64) -> Result<i64, ServiceError> {
        if a == 0 && b == 0 {
            return Err(ServiceError::TwoZeroes);
        }
        let v = a.checked_add(b).ok_or(ServiceError::IntOverflow)?;
        self.ints.increment(2);
        tracing::debug!(a, b, v, "sum");
        Ok(v)
    }

    pub fn concat(&self, a: &str, b: &str) -> Result<String, ServiceError> {
        let len = a.chars().count() + b.chars().count();
        if len > MAX_CONCAT_LEN {
            return Err(ServiceError::MaxSizeExceeded);
        }
        let v = format!("{a}{b}");
        self.chars.increment(len as u64);
        tracing::debug!(a, b, v = %v, "concat");
        Ok(v)
    }

    pub async fn film_count(&self) -> Result<i64, ServiceError> {
        sqlx::query_scalar::<_, i64>("SELECT count(*) FROM films")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, "film count query failed");
                ServiceError::Storage(e.to_string())
            })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use sqlx::postgres::PgPoolOptions;

    /// A service whose pool never connects; fine for the pure methods.
    pub(crate) fn offline_service() -> FilmsService {
        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://films@127.0.0.1:1/films")
            .unwrap();
        FilmsService::new(pool, ServiceCounters::register())
    }

    #[tokio::test]
    async fn sum_rules() {
        let service = offline_service();
        assert_eq!(service.sum(2, 3), Ok(5));
        assert_eq!(service.sum(-4, 0), Ok(-4));
        assert_eq!(service.sum(0, 0), Err(ServiceError::TwoZeroes));
        assert_eq!(service.sum(i64::MAX, 1), Err(ServiceError::IntOverflow));
    }

    #[tokio::test]
    async fn concat_rules() {
        let service = offline_service();
        assert_eq!(service.concat("foo", "bar").as_deref(), Ok("foobar"));
        assert_eq!(service.concat("", "").as_deref(), Ok(""));
        assert_eq!(service.concat("123456", "7890"), Ok("1234567890".to_string()));
        assert_eq!(service.concat("123456", "78901"), Err(ServiceError::MaxSizeExceeded));
    }

    #[test]
    fn storage_errors_are_not_client_errors() {
        assert!(ServiceError::TwoZeroes.is_client_error());
        assert!(!ServiceError::Storage("down".into()).is_client_error());
    }
}
