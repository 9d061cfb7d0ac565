//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define service metrics (business counters, request latency, startup)
//! - Install the Prometheus recorder whose handle backs `/metrics`
//!
//! # Metrics
//! - `films_integers_summed_total` (counter): integers passed to `sum`
//! - `films_characters_concatenated_total` (counter): characters produced by `concat`
//! - `films_request_duration_seconds` (histogram): endpoint latency by method, success
//! - `films_storage_connect_attempts_total` (counter): startup connection attempts
//! - `films_migrations_applied_total` (counter): migration units applied by this process
//!
//! # Design Decisions
//! - One process-wide recorder; repeated installation returns the same handle
//! - Handles are passed to collaborators explicitly instead of looked up by name

use std::sync::OnceLock;
use std::time::Duration;

use metrics::{counter, describe_counter, describe_histogram, histogram, Counter};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

pub const INTEGERS_SUMMED: &str = "films_integers_summed_total";
pub const CHARACTERS_CONCATENATED: &str = "films_characters_concatenated_total";
pub const REQUEST_DURATION: &str = "films_request_duration_seconds";
pub const STORAGE_CONNECT_ATTEMPTS: &str = "films_storage_connect_attempts_total";
pub const MIGRATIONS_APPLIED: &str = "films_migrations_applied_total";

static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Install the global Prometheus recorder and return its render handle.
///
/// Safe to call multiple times; subsequent calls return the first handle. If a
/// different recorder already owns the global slot, a detached recorder is used
/// so `/metrics` still renders (empty) output instead of failing startup.
pub fn init_metrics() -> PrometheusHandle {
    PROMETHEUS_HANDLE
        .get_or_init(|| {
            let handle = match PrometheusBuilder::new().install_recorder() {
                Ok(handle) => handle,
                Err(e) => {
                    tracing::warn!(error = %e, "Global metrics recorder unavailable, using detached recorder");
                    PrometheusBuilder::new().build_recorder().handle()
                }
            };

            describe_counter!(INTEGERS_SUMMED, "Total count of integers summed via the Sum method.");
            describe_counter!(
                CHARACTERS_CONCATENATED,
                "Total count of characters concatenated via the Concat method."
            );
            describe_histogram!(REQUEST_DURATION, "Request duration in seconds.");
            describe_counter!(STORAGE_CONNECT_ATTEMPTS, "Storage connection attempts at startup.");
            describe_counter!(MIGRATIONS_APPLIED, "Schema migration units applied.");

            tracing::info!("Prometheus metrics recorder initialized");
            handle
        })
        .clone()
}

/// The two business counters handed to the films service.
#[derive(Clone)]
pub struct ServiceCounters {
    pub ints: Counter,
    pub chars: Counter,
}

impl ServiceCounters {
    pub fn register() -> Self {
        Self {
            ints: counter!(INTEGERS_SUMMED),
            chars: counter!(CHARACTERS_CONCATENATED),
        }
    }
}

/// Endpoint latency histogram, labelled by method name and success.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestDuration;

impl RequestDuration {
    pub fn record(&self, method: &'static str, success: bool, elapsed: Duration) {
        histogram!(
            REQUEST_DURATION,
            "method" => method,
            "success" => if success { "true" } else { "false" }
        )
        .record(elapsed.as_secs_f64());
    }
}

pub fn record_connect_attempt() {
    counter!(STORAGE_CONNECT_ATTEMPTS).increment(1);
}

pub fn record_migrations_applied(count: usize) {
    counter!(MIGRATIONS_APPLIED).increment(count as u64);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_is_idempotent() {
        let _first = init_metrics();
        let second = init_metrics();
        ServiceCounters::register().ints.increment(2);
        // Registered through the first install, visible through the second handle.
        assert!(second.render().contains(INTEGERS_SUMMED));
    }
}
