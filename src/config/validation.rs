//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate listener addresses and that they do not collide
//! - Validate the storage URL
//! - Validate value ranges (retry delay > 0, pool size > 0)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ServiceConfig → Result<(), Vec<ValidationError>>
//! - Runs before any listener is bound or storage is contacted

use std::net::SocketAddr;

use url::Url;

use crate::config::schema::ServiceConfig;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("{field}: '{value}' is not a listen address (host:port or :port)")]
    InvalidAddress { field: &'static str, value: String },

    #[error("admin and application listeners share address {0}")]
    AddressCollision(String),

    #[error("storage.url is not a postgres:// or postgresql:// URL")]
    InvalidStorageUrl,

    #[error("{0} must be greater than zero")]
    Zero(&'static str),
}

/// Check a configuration, collecting every problem found.
pub fn validate_config(config: &ServiceConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let admin = check_address("listeners.admin_address", &config.listeners.admin_address, &mut errors);
    let app = check_address("listeners.app_address", &config.listeners.app_address, &mut errors);
    if let (Some(admin), Some(app)) = (admin, app) {
        // Port 0 asks the OS for an ephemeral port, so two of them never collide.
        if admin == app && !admin.ends_with(":0") {
            errors.push(ValidationError::AddressCollision(admin));
        }
    }

    let scheme_ok = Url::parse(&config.storage.url)
        .is_ok_and(|url| {
            matches!(url.scheme(), "postgres" | "postgresql")
                && url.host_str().is_some_and(|host| !host.is_empty())
        });
    if !scheme_ok {
        errors.push(ValidationError::InvalidStorageUrl);
    }

    if config.storage.retry_delay_secs == 0 {
        errors.push(ValidationError::Zero("storage.retry_delay_secs"));
    }
    if config.storage.max_connect_attempts == Some(0) {
        errors.push(ValidationError::Zero("storage.max_connect_attempts"));
    }
    if config.storage.max_connections == 0 {
        errors.push(ValidationError::Zero("storage.max_connections"));
    }
    if config.listeners.request_timeout_secs == 0 {
        errors.push(ValidationError::Zero("listeners.request_timeout_secs"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Normalize a listener address into something `TcpListener::bind` accepts.
///
/// Accepts a literal socket address, `host:port` (resolved at bind time) and
/// the bare `:port` form, which listens on every IPv4 interface.
pub fn listen_address(value: &str) -> Option<String> {
    let value = value.trim();
    if let Some(port) = value.strip_prefix(':') {
        return port.parse::<u16>().ok().map(|port| format!("0.0.0.0:{port}"));
    }
    if value.parse::<SocketAddr>().is_ok() {
        return Some(value.to_string());
    }

    let (host, port) = value.rsplit_once(':')?;
    let hostname = !host.is_empty()
        && host
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.');
    (hostname && port.parse::<u16>().is_ok()).then(|| value.to_string())
}

fn check_address(
    field: &'static str,
    value: &str,
    errors: &mut Vec<ValidationError>,
) -> Option<String> {
    match listen_address(value) {
        Some(addr) => Some(addr),
        None => {
            errors.push(ValidationError::InvalidAddress {
                field,
                value: value.to_string(),
            });
            None
        }
    }
}
