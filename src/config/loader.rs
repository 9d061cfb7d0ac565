//! Configuration loading from disk and environment.

use std::fs;
use std::path::Path;

use crate::config::schema::ServiceConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("{name}: cannot parse '{value}' as a number")]
    Env { name: &'static str, value: String },

    #[error("Validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load configuration: TOML file (if any), then process environment, then validate.
pub fn load_config(path: Option<&Path>) -> Result<ServiceConfig, ConfigError> {
    let mut config = match path {
        Some(path) => {
            let content = fs::read_to_string(path)?;
            toml::from_str(&content)?
        }
        None => ServiceConfig::default(),
    };

    apply_env_overrides(&mut config, |name| std::env::var(name).ok())?;
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Overlay environment variables onto `config`.
///
/// `lookup` resolves a variable name; empty values are ignored.
pub fn apply_env_overrides<F>(config: &mut ServiceConfig, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

    if let Some(v) = get("APP_ENV") {
        config.service.env = v;
    }
    if let Some(v) = get("CHANNEL") {
        config.service.channel = v;
    }
    if let Some(v) = get("TOKEN") {
        config.service.token = Some(v);
    }
    if let Some(v) = get("DEBUG_ADDR") {
        config.listeners.admin_address = v;
    }
    if let Some(v) = get("HTTP_ADDR") {
        config.listeners.app_address = v;
    }
    if let Some(v) = get("POSTGRES_DATABASE") {
        config.storage.url = v;
    }
    if let Some(v) = get("POSTGRES_TIMEOUT") {
        config.storage.retry_delay_secs = v.trim().parse().map_err(|_| ConfigError::Env {
            name: "POSTGRES_TIMEOUT",
            value: v.clone(),
        })?;
    }

    Ok(())
}
