//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse & deserialize)
//!     → environment overrides (APP_ENV, DEBUG_ADDR, HTTP_ADDR, POSTGRES_*)
//!     → validation.rs (semantic checks)
//!     → ServiceConfig (validated, immutable)
//!     → borrowed by the bootstrap sequence
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use validation::listen_address;
pub use schema::{
    AppConfig, ListenersConfig, LogFormat, ObservabilityConfig, ServiceConfig, StorageConfig,
};
