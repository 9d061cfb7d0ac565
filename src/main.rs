//! Films service.
//!
//! # Architecture Overview
//!
//! ```text
//!   ┌──────────────────────────────── films-service ────────────────────────────────┐
//!   │                                                                                │
//!   │  config ─▶ storage connect (retry) ─▶ migrations ─▶ service/endpoints/routers  │
//!   │                                                            │                   │
//!   │                                                            ▼                   │
//!   │   ┌──────────────────────────── actor group ───────────────────────────────┐  │
//!   │   │  admin listener (/metrics, /admin/status)                              │  │
//!   │   │  app listener   (/sum, /concat, /films/count)                          │  │
//!   │   │  signal watcher (SIGINT, SIGTERM)                                      │  │
//!   │   │                                                                        │  │
//!   │   │  first to stop ─▶ interrupt the others ─▶ wait for all ─▶ outcome      │  │
//!   │   └────────────────────────────────────────────────────────────────────────┘  │
//!   │                                                            │                   │
//!   │                                                            ▼                   │
//!   │                                                     final log + exit code      │
//!   └────────────────────────────────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use films_service::config::{load_config, ObservabilityConfig};
use films_service::lifecycle::startup;
use films_service::observability::logging;

#[derive(Parser)]
#[command(name = "films-service")]
#[command(about = "Films service with admin, application and signal actors", long_about = None)]
struct Cli {
    /// Optional TOML config file; environment variables override it.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            logging::init(&ObservabilityConfig::default());
            tracing::error!(error = %e, "Configuration invalid");
            return ExitCode::FAILURE;
        }
    };

    logging::init(&config.observability);
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        admin_address = %config.listeners.admin_address,
        app_address = %config.listeners.app_address,
        retry_delay_secs = config.storage.retry_delay_secs,
        "films-service starting"
    );

    let result = startup::run(config).await;
    startup::exit_status(&result)
}
