//! TCP listener binding and the actor that serves on it.
//!
//! # Responsibilities
//! - Bind to configured address during bootstrap (bind errors are fatal there)
//! - Serve an axum router on the bound socket inside the actor group
//! - Close the socket when interrupted and report a clean exit
//!
//! # Design Decisions
//! - Binding and serving are split so a taken port never becomes an actor failure
//! - Interruption is recorded by the actor itself, not inferred from I/O errors
//! - In-flight requests are drained by axum's graceful shutdown after the socket closes,
//!   but only until the drain deadline; stragglers must not hold the group open

use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use tokio::net::TcpListener;

use crate::config::listen_address;
use crate::lifecycle::actor::{Actor, ActorError, ActorResult, Exit};
use crate::lifecycle::shutdown::Shutdown;

/// Error type for listener setup.
#[derive(Debug, thiserror::Error)]
pub enum ListenerError {
    #[error("{name}: '{address}' is not a listen address")]
    Address { name: String, address: String },

    #[error("{name}: failed to bind {address}: {source}")]
    Bind {
        name: String,
        address: String,
        #[source]
        source: std::io::Error,
    },
}

/// Default time an interrupted listener gives open connections to finish.
pub const DEFAULT_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Bind `address` for the listener called `name`.
///
/// Hostnames are resolved here; `:port` listens on every IPv4 interface.
pub async fn bind(name: &str, address: &str) -> Result<TcpListener, ListenerError> {
    let target = listen_address(address).ok_or_else(|| ListenerError::Address {
        name: name.to_string(),
        address: address.to_string(),
    })?;

    let bind_error = |source| ListenerError::Bind {
        name: name.to_string(),
        address: address.to_string(),
        source,
    };
    let listener = TcpListener::bind(target.as_str()).await.map_err(bind_error)?;
    let local_addr = listener.local_addr().map_err(bind_error)?;

    tracing::info!(listener = name, address = %local_addr, "Listener bound");
    Ok(listener)
}

/// Serves a router on a pre-bound socket until interrupted.
pub struct ListenerActor {
    name: String,
    local_addr: SocketAddr,
    listener: Mutex<Option<TcpListener>>,
    router: Router,
    shutdown: Shutdown,
    drain_timeout: Duration,
}

impl ListenerActor {
    /// Wrap an already bound socket.
    pub fn new(
        name: impl Into<String>,
        listener: TcpListener,
        router: Router,
    ) -> Result<Self, ListenerError> {
        let name = name.into();
        let local_addr = listener.local_addr().map_err(|source| ListenerError::Bind {
            name: name.clone(),
            address: "<bound socket>".to_string(),
            source,
        })?;

        Ok(Self {
            name,
            local_addr,
            listener: Mutex::new(Some(listener)),
            router,
            shutdown: Shutdown::new(),
            drain_timeout: DEFAULT_DRAIN_TIMEOUT,
        })
    }

    /// Bound the wait for open connections once interrupted.
    pub fn with_drain_timeout(mut self, drain_timeout: Duration) -> Self {
        self.drain_timeout = drain_timeout;
        self
    }

    /// Bind `address` and wrap the socket.
    pub async fn bind(
        name: impl Into<String>,
        address: &str,
        router: Router,
    ) -> Result<Self, ListenerError> {
        let name = name.into();
        let listener = bind(&name, address).await?;
        Self::new(name, listener, router)
    }

    /// The address actually bound (resolves port 0).
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }
}

#[async_trait]
impl Actor for ListenerActor {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self) -> ActorResult {
        let listener = self
            .listener
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .ok_or(ActorError::AlreadyRan)?;

        tracing::info!(listener = %self.name, address = %self.local_addr, "Serving");
        let serve = axum::serve(listener, self.router.clone())
            .with_graceful_shutdown(self.shutdown.wait())
            .into_future();
        let deadline = async {
            self.shutdown.wait().await;
            tokio::time::sleep(self.drain_timeout).await;
        };

        tokio::select! {
            served = serve => served.map_err(|source| ActorError::Serve {
                addr: self.local_addr,
                source,
            })?,
            () = deadline => {
                // Dropping the serve future closes the socket; the runtime
                // reaps leftover connection tasks at exit.
                tracing::warn!(
                    listener = %self.name,
                    drain_timeout = ?self.drain_timeout,
                    "Open connections outlived the drain deadline"
                );
            }
        }

        if self.shutdown.is_triggered() {
            Ok(Exit::Interrupted)
        } else {
            Ok(Exit::Completed)
        }
    }

    fn interrupt(&self) {
        if self.shutdown.trigger() {
            tracing::debug!(listener = %self.name, "Closing listener");
        }
    }
}
