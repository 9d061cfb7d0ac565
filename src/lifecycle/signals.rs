//! OS signal handling.
//!
//! # Responsibilities
//! - Register SIGINT and SIGTERM handlers
//! - Turn the first delivered signal into an actor exit
//! - Stop waiting when the group interrupts the actor
//!
//! # Design Decisions
//! - Uses Tokio's signal handling (async-safe)
//! - Handlers are registered at construction, so a signal that arrives before
//!   the group starts is queued instead of killing the process
//! - Other signals keep their default disposition
//! - Signals can come from a channel instead of the OS, for tests and embedding

use std::fmt;
use std::io;

use async_trait::async_trait;
use tokio::sync::{mpsc, Mutex};

use crate::lifecycle::actor::{Actor, ActorError, ActorResult, Exit};
use crate::lifecycle::shutdown::Shutdown;

/// Termination signals the service reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Signal {
    /// SIGINT (Ctrl-C).
    Interrupt,
    /// SIGTERM.
    Terminate,
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Signal::Interrupt => write!(f, "SIGINT"),
            Signal::Terminate => write!(f, "SIGTERM"),
        }
    }
}

#[cfg(unix)]
struct OsSignals {
    interrupt: tokio::signal::unix::Signal,
    terminate: tokio::signal::unix::Signal,
}

#[cfg(unix)]
impl OsSignals {
    fn install() -> io::Result<Self> {
        use tokio::signal::unix::{signal, SignalKind};

        Ok(Self {
            interrupt: signal(SignalKind::interrupt())?,
            terminate: signal(SignalKind::terminate())?,
        })
    }

    async fn recv(&mut self) -> Signal {
        tokio::select! {
            _ = self.interrupt.recv() => Signal::Interrupt,
            _ = self.terminate.recv() => Signal::Terminate,
        }
    }
}

enum Source {
    #[cfg(unix)]
    Os(Mutex<OsSignals>),
    #[cfg(not(unix))]
    Os,
    Channel(Mutex<mpsc::Receiver<Signal>>),
}

/// Actor that ends when the process is told to stop.
pub struct SignalActor {
    source: Source,
    cancel: Shutdown,
}

impl SignalActor {
    /// Watch real OS signals. Must be called inside a Tokio runtime.
    ///
    /// From here on SIGINT and SIGTERM no longer terminate the process by
    /// default; they are held until the actor runs.
    pub fn new() -> io::Result<Self> {
        #[cfg(unix)]
        let source = Source::Os(Mutex::new(OsSignals::install()?));
        #[cfg(not(unix))]
        let source = Source::Os;

        Ok(Self {
            source,
            cancel: Shutdown::new(),
        })
    }

    /// Watch signals sent through a channel instead of the OS.
    ///
    /// A closed channel is never treated as a signal.
    pub fn from_channel(rx: mpsc::Receiver<Signal>) -> Self {
        Self {
            source: Source::Channel(Mutex::new(rx)),
            cancel: Shutdown::new(),
        }
    }

    async fn next_signal(&self) -> Result<Signal, ActorError> {
        match &self.source {
            #[cfg(unix)]
            Source::Os(signals) => Ok(signals.lock().await.recv().await),
            #[cfg(not(unix))]
            Source::Os => {
                tokio::signal::ctrl_c()
                    .await
                    .map_err(ActorError::SignalHandler)?;
                Ok(Signal::Interrupt)
            }
            Source::Channel(rx) => {
                let mut rx = rx.lock().await;
                match rx.recv().await {
                    Some(signal) => Ok(signal),
                    None => std::future::pending().await,
                }
            }
        }
    }
}

#[async_trait]
impl Actor for SignalActor {
    fn name(&self) -> &str {
        "signals"
    }

    async fn run(&self) -> ActorResult {
        tokio::select! {
            received = self.next_signal() => {
                let signal = received?;
                tracing::info!(%signal, "Received termination signal");
                Ok(Exit::Signalled(signal))
            }
            () = self.cancel.wait() => Ok(Exit::Interrupted),
        }
    }

    fn interrupt(&self) {
        if self.cancel.trigger() {
            tracing::debug!("Signal watcher cancelled");
        }
    }
}
