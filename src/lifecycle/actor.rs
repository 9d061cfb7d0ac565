//! The actor contract shared by every long-running component.
//!
//! # State Machine
//! ```text
//! Idle → Running → { Completed | Interrupted | Signalled | Failed }
//! ```
//!
//! # Design Decisions
//! - `run` takes `&self` so the group can call `interrupt` while `run` is pending
//! - `interrupt` never blocks and is a no-op once the actor has stopped
//! - Each actor records whether it was interrupted; the exit kind never depends on
//!   error text from the layer below

use std::fmt;
use std::net::SocketAddr;
use std::process::ExitCode;

use async_trait::async_trait;

use crate::lifecycle::signals::Signal;

/// How an actor stopped when it did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exit {
    /// The work finished on its own.
    Completed,
    /// `interrupt` was called and honoured.
    Interrupted,
    /// An operator signal arrived.
    Signalled(Signal),
}

impl fmt::Display for Exit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Exit::Completed => write!(f, "completed"),
            Exit::Interrupted => write!(f, "interrupted"),
            Exit::Signalled(signal) => write!(f, "received signal {signal}"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ActorError {
    #[error("serving on {addr} failed: {source}")]
    Serve {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot install signal handler: {0}")]
    SignalHandler(#[source] std::io::Error),

    #[error("actor was already run")]
    AlreadyRan,

    #[error("actor panicked: {0}")]
    Panicked(String),

    #[error("{0}")]
    Other(#[source] Box<dyn std::error::Error + Send + Sync>),
}

pub type ActorResult = Result<Exit, ActorError>;

/// A long-running unit of work that can be asked to stop.
#[async_trait]
pub trait Actor: Send + Sync {
    /// Label used in log lines and outcomes.
    fn name(&self) -> &str;

    /// Do the work. Called exactly once.
    async fn run(&self) -> ActorResult;

    /// Ask a pending `run` to return promptly.
    fn interrupt(&self);
}

/// The result of the actor that stopped first, which decides the process fate.
#[derive(Debug)]
pub struct Outcome {
    pub actor: String,
    pub result: ActorResult,
}

impl Outcome {
    pub fn is_error(&self) -> bool {
        self.result.is_err()
    }

    /// The operator signal that ended the process, if that is what happened.
    pub fn signal(&self) -> Option<Signal> {
        match self.result {
            Ok(Exit::Signalled(signal)) => Some(signal),
            _ => None,
        }
    }

    pub fn exit_code(&self) -> ExitCode {
        if self.is_error() {
            ExitCode::FAILURE
        } else {
            ExitCode::SUCCESS
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.result {
            Ok(exit) => write!(f, "{}: {exit}", self.actor),
            Err(e) => write!(f, "{}: {e}", self.actor),
        }
    }
}
