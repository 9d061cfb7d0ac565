//! Run a set of actors until the first one stops, then stop the rest.
//!
//! # Algorithm
//! ```text
//! spawn run() for every actor (one task each)
//!     → wait for the first task to finish        (the trigger)
//!     → interrupt() every other actor, once each
//!     → join every remaining task                (no deadline)
//!     → return the trigger's outcome
//! ```
//!
//! # Design Decisions
//! - One coordinator owns the `JoinSet`, so simultaneous exits are serialized
//! - A panicking actor counts as a failed one
//! - Later exits are logged but never replace the trigger's outcome

use std::collections::HashMap;
use std::sync::Arc;

use tokio::task::{Id, JoinError, JoinSet};
use tracing::Instrument;

use crate::lifecycle::actor::{Actor, ActorError, ActorResult, Exit, Outcome};

/// Actors that live and die together.
#[derive(Default)]
pub struct ActorGroup {
    actors: Vec<Arc<dyn Actor>>,
}

impl ActorGroup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an actor.
    pub fn add<A: Actor + 'static>(&mut self, actor: A) -> &mut Self {
        self.actors.push(Arc::new(actor));
        self
    }

    /// Register an actor the caller keeps a handle to.
    pub fn add_shared(&mut self, actor: Arc<dyn Actor>) -> &mut Self {
        self.actors.push(actor);
        self
    }

    pub fn len(&self) -> usize {
        self.actors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actors.is_empty()
    }

    /// Run every actor; return once all of them have stopped.
    ///
    /// An empty group completes immediately.
    pub async fn run(self) -> Outcome {
        let mut tasks = JoinSet::new();
        let mut index_of: HashMap<Id, usize> = HashMap::with_capacity(self.actors.len());

        for (index, actor) in self.actors.iter().enumerate() {
            let actor = Arc::clone(actor);
            let span = tracing::info_span!("actor", actor = actor.name());
            tracing::info!(actor = actor.name(), "Starting actor");
            let handle = tasks.spawn(async move { actor.run().await }.instrument(span));
            index_of.insert(handle.id(), index);
        }

        let (first, result) = loop {
            match tasks.join_next_with_id().await {
                None => {
                    return Outcome {
                        actor: "group".to_string(),
                        result: Ok(Exit::Completed),
                    };
                }
                Some(joined) => {
                    if let Some(resolved) = resolve(joined, &index_of) {
                        break resolved;
                    }
                }
            }
        };

        let trigger = self.name_of(first);
        match &result {
            Ok(exit) => tracing::info!(actor = %trigger, exit = %exit, "Actor stopped, shutting down group"),
            Err(e) => tracing::error!(actor = %trigger, error = %e, "Actor failed, shutting down group"),
        }

        for (index, actor) in self.actors.iter().enumerate() {
            if index != first {
                tracing::debug!(actor = actor.name(), "Interrupting actor");
                actor.interrupt();
            }
        }

        while let Some(joined) = tasks.join_next_with_id().await {
            let Some((index, result)) = resolve(joined, &index_of) else {
                continue;
            };
            let actor = self.name_of(index);
            match result {
                Ok(exit) => tracing::info!(actor = %actor, exit = %exit, "Actor stopped"),
                Err(e) => tracing::warn!(actor = %actor, error = %e, "Actor failed during shutdown"),
            }
        }

        tracing::info!(actors = self.actors.len(), "All actors stopped");
        Outcome {
            actor: trigger,
            result,
        }
    }

    fn name_of(&self, index: usize) -> String {
        self.actors
            .get(index)
            .map(|actor| actor.name().to_string())
            .unwrap_or_default()
    }
}

fn resolve(
    joined: Result<(Id, ActorResult), JoinError>,
    index_of: &HashMap<Id, usize>,
) -> Option<(usize, ActorResult)> {
    match joined {
        Ok((id, result)) => index_of.get(&id).map(|&index| (index, result)),
        Err(e) => index_of
            .get(&e.id())
            .map(|&index| (index, Err(ActorError::Panicked(e.to_string())))),
    }
}
