//! The facade the UI loop owns.
//!
//! [`Engine`] bundles the registry, the dispatcher and the receiving half of
//! the event queue. Every method takes `&mut self` or `&self` on the loop's
//! own task; workers only ever hold a sender.

use std::path::PathBuf;
use std::sync::Arc;

use courier_core::{EngineConfig, Operation, OperationId, OperationKind, ValidationError};
use tokio::sync::mpsc;

use crate::OperationEvent;
use crate::dispatcher::Dispatcher;
use crate::fs::{FileSystem, LocalFileSystem};
use crate::registry::{ApplyError, Registry};

pub struct Engine {
    registry: Registry,
    dispatcher: Dispatcher,
    events: mpsc::Receiver<OperationEvent>,
}

impl Engine {
    /// Engine working on the local disk.
    pub fn new(config: EngineConfig) -> Self {
        Self::with_file_system(Arc::new(LocalFileSystem::new()), config)
    }

    pub fn with_file_system(fs: Arc<dyn FileSystem>, config: EngineConfig) -> Self {
        let (tx, rx) = mpsc::channel(config.channel_capacity.max(1));
        Self {
            registry: Registry::new(),
            dispatcher: Dispatcher::new(fs, tx, config),
            events: rx,
        }
    }

    /// Validate and start an operation. Returns without waiting for it.
    pub fn submit(
        &mut self,
        kind: OperationKind,
        sources: Vec<PathBuf>,
        destination: Option<PathBuf>,
    ) -> Result<OperationId, ValidationError> {
        self.dispatcher
            .submit(&mut self.registry, kind, sources, destination)
    }

    /// Request cooperative cancellation. See [`Dispatcher::cancel`].
    pub fn cancel(&mut self, id: OperationId) -> bool {
        self.dispatcher.cancel(&self.registry, id)
    }

    /// Apply one event to the registry. Returns whether anything changed.
    pub fn apply(&mut self, event: OperationEvent) -> bool {
        let id = event.id();
        match self.registry.apply(event) {
            Ok(Some(state)) => {
                self.dispatcher.release(id);
                if let Some(op) = self.registry.get(id) {
                    tracing::info!(id = %id, state = %state, summary = %op.summary(), "operation finished");
                }
                true
            }
            Ok(None) => true,
            Err(e @ ApplyError::Unknown(_)) => {
                tracing::debug!(error = %e, "event dropped");
                false
            }
            Err(e @ ApplyError::Rejected { .. }) => {
                tracing::debug!(error = %e, "late event discarded");
                false
            }
        }
    }

    /// Apply every event already queued without waiting.
    ///
    /// Returns the number of events received.
    pub fn drain(&mut self) -> usize {
        let mut received = 0;
        while let Ok(event) = self.events.try_recv() {
            self.apply(event);
            received += 1;
        }
        received
    }

    /// Wait for the next event without applying it.
    ///
    /// Cancel-safe, so it can sit in a `tokio::select!` arm.
    pub async fn next_event(&mut self) -> Option<OperationEvent> {
        self.events.recv().await
    }

    /// Apply events until `id` reaches a terminal state.
    pub async fn wait_for(&mut self, id: OperationId) -> Option<&Operation> {
        loop {
            match self.registry.get(id) {
                None => return None,
                Some(op) if op.is_terminal() => break,
                Some(_) => {}
            }
            let event = self.events.recv().await?;
            self.apply(event);
        }
        self.registry.get(id)
    }

    /// Apply events until no operation is left running.
    pub async fn wait_all(&mut self) {
        while self.registry.active() > 0 {
            let Some(event) = self.events.recv().await else {
                break;
            };
            self.apply(event);
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn get(&self, id: OperationId) -> Option<&Operation> {
        self.registry.get(id)
    }

    pub fn len(&self) -> usize {
        self.registry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }

    pub fn has_active(&self) -> bool {
        self.registry.active() > 0
    }

    /// Owned copies of every record in display order.
    pub fn snapshot(&self) -> Vec<Operation> {
        self.registry
            .display_order()
            .into_iter()
            .cloned()
            .collect()
    }

    pub fn clear_finished(&mut self) -> usize {
        self.registry.clear_finished()
    }

    pub fn config(&self) -> &EngineConfig {
        self.dispatcher.config()
    }
}
