//! Validates requests and launches workers.

use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use courier_core::{EngineConfig, OperationId, OperationKind, ValidationError};
use tokio::sync::{Semaphore, mpsc};
use tokio_util::sync::CancellationToken;

use crate::OperationEvent;
use crate::fs::FileSystem;
use crate::registry::Registry;
use crate::worker::{Worker, WorkerSettings};

/// A request that passed validation, with paths made absolute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidRequest {
    pub kind: OperationKind,
    pub sources: Vec<PathBuf>,
    pub destination: Option<PathBuf>,
}

/// Public entry point for starting and cancelling operations.
pub struct Dispatcher {
    fs: Arc<dyn FileSystem>,
    events: mpsc::Sender<OperationEvent>,
    tokens: HashMap<OperationId, CancellationToken>,
    slots: Option<Arc<Semaphore>>,
    config: EngineConfig,
}

impl Dispatcher {
    pub fn new(
        fs: Arc<dyn FileSystem>,
        events: mpsc::Sender<OperationEvent>,
        config: EngineConfig,
    ) -> Self {
        Self {
            fs,
            events,
            tokens: HashMap::new(),
            slots: config.worker_limit().map(|n| Arc::new(Semaphore::new(n))),
            config,
        }
    }

    /// Check a request without touching the filesystem.
    ///
    /// Relative paths are resolved against the working directory and `.`/`..`
    /// are folded lexically, so symlinked aliases of a source are not caught.
    pub fn validate(
        kind: OperationKind,
        sources: &[PathBuf],
        destination: Option<&Path>,
    ) -> Result<ValidRequest, ValidationError> {
        if sources.is_empty() {
            return Err(ValidationError::EmptySources);
        }

        let destination = match (kind.needs_destination(), destination) {
            (true, None) => return Err(ValidationError::MissingDestination { kind }),
            (false, Some(_)) => return Err(ValidationError::UnexpectedDestination { kind }),
            (true, Some(dest)) => Some(normalize(dest)),
            (false, None) => None,
        };

        let mut resolved: Vec<PathBuf> = Vec::with_capacity(sources.len());
        for source in sources {
            if source.as_os_str().is_empty() {
                return Err(ValidationError::InvalidSource {
                    path: source.clone(),
                });
            }
            let path = normalize(source);
            if path.file_name().is_none() {
                return Err(ValidationError::InvalidSource {
                    path: source.clone(),
                });
            }
            if let Some(dest) = &destination {
                if dest.starts_with(&path) {
                    return Err(ValidationError::DestinationInsideSource {
                        kind,
                        path: source.clone(),
                        destination: dest.clone(),
                    });
                }
            }
            if let Some(other) = resolved
                .iter()
                .find(|other| path.starts_with(other) || other.starts_with(&path))
            {
                return Err(ValidationError::OverlappingSources {
                    path: source.clone(),
                    other: other.clone(),
                });
            }
            resolved.push(path);
        }

        Ok(ValidRequest {
            kind,
            sources: resolved,
            destination,
        })
    }

    /// Validate, register and launch an operation. Returns immediately.
    ///
    /// Must be called from within a tokio runtime.
    pub fn submit(
        &mut self,
        registry: &mut Registry,
        kind: OperationKind,
        sources: Vec<PathBuf>,
        destination: Option<PathBuf>,
    ) -> Result<OperationId, ValidationError> {
        let request = Self::validate(kind, &sources, destination.as_deref())?;
        let id = registry.create(
            request.kind,
            request.sources.clone(),
            request.destination.clone(),
        );
        let cancel = CancellationToken::new();
        self.tokens.insert(id, cancel.clone());

        tracing::info!(
            id = %id,
            kind = %kind,
            sources = request.sources.len(),
            destination = ?request.destination,
            "operation submitted"
        );

        Worker {
            id,
            kind: request.kind,
            sources: request.sources,
            destination: request.destination,
            fs: Arc::clone(&self.fs),
            cancel,
            events: self.events.clone(),
            slots: self.slots.clone(),
            settings: WorkerSettings {
                progress_batch: self.config.progress_batch,
                progress_interval: self.config.progress_interval(),
                conflict_policy: self.config.conflict_policy,
            },
        }
        .spawn();

        Ok(id)
    }

    /// Ask a running or pending operation to stop at its next item.
    ///
    /// Returns `true` only for the call that trips the flag; repeated calls,
    /// unknown ids and finished operations are no-ops.
    pub fn cancel(&mut self, registry: &Registry, id: OperationId) -> bool {
        let live = registry.get(id).is_some_and(|op| !op.is_terminal());
        match self.tokens.get(&id) {
            Some(token) if live && !token.is_cancelled() => {
                token.cancel();
                tracing::info!(id = %id, "cancellation requested");
                true
            }
            _ => false,
        }
    }

    /// Forget the cancellation flag of a finished operation.
    pub fn release(&mut self, id: OperationId) {
        self.tokens.remove(&id);
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }
}

/// Absolute, lexically normalized form of `path`.
fn normalize(path: &Path) -> PathBuf {
    let absolute = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
    let mut out = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}
