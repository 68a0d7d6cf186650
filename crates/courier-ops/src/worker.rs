//! Executes one operation against the filesystem.
//!
//! A worker runs as its own tokio task, performs every filesystem call via
//! `spawn_blocking`, and reports through the event queue. It knows its
//! operation only by id and never sees the registry.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use courier_core::{ConflictPolicy, OperationError, OperationId, OperationKind, OperationState};
use tokio::sync::{OwnedSemaphorePermit, Semaphore, mpsc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::OperationEvent;
use crate::conflict::{self, Resolution};
use crate::fs::{Entry, FileSystem, Survey, io_message};
use crate::progress::ProgressThrottle;

/// Per-worker knobs taken from the engine config.
#[derive(Debug, Clone, Copy)]
pub(crate) struct WorkerSettings {
    pub progress_batch: u64,
    pub progress_interval: Duration,
    pub conflict_policy: ConflictPolicy,
}

pub(crate) struct Worker {
    pub id: OperationId,
    pub kind: OperationKind,
    pub sources: Vec<PathBuf>,
    pub destination: Option<PathBuf>,
    pub fs: Arc<dyn FileSystem>,
    pub cancel: CancellationToken,
    pub events: mpsc::Sender<OperationEvent>,
    pub slots: Option<Arc<Semaphore>>,
    pub settings: WorkerSettings,
}

/// What happened to a single item.
enum Step {
    Done,
    Skipped,
}

/// Running counters of one worker.
struct Tally {
    done: u64,
    failed: bool,
    unsent: Vec<OperationError>,
}

impl Tally {
    fn record(&mut self, error: OperationError) {
        self.failed = true;
        self.unsent.push(error);
    }

    fn take_errors(&mut self) -> Vec<OperationError> {
        std::mem::take(&mut self.unsent)
    }

    /// Terminal state for a run that stopped here. Recorded errors win over
    /// cancellation.
    fn outcome(&self, cancelled: bool) -> OperationState {
        if self.failed {
            OperationState::Failure
        } else if cancelled {
            OperationState::Cancelled
        } else {
            OperationState::Successful
        }
    }
}

impl Worker {
    pub(crate) fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    async fn run(self) {
        let _slot = self.wait_for_slot().await;
        tracing::debug!(id = %self.id, kind = %self.kind, "worker started");

        let survey = self.survey().await;
        let total = survey.entries.len() as u64;
        if !self.emit(OperationEvent::Started { id: self.id, total }).await {
            return;
        }

        let mut tally = Tally {
            done: 0,
            failed: !survey.errors.is_empty(),
            unsent: survey.errors,
        };

        if survey.interrupted {
            self.finish(tally.outcome(true), &mut tally).await;
            return;
        }

        if let Some(destination) = &self.destination {
            if let Err(e) = self.prepare_destination(destination).await {
                tally.record(OperationError::new(
                    destination.clone(),
                    format!("Failed to create destination: {}", io_message(&e)),
                ));
                self.finish(OperationState::Failure, &mut tally).await;
                return;
            }
        }

        let mut entries = survey.entries;
        if self.kind == OperationKind::Delete {
            // Children before their parents.
            entries.reverse();
        }

        let mut throttle = ProgressThrottle::new(
            self.settings.progress_batch,
            self.settings.progress_interval,
        );
        let mut targets: HashMap<usize, Resolution> = HashMap::new();
        let mut moved_dirs = Vec::new();
        let mut cancelled = false;

        for entry in entries {
            if self.cancel.is_cancelled() {
                cancelled = true;
                break;
            }

            match self.process(&entry, &mut targets).await {
                Ok(Step::Done) => {
                    if self.kind == OperationKind::Move && entry.is_dir() {
                        moved_dirs.push(entry.clone());
                    }
                }
                Ok(Step::Skipped) => {
                    tracing::debug!(id = %self.id, path = %entry.path.display(), "skipped");
                }
                Err(e) => {
                    tracing::debug!(id = %self.id, path = %entry.path.display(), error = %e, "item failed");
                    tally.record(OperationError::new(entry.path.clone(), io_message(&e)));
                }
            }
            tally.done += 1;

            if throttle.should_emit(tally.done) {
                let event = OperationEvent::Progress {
                    id: self.id,
                    done: tally.done,
                    current: Some(entry.path),
                    errors: tally.take_errors(),
                };
                if !self.emit(event).await {
                    return;
                }
            }
        }

        if !moved_dirs.is_empty() {
            self.remove_emptied(moved_dirs).await;
        }

        self.finish(tally.outcome(cancelled), &mut tally).await;
    }

    /// Hold a worker slot for the lifetime of the run when a cap is set.
    async fn wait_for_slot(&self) -> Option<OwnedSemaphorePermit> {
        let slots = Arc::clone(self.slots.as_ref()?);
        tokio::select! {
            permit = slots.acquire_owned() => permit.ok(),
            _ = self.cancel.cancelled() => None,
        }
    }

    async fn survey(&self) -> Survey {
        let fs = Arc::clone(&self.fs);
        let sources = self.sources.clone();
        let cancel = self.cancel.clone();
        let recursive = self.kind != OperationKind::Trash;

        match tokio::task::spawn_blocking(move || fs.count(&sources, recursive, &cancel)).await {
            Ok(survey) => survey,
            Err(e) => Survey {
                errors: vec![OperationError::new(
                    self.sources.first().cloned().unwrap_or_default(),
                    format!("Pre-scan failed: {e}"),
                )],
                ..Survey::default()
            },
        }
    }

    async fn prepare_destination(&self, destination: &Path) -> io::Result<()> {
        let fs = Arc::clone(&self.fs);
        let destination = destination.to_path_buf();
        tokio::task::spawn_blocking(move || fs.ensure_dir(&destination))
            .await
            .unwrap_or_else(|e| Err(io::Error::other(format!("Task failed: {e}"))))
    }

    async fn process(
        &self,
        entry: &Entry,
        targets: &mut HashMap<usize, Resolution>,
    ) -> io::Result<Step> {
        let target = if self.kind.needs_destination() {
            match self.target_for(entry, targets).await? {
                Some(target) => Some(target),
                None => return Ok(Step::Skipped),
            }
        } else {
            None
        };

        let fs = Arc::clone(&self.fs);
        let kind = self.kind;
        let job = entry.clone();
        tokio::task::spawn_blocking(move || apply(fs.as_ref(), kind, &job, target.as_deref()))
            .await
            .unwrap_or_else(|e| Err(io::Error::other(format!("Task failed: {e}"))))
            .map(|()| Step::Done)
    }

    /// Target path for `entry`, or `None` when its source is skipped.
    ///
    /// Top-level sources are resolved against the conflict policy once;
    /// everything below them follows the resolved root.
    async fn target_for(
        &self,
        entry: &Entry,
        targets: &mut HashMap<usize, Resolution>,
    ) -> io::Result<Option<PathBuf>> {
        if !entry.is_root() {
            return Ok(match targets.get(&entry.root) {
                Some(Resolution::Target(root)) => Some(root.join(&entry.relative)),
                _ => None,
            });
        }

        let Some(destination) = &self.destination else {
            return Ok(None);
        };
        let name = entry.path.file_name().map(PathBuf::from).unwrap_or_default();
        let candidate = destination.join(name);
        let fs = Arc::clone(&self.fs);
        let policy = self.settings.conflict_policy;

        let resolution = match tokio::task::spawn_blocking(move || {
            conflict::resolve(candidate, policy, |p| fs.exists(p))
        })
        .await
        {
            Ok(resolution) => resolution,
            Err(e) => {
                targets.insert(entry.root, Resolution::Skip);
                return Err(io::Error::other(format!("Task failed: {e}")));
            }
        };

        targets.insert(entry.root, resolution.clone());
        Ok(match resolution {
            Resolution::Target(target) => Some(target),
            Resolution::Skip => None,
        })
    }

    /// Remove source directories whose contents were moved, deepest first.
    async fn remove_emptied(&self, dirs: Vec<Entry>) {
        let fs = Arc::clone(&self.fs);
        let id = self.id;
        let result = tokio::task::spawn_blocking(move || {
            for dir in dirs.iter().rev() {
                if let Err(e) = fs.delete(dir) {
                    tracing::debug!(id = %id, path = %dir.path.display(), error = %e, "source directory left in place");
                }
            }
        })
        .await;
        if let Err(e) = result {
            tracing::warn!(id = %self.id, error = %e, "move clean-up task failed");
        }
    }

    async fn finish(&self, state: OperationState, tally: &mut Tally) {
        let event = OperationEvent::Finished {
            id: self.id,
            state,
            done: tally.done,
            errors: tally.take_errors(),
        };
        self.emit(event).await;
    }

    async fn emit(&self, event: OperationEvent) -> bool {
        if self.events.send(event).await.is_err() {
            tracing::debug!(id = %self.id, "event queue closed, stopping worker");
            return false;
        }
        true
    }
}

/// Perform one item of work. Runs on a blocking thread.
fn apply(
    fs: &dyn FileSystem,
    kind: OperationKind,
    entry: &Entry,
    target: Option<&Path>,
) -> io::Result<()> {
    match (kind, target) {
        (OperationKind::Copy, Some(target)) => {
            ensure_distinct(entry, target)?;
            fs.copy(entry, target)
        }
        (OperationKind::Move, Some(target)) => {
            ensure_distinct(entry, target)?;
            fs.rename(entry, target)
        }
        (OperationKind::Delete, _) => fs.delete(entry),
        (OperationKind::Trash, _) => fs.trash(entry),
        (OperationKind::Copy | OperationKind::Move, None) => Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "No destination for item",
        )),
    }
}

fn ensure_distinct(entry: &Entry, target: &Path) -> io::Result<()> {
    if entry.path == target {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "Source and destination are the same",
        ));
    }
    Ok(())
}
