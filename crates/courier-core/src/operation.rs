//! Operation records and their state machine.

use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::Display;

use crate::TransitionError;

/// Unique identifier of an operation.
///
/// Ids are handed out from a counter and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OperationId(pub u64);

impl OperationId {
    /// Create an id from a raw value.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// The raw value.
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for OperationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// What an operation does to its sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    /// Copy sources into a destination directory.
    Copy,
    /// Move sources into a destination directory.
    Move,
    /// Permanently delete sources.
    Delete,
    /// Move sources to the system trash.
    Trash,
}

impl OperationKind {
    /// Whether this kind writes into a destination directory.
    pub fn needs_destination(self) -> bool {
        matches!(self, Self::Copy | Self::Move)
    }

    /// Verb used in completion summaries.
    pub fn past_tense(self) -> &'static str {
        match self {
            Self::Copy => "Copied",
            Self::Move => "Moved",
            Self::Delete => "Deleted",
            Self::Trash => "Trashed",
        }
    }

    /// Capitalized label used in progress lines.
    pub fn title(self) -> &'static str {
        match self {
            Self::Copy => "Copy",
            Self::Move => "Move",
            Self::Delete => "Delete",
            Self::Trash => "Trash",
        }
    }
}

/// Lifecycle state of an operation.
///
/// `Pending -> InOperation -> {Successful | Failure | Cancelled}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationState {
    /// Created, pre-scan not finished yet.
    #[default]
    #[strum(serialize = "pending")]
    Pending,
    /// Total known, items being processed.
    #[strum(serialize = "in operation")]
    InOperation,
    /// Every item processed without error.
    #[strum(serialize = "successful")]
    Successful,
    /// Finished with at least one recorded error.
    #[strum(serialize = "failed")]
    Failure,
    /// Stopped on user request.
    #[strum(serialize = "cancelled")]
    Cancelled,
}

impl OperationState {
    /// Terminal states accept no further transitions.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Successful | Self::Failure | Self::Cancelled)
    }
}

/// An error recorded against a single item of an operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationError {
    /// The path that caused the error.
    pub path: PathBuf,
    /// A human-readable error message.
    pub message: String,
}

impl OperationError {
    /// Create a new operation error.
    pub fn new(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for OperationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path.display(), self.message)
    }
}

/// One user-requested file operation, from submission to a terminal state.
///
/// Records are only changed through [`start`](Self::start),
/// [`advance`](Self::advance) and [`finish`](Self::finish), which keep
/// `done <= total`, never let `total` shrink, and refuse to touch a
/// terminal record.
#[derive(Debug, Clone, Serialize)]
pub struct Operation {
    id: OperationId,
    kind: OperationKind,
    name: String,
    sources: Vec<PathBuf>,
    destination: Option<PathBuf>,
    state: OperationState,
    done: u64,
    total: Option<u64>,
    submitted_at: DateTime<Utc>,
    done_time: Option<DateTime<Utc>>,
    #[serde(skip)]
    finish_seq: u64,
    current: Option<PathBuf>,
    errors: Vec<OperationError>,
}

impl Operation {
    /// Create a pending operation.
    pub fn new(
        id: OperationId,
        kind: OperationKind,
        sources: Vec<PathBuf>,
        destination: Option<PathBuf>,
    ) -> Self {
        Self {
            id,
            kind,
            name: display_name(&sources),
            sources,
            destination,
            state: OperationState::Pending,
            done: 0,
            total: None,
            submitted_at: Utc::now(),
            done_time: None,
            finish_seq: 0,
            current: None,
            errors: Vec::new(),
        }
    }

    pub fn id(&self) -> OperationId {
        self.id
    }

    pub fn kind(&self) -> OperationKind {
        self.kind
    }

    /// Display label: first source's file name, plus a count of the rest.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn sources(&self) -> &[PathBuf] {
        &self.sources
    }

    pub fn destination(&self) -> Option<&PathBuf> {
        self.destination.as_ref()
    }

    pub fn state(&self) -> OperationState {
        self.state
    }

    /// Items attempted so far.
    pub fn done(&self) -> u64 {
        self.done
    }

    /// Items to process, known once the pre-scan completes.
    pub fn total(&self) -> Option<u64> {
        self.total
    }

    pub fn submitted_at(&self) -> DateTime<Utc> {
        self.submitted_at
    }

    /// When the operation reached its terminal state.
    pub fn done_time(&self) -> Option<DateTime<Utc>> {
        self.done_time
    }

    /// Position of this record among terminal transitions (1-based, 0 while running).
    pub fn finish_seq(&self) -> u64 {
        self.finish_seq
    }

    /// The item the worker reported last.
    pub fn current(&self) -> Option<&PathBuf> {
        self.current.as_ref()
    }

    pub fn errors(&self) -> &[OperationError] {
        &self.errors
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    /// Completion fraction used for ordering. Unknown or zero totals count as 0.
    pub fn fraction(&self) -> f64 {
        match self.total {
            Some(total) if total > 0 => self.done as f64 / total as f64,
            _ => 0.0,
        }
    }

    /// Fill ratio for progress bars; a successful operation is always full.
    pub fn progress_ratio(&self) -> f64 {
        if self.state == OperationState::Successful {
            1.0
        } else {
            self.fraction().clamp(0.0, 1.0)
        }
    }

    /// Record the pre-scan result: `Pending -> InOperation`.
    pub fn start(&mut self, total: u64) -> Result<(), TransitionError> {
        match self.state {
            OperationState::Pending => {
                self.total = Some(total);
                self.state = OperationState::InOperation;
                Ok(())
            }
            state if state.is_terminal() => Err(TransitionError::Terminal { state }),
            from => Err(TransitionError::Invalid {
                from,
                to: OperationState::InOperation,
            }),
        }
    }

    /// Apply a progress report. `done` never moves backwards or past `total`.
    pub fn advance(
        &mut self,
        done: u64,
        current: Option<PathBuf>,
        errors: Vec<OperationError>,
    ) -> Result<(), TransitionError> {
        self.ensure_running(OperationState::InOperation)?;
        self.done = self.clamp_done(done);
        if current.is_some() {
            self.current = current;
        }
        self.errors.extend(errors);
        Ok(())
    }

    /// Move to a terminal state.
    ///
    /// A claimed `Successful` outcome that contradicts the record (errors
    /// present, or fewer than `total` items attempted) is stored as
    /// `Failure`. Returns the state actually stored.
    pub fn finish(
        &mut self,
        outcome: OperationState,
        done: u64,
        errors: Vec<OperationError>,
        at: DateTime<Utc>,
        seq: u64,
    ) -> Result<OperationState, TransitionError> {
        if !outcome.is_terminal() {
            return Err(TransitionError::Invalid {
                from: self.state,
                to: outcome,
            });
        }
        self.ensure_running(outcome)?;

        self.done = self.clamp_done(done);
        self.errors.extend(errors);
        self.current = None;

        let complete = Some(self.done) == self.total;
        self.state = match outcome {
            OperationState::Successful if !self.errors.is_empty() || !complete => {
                OperationState::Failure
            }
            other => other,
        };
        self.done_time = Some(at);
        self.finish_seq = seq;
        Ok(self.state)
    }

    /// Short human-readable description of where the operation stands.
    pub fn summary(&self) -> String {
        let total = self.total.unwrap_or(0);
        match self.state {
            OperationState::Pending => format!("{} {}: preparing", self.kind.title(), self.name),
            OperationState::InOperation => {
                format!("{} {}: {}/{}", self.kind.title(), self.name, self.done, total)
            }
            OperationState::Successful => {
                format!("{} {} items", self.kind.past_tense(), self.done)
            }
            OperationState::Failure => format!(
                "{} {} items, {} failed",
                self.kind.past_tense(),
                self.done.saturating_sub(self.errors.len() as u64),
                self.errors.len()
            ),
            OperationState::Cancelled => format!(
                "{} cancelled after {} of {} items",
                self.kind.title(),
                self.done,
                total
            ),
        }
    }

    fn ensure_running(&self, to: OperationState) -> Result<(), TransitionError> {
        match self.state {
            OperationState::InOperation => Ok(()),
            state if state.is_terminal() => Err(TransitionError::Terminal { state }),
            from => Err(TransitionError::Invalid { from, to }),
        }
    }

    fn clamp_done(&self, done: u64) -> u64 {
        let done = done.max(self.done);
        match self.total {
            Some(total) => done.min(total),
            None => done,
        }
    }
}

fn display_name(sources: &[PathBuf]) -> String {
    let Some(first) = sources.first() else {
        return String::new();
    };
    let base = first
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| first.display().to_string());
    match sources.len() {
        0 | 1 => base,
        n => format!("{base} (+{})", n - 1),
    }
}
