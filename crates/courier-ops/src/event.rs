//! Messages sent from workers to the UI loop.

use std::path::PathBuf;

use courier_core::{OperationError, OperationId, OperationState};

/// An immutable notification about one operation.
///
/// Events for the same id arrive in the order they were sent. `errors`
/// carries only what was recorded since the previous event for that id.
#[derive(Debug, Clone, PartialEq)]
pub enum OperationEvent {
    /// Pre-scan finished; `total` items will be processed.
    Started { id: OperationId, total: u64 },
    /// `done` items have been attempted so far.
    Progress {
        id: OperationId,
        done: u64,
        current: Option<PathBuf>,
        errors: Vec<OperationError>,
    },
    /// The worker stopped. Sent exactly once per operation.
    Finished {
        id: OperationId,
        state: OperationState,
        done: u64,
        errors: Vec<OperationError>,
    },
}

impl OperationEvent {
    /// The operation this event belongs to.
    pub fn id(&self) -> OperationId {
        match self {
            Self::Started { id, .. } | Self::Progress { id, .. } | Self::Finished { id, .. } => *id,
        }
    }

    /// Whether this is the final event of its operation.
    pub fn is_finished(&self) -> bool {
        matches!(self, Self::Finished { .. })
    }
}
