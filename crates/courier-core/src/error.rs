//! Error types for submitting and tracking operations.

use std::path::PathBuf;

use thiserror::Error;

use crate::{OperationKind, OperationState};

/// A request rejected before any work was scheduled.
///
/// No operation record exists for a request that failed validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Nothing to operate on.
    #[error("No source paths given")]
    EmptySources,

    /// Copy and move need somewhere to put things.
    #[error("{kind} requires a destination")]
    MissingDestination { kind: OperationKind },

    /// Delete and trash take no destination.
    #[error("{kind} does not take a destination")]
    UnexpectedDestination { kind: OperationKind },

    /// The destination is a source or lives underneath one.
    #[error("Cannot {kind} {path} into itself ({destination})")]
    DestinationInsideSource {
        kind: OperationKind,
        path: PathBuf,
        destination: PathBuf,
    },

    /// Two sources are the same path, or one lies inside the other.
    #[error("Source {path} overlaps {other}")]
    OverlappingSources { path: PathBuf, other: PathBuf },

    /// A source path with no usable components (e.g. empty string).
    #[error("Invalid source path: {path:?}")]
    InvalidSource { path: PathBuf },
}

/// An event that does not fit the operation's current state.
///
/// The registry discards such events; they never change a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TransitionError {
    /// The operation already reached a terminal state.
    #[error("operation is already {state}")]
    Terminal { state: OperationState },

    /// The event skips a state (e.g. progress before the pre-scan finished).
    #[error("cannot go from {from} to {to}")]
    Invalid {
        from: OperationState,
        to: OperationState,
    },
}
