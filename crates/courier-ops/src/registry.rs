//! The authoritative store of operation records.
//!
//! Only the UI loop owns and mutates a [`Registry`]; workers reach it
//! exclusively through [`OperationEvent`]s, so no locking is involved.

use std::cmp::Ordering;
use std::path::PathBuf;

use chrono::Utc;
use courier_core::{Operation, OperationId, OperationKind, OperationState, TransitionError};
use indexmap::IndexMap;
use itertools::Itertools;
use thiserror::Error;

use crate::OperationEvent;

/// Why an event left the registry unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApplyError {
    /// No record with this id (never created, or already cleared).
    #[error("unknown operation {0}")]
    Unknown(OperationId),

    /// The event does not fit the record's state.
    #[error("event for {id} discarded: {reason}")]
    Rejected {
        id: OperationId,
        reason: TransitionError,
    },
}

/// Operation records in submission order.
#[derive(Debug, Default)]
pub struct Registry {
    operations: IndexMap<OperationId, Operation>,
    next_id: u64,
    finished: u64,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a new pending record and return its id.
    pub(crate) fn create(
        &mut self,
        kind: OperationKind,
        sources: Vec<PathBuf>,
        destination: Option<PathBuf>,
    ) -> OperationId {
        self.next_id += 1;
        let id = OperationId::new(self.next_id);
        self.operations
            .insert(id, Operation::new(id, kind, sources, destination));
        id
    }

    pub fn get(&self, id: OperationId) -> Option<&Operation> {
        self.operations.get(&id)
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Records in submission order.
    pub fn iter(&self) -> impl Iterator<Item = &Operation> {
        self.operations.values()
    }

    /// Number of records not yet in a terminal state.
    pub fn active(&self) -> usize {
        self.iter().filter(|op| !op.is_terminal()).count()
    }

    /// Apply one worker event.
    ///
    /// Returns the stored terminal state when the event finished the
    /// operation, `None` for intermediate updates.
    pub fn apply(&mut self, event: OperationEvent) -> Result<Option<OperationState>, ApplyError> {
        let id = event.id();
        let op = self
            .operations
            .get_mut(&id)
            .ok_or(ApplyError::Unknown(id))?;
        let rejected = |reason| ApplyError::Rejected { id, reason };

        match event {
            OperationEvent::Started { total, .. } => {
                op.start(total).map_err(rejected)?;
                Ok(None)
            }
            OperationEvent::Progress {
                done,
                current,
                errors,
                ..
            } => {
                op.advance(done, current, errors).map_err(rejected)?;
                Ok(None)
            }
            OperationEvent::Finished {
                state,
                done,
                errors,
                ..
            } => {
                let seq = self.finished + 1;
                let stored = op
                    .finish(state, done, errors, Utc::now(), seq)
                    .map_err(rejected)?;
                if stored != state {
                    tracing::warn!(id = %id, claimed = %state, stored = %stored, "inconsistent outcome");
                }
                self.finished = seq;
                Ok(Some(stored))
            }
        }
    }

    /// Records in display order (see [`display_cmp`]).
    pub fn display_order(&self) -> Vec<&Operation> {
        // Stable sort: equal keys keep submission order.
        self.operations.values().sorted_by(|a, b| display_cmp(a, b)).collect()
    }

    /// Drop every terminal record. Returns how many were removed.
    pub fn clear_finished(&mut self) -> usize {
        let before = self.operations.len();
        self.operations.retain(|_, op| !op.is_terminal());
        before - self.operations.len()
    }
}

/// Display ordering of two operations.
///
/// Unfinished operations come first, least complete first. Finished ones
/// (successful, failed or cancelled) follow, most recently finished first.
pub fn display_cmp(a: &Operation, b: &Operation) -> Ordering {
    match (a.is_terminal(), b.is_terminal()) {
        (false, true) => Ordering::Less,
        (true, false) => Ordering::Greater,
        (false, false) => a.fraction().total_cmp(&b.fraction()),
        (true, true) => b
            .done_time()
            .cmp(&a.done_time())
            .then_with(|| b.finish_seq().cmp(&a.finish_seq())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use courier_core::OperationError;

    fn copy_op(registry: &mut Registry, name: &str) -> OperationId {
        registry.create(
            OperationKind::Copy,
            vec![PathBuf::from(format!("/src/{name}"))],
            Some(PathBuf::from("/dst")),
        )
    }

    fn start(registry: &mut Registry, id: OperationId, total: u64) {
        registry
            .apply(OperationEvent::Started { id, total })
            .unwrap();
    }

    fn progress(registry: &mut Registry, id: OperationId, done: u64) {
        registry
            .apply(OperationEvent::Progress {
                id,
                done,
                current: None,
                errors: vec![],
            })
            .unwrap();
    }

    fn finish(registry: &mut Registry, id: OperationId, state: OperationState, done: u64) {
        registry
            .apply(OperationEvent::Finished {
                id,
                state,
                done,
                errors: vec![],
            })
            .unwrap();
    }

    fn names(ops: &[&Operation]) -> Vec<String> {
        ops.iter().map(|op| op.name().to_string()).collect()
    }

    #[test]
    fn test_ids_are_never_reused() {
        let mut registry = Registry::new();
        let a = copy_op(&mut registry, "a");
        start(&mut registry, a, 1);
        finish(&mut registry, a, OperationState::Successful, 1);
        assert_eq!(registry.clear_finished(), 1);

        let b = copy_op(&mut registry, "b");
        assert_ne!(a, b);
        assert!(b > a);
    }

    #[test]
    fn test_unknown_id_is_rejected() {
        let mut registry = Registry::new();
        let err = registry
            .apply(OperationEvent::Started {
                id: OperationId::new(42),
                total: 1,
            })
            .unwrap_err();
        assert_eq!(err, ApplyError::Unknown(OperationId::new(42)));
    }

    #[test]
    fn test_late_events_for_terminal_operation_are_discarded() {
        let mut registry = Registry::new();
        let id = copy_op(&mut registry, "a");
        start(&mut registry, id, 4);
        finish(&mut registry, id, OperationState::Cancelled, 2);

        let late = registry.apply(OperationEvent::Progress {
            id,
            done: 4,
            current: None,
            errors: vec![OperationError::new("/src/a", "late")],
        });
        assert!(matches!(late, Err(ApplyError::Rejected { .. })));

        let op = registry.get(id).unwrap();
        assert_eq!(op.state(), OperationState::Cancelled);
        assert_eq!(op.done(), 2);
        assert!(op.errors().is_empty());
    }

    #[test]
    fn test_errors_accumulate_across_events() {
        let mut registry = Registry::new();
        let id = copy_op(&mut registry, "a");
        start(&mut registry, id, 3);
        registry
            .apply(OperationEvent::Progress {
                id,
                done: 1,
                current: None,
                errors: vec![OperationError::new("/src/a/1", "denied")],
            })
            .unwrap();
        let stored = registry
            .apply(OperationEvent::Finished {
                id,
                state: OperationState::Failure,
                done: 3,
                errors: vec![OperationError::new("/src/a/3", "denied")],
            })
            .unwrap();

        assert_eq!(stored, Some(OperationState::Failure));
        let op = registry.get(id).unwrap();
        assert_eq!(op.errors().len(), 2);
        assert_eq!(op.errors()[1].path, PathBuf::from("/src/a/3"));
    }

    #[test]
    fn test_short_success_is_stored_as_failure() {
        let mut registry = Registry::new();
        let id = copy_op(&mut registry, "a");
        start(&mut registry, id, 5);
        let stored = registry
            .apply(OperationEvent::Finished {
                id,
                state: OperationState::Successful,
                done: 3,
                errors: vec![],
            })
            .unwrap();
        assert_eq!(stored, Some(OperationState::Failure));
    }

    #[test]
    fn test_display_order_unfinished_first_by_fraction() {
        let mut registry = Registry::new();
        let half = copy_op(&mut registry, "half");
        let fresh = copy_op(&mut registry, "fresh");
        let pending = copy_op(&mut registry, "pending");
        let almost = copy_op(&mut registry, "almost");
        let done = copy_op(&mut registry, "done");

        start(&mut registry, half, 10);
        progress(&mut registry, half, 5);
        start(&mut registry, fresh, 10);
        start(&mut registry, almost, 10);
        progress(&mut registry, almost, 9);
        start(&mut registry, done, 1);
        finish(&mut registry, done, OperationState::Successful, 1);
        let _ = pending;

        assert_eq!(
            names(&registry.display_order()),
            vec!["fresh", "pending", "half", "almost", "done"]
        );
    }

    #[test]
    fn test_display_order_finished_most_recent_first() {
        let mut registry = Registry::new();
        let ids: Vec<_> = ["first", "second", "third"]
            .iter()
            .map(|name| copy_op(&mut registry, name))
            .collect();
        for id in &ids {
            start(&mut registry, *id, 2);
        }
        finish(&mut registry, ids[1], OperationState::Successful, 2);
        finish(&mut registry, ids[0], OperationState::Failure, 2);
        finish(&mut registry, ids[2], OperationState::Cancelled, 1);

        let order = registry.display_order();
        assert_eq!(names(&order), vec!["third", "first", "second"]);
        for pair in order.windows(2) {
            assert!(pair[0].done_time() >= pair[1].done_time());
        }
    }

    #[test]
    fn test_failed_and_cancelled_group_with_finished() {
        let mut registry = Registry::new();
        let failed = copy_op(&mut registry, "failed");
        let running = copy_op(&mut registry, "running");
        start(&mut registry, failed, 2);
        finish(&mut registry, failed, OperationState::Failure, 1);
        start(&mut registry, running, 2);
        progress(&mut registry, running, 1);

        assert_eq!(names(&registry.display_order()), vec!["running", "failed"]);
    }

    #[test]
    fn test_clear_finished_keeps_active_and_order() {
        let mut registry = Registry::new();
        let a = copy_op(&mut registry, "a");
        let b = copy_op(&mut registry, "b");
        let c = copy_op(&mut registry, "c");
        start(&mut registry, b, 1);
        finish(&mut registry, b, OperationState::Successful, 1);

        assert_eq!(registry.active(), 2);
        assert_eq!(registry.clear_finished(), 1);
        let ids: Vec<_> = registry.iter().map(|op| op.id()).collect();
        assert_eq!(ids, vec![a, c]);
    }
}
