//! Core types for courier.
//!
//! This crate holds the data model shared by the operation engine and the
//! terminal UI: operation records and their state machine, validation
//! errors, and engine configuration.

mod config;
mod error;
mod operation;

pub use config::{ConflictPolicy, EngineConfig, EngineConfigBuilder};
pub use error::{TransitionError, ValidationError};
pub use operation::{Operation, OperationError, OperationId, OperationKind, OperationState};
