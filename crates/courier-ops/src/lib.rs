//! Asynchronous file operations for courier.
//!
//! Copy, move, delete and trash run as background workers that report to a
//! single-threaded owner through an event queue. The owner (normally the UI
//! loop) holds an [`Engine`] and is the only code that mutates operation
//! records.

mod conflict;
pub mod dispatcher;
pub mod engine;
pub mod event;
pub mod fs;
mod progress;
pub mod registry;
mod worker;

pub use dispatcher::{Dispatcher, ValidRequest};
pub use engine::Engine;
pub use event::OperationEvent;
pub use fs::{Entry, EntryKind, FileSystem, LocalFileSystem, Survey};
pub use registry::{ApplyError, Registry, display_cmp};
