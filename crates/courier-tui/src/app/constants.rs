//! Application constants.

/// Rows taken by one process in the process bar, separator included.
pub const LINES_PER_PROCESS: usize = 3;

/// Event loop tick interval in milliseconds.
pub const TICK_INTERVAL_MS: u64 = 50;

/// How long a status message stays in the header.
pub const STATUS_TIMEOUT_SECS: u64 = 5;
