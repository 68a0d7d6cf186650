//! Terminal user interface for courier.
//!
//! Shows every file operation the engine knows about, most relevant first,
//! and lets the user start, cancel and clear operations without leaving the
//! terminal.
//!
//! # Usage
//!
//! ```rust,no_run
//! use courier_core::EngineConfig;
//!
//! courier_tui::run(EngineConfig::default()).unwrap();
//! ```
//!
//! # Keyboard Navigation
//!
//! - `j`/`k` - Select next/previous operation
//! - `g`/`G` - Jump to top/bottom
//! - `x` - Cancel the selected operation
//! - `c` - Clear finished operations
//! - `:` - Command palette (`cp`, `mv`, `rm`, `trash`, `cancel`, `clear`, `q`)
//! - `?` - Help
//! - `q` - Quit

pub mod app;
mod event;
mod theme;
mod ui;

pub use app::{App, AppResult};
pub use theme::Theme;

use courier_core::EngineConfig;

/// Run the TUI application.
pub fn run(config: EngineConfig) -> AppResult<()> {
    let rt = tokio::runtime::Runtime::new()?;

    let terminal = ratatui::init();
    let result = rt.block_on(App::new(config).run(terminal));
    ratatui::restore();

    // Workers still running are abandoned; their partial results stay on disk.
    rt.shutdown_timeout(std::time::Duration::from_millis(100));

    result
}
