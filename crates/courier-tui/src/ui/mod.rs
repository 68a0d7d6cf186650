//! UI components and widgets.

mod command_line;
mod help;
mod process_bar;
mod progress_bar;

pub use command_line::CommandLine;
pub use help::HelpOverlay;
pub use process_bar::ProcessBar;
pub use progress_bar::ProgressBar;

use ratatui::layout::{Constraint, Layout, Rect};

/// Layout areas for the application.
#[derive(Debug, Clone, Copy)]
pub struct AppLayout {
    pub header: Rect,
    pub main: Rect,
    pub footer: Rect,
}

impl AppLayout {
    /// Compute layout from terminal area.
    pub fn new(area: Rect) -> Self {
        let [header, main, footer] = Layout::vertical([
            Constraint::Length(1),
            Constraint::Min(3),
            Constraint::Length(1),
        ])
        .areas(area);

        Self {
            header,
            main,
            footer,
        }
    }
}
