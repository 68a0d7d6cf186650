//! Color theme for the TUI.
//!
//! A single dark palette based on Tailwind CSS slate, with state colors for
//! operations.

use courier_core::OperationState;
use ratatui::style::{Color, Modifier, Style};

/// Color theme for the TUI.
#[derive(Debug, Clone)]
pub struct Theme {
    // Base colors
    pub background: Color,
    pub foreground: Color,
    pub muted: Color,

    // Interactive elements
    pub selected: Style,

    // Status colors
    pub success: Color,
    pub warning: Color,
    pub error: Color,
    pub info: Color,

    // UI elements
    pub border: Style,
    pub title: Style,
    pub help_key: Style,
    pub help_desc: Style,

    // Progress
    pub progress_bg: Style,

    // Header/Footer
    pub header: Style,
    pub footer: Style,
}

impl Theme {
    /// Dark theme using a slate-based palette.
    pub fn dark() -> Self {
        let slate_50 = Color::Rgb(248, 250, 252);
        let slate_100 = Color::Rgb(241, 245, 249);
        let slate_400 = Color::Rgb(148, 163, 184);
        let slate_500 = Color::Rgb(100, 116, 139);
        let slate_600 = Color::Rgb(71, 85, 105);
        let slate_700 = Color::Rgb(51, 65, 85);
        let slate_800 = Color::Rgb(30, 41, 59);
        let slate_900 = Color::Rgb(15, 23, 42);

        let blue_400 = Color::Rgb(96, 165, 250);
        let green_500 = Color::Rgb(34, 197, 94);
        let yellow_500 = Color::Rgb(234, 179, 8);
        let red_500 = Color::Rgb(239, 68, 68);

        Self {
            background: slate_900,
            foreground: slate_100,
            muted: slate_500,

            selected: Style::new().bg(slate_700).fg(slate_50).add_modifier(Modifier::BOLD),

            success: green_500,
            warning: yellow_500,
            error: red_500,
            info: blue_400,

            border: Style::new().fg(slate_600),
            title: Style::new().fg(blue_400).add_modifier(Modifier::BOLD),
            help_key: Style::new().fg(blue_400).add_modifier(Modifier::BOLD),
            help_desc: Style::new().fg(slate_400),

            progress_bg: Style::new().fg(slate_700),

            header: Style::new().bg(slate_800).fg(slate_100),
            footer: Style::new().bg(slate_800).fg(slate_400),
        }
    }

    /// Color for an operation state.
    pub fn state_color(&self, state: OperationState) -> Color {
        match state {
            OperationState::Pending => self.muted,
            OperationState::InOperation => self.info,
            OperationState::Successful => self.success,
            OperationState::Failure => self.error,
            OperationState::Cancelled => self.warning,
        }
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::dark()
    }
}
