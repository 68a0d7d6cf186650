//! Event handling for the TUI.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// Key action that can be performed in the TUI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    // Navigation
    MoveUp,
    MoveDown,
    ScrollUp,
    ScrollDown,
    JumpToTop,
    JumpToBottom,
    PageUp,
    PageDown,

    // Operations
    /// Cancel the operation under the cursor.
    CancelSelected,
    /// Remove finished operations from the list.
    ClearFinished,

    // UI
    ToggleHelp,
    CommandMode,
    /// Close overlays and dismiss the status message.
    Dismiss,

    // Application
    Quit,
    ForceQuit,

    // No action
    None,
}

impl KeyAction {
    /// Convert a key event to an action.
    pub fn from_key_event(event: KeyEvent) -> Self {
        match (event.code, event.modifiers) {
            (KeyCode::Char('q'), KeyModifiers::NONE) => KeyAction::Quit,
            (KeyCode::Char('c'), KeyModifiers::CONTROL) => KeyAction::ForceQuit,
            (KeyCode::Esc, _) => KeyAction::Dismiss,

            // Navigation - vim style
            (KeyCode::Char('j'), KeyModifiers::NONE) => KeyAction::MoveDown,
            (KeyCode::Char('k'), KeyModifiers::NONE) => KeyAction::MoveUp,
            (KeyCode::Char('e'), KeyModifiers::CONTROL) => KeyAction::ScrollDown,
            (KeyCode::Char('y'), KeyModifiers::CONTROL) => KeyAction::ScrollUp,

            // Navigation - arrow keys
            (KeyCode::Down, _) => KeyAction::MoveDown,
            (KeyCode::Up, _) => KeyAction::MoveUp,

            // Jump
            (KeyCode::Char('g'), KeyModifiers::NONE) => KeyAction::JumpToTop,
            (KeyCode::Char('G'), KeyModifiers::SHIFT | KeyModifiers::NONE) => {
                KeyAction::JumpToBottom
            }
            (KeyCode::Home, _) => KeyAction::JumpToTop,
            (KeyCode::End, _) => KeyAction::JumpToBottom,

            // Page navigation
            (KeyCode::PageUp, _) => KeyAction::PageUp,
            (KeyCode::PageDown, _) => KeyAction::PageDown,
            (KeyCode::Char('u'), KeyModifiers::CONTROL) => KeyAction::PageUp,
            (KeyCode::Char('d'), KeyModifiers::CONTROL) => KeyAction::PageDown,

            // Operations
            (KeyCode::Char('x'), KeyModifiers::NONE) => KeyAction::CancelSelected,
            (KeyCode::Delete, _) => KeyAction::CancelSelected,
            (KeyCode::Char('c'), KeyModifiers::NONE) => KeyAction::ClearFinished,

            (KeyCode::Char('?'), KeyModifiers::NONE | KeyModifiers::SHIFT) => {
                KeyAction::ToggleHelp
            }
            (KeyCode::Char(':'), KeyModifiers::NONE | KeyModifiers::SHIFT) => {
                KeyAction::CommandMode
            }

            _ => KeyAction::None,
        }
    }
}

/// A section of key bindings for the help display.
pub struct HelpSection {
    pub title: &'static str,
    pub bindings: Vec<KeyBinding>,
}

/// Key binding for display in help.
pub struct KeyBinding {
    pub keys: &'static str,
    pub description: &'static str,
}

/// Get all key bindings organized by section for help display.
pub fn get_help_sections() -> Vec<HelpSection> {
    vec![
        HelpSection {
            title: "Navigation",
            bindings: vec![
                KeyBinding { keys: "j/k ↑/↓", description: "Select next/previous" },
                KeyBinding { keys: "Ctrl-e/y", description: "Scroll down/up" },
                KeyBinding { keys: "PgDn/PgUp", description: "Page down/up" },
                KeyBinding { keys: "g/G", description: "Jump to top/bottom" },
            ],
        },
        HelpSection {
            title: "Operations",
            bindings: vec![
                KeyBinding { keys: "x/Del", description: "Cancel selected" },
                KeyBinding { keys: "c", description: "Clear finished" },
            ],
        },
        HelpSection {
            title: "Commands",
            bindings: vec![
                KeyBinding { keys: ":", description: "Open command palette" },
                KeyBinding { keys: "?", description: "Show this help" },
                KeyBinding { keys: "q", description: "Quit" },
            ],
        },
    ]
}

/// Get command palette commands for help display.
pub fn get_command_help() -> Vec<(&'static str, &'static str)> {
    vec![
        (":cp <src>... <dst>", "Copy into directory"),
        (":mv <src>... <dst>", "Move into directory"),
        (":rm <path>...", "Delete permanently"),
        (":trash <path>...", "Move to trash"),
        (":cancel [id]", "Cancel operation"),
        (":clear", "Clear finished"),
        (":q", "Quit"),
    ]
}
