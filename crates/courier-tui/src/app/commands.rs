//! Command palette handling.

use std::path::PathBuf;

use courier_core::{OperationId, OperationKind};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// Command input state.
#[derive(Debug, Clone, Default)]
pub struct CommandInput {
    /// Input buffer.
    buffer: String,
    /// Cursor position as a byte offset on a char boundary.
    cursor: usize,
}

impl CommandInput {
    /// Create a new empty command input.
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear the input buffer.
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.cursor = 0;
    }

    /// Get the current input buffer.
    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    /// Get the cursor position.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    fn prev_boundary(&self) -> usize {
        self.buffer[..self.cursor]
            .char_indices()
            .next_back()
            .map_or(0, |(i, _)| i)
    }

    fn next_boundary(&self) -> usize {
        self.buffer[self.cursor..]
            .chars()
            .next()
            .map_or(self.cursor, |c| self.cursor + c.len_utf8())
    }

    /// Handle a key event, returning whether to execute the command.
    pub fn handle_key(&mut self, key: KeyEvent) -> CommandKeyResult {
        match (key.code, key.modifiers) {
            (KeyCode::Enter, _) => {
                let cmd = std::mem::take(&mut self.buffer);
                self.cursor = 0;
                CommandKeyResult::Execute(cmd)
            }
            (KeyCode::Esc, _) => {
                self.clear();
                CommandKeyResult::Cancel
            }
            (KeyCode::Backspace, _) => {
                if self.cursor > 0 {
                    let start = self.prev_boundary();
                    self.buffer.replace_range(start..self.cursor, "");
                    self.cursor = start;
                    CommandKeyResult::Continue
                } else if self.buffer.is_empty() {
                    CommandKeyResult::Cancel
                } else {
                    CommandKeyResult::Continue
                }
            }
            (KeyCode::Delete, _) => {
                let end = self.next_boundary();
                self.buffer.replace_range(self.cursor..end, "");
                CommandKeyResult::Continue
            }
            (KeyCode::Left, _) => {
                self.cursor = self.prev_boundary();
                CommandKeyResult::Continue
            }
            (KeyCode::Right, _) => {
                self.cursor = self.next_boundary();
                CommandKeyResult::Continue
            }
            (KeyCode::Home, _) | (KeyCode::Char('a'), KeyModifiers::CONTROL) => {
                self.cursor = 0;
                CommandKeyResult::Continue
            }
            (KeyCode::End, _) | (KeyCode::Char('e'), KeyModifiers::CONTROL) => {
                self.cursor = self.buffer.len();
                CommandKeyResult::Continue
            }
            (KeyCode::Char('u'), KeyModifiers::CONTROL) => {
                self.clear();
                CommandKeyResult::Continue
            }
            (KeyCode::Char(c), KeyModifiers::NONE | KeyModifiers::SHIFT) => {
                self.buffer.insert(self.cursor, c);
                self.cursor += c.len_utf8();
                CommandKeyResult::Continue
            }
            _ => CommandKeyResult::Continue,
        }
    }
}

/// Result of handling a key in command mode.
#[derive(Debug, Clone)]
pub enum CommandKeyResult {
    /// Continue accepting input.
    Continue,
    /// Cancel command mode.
    Cancel,
    /// Execute the given command string.
    Execute(String),
}

/// Action to perform after executing a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandAction {
    /// No action.
    None,
    /// Quit the application.
    Quit,
    /// Start a file operation.
    Submit {
        kind: OperationKind,
        sources: Vec<PathBuf>,
        destination: Option<PathBuf>,
    },
    /// Cancel the operation under the cursor.
    CancelSelected,
    /// Cancel an operation by id.
    Cancel(OperationId),
    /// Drop finished operations from the list.
    ClearFinished,
    /// Show help.
    ShowHelp,
    /// The command was recognised but its arguments were not.
    Usage(&'static str),
    /// Not a command.
    Unknown(String),
}

/// Parse a command string.
pub fn parse_command(cmd: &str) -> CommandAction {
    let parts = split_args(cmd);
    let Some((name, args)) = parts.split_first() else {
        return CommandAction::None;
    };

    match name.as_str() {
        "q" | "quit" | "exit" => CommandAction::Quit,

        "cp" | "copy" => transfer(OperationKind::Copy, args, "cp <src>... <dest>"),
        "mv" | "move" => transfer(OperationKind::Move, args, "mv <src>... <dest>"),

        // An empty path list is passed through so the engine reports it.
        "rm" | "delete" | "del" => CommandAction::Submit {
            kind: OperationKind::Delete,
            sources: args.iter().map(PathBuf::from).collect(),
            destination: None,
        },
        "trash" => CommandAction::Submit {
            kind: OperationKind::Trash,
            sources: args.iter().map(PathBuf::from).collect(),
            destination: None,
        },

        "cancel" | "kill" => match args {
            [] => CommandAction::CancelSelected,
            [id] => match id.trim_start_matches('#').parse() {
                Ok(n) => CommandAction::Cancel(OperationId::new(n)),
                Err(_) => CommandAction::Usage("cancel [id]"),
            },
            _ => CommandAction::Usage("cancel [id]"),
        },

        "clear" => CommandAction::ClearFinished,
        "help" | "?" => CommandAction::ShowHelp,

        other => CommandAction::Unknown(other.to_string()),
    }
}

fn transfer(kind: OperationKind, args: &[String], usage: &'static str) -> CommandAction {
    match args.split_last() {
        Some((destination, sources)) if !sources.is_empty() => CommandAction::Submit {
            kind,
            sources: sources.iter().map(PathBuf::from).collect(),
            destination: Some(PathBuf::from(destination)),
        },
        _ => CommandAction::Usage(usage),
    }
}

/// Split on whitespace, keeping quoted runs and backslash-escaped characters
/// together.
fn split_args(cmd: &str) -> Vec<String> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut in_arg = false;
    let mut quote: Option<char> = None;
    let mut chars = cmd.chars();

    while let Some(c) = chars.next() {
        match (c, quote) {
            ('\\', _) => {
                if let Some(next) = chars.next() {
                    current.push(next);
                }
                in_arg = true;
            }
            (q, Some(open)) if q == open => quote = None,
            (_, Some(_)) => current.push(c),
            ('"' | '\'', None) => {
                quote = Some(c);
                in_arg = true;
            }
            (c, None) if c.is_whitespace() => {
                if in_arg {
                    args.push(std::mem::take(&mut current));
                    in_arg = false;
                }
            }
            _ => {
                current.push(c);
                in_arg = true;
            }
        }
    }
    if in_arg {
        args.push(current);
    }
    args
}
