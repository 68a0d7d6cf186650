//! Main application state and the UI loop.

mod commands;
pub(crate) mod constants;
pub(crate) mod process_view;
mod render;

use std::path::PathBuf;
use std::time::{Duration, Instant};

use courier_core::{EngineConfig, OperationId, OperationKind};
use courier_ops::Engine;
use crossterm::event::{Event, EventStream, KeyEvent, KeyEventKind};
use futures::StreamExt;
use ratatui::{DefaultTerminal, Frame};

use crate::event::KeyAction;
use crate::theme::Theme;
use crate::ui::{AppLayout, ProcessBar};

use self::commands::{CommandAction, CommandInput, CommandKeyResult, parse_command};
use self::constants::{STATUS_TIMEOUT_SECS, TICK_INTERVAL_MS};
use self::process_view::ProcessView;
use self::render::{RenderContext, render_app};

/// Application result type.
pub type AppResult<T> = color_eyre::Result<T>;

/// Input mode of the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppMode {
    Normal,
    Command,
    Quit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusLevel {
    Info,
    Error,
}

/// A transient message in the header.
#[derive(Debug, Clone)]
pub struct StatusMessage {
    pub text: String,
    pub level: StatusLevel,
    shown_at: Instant,
}

/// The application: owns the engine and everything the screen shows.
///
/// All registry mutation happens on the task running [`App::run`].
pub struct App {
    engine: Engine,
    view: ProcessView,
    mode: AppMode,
    command: CommandInput,
    show_help: bool,
    status: Option<StatusMessage>,
    theme: Theme,
    needs_redraw: bool,
}

impl App {
    pub fn new(config: EngineConfig) -> Self {
        Self::with_engine(Engine::new(config))
    }

    pub fn with_engine(engine: Engine) -> Self {
        Self {
            engine,
            view: ProcessView::new(),
            mode: AppMode::Normal,
            command: CommandInput::new(),
            show_help: false,
            status: None,
            theme: Theme::default(),
            needs_redraw: true,
        }
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    pub fn mode(&self) -> AppMode {
        self.mode
    }

    pub fn status(&self) -> Option<&StatusMessage> {
        self.status.as_ref()
    }

    /// Run the UI loop until the user quits.
    pub async fn run(mut self, mut terminal: DefaultTerminal) -> AppResult<()> {
        let mut interval = tokio::time::interval(Duration::from_millis(TICK_INTERVAL_MS));
        let mut events = EventStream::new();

        while self.mode != AppMode::Quit {
            if self.needs_redraw {
                terminal.draw(|frame| self.render(frame))?;
                self.needs_redraw = false;
            }

            tokio::select! {
                biased;

                maybe_event = events.next() => match maybe_event {
                    Some(Ok(Event::Key(key))) if key.kind == KeyEventKind::Press => {
                        self.handle_key(key);
                        self.needs_redraw = true;
                    }
                    Some(Ok(Event::Resize(..))) => self.needs_redraw = true,
                    Some(Ok(_)) => {}
                    Some(Err(e)) => return Err(e.into()),
                    None => break,
                },

                Some(event) = self.engine.next_event() => {
                    self.engine.apply(event);
                    self.engine.drain();
                    self.view.clamp(self.engine.len());
                    self.needs_redraw = true;
                }

                _ = interval.tick() => {
                    if self.expire_status() {
                        self.needs_redraw = true;
                    }
                }
            }
        }

        let active = self.engine.registry().active();
        if active > 0 {
            tracing::info!(active, "quitting with operations still running");
        }
        Ok(())
    }

    fn render(&mut self, frame: &mut Frame) {
        let area = frame.area();
        let operations = self.engine.snapshot();
        let layout = AppLayout::new(area);
        self.view
            .set_height(ProcessBar::inner_height(layout.main), operations.len());

        let ctx = RenderContext {
            mode: self.mode,
            theme: &self.theme,
            operations: &operations,
            view: &self.view,
            status: self.status.as_ref(),
            show_help: self.show_help,
            command_input: self.command.buffer(),
            command_cursor: self.command.cursor(),
        };
        render_app(&ctx, area, frame.buffer_mut());
    }

    fn handle_key(&mut self, key: KeyEvent) {
        if self.mode == AppMode::Command {
            match self.command.handle_key(key) {
                CommandKeyResult::Continue => {}
                CommandKeyResult::Cancel => self.mode = AppMode::Normal,
                CommandKeyResult::Execute(cmd) => {
                    self.mode = AppMode::Normal;
                    self.execute_command(&cmd);
                }
            }
            return;
        }
        self.handle_action(KeyAction::from_key_event(key));
    }

    fn handle_action(&mut self, action: KeyAction) {
        let len = self.engine.len();
        if self.show_help && !matches!(action, KeyAction::ForceQuit | KeyAction::None) {
            self.show_help = false;
            if matches!(action, KeyAction::ToggleHelp | KeyAction::Dismiss) {
                return;
            }
        }

        match action {
            KeyAction::MoveUp => self.view.move_cursor_up(len),
            KeyAction::MoveDown => self.view.move_cursor_down(len),
            KeyAction::ScrollUp => self.view.scroll(-1, len),
            KeyAction::ScrollDown => self.view.scroll(1, len),
            KeyAction::PageUp => self.view.page_up(len),
            KeyAction::PageDown => self.view.page_down(len),
            KeyAction::JumpToTop => self.view.jump_to_top(),
            KeyAction::JumpToBottom => self.view.jump_to_bottom(len),
            KeyAction::CancelSelected => self.cancel_selected(),
            KeyAction::ClearFinished => self.clear_finished(),
            KeyAction::ToggleHelp => self.show_help = !self.show_help,
            KeyAction::CommandMode => {
                self.command.clear();
                self.mode = AppMode::Command;
            }
            KeyAction::Dismiss => self.status = None,
            KeyAction::Quit | KeyAction::ForceQuit => self.mode = AppMode::Quit,
            KeyAction::None => {}
        }
    }

    /// Execute a command palette line.
    pub fn execute_command(&mut self, cmd: &str) {
        match parse_command(cmd) {
            CommandAction::None => {}
            CommandAction::Quit => self.mode = AppMode::Quit,
            CommandAction::Submit {
                kind,
                sources,
                destination,
            } => self.submit(kind, sources, destination),
            CommandAction::CancelSelected => self.cancel_selected(),
            CommandAction::Cancel(id) => self.cancel(id),
            CommandAction::ClearFinished => self.clear_finished(),
            CommandAction::ShowHelp => self.show_help = true,
            CommandAction::Usage(usage) => self.set_error(format!("Usage: {usage}")),
            CommandAction::Unknown(name) => self.set_error(format!("Unknown command: {name}")),
        }
    }

    /// Start an operation, reporting rejections in the status line.
    pub fn submit(
        &mut self,
        kind: OperationKind,
        sources: Vec<PathBuf>,
        destination: Option<PathBuf>,
    ) {
        match self.engine.submit(kind, sources, destination) {
            Ok(id) => {
                let name = self
                    .engine
                    .get(id)
                    .map(|op| op.name().to_string())
                    .unwrap_or_default();
                self.set_info(format!("{} {name} started ({id})", kind.title()));
            }
            Err(e) => {
                tracing::debug!(error = %e, "request rejected");
                self.set_error(e.to_string());
            }
        }
        self.view.clamp(self.engine.len());
    }

    fn cancel_selected(&mut self) {
        let order = self.engine.registry().display_order();
        let selected = self.view.selected(&order).map(|op| op.id());
        match selected {
            Some(id) => self.cancel(id),
            None => self.set_error("No operation selected"),
        }
    }

    fn cancel(&mut self, id: OperationId) {
        let Some(op) = self.engine.get(id) else {
            self.set_error(format!("No operation {id}"));
            return;
        };
        if op.is_terminal() {
            let msg = format!("{} is already {}", op.name(), op.state());
            self.set_error(msg);
            return;
        }
        let name = op.name().to_string();
        if self.engine.cancel(id) {
            self.set_info(format!("Cancelling {name}"));
        } else {
            self.set_info(format!("{name} is already cancelling"));
        }
    }

    fn clear_finished(&mut self) {
        let removed = self.engine.clear_finished();
        self.view.clamp(self.engine.len());
        if removed > 0 {
            self.set_info(format!("Cleared {removed} finished"));
        }
    }

    fn set_info(&mut self, text: impl Into<String>) {
        self.set_status(text.into(), StatusLevel::Info);
    }

    fn set_error(&mut self, text: impl Into<String>) {
        self.set_status(text.into(), StatusLevel::Error);
    }

    fn set_status(&mut self, text: String, level: StatusLevel) {
        self.status = Some(StatusMessage {
            text,
            level,
            shown_at: Instant::now(),
        });
    }

    /// Drop a status message that has been up long enough.
    fn expire_status(&mut self) -> bool {
        let expired = self
            .status
            .as_ref()
            .is_some_and(|s| s.shown_at.elapsed() >= Duration::from_secs(STATUS_TIMEOUT_SECS));
        if expired {
            self.status = None;
        }
        expired
    }
}
