//! The process list: one two-line entry per operation.

use courier_core::{Operation, OperationState};
use ratatui::buffer::Buffer;
use ratatui::layout::{Alignment, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Widget};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::app::constants::LINES_PER_PROCESS;
use crate::app::process_view::ProcessView;
use crate::theme::Theme;

use super::ProgressBar;

/// Symbol shown next to an operation's name.
pub fn state_symbol(state: OperationState) -> &'static str {
    match state {
        OperationState::Pending => "◌",
        OperationState::InOperation => "⟳",
        OperationState::Successful => "✔",
        OperationState::Failure => "✘",
        OperationState::Cancelled => "⊘",
    }
}

/// Renders operations in display order inside a bordered block.
pub struct ProcessBar<'a> {
    operations: &'a [Operation],
    view: &'a ProcessView,
    theme: &'a Theme,
}

impl<'a> ProcessBar<'a> {
    pub fn new(operations: &'a [Operation], view: &'a ProcessView, theme: &'a Theme) -> Self {
        Self {
            operations,
            view,
            theme,
        }
    }

    /// Height available for entries inside a block of `area`.
    pub fn inner_height(area: Rect) -> u16 {
        area.height.saturating_sub(2)
    }

    fn render_entry(&self, op: &Operation, selected: bool, area: Rect, buf: &mut Buffer) {
        let color = self.theme.state_color(op.state());
        let marker = if selected { "▶ " } else { "  " };
        let id = format!(" {}", op.id());
        let fixed = marker.width() + 2 + id.width();
        let name_width = usize::from(area.width).saturating_sub(fixed);

        let name_style = if selected {
            self.theme.selected
        } else {
            Style::default().fg(self.theme.foreground)
        };
        let title = Line::from(vec![
            Span::styled(marker, Style::default().fg(self.theme.info)),
            Span::styled(
                format!("{} ", state_symbol(op.state())),
                Style::default().fg(color).add_modifier(Modifier::BOLD),
            ),
            Span::styled(truncate(op.name(), name_width), name_style),
            Span::styled(id, Style::default().fg(self.theme.muted)),
        ]);
        buf.set_line(area.x, area.y, &title, area.width);

        if area.height < 2 {
            return;
        }
        let y = area.y + 1;
        let label = progress_label(op);
        let label_width = label.width() as u16 + 1;
        let indent = 2u16.min(area.width);
        let bar_width = area.width.saturating_sub(indent + label_width);

        if bar_width >= 4 {
            ProgressBar::new(op.progress_ratio())
                .filled_style(Style::default().fg(color))
                .empty_style(self.theme.progress_bg)
                .render(Rect::new(area.x + indent, y, bar_width, 1), buf);
            buf.set_string(
                area.x + indent + bar_width + 1,
                y,
                &label,
                Style::default().fg(self.theme.muted),
            );
        } else {
            let text = truncate(&label, usize::from(area.width.saturating_sub(indent)));
            buf.set_string(area.x + indent, y, text, Style::default().fg(self.theme.muted));
        }
    }
}

impl Widget for ProcessBar<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let len = self.operations.len();
        let mut block = Block::default()
            .title(" Processes ")
            .title_style(self.theme.title)
            .borders(Borders::ALL)
            .border_style(self.theme.border);
        if len > 0 {
            block = block.title_bottom(
                Line::from(format!(" {}/{} ", self.view.cursor() + 1, len)).right_aligned(),
            );
        }

        let inner = block.inner(area);
        block.render(area, buf);
        if inner.width == 0 || inner.height == 0 {
            return;
        }

        if len == 0 {
            Paragraph::new("No processes running")
                .style(Style::default().fg(self.theme.muted))
                .alignment(Alignment::Center)
                .render(Rect::new(inner.x, inner.y + inner.height / 2, inner.width, 1), buf);
            return;
        }

        let bottom = inner.y + inner.height;
        for (row, index) in self.view.visible_range(len).enumerate() {
            let y = inner.y + (row * LINES_PER_PROCESS) as u16;
            if y >= bottom {
                break;
            }
            let height = (bottom - y).min(2);
            self.render_entry(
                &self.operations[index],
                index == self.view.cursor(),
                Rect::new(inner.x, y, inner.width, height),
                buf,
            );
        }
    }
}

/// Text after the bar: counts while running, the outcome once finished.
fn progress_label(op: &Operation) -> String {
    match (op.state(), op.total()) {
        (OperationState::Pending, _) | (_, None) => "preparing".to_string(),
        (OperationState::InOperation, Some(total)) => format!("{}/{}", op.done(), total),
        (OperationState::Failure, Some(total)) => {
            format!("{}/{} · {} errors", op.done(), total, op.errors().len())
        }
        (state, Some(total)) => format!("{}/{} {}", op.done(), total, state),
    }
}

/// Cut `text` to `max` columns, ending in "…" when shortened.
fn truncate(text: &str, max: usize) -> String {
    if text.width() <= max {
        return text.to_string();
    }
    if max == 0 {
        return String::new();
    }
    let mut out = String::new();
    let mut width = 0;
    for c in text.chars() {
        let w = c.width().unwrap_or(0);
        if width + w + 1 > max {
            break;
        }
        out.push(c);
        width += w;
    }
    out.push('…');
    out
}
