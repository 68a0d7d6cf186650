//! Help overlay widget.

use ratatui::buffer::Buffer;
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Widget};

use crate::event::{get_command_help, get_help_sections};
use crate::theme::Theme;

/// Help overlay: key bindings on the left, palette commands on the right.
pub struct HelpOverlay<'a> {
    theme: &'a Theme,
}

impl<'a> HelpOverlay<'a> {
    pub fn new(theme: &'a Theme) -> Self {
        Self { theme }
    }

    fn heading(&self, text: &'static str) -> Line<'static> {
        Line::from(Span::styled(
            text,
            Style::default()
                .fg(self.theme.info)
                .add_modifier(Modifier::BOLD),
        ))
    }

    fn entry(&self, key: &str, desc: &str, key_width: usize) -> Line<'static> {
        Line::from(vec![
            Span::styled(format!("{key:>key_width$}"), self.theme.help_key),
            Span::styled(format!(" {desc}"), self.theme.help_desc),
        ])
    }
}

impl Widget for HelpOverlay<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let popup_width = 84.min(area.width.saturating_sub(4));
        let popup_height = 18.min(area.height.saturating_sub(2));
        let popup_x = (area.width.saturating_sub(popup_width)) / 2 + area.x;
        let popup_y = (area.height.saturating_sub(popup_height)) / 2 + area.y;
        let popup_area = Rect::new(popup_x, popup_y, popup_width, popup_height);

        Clear.render(popup_area, buf);

        let block = Block::default()
            .title(" Help - Press ? or Esc to close ")
            .title_style(self.theme.title)
            .borders(Borders::ALL)
            .border_style(self.theme.border);
        let inner = block.inner(popup_area);
        block.render(popup_area, buf);

        let [left_col, right_col] =
            Layout::horizontal([Constraint::Percentage(45), Constraint::Percentage(55)])
                .areas(inner);

        let mut left = Vec::new();
        for section in get_help_sections() {
            left.push(self.heading(section.title));
            for binding in &section.bindings {
                left.push(self.entry(binding.keys, binding.description, 12));
            }
            left.push(Line::default());
        }

        let mut right = vec![self.heading("Command Palette (:)")];
        for (cmd, desc) in get_command_help() {
            right.push(self.entry(cmd, desc, 20));
        }

        for (col, lines) in [(left_col, left), (right_col, right)] {
            for (line, y) in lines.iter().zip(col.y..col.y + col.height) {
                buf.set_line(col.x, y, line, col.width);
            }
        }
    }
}
