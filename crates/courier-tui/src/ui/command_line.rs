//! Command palette line shown in place of the footer.

use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Clear, Paragraph, Widget};

use crate::theme::Theme;

pub struct CommandLine<'a> {
    theme: &'a Theme,
    input: &'a str,
    cursor: usize,
}

impl<'a> CommandLine<'a> {
    pub fn new(theme: &'a Theme, input: &'a str, cursor: usize) -> Self {
        Self {
            theme,
            input,
            cursor,
        }
    }
}

impl Widget for CommandLine<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        Clear.render(area, buf);

        let mut spans = vec![Span::styled(
            ":",
            Style::default()
                .fg(self.theme.info)
                .add_modifier(Modifier::BOLD),
        )];

        if self.input.is_empty() {
            spans.push(Span::styled(
                "cp, mv, rm, trash, cancel, clear, q",
                Style::default().fg(self.theme.muted),
            ));
        } else {
            let at = self.cursor.min(self.input.len());
            let (before, after) = self.input.split_at(at);
            spans.push(Span::raw(before));

            let reversed = Style::default().add_modifier(Modifier::REVERSED);
            match after.chars().next() {
                Some(c) => {
                    let (under, rest) = after.split_at(c.len_utf8());
                    spans.push(Span::styled(under, reversed));
                    spans.push(Span::raw(rest));
                }
                None => spans.push(Span::styled(" ", reversed)),
            }
        }

        Paragraph::new(Line::from(spans))
            .style(self.theme.footer)
            .render(area, buf);
    }
}
