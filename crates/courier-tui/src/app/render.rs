//! Application rendering.

use courier_core::Operation;
use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Paragraph, Widget};

use crate::theme::Theme;
use crate::ui::{AppLayout, CommandLine, HelpOverlay, ProcessBar};

use super::process_view::ProcessView;
use super::{AppMode, StatusLevel, StatusMessage};

/// Everything a frame needs, borrowed from the app.
pub struct RenderContext<'a> {
    pub mode: AppMode,
    pub theme: &'a Theme,
    pub operations: &'a [Operation],
    pub view: &'a ProcessView,
    pub status: Option<&'a StatusMessage>,
    pub show_help: bool,
    pub command_input: &'a str,
    pub command_cursor: usize,
}

/// Main render function for the application.
pub fn render_app(ctx: &RenderContext, area: Rect, buf: &mut Buffer) {
    let base_style = Style::default()
        .bg(ctx.theme.background)
        .fg(ctx.theme.foreground);
    buf.set_style(area, base_style);

    let layout = AppLayout::new(area);
    render_header(ctx, layout.header, buf);
    ProcessBar::new(ctx.operations, ctx.view, ctx.theme).render(layout.main, buf);

    match ctx.mode {
        AppMode::Command => {
            CommandLine::new(ctx.theme, ctx.command_input, ctx.command_cursor)
                .render(layout.footer, buf);
        }
        AppMode::Normal | AppMode::Quit => render_footer(ctx, layout.footer, buf),
    }

    if ctx.show_help {
        HelpOverlay::new(ctx.theme).render(area, buf);
    }
}

fn render_header(ctx: &RenderContext, area: Rect, buf: &mut Buffer) {
    let running = ctx.operations.iter().filter(|op| !op.is_terminal()).count();
    let mut spans = vec![
        Span::styled(" courier ", ctx.theme.title.add_modifier(Modifier::BOLD)),
        Span::styled(
            format!(" {running} running, {} total ", ctx.operations.len()),
            ctx.theme.header,
        ),
    ];

    if let Some(status) = ctx.status {
        let color = match status.level {
            StatusLevel::Info => ctx.theme.success,
            StatusLevel::Error => ctx.theme.error,
        };
        spans.push(Span::styled(
            format!(" {} ", status.text),
            Style::default().fg(color),
        ));
    }

    Paragraph::new(Line::from(spans))
        .style(ctx.theme.header)
        .render(area, buf);
}

fn render_footer(ctx: &RenderContext, area: Rect, buf: &mut Buffer) {
    let mut keys = vec![("j/k", "Nav")];
    if ctx.operations.iter().any(|op| !op.is_terminal()) {
        keys.push(("x", "Cancel"));
    }
    if ctx.operations.iter().any(|op| op.is_terminal()) {
        keys.push(("c", "Clear"));
    }
    keys.extend([(":", "Cmd"), ("?", "Help"), ("q", "Quit")]);

    let spans: Vec<Span> = keys
        .iter()
        .flat_map(|(key, desc)| {
            vec![
                Span::styled(format!(" {key} "), ctx.theme.help_key),
                Span::styled(format!("{desc} "), ctx.theme.help_desc),
            ]
        })
        .collect();

    Paragraph::new(Line::from(spans))
        .style(ctx.theme.footer)
        .render(area, buf);
}
