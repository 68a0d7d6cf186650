//! Progress bar widget.

use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::Style;
use ratatui::widgets::Widget;

/// A one-line horizontal bar filled to `ratio`.
pub struct ProgressBar {
    /// Value to display (0.0 - 1.0).
    ratio: f64,
    filled_style: Style,
    empty_style: Style,
    filled_char: char,
    empty_char: char,
}

impl ProgressBar {
    pub fn new(ratio: f64) -> Self {
        Self {
            ratio: if ratio.is_finite() { ratio.clamp(0.0, 1.0) } else { 0.0 },
            filled_style: Style::default(),
            empty_style: Style::default(),
            filled_char: '█',
            empty_char: '░',
        }
    }

    pub fn filled_style(mut self, style: Style) -> Self {
        self.filled_style = style;
        self
    }

    pub fn empty_style(mut self, style: Style) -> Self {
        self.empty_style = style;
        self
    }
}

impl Widget for ProgressBar {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.width == 0 || area.height == 0 {
            return;
        }

        // Never show a full bar for unfinished work.
        let exact = f64::from(area.width) * self.ratio;
        let filled_width = if self.ratio < 1.0 {
            exact.floor() as u16
        } else {
            area.width
        };

        for x in 0..area.width {
            let (symbol, style) = if x < filled_width {
                (self.filled_char, self.filled_style)
            } else {
                (self.empty_char, self.empty_style)
            };
            buf[(area.x + x, area.y)].set_char(symbol).set_style(style);
        }
    }
}
