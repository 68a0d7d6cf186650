//! Cursor and scroll state for the process list.
//!
//! The list itself is never stored here: every method takes the current
//! number of operations, so the view can never disagree with the registry
//! about what exists. Only the cursor row and the first visible row are kept.

use super::constants::LINES_PER_PROCESS;

/// Number of processes that fit in a viewport `height` rows tall.
///
/// Every process takes two lines plus a separator; the last one needs no
/// separator, so a trailing two-line gap still fits one more.
pub fn capacity_for(height: u16) -> usize {
    ((usize::from(height) + 1) / LINES_PER_PROCESS).max(1)
}

#[derive(Debug, Clone)]
pub struct ProcessView {
    cursor: usize,
    render_index: usize,
    capacity: usize,
}

impl Default for ProcessView {
    fn default() -> Self {
        Self {
            cursor: 0,
            render_index: 0,
            capacity: 1,
        }
    }
}

impl ProcessView {
    pub fn new() -> Self {
        Self::default()
    }

    /// Selected row.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// First visible row.
    pub fn render_index(&self) -> usize {
        self.render_index
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Adapt to a new viewport height.
    pub fn set_height(&mut self, height: u16, len: usize) {
        self.capacity = capacity_for(height);
        self.clamp(len);
    }

    /// Rows currently on screen.
    pub fn visible_range(&self, len: usize) -> std::ops::Range<usize> {
        let start = self.render_index.min(len);
        start..(start + self.capacity).min(len)
    }

    /// The item under the cursor in `order`.
    pub fn selected<'a, T>(&self, order: &'a [T]) -> Option<&'a T> {
        order.get(self.cursor)
    }

    /// Move up one row, wrapping to the bottom.
    pub fn move_cursor_up(&mut self, len: usize) {
        if len == 0 {
            return;
        }
        self.cursor = match self.cursor.min(len - 1) {
            0 => len - 1,
            n => n - 1,
        };
        self.clamp(len);
    }

    /// Move down one row, wrapping to the top.
    pub fn move_cursor_down(&mut self, len: usize) {
        if len == 0 {
            return;
        }
        self.cursor = if self.cursor + 1 >= len {
            0
        } else {
            self.cursor + 1
        };
        self.clamp(len);
    }

    /// Shift the window by `delta` rows, dragging the cursor along when it
    /// would leave the screen.
    pub fn scroll(&mut self, delta: isize, len: usize) {
        if len == 0 {
            return;
        }
        let max_start = len.saturating_sub(self.capacity);
        self.render_index = self.render_index.saturating_add_signed(delta).min(max_start);
        let last_visible = (self.render_index + self.capacity - 1).min(len - 1);
        self.cursor = self.cursor.clamp(self.render_index, last_visible);
    }

    pub fn page_up(&mut self, len: usize) {
        self.cursor = self.cursor.saturating_sub(self.capacity);
        self.render_index = self.render_index.saturating_sub(self.capacity);
        self.clamp(len);
    }

    pub fn page_down(&mut self, len: usize) {
        self.cursor = self.cursor.saturating_add(self.capacity);
        self.render_index = self.render_index.saturating_add(self.capacity);
        self.clamp(len);
    }

    pub fn jump_to_top(&mut self) {
        self.cursor = 0;
        self.render_index = 0;
    }

    pub fn jump_to_bottom(&mut self, len: usize) {
        self.cursor = len.saturating_sub(1);
        self.clamp(len);
    }

    /// Pull cursor and window back inside a list of `len` rows.
    ///
    /// Afterwards `render_index <= cursor < render_index + capacity`, and
    /// the window never starts so late that rows could be shown but are not.
    pub fn clamp(&mut self, len: usize) {
        if len == 0 {
            self.cursor = 0;
            self.render_index = 0;
            return;
        }
        self.cursor = self.cursor.min(len - 1);
        self.render_index = self.render_index.min(len.saturating_sub(self.capacity));
        if self.cursor < self.render_index {
            self.render_index = self.cursor;
        } else if self.cursor >= self.render_index + self.capacity {
            self.render_index = self.cursor + 1 - self.capacity;
        }
    }
}
