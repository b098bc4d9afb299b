//! Screen model implementation
//!
//! The screen is the visible `rows x cols` grid plus the state that shapes
//! how characters land on it: the cursor, the saved cursor slot, the scroll
//! region, and the mode flags the input side depends on. Rows scrolled off
//! the top of a full-height region go to the scrollback.

use serde::{Deserialize, Serialize};

use super::cell::{char_width, Cell, Color};
use super::cursor::{Cursor, SavedCursor};
use super::scrollback::{Line, Scrollback};

/// Width between default tab stops
pub const TAB_WIDTH: usize = 8;

/// Terminal mode flags surfaced to the input side and the renderer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Modes {
    /// Application cursor keys (DECCKM, `?1`)
    pub application_cursor: bool,
    /// Bracketed paste mode (xterm, `?2004`)
    pub bracketed_paste: bool,
    /// Cursor blinking requested by the application (`?12`)
    pub cursor_blink: bool,
}

/// The visible grid and everything needed to place characters on it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Screen {
    cols: usize,
    rows: usize,
    /// Exactly `rows` lines of exactly `cols` cells each
    lines: Vec<Line>,
    scrollback: Scrollback,
    cursor: Cursor,
    saved_cursor: SavedCursor,
    /// Scroll region top (0-indexed, inclusive)
    scroll_top: usize,
    /// Scroll region bottom (0-indexed, inclusive)
    scroll_bottom: usize,
    pub modes: Modes,
}

impl Screen {
    /// Create a new screen with the given dimensions.
    ///
    /// Dimensions are clamped to at least one row and one column.
    pub fn new(cols: usize, rows: usize, scrollback_capacity: usize) -> Self {
        let cols = cols.max(1);
        let rows = rows.max(1);
        Self {
            cols,
            rows,
            lines: (0..rows).map(|_| Line::new(cols)).collect(),
            scrollback: Scrollback::new(scrollback_capacity),
            cursor: Cursor::new(),
            saved_cursor: SavedCursor::default(),
            scroll_top: 0,
            scroll_bottom: rows - 1,
            modes: Modes::default(),
        }
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cursor(&self) -> &Cursor {
        &self.cursor
    }

    pub fn cursor_mut(&mut self) -> &mut Cursor {
        &mut self.cursor
    }

    pub fn scrollback(&self) -> &Scrollback {
        &self.scrollback
    }

    /// Get scroll region as `(top, bottom)`, both inclusive
    pub fn scroll_region(&self) -> (usize, usize) {
        (self.scroll_top, self.scroll_bottom)
    }

    /// Get a cell at the given position
    pub fn cell(&self, col: usize, row: usize) -> Option<&Cell> {
        self.lines.get(row).and_then(|line| line.get(col))
    }

    /// Get a line at the given screen row
    pub fn line(&self, row: usize) -> Option<&Line> {
        self.lines.get(row)
    }

    /// Iterate over the visible lines, top to bottom
    pub fn lines(&self) -> impl ExactSizeIterator<Item = &Line> + '_ {
        self.lines.iter()
    }

    /// Number of rows addressable by selection: scrollback followed by screen
    pub fn total_lines(&self) -> usize {
        self.scrollback.len() + self.rows
    }

    /// Line at an absolute row over scrollback followed by screen
    pub fn line_at(&self, abs_row: usize) -> Option<&Line> {
        let history = self.scrollback.len();
        if abs_row < history {
            self.scrollback.get(abs_row)
        } else {
            self.lines.get(abs_row - history)
        }
    }

    /// Text of one screen row with trailing blanks trimmed
    pub fn row_text(&self, row: usize) -> String {
        self.lines.get(row).map(Line::text).unwrap_or_default()
    }

    /// All visible rows joined with newlines
    pub fn visible_text(&self) -> String {
        self.lines
            .iter()
            .map(Line::text)
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn blank_line(&self) -> Line {
        let mut line = Line::new(self.cols);
        line.clear(self.cursor.bg);
        line
    }

    /// Place a printable character at the cursor
    pub fn print(&mut self, c: char) {
        let width = char_width(c);

        if width == 0 {
            self.attach_combining(c);
            return;
        }

        if self.cursor.pending_wrap {
            self.wrap();
        }

        let cols = self.cols;
        if width == 2 && cols < 2 {
            // Nowhere to put a double-width glyph
            return;
        }

        if width == 2 && self.cursor.col + 1 >= cols {
            if self.cursor.autowrap {
                let (col, row) = (self.cursor.col, self.cursor.row);
                let bg = self.cursor.bg;
                let line = &mut self.lines[row];
                line.erase_range(col, col + 1, bg);
                line.repair_wide_chars_in(col, col + 1);
                self.wrap();
            } else {
                self.cursor.col = cols - 2;
            }
        }

        let (col, row) = (self.cursor.col, self.cursor.row);
        let (fg, bg, style) = (self.cursor.fg, self.cursor.bg, self.cursor.style);
        let line = &mut self.lines[row];
        line.cells[col].set(c, width as u8, fg, bg, style);
        if width == 2 {
            let cont = &mut line.cells[col + 1];
            *cont = Cell::continuation();
            cont.fg = fg;
            cont.bg = bg;
            cont.style = style;
        }
        line.repair_wide_chars_in(col, col + width);

        let next = col + width;
        if next >= cols {
            self.cursor.col = cols - 1;
            self.cursor.pending_wrap = self.cursor.autowrap;
        } else {
            self.cursor.col = next;
        }
    }

    /// Zero-width characters join the cell before the cursor
    fn attach_combining(&mut self, c: char) {
        let row = self.cursor.row;
        let mut col = if self.cursor.pending_wrap {
            self.cursor.col
        } else if self.cursor.col > 0 {
            self.cursor.col - 1
        } else {
            return;
        };
        if col > 0 && self.lines[row].cells[col].is_continuation() {
            col -= 1;
        }
        self.lines[row].cells[col].push_combining(c);
    }

    /// Deferred autowrap: move to the start of the next row
    fn wrap(&mut self) {
        self.cursor.pending_wrap = false;
        let row = self.cursor.row;
        self.lines[row].wrapped = true;
        self.cursor.col = 0;
        self.index();
    }

    /// Line feed: down one row, scrolling at the bottom of the region, and
    /// back to column 0. Output that ends lines with a bare `\n` still
    /// starts each line at the left margin.
    pub fn linefeed(&mut self) {
        self.index();
        self.cursor.carriage_return();
    }

    /// Index (IND): down one row, scrolling at the bottom of the region
    pub fn index(&mut self) {
        self.cursor.pending_wrap = false;
        let row = self.cursor.row;
        if row == self.scroll_bottom {
            self.scroll_up(1);
        } else if row + 1 < self.rows {
            self.cursor.row += 1;
        }
    }

    /// Reverse index (RI): up one row, scrolling at the top of the region
    pub fn reverse_index(&mut self) {
        self.cursor.pending_wrap = false;
        let row = self.cursor.row;
        if row == self.scroll_top {
            self.scroll_down(1);
        } else if row > 0 {
            self.cursor.row -= 1;
        }
    }

    /// Next line (NEL). Same motion as LF.
    pub fn next_line(&mut self) {
        self.linefeed();
    }

    pub fn carriage_return(&mut self) {
        self.cursor.carriage_return();
    }

    pub fn backspace(&mut self) {
        self.cursor.move_left(1);
    }

    /// Horizontal tab: next multiple of eight, clipped to the last column
    pub fn tab(&mut self) {
        let next = (self.cursor.col / TAB_WIDTH + 1) * TAB_WIDTH;
        self.cursor.col = next.min(self.cols - 1);
        self.cursor.pending_wrap = false;
    }

    /// Scroll the region up by n lines (content moves up, blank lines at the
    /// bottom). Lines leaving a region that starts at row 0 go to scrollback.
    pub fn scroll_up(&mut self, n: usize) {
        let (top, bottom) = (self.scroll_top, self.scroll_bottom);
        let n = n.min(bottom - top + 1);
        if n == 0 {
            return;
        }
        for i in 0..n {
            let blank = self.blank_line();
            let evicted = std::mem::replace(&mut self.lines[top + i], blank);
            if top == 0 {
                self.scrollback.push(evicted);
            }
        }
        self.lines[top..=bottom].rotate_left(n);
    }

    /// Scroll the region down by n lines (content moves down, blank lines at
    /// the top). Lines pushed off the bottom are discarded.
    pub fn scroll_down(&mut self, n: usize) {
        let (top, bottom) = (self.scroll_top, self.scroll_bottom);
        let n = n.min(bottom - top + 1);
        if n == 0 {
            return;
        }
        for i in 0..n {
            self.lines[bottom - i] = self.blank_line();
        }
        self.lines[top..=bottom].rotate_right(n);
    }

    /// Set the scroll region (DECSTBM), 0-indexed and inclusive.
    /// Invalid regions are ignored. The cursor homes on success.
    pub fn set_scroll_region(&mut self, top: usize, bottom: usize) {
        let bottom = bottom.min(self.rows - 1);
        if top >= bottom {
            tracing::trace!(top, bottom, "ignoring invalid scroll region");
            return;
        }
        self.scroll_top = top;
        self.scroll_bottom = bottom;
        self.cursor.move_to(0, 0, self.cols, self.rows);
    }

    pub fn reset_scroll_region(&mut self) {
        self.scroll_top = 0;
        self.scroll_bottom = self.rows - 1;
    }

    /// Erase in display (ED).
    ///
    /// 0: cursor to end of screen, 1: start of screen through the cursor,
    /// 2: whole screen, 3: whole screen and scrollback.
    pub fn erase_in_display(&mut self, mode: u16) {
        let (col, row) = (self.cursor.col, self.cursor.row);
        let bg = self.cursor.bg;
        match mode {
            0 => {
                let line = &mut self.lines[row];
                line.erase_range(col, self.cols, bg);
                line.repair_wide_chars_in(col, col);
                line.wrapped = false;
                for line in &mut self.lines[row + 1..] {
                    line.clear(bg);
                }
            }
            1 => {
                for line in &mut self.lines[..row] {
                    line.clear(bg);
                }
                let line = &mut self.lines[row];
                line.erase_range(0, col + 1, bg);
                line.repair_wide_chars_in(col + 1, col + 1);
            }
            2 => {
                for line in &mut self.lines {
                    line.clear(bg);
                }
            }
            3 => {
                for line in &mut self.lines {
                    line.clear(bg);
                }
                self.scrollback.clear();
            }
            _ => tracing::trace!(mode, "unknown erase-in-display mode"),
        }
    }

    /// Erase in line (EL).
    ///
    /// 0: cursor to end of line, 1: start of line through the cursor,
    /// 2: whole line.
    pub fn erase_in_line(&mut self, mode: u16) {
        let (col, row) = (self.cursor.col, self.cursor.row);
        let bg = self.cursor.bg;
        let cols = self.cols;
        let line = &mut self.lines[row];
        match mode {
            0 => {
                line.erase_range(col, cols, bg);
                line.repair_wide_chars_in(col, col);
                line.wrapped = false;
            }
            1 => {
                line.erase_range(0, col + 1, bg);
                line.repair_wide_chars_in(col + 1, col + 1);
            }
            2 => line.clear(bg),
            _ => tracing::trace!(mode, "unknown erase-in-line mode"),
        }
    }

    /// Erase n characters from the cursor without moving it (ECH)
    pub fn erase_chars(&mut self, n: usize) {
        let (col, row) = (self.cursor.col, self.cursor.row);
        let bg = self.cursor.bg;
        let end = col.saturating_add(n.max(1)).min(self.cols);
        let line = &mut self.lines[row];
        line.erase_range(col, end, bg);
        line.repair_wide_chars_in(col, end);
    }

    /// Insert n blank lines at the cursor row (IL). No-op outside the region.
    pub fn insert_lines(&mut self, n: usize) {
        let row = self.cursor.row;
        if row < self.scroll_top || row > self.scroll_bottom {
            return;
        }
        let bottom = self.scroll_bottom;
        let n = n.min(bottom - row + 1);
        for i in 0..n {
            self.lines[bottom - i] = self.blank_line();
        }
        self.lines[row..=bottom].rotate_right(n);
        self.cursor.carriage_return();
    }

    /// Delete n lines at the cursor row (DL). No-op outside the region.
    pub fn delete_lines(&mut self, n: usize) {
        let row = self.cursor.row;
        if row < self.scroll_top || row > self.scroll_bottom {
            return;
        }
        let bottom = self.scroll_bottom;
        let n = n.min(bottom - row + 1);
        for i in 0..n {
            self.lines[row + i] = self.blank_line();
        }
        self.lines[row..=bottom].rotate_left(n);
        self.cursor.carriage_return();
    }

    /// Insert n blank cells at the cursor (ICH)
    pub fn insert_chars(&mut self, n: usize) {
        let (col, row) = (self.cursor.col, self.cursor.row);
        let bg = self.cursor.bg;
        let line = &mut self.lines[row];
        line.insert_cells(col, n, bg);
        line.repair_wide_chars();
        self.cursor.pending_wrap = false;
    }

    /// Delete n cells at the cursor (DCH)
    pub fn delete_chars(&mut self, n: usize) {
        let (col, row) = (self.cursor.col, self.cursor.row);
        let bg = self.cursor.bg;
        let line = &mut self.lines[row];
        line.delete_cells(col, n, bg);
        line.repair_wide_chars();
        self.cursor.pending_wrap = false;
    }

    /// Move cursor to an absolute 0-indexed position (CUP)
    pub fn move_cursor_to(&mut self, row: usize, col: usize) {
        self.cursor.move_to(col, row, self.cols, self.rows);
    }

    /// Cursor up (CUU). Stops at the region top when starting inside it.
    pub fn move_cursor_up(&mut self, n: usize) {
        let top = if self.cursor.row >= self.scroll_top {
            self.scroll_top
        } else {
            0
        };
        self.cursor.move_up(n, top);
    }

    /// Cursor down (CUD). Stops at the region bottom when starting inside it.
    pub fn move_cursor_down(&mut self, n: usize) {
        let bottom = if self.cursor.row <= self.scroll_bottom {
            self.scroll_bottom
        } else {
            self.rows - 1
        };
        self.cursor.move_down(n, bottom);
    }

    pub fn move_cursor_forward(&mut self, n: usize) {
        self.cursor.move_right(n, self.cols);
    }

    pub fn move_cursor_backward(&mut self, n: usize) {
        self.cursor.move_left(n);
    }

    /// Move to an absolute column on the current row (CHA/HPA)
    pub fn move_cursor_to_col(&mut self, col: usize) {
        let row = self.cursor.row;
        self.cursor.move_to(col, row, self.cols, self.rows);
    }

    /// Move to an absolute row keeping the column (VPA)
    pub fn move_cursor_to_row(&mut self, row: usize) {
        let col = self.cursor.col;
        self.cursor.move_to(col, row, self.cols, self.rows);
    }

    /// Save cursor position and pen (DECSC, CSI s)
    pub fn save_cursor(&mut self) {
        self.saved_cursor = self.cursor.save();
    }

    /// Restore the saved cursor (DECRC, CSI u)
    pub fn restore_cursor(&mut self) {
        let saved = self.saved_cursor.clone();
        self.cursor.restore(&saved, self.cols, self.rows);
    }

    /// Resize the grid in place.
    ///
    /// Rows are padded or truncated to the new width; content is never
    /// re-wrapped. When rows shrink, blank rows below the cursor are dropped
    /// first and the remaining excess leaves through the top into
    /// scrollback. The cursor is clamped into the new bounds.
    pub fn resize(&mut self, cols: usize, rows: usize) {
        let cols = cols.max(1);
        let rows = rows.max(1);
        if cols == self.cols && rows == self.rows {
            return;
        }

        if cols != self.cols {
            for line in &mut self.lines {
                line.resize(cols);
            }
        }

        if rows < self.rows {
            let mut excess = self.rows - rows;
            while excess > 0
                && self.lines.len() > self.cursor.row + 1
                && self.lines.last().is_some_and(Line::is_empty)
            {
                self.lines.pop();
                excess -= 1;
            }
            for line in self.lines.drain(..excess) {
                self.scrollback.push(line);
            }
            self.cursor.row = self.cursor.row.saturating_sub(excess);
        } else {
            self.lines.resize_with(rows, || Line::new(cols));
        }

        self.cols = cols;
        self.rows = rows;
        self.scroll_top = 0;
        self.scroll_bottom = rows - 1;
        let (col, row) = (self.cursor.col, self.cursor.row);
        self.cursor.move_to(col, row, cols, rows);
        tracing::debug!(cols, rows, "screen resized");
    }

    /// Full reset (RIS): blank grid, home cursor, default modes, no history
    pub fn reset(&mut self) {
        for line in &mut self.lines {
            line.clear(Color::Default);
        }
        self.cursor = Cursor::new();
        self.saved_cursor = SavedCursor::default();
        self.reset_scroll_region();
        self.modes = Modes::default();
        self.scrollback.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn print_str(screen: &mut Screen, s: &str) {
        for c in s.chars() {
            screen.print(c);
        }
    }

    #[test]
    fn test_screen_new() {
        let screen = Screen::new(80, 24, 1000);
        assert_eq!(screen.cols(), 80);
        assert_eq!(screen.rows(), 24);
        assert_eq!(screen.cursor().col, 0);
        assert_eq!(screen.cursor().row, 0);
        assert_eq!(screen.scroll_region(), (0, 23));
    }

    #[test]
    fn test_print() {
        let mut screen = Screen::new(80, 24, 1000);
        print_str(&mut screen, "Hi");
        assert_eq!(screen.cell(0, 0).unwrap().display_char(), 'H');
        assert_eq!(screen.cell(1, 0).unwrap().display_char(), 'i');
        assert_eq!(screen.cursor().col, 2);
    }

    #[test]
    fn test_autowrap() {
        let mut screen = Screen::new(5, 3, 1000);
        print_str(&mut screen, "Hello World");
        assert_eq!(screen.row_text(0), "Hello");
        assert_eq!(screen.row_text(1), " Worl");
        assert_eq!(screen.row_text(2), "d");
        assert!(screen.line(0).unwrap().wrapped);
    }

    #[test]
    fn test_pending_wrap_at_last_column() {
        let mut screen = Screen::new(5, 3, 1000);
        print_str(&mut screen, "abcde");
        assert_eq!((screen.cursor().col, screen.cursor().row), (4, 0));
        assert!(screen.cursor().pending_wrap);

        // CR cancels the pending wrap
        screen.carriage_return();
        print_str(&mut screen, "X");
        assert_eq!(screen.row_text(0), "Xbcde");
        assert_eq!(screen.cursor().row, 0);
    }

    #[test]
    fn test_no_autowrap_overwrites_last_column() {
        let mut screen = Screen::new(5, 3, 1000);
        screen.cursor_mut().autowrap = false;
        print_str(&mut screen, "abcdefg");
        assert_eq!(screen.row_text(0), "abcdg");
        assert_eq!(screen.cursor().row, 0);
    }

    #[test]
    fn test_wide_char_occupies_two_columns() {
        let mut screen = Screen::new(10, 3, 100);
        screen.move_cursor_to(0, 3);
        screen.print('中');
        assert!(screen.cell(3, 0).unwrap().is_wide());
        assert!(screen.cell(4, 0).unwrap().is_continuation());
        assert_eq!(screen.cursor().col, 5);
        assert_eq!(screen.row_text(0), "   中");
    }

    #[test]
    fn test_wide_char_wraps_at_last_column() {
        let mut screen = Screen::new(5, 3, 100);
        print_str(&mut screen, "abcd中");
        assert_eq!(screen.row_text(0), "abcd");
        assert!(screen.cell(0, 1).unwrap().is_wide());
        assert_eq!((screen.cursor().col, screen.cursor().row), (2, 1));
    }

    #[test]
    fn test_overwrite_half_of_wide_char() {
        let mut screen = Screen::new(10, 3, 100);
        screen.print('中');
        screen.move_cursor_to(0, 1);
        screen.print('x');
        let lead = screen.cell(0, 0).unwrap();
        assert!(lead.is_empty() && !lead.is_wide());
        assert_eq!(screen.cell(1, 0).unwrap().content, "x");

        screen.move_cursor_to(1, 0);
        screen.print('中');
        screen.move_cursor_to(1, 0);
        screen.print('y');
        assert_eq!(screen.row_text(1), "y");
        assert!(!screen.cell(1, 1).unwrap().is_continuation());
    }

    #[test]
    fn test_combining_attaches_to_previous() {
        let mut screen = Screen::new(10, 3, 100);
        print_str(&mut screen, "e\u{301}x");
        assert_eq!(screen.cell(0, 0).unwrap().content, "e\u{301}");
        assert_eq!(screen.cell(1, 0).unwrap().content, "x");
        assert_eq!(screen.cursor().col, 2);
    }

    #[test]
    fn test_linefeed_scrolls_into_scrollback() {
        let mut screen = Screen::new(10, 3, 100);
        for s in ["one", "two", "three", "four"] {
            screen.carriage_return();
            print_str(&mut screen, s);
            screen.linefeed();
        }
        // Four lines plus the final LF push two rows off the top
        assert_eq!(screen.scrollback().len(), 2);
        assert_eq!(screen.scrollback().get(0).unwrap().text(), "one");
        assert_eq!(screen.row_text(0), "three");
        assert_eq!(screen.row_text(1), "four");
        assert_eq!(screen.row_text(2), "");
    }

    #[test]
    fn test_linefeed_returns_to_column_zero() {
        let mut screen = Screen::new(10, 3, 100);
        print_str(&mut screen, "abc");
        screen.linefeed();
        assert_eq!((screen.cursor().col, screen.cursor().row), (0, 1));
        print_str(&mut screen, "de");
        assert_eq!(screen.row_text(1), "de");
    }

    #[test]
    fn test_linefeed_after_full_row_does_not_double_advance() {
        let mut screen = Screen::new(3, 3, 100);
        print_str(&mut screen, "abc");
        assert!(screen.cursor().pending_wrap);
        screen.linefeed();
        assert_eq!((screen.cursor().col, screen.cursor().row), (0, 1));
        assert!(!screen.cursor().pending_wrap);
    }

    #[test]
    fn test_tab_stops() {
        let mut screen = Screen::new(20, 3, 100);
        screen.tab();
        assert_eq!(screen.cursor().col, 8);
        screen.tab();
        assert_eq!(screen.cursor().col, 16);
        screen.tab();
        assert_eq!(screen.cursor().col, 19);
        screen.tab();
        assert_eq!(screen.cursor().col, 19);
    }

    #[test]
    fn test_backspace_floor() {
        let mut screen = Screen::new(10, 3, 100);
        screen.backspace();
        assert_eq!(screen.cursor().col, 0);
        print_str(&mut screen, "ab");
        screen.backspace();
        assert_eq!(screen.cursor().col, 1);
    }

    #[test]
    fn test_scroll_region_keeps_history_clean() {
        let mut screen = Screen::new(10, 5, 100);
        for (row, s) in ["a", "b", "c", "d", "e"].iter().enumerate() {
            screen.move_cursor_to(row, 0);
            print_str(&mut screen, s);
        }
        screen.set_scroll_region(1, 3);
        screen.move_cursor_to(3, 0);
        screen.linefeed();

        assert_eq!(screen.row_text(0), "a");
        assert_eq!(screen.row_text(1), "c");
        assert_eq!(screen.row_text(2), "d");
        assert_eq!(screen.row_text(3), "");
        assert_eq!(screen.row_text(4), "e");
        assert!(screen.scrollback().is_empty());
    }

    #[test]
    fn test_invalid_scroll_region_ignored() {
        let mut screen = Screen::new(10, 5, 100);
        screen.set_scroll_region(3, 3);
        assert_eq!(screen.scroll_region(), (0, 4));
        screen.set_scroll_region(4, 1);
        assert_eq!(screen.scroll_region(), (0, 4));
    }

    #[test]
    fn test_reverse_index_at_top() {
        let mut screen = Screen::new(10, 3, 100);
        print_str(&mut screen, "top");
        screen.reverse_index();
        assert_eq!(screen.row_text(0), "");
        assert_eq!(screen.row_text(1), "top");
    }

    #[test]
    fn test_erase_in_display_below() {
        let mut screen = Screen::new(10, 3, 100);
        for row in 0..3 {
            screen.move_cursor_to(row, 0);
            print_str(&mut screen, "abcdef");
        }
        screen.move_cursor_to(1, 2);
        screen.erase_in_display(0);
        assert_eq!(screen.row_text(0), "abcdef");
        assert_eq!(screen.row_text(1), "ab");
        assert_eq!(screen.row_text(2), "");
    }

    #[test]
    fn test_erase_in_display_above_is_inclusive() {
        let mut screen = Screen::new(10, 3, 100);
        for row in 0..3 {
            screen.move_cursor_to(row, 0);
            print_str(&mut screen, "abcdef");
        }
        screen.move_cursor_to(1, 2);
        screen.erase_in_display(1);
        assert_eq!(screen.row_text(0), "");
        assert_eq!(screen.row_text(1), "   def");
        assert_eq!(screen.row_text(2), "abcdef");
    }

    #[test]
    fn test_erase_in_display_above_at_origin() {
        let mut screen = Screen::new(10, 3, 100);
        screen.erase_in_display(1);
        assert_eq!((screen.cursor().col, screen.cursor().row), (0, 0));
        assert!(screen.lines().all(|l| l.len() == 10 && l.is_empty()));
    }

    #[test]
    fn test_erase_in_display_all_keeps_cursor() {
        let mut screen = Screen::new(10, 3, 100);
        print_str(&mut screen, "hello");
        screen.move_cursor_to(1, 4);
        screen.erase_in_display(2);
        assert!(screen.lines().all(Line::is_empty));
        assert_eq!((screen.cursor().col, screen.cursor().row), (4, 1));
    }

    #[test]
    fn test_erase_in_display_scrollback() {
        let mut screen = Screen::new(10, 2, 100);
        for _ in 0..5 {
            print_str(&mut screen, "x");
            screen.linefeed();
        }
        assert!(!screen.scrollback().is_empty());
        screen.erase_in_display(3);
        assert!(screen.scrollback().is_empty());
    }

    #[test]
    fn test_erase_in_line_modes() {
        let mut screen = Screen::new(10, 1, 100);
        print_str(&mut screen, "abcdefgh");
        screen.move_cursor_to(0, 3);
        screen.erase_in_line(0);
        assert_eq!(screen.row_text(0), "abc");

        screen.erase_in_line(1);
        assert_eq!(screen.row_text(0), "");

        print_str(&mut screen, "zz");
        screen.erase_in_line(2);
        assert_eq!(screen.row_text(0), "");
    }

    #[test]
    fn test_erase_chars() {
        let mut screen = Screen::new(10, 1, 100);
        print_str(&mut screen, "abcdef");
        screen.move_cursor_to(0, 1);
        screen.erase_chars(2);
        assert_eq!(screen.row_text(0), "a  def");
        assert_eq!(screen.cursor().col, 1);
    }

    #[test]
    fn test_insert_delete_lines() {
        let mut screen = Screen::new(10, 4, 100);
        for (row, s) in ["a", "b", "c", "d"].iter().enumerate() {
            screen.move_cursor_to(row, 0);
            print_str(&mut screen, s);
        }
        screen.move_cursor_to(1, 3);
        screen.insert_lines(2);
        assert_eq!(screen.visible_text(), "a\n\n\nb");
        assert_eq!(screen.cursor().col, 0);

        screen.delete_lines(2);
        assert_eq!(screen.visible_text(), "a\nb\n\n");

        screen.delete_lines(100);
        assert_eq!(screen.visible_text(), "a\n\n\n");
        assert!(screen.lines().all(|l| l.len() == 10));
    }

    #[test]
    fn test_insert_delete_chars() {
        let mut screen = Screen::new(8, 1, 100);
        print_str(&mut screen, "abcdef");
        screen.move_cursor_to(0, 2);
        screen.insert_chars(2);
        assert_eq!(screen.row_text(0), "ab  cdef");
        screen.delete_chars(3);
        assert_eq!(screen.row_text(0), "abdef");
        screen.delete_chars(100);
        assert_eq!(screen.row_text(0), "ab");
        assert_eq!(screen.line(0).unwrap().len(), 8);
    }

    #[test]
    fn test_cursor_moves_clamp() {
        let mut screen = Screen::new(10, 5, 100);
        screen.move_cursor_to(100, 100);
        assert_eq!((screen.cursor().col, screen.cursor().row), (9, 4));
        screen.move_cursor_up(100);
        assert_eq!(screen.cursor().row, 0);
        screen.move_cursor_down(2);
        assert_eq!(screen.cursor().row, 2);
        screen.move_cursor_backward(100);
        assert_eq!(screen.cursor().col, 0);
        screen.move_cursor_forward(3);
        assert_eq!(screen.cursor().col, 3);
        screen.move_cursor_to_row(1);
        screen.move_cursor_to_col(7);
        assert_eq!((screen.cursor().col, screen.cursor().row), (7, 1));
    }

    #[test]
    fn test_cursor_moves_respect_region() {
        let mut screen = Screen::new(10, 10, 100);
        screen.set_scroll_region(2, 6);
        screen.move_cursor_to(4, 0);
        screen.move_cursor_up(10);
        assert_eq!(screen.cursor().row, 2);
        screen.move_cursor_down(10);
        assert_eq!(screen.cursor().row, 6);

        // Outside the region the screen edges apply
        screen.move_cursor_to(1, 0);
        screen.move_cursor_up(10);
        assert_eq!(screen.cursor().row, 0);
        screen.move_cursor_to(8, 0);
        screen.move_cursor_down(10);
        assert_eq!(screen.cursor().row, 9);
    }

    #[test]
    fn test_save_restore_cursor() {
        let mut screen = Screen::new(10, 5, 100);
        screen.move_cursor_to(3, 4);
        screen.cursor_mut().fg = Color::GREEN;
        screen.save_cursor();
        screen.move_cursor_to(0, 0);
        screen.cursor_mut().fg = Color::Default;
        screen.restore_cursor();
        assert_eq!((screen.cursor().col, screen.cursor().row), (4, 3));
        assert_eq!(screen.cursor().fg, Color::GREEN);
    }

    #[test]
    fn test_resize_columns_round_trip() {
        let mut screen = Screen::new(80, 24, 100);
        for row in 0..24 {
            screen.move_cursor_to(row, 0);
            print_str(&mut screen, &format!("row {row}"));
        }
        let before: Vec<String> = (0..24).map(|r| screen.row_text(r)).collect();

        screen.resize(40, 24);
        assert!(screen.lines().all(|l| l.len() == 40));
        screen.resize(80, 24);
        assert!(screen.lines().all(|l| l.len() == 80));

        let after: Vec<String> = (0..24).map(|r| screen.row_text(r)).collect();
        assert_eq!(before, after);
        assert!(screen.scrollback().is_empty());
    }

    #[test]
    fn test_resize_truncates_columns() {
        let mut screen = Screen::new(10, 2, 100);
        print_str(&mut screen, "abcdefghij");
        screen.resize(4, 2);
        assert_eq!(screen.row_text(0), "abcd");
        assert_eq!(screen.cursor().col, 3);
    }

    #[test]
    fn test_resize_shrink_rows_pushes_to_scrollback() {
        let mut screen = Screen::new(10, 5, 100);
        for row in 0..5 {
            screen.move_cursor_to(row, 0);
            print_str(&mut screen, &format!("r{row}"));
        }
        screen.resize(10, 3);
        assert_eq!(screen.rows(), 3);
        assert_eq!(screen.scrollback().len(), 2);
        assert_eq!(screen.scrollback().get(0).unwrap().text(), "r0");
        assert_eq!(screen.row_text(0), "r2");
        assert_eq!(screen.cursor().row, 2);
    }

    #[test]
    fn test_resize_shrink_rows_drops_blank_rows_below_cursor() {
        let mut screen = Screen::new(10, 5, 100);
        print_str(&mut screen, "top");
        screen.resize(10, 2);
        assert!(screen.scrollback().is_empty());
        assert_eq!(screen.row_text(0), "top");
        assert_eq!(screen.cursor().row, 0);
    }

    #[test]
    fn test_resize_grow_rows() {
        let mut screen = Screen::new(10, 2, 100);
        print_str(&mut screen, "x");
        screen.resize(12, 4);
        assert_eq!(screen.rows(), 4);
        assert!(screen.lines().all(|l| l.len() == 12));
        assert_eq!(screen.row_text(0), "x");
        assert_eq!(screen.scroll_region(), (0, 3));
    }

    #[test]
    fn test_line_at_spans_history() {
        let mut screen = Screen::new(10, 2, 100);
        for s in ["a", "b", "c"] {
            screen.carriage_return();
            print_str(&mut screen, s);
            screen.linefeed();
        }
        assert_eq!(screen.total_lines(), 4);
        assert_eq!(screen.line_at(0).unwrap().text(), "a");
        assert_eq!(screen.line_at(1).unwrap().text(), "b");
        assert_eq!(screen.line_at(2).unwrap().text(), "c");
        assert!(screen.line_at(4).is_none());
    }

    #[test]
    fn test_reset() {
        let mut screen = Screen::new(10, 2, 100);
        for _ in 0..4 {
            print_str(&mut screen, "x");
            screen.linefeed();
        }
        screen.modes.bracketed_paste = true;
        screen.reset();
        assert!(screen.scrollback().is_empty());
        assert!(screen.lines().all(Line::is_empty));
        assert_eq!(screen.modes, Modes::default());
        assert_eq!((screen.cursor().col, screen.cursor().row), (0, 0));
    }
}
