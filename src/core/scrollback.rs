//! Rows and the scrollback history
//!
//! A `Line` is one row of cells. The scrollback stores rows evicted from the
//! top of the screen, oldest first, dropping the oldest rows once its
//! capacity is reached.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use super::cell::{Cell, Color};

/// Default number of rows kept in history
pub const DEFAULT_SCROLLBACK: usize = 10_000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Line {
    pub cells: Vec<Cell>,
    /// Autowrap continued this row onto the next one
    pub wrapped: bool,
}

impl Line {
    pub fn new(cols: usize) -> Self {
        Self {
            cells: vec![Cell::default(); cols],
            wrapped: false,
        }
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Lines always have at least one cell on a live screen; this reports
    /// whether every cell is blank.
    pub fn is_empty(&self) -> bool {
        self.cells.iter().all(|c| c.is_empty())
    }

    /// Pad with blank cells or truncate to `cols`.
    ///
    /// A wide character cut in half by truncation is blanked so the row
    /// never ends in an orphaned double-width cell.
    pub fn resize(&mut self, cols: usize) {
        let old = self.cells.len();
        self.cells.resize(cols, Cell::default());
        if cols < old {
            self.repair_wide_chars_in(cols.saturating_sub(1), cols);
        }
    }

    /// Erase every cell to `bg` and drop the wrap flag
    pub fn clear(&mut self, bg: Color) {
        for cell in &mut self.cells {
            cell.erase(bg);
        }
        self.wrapped = false;
    }

    /// Erase the cells in `start..end`, clamped to the line length
    pub fn erase_range(&mut self, start: usize, end: usize, bg: Color) {
        let end = end.min(self.cells.len());
        if start >= end {
            return;
        }
        for cell in &mut self.cells[start..end] {
            cell.erase(bg);
        }
    }

    /// Insert `count` blank cells at `col`, shifting the rest right.
    /// Cells pushed past the end are lost.
    pub fn insert_cells(&mut self, col: usize, count: usize, bg: Color) {
        let len = self.cells.len();
        if col >= len {
            return;
        }
        let count = count.min(len - col);
        self.cells[col..].rotate_right(count);
        self.erase_range(col, col + count, bg);
    }

    /// Delete `count` cells at `col`, shifting the rest left and filling the
    /// end with blanks.
    pub fn delete_cells(&mut self, col: usize, count: usize, bg: Color) {
        let len = self.cells.len();
        if col >= len {
            return;
        }
        let count = count.min(len - col);
        self.cells[col..].rotate_left(count);
        self.erase_range(len - count, len, bg);
    }

    /// Blank any half of a wide character whose partner was lost in the
    /// columns `start..end` (plus one column either side).
    pub fn repair_wide_chars_in(&mut self, start: usize, end: usize) {
        let len = self.cells.len();
        let from = start.saturating_sub(1);
        let to = end.saturating_add(1).min(len);
        for i in from..to {
            if self.cells[i].is_wide() {
                let paired = self.cells.get(i + 1).is_some_and(|c| c.is_continuation());
                if !paired {
                    let bg = self.cells[i].bg;
                    self.cells[i].erase(bg);
                }
            } else if self.cells[i].is_continuation() {
                let paired = i > 0 && self.cells[i - 1].is_wide();
                if !paired {
                    let bg = self.cells[i].bg;
                    self.cells[i].erase(bg);
                }
            }
        }
    }

    /// Blank every orphaned wide-character half in the line
    pub fn repair_wide_chars(&mut self) {
        self.repair_wide_chars_in(0, self.cells.len());
    }

    pub fn get(&self, col: usize) -> Option<&Cell> {
        self.cells.get(col)
    }

    pub fn get_mut(&mut self, col: usize) -> Option<&mut Cell> {
        self.cells.get_mut(col)
    }

    /// Text of the columns in `start..=end`, skipping continuation cells and
    /// trimming trailing blanks
    pub fn text_range(&self, start: usize, end: usize) -> String {
        let mut s = String::new();
        for cell in self.cells.iter().take(end.saturating_add(1)).skip(start) {
            if cell.is_continuation() {
                continue;
            }
            if cell.is_empty() {
                s.push(' ');
            } else {
                s.push_str(&cell.content);
            }
        }
        s.truncate(s.trim_end().len());
        s
    }

    /// Text content of the whole line, trailing blanks trimmed
    pub fn text(&self) -> String {
        self.text_range(0, self.cells.len())
    }
}

/// Bounded history of rows evicted from the top of the screen
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scrollback {
    lines: VecDeque<Line>,
    capacity: usize,
}

impl Default for Scrollback {
    fn default() -> Self {
        Self::new(DEFAULT_SCROLLBACK)
    }
}

impl Scrollback {
    /// `capacity` 0 disables history
    pub fn new(capacity: usize) -> Self {
        Self {
            // Don't pre-allocate the whole history
            lines: VecDeque::with_capacity(capacity.min(1024)),
            capacity,
        }
    }

    /// Number of lines in the scrollback
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Maximum number of lines kept
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Append a line, dropping the oldest one when over capacity
    pub fn push(&mut self, line: Line) {
        if self.capacity == 0 {
            return;
        }
        while self.lines.len() >= self.capacity {
            self.lines.pop_front();
        }
        self.lines.push_back(line);
    }

    /// Get a line by index (0 = oldest line)
    pub fn get(&self, index: usize) -> Option<&Line> {
        self.lines.get(index)
    }

    /// Remove all lines
    pub fn clear(&mut self) {
        self.lines.clear();
    }

    /// Iterate from oldest to newest
    pub fn iter(&self) -> impl ExactSizeIterator<Item = &Line> + DoubleEndedIterator + '_ {
        self.lines.iter()
    }

    /// Change the capacity, keeping only the most recent lines
    pub fn set_capacity(&mut self, capacity: usize) {
        self.capacity = capacity;
        while self.lines.len() > capacity {
            self.lines.pop_front();
        }
    }
}
