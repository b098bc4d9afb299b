//! Text selection over scrollback and screen
//!
//! Rows are absolute: row 0 is the oldest scrollback line and the visible
//! screen follows the history. A selection stores the point where the
//! pointer went down (anchor) and the point it was dragged to (extent);
//! every query normalizes the pair first, so drag direction never matters.

use serde::{Deserialize, Serialize};

use super::scrollback::Line;
use super::screen::Screen;

/// A position over scrollback followed by screen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionPoint {
    pub row: usize,
    pub col: usize,
}

impl SelectionPoint {
    pub fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }

    /// Reading-order comparison: row first, then column
    pub fn is_before(&self, other: &SelectionPoint) -> bool {
        (self.row, self.col) < (other.row, other.col)
    }
}

/// How the selected cells are shaped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SelectionKind {
    /// Stream selection: first row from the start column, middle rows in
    /// full, last row up to the end column
    #[default]
    Normal,
    /// Rectangle: the same column range on every row
    Block,
}

/// An anchor/extent pair plus the drag state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    anchor: SelectionPoint,
    extent: SelectionPoint,
    kind: SelectionKind,
    /// Pointer still held down
    active: bool,
}

impl Selection {
    /// Start a selection at `anchor`
    pub fn new(anchor: SelectionPoint, kind: SelectionKind) -> Self {
        Self {
            anchor,
            extent: anchor,
            kind,
            active: true,
        }
    }

    /// A finished selection covering `start..=end`
    pub fn range(start: SelectionPoint, end: SelectionPoint, kind: SelectionKind) -> Self {
        Self {
            anchor: start,
            extent: end,
            kind,
            active: false,
        }
    }

    /// Move the extent (pointer drag)
    pub fn update(&mut self, extent: SelectionPoint) {
        self.extent = extent;
    }

    /// Pointer released
    pub fn finish(&mut self) {
        self.active = false;
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn kind(&self) -> SelectionKind {
        self.kind
    }

    pub fn anchor(&self) -> SelectionPoint {
        self.anchor
    }

    pub fn extent(&self) -> SelectionPoint {
        self.extent
    }

    /// Ordered `(start, end)`. For block selections these are the top-left
    /// and bottom-right corners.
    pub fn normalized(&self) -> (SelectionPoint, SelectionPoint) {
        match self.kind {
            SelectionKind::Normal => {
                if self.extent.is_before(&self.anchor) {
                    (self.extent, self.anchor)
                } else {
                    (self.anchor, self.extent)
                }
            }
            SelectionKind::Block => (
                SelectionPoint::new(
                    self.anchor.row.min(self.extent.row),
                    self.anchor.col.min(self.extent.col),
                ),
                SelectionPoint::new(
                    self.anchor.row.max(self.extent.row),
                    self.anchor.col.max(self.extent.col),
                ),
            ),
        }
    }

    /// Inclusive column range selected on `row`, if any
    pub fn col_range(&self, row: usize, cols: usize) -> Option<(usize, usize)> {
        let (start, end) = self.normalized();
        if row < start.row || row > end.row || cols == 0 {
            return None;
        }
        let last = cols - 1;
        let range = match self.kind {
            SelectionKind::Block => (start.col, end.col),
            SelectionKind::Normal if start.row == end.row => (start.col, end.col),
            SelectionKind::Normal if row == start.row => (start.col, last),
            SelectionKind::Normal if row == end.row => (0, end.col),
            SelectionKind::Normal => (0, last),
        };
        Some((range.0.min(last), range.1.min(last)))
    }

    /// Check if the cell at `(row, col)` is selected
    pub fn contains(&self, row: usize, col: usize, cols: usize) -> bool {
        self.col_range(row, cols)
            .is_some_and(|(start, end)| col >= start && col <= end)
    }

    /// Extract the selected text: one line per row, trailing blanks
    /// trimmed, rows joined with a single newline.
    pub fn text(&self, screen: &Screen) -> String {
        let (start, end) = self.normalized();
        let mut rows = Vec::with_capacity(end.row.saturating_sub(start.row) + 1);
        for row in start.row..=end.row {
            let Some(line) = screen.line_at(row) else {
                break;
            };
            let text = self
                .col_range(row, line.len())
                .map(|(from, to)| line.text_range(widen_start(line, from), to))
                .unwrap_or_default();
            rows.push(text);
        }
        rows.join("\n")
    }

    /// Select the run of non-blank cells around `point` (double-click).
    /// Returns `None` when the point is on a blank cell.
    pub fn word_at(screen: &Screen, point: SelectionPoint) -> Option<Selection> {
        let line = screen.line_at(point.row)?;
        let col = widen_start(line, point.col.min(line.len().checked_sub(1)?));
        if !is_word_cell(line, col) {
            return None;
        }
        let mut start = col;
        while start > 0 && is_word_cell(line, start - 1) {
            start -= 1;
        }
        let mut end = col;
        while end + 1 < line.len() && is_word_cell(line, end + 1) {
            end += 1;
        }
        Some(Selection::range(
            SelectionPoint::new(point.row, start),
            SelectionPoint::new(point.row, end),
            SelectionKind::Normal,
        ))
    }
}

/// Step back onto the lead cell when a range starts on a continuation
fn widen_start(line: &Line, col: usize) -> usize {
    match line.get(col) {
        Some(cell) if cell.is_continuation() && col > 0 => col - 1,
        _ => col,
    }
}

fn is_word_cell(line: &Line, col: usize) -> bool {
    line.get(col).is_some_and(|cell| {
        cell.is_continuation() || (!cell.is_empty() && !cell.display_char().is_whitespace())
    })
}
