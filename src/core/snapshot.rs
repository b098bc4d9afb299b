//! Renderer-facing snapshots
//!
//! A snapshot is a pull-model copy of everything a renderer reads: the
//! visible grid, the cursor, the modes, and the selection. It is plain data
//! and serializes with serde, so the same byte stream always yields the
//! same JSON.

use serde::{Deserialize, Serialize};

use super::cell::{Cell, Color, Style};
use super::screen::{Modes, Screen};
use super::selection::{Selection, SelectionPoint};

/// A complete snapshot of the terminal state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub cols: usize,
    pub rows: usize,
    /// Visible grid content (row-major)
    pub grid: Vec<Vec<CellSnapshot>>,
    /// Text of each visible row, trailing blanks trimmed
    pub lines: Vec<String>,
    pub cursor: CursorSnapshot,
    pub modes: Modes,
    pub title: String,
    pub scrollback_lines: usize,
    /// Normalized selection bounds in absolute rows
    pub selection: Option<(SelectionPoint, SelectionPoint)>,
}

/// Snapshot of a single cell
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellSnapshot {
    pub content: String,
    /// 0 for continuation, 1 normal, 2 wide
    pub width: u8,
    pub fg: Color,
    pub bg: Color,
    #[serde(default, skip_serializing_if = "Style::is_plain")]
    pub style: Style,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CursorSnapshot {
    pub col: usize,
    pub row: usize,
    /// DECTCEM combined with the blink phase
    pub visible: bool,
}

impl From<&Cell> for CellSnapshot {
    fn from(cell: &Cell) -> Self {
        Self {
            content: cell.content.clone(),
            width: cell.width,
            fg: cell.fg,
            bg: cell.bg,
            style: cell.style,
        }
    }
}

impl Snapshot {
    /// Capture the current state of `screen`
    pub fn capture(
        screen: &Screen,
        title: &str,
        selection: Option<&Selection>,
        blink_visible: bool,
    ) -> Self {
        let cursor = screen.cursor();
        Self {
            cols: screen.cols(),
            rows: screen.rows(),
            grid: screen
                .lines()
                .map(|line| line.cells.iter().map(CellSnapshot::from).collect())
                .collect(),
            lines: screen.lines().map(|line| line.text()).collect(),
            cursor: CursorSnapshot {
                col: cursor.col,
                row: cursor.row,
                visible: cursor.visible && blink_visible,
            },
            modes: screen.modes,
            title: title.to_string(),
            scrollback_lines: screen.scrollback().len(),
            selection: selection.map(Selection::normalized),
        }
    }

    /// Serialize to pretty-printed JSON
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::SelectionKind;

    #[test]
    fn test_capture_grid_and_cursor() {
        let mut screen = Screen::new(6, 2, 10);
        for c in "a中".chars() {
            screen.print(c);
        }
        let snap = Snapshot::capture(&screen, "title", None, true);
        assert_eq!((snap.cols, snap.rows), (6, 2));
        assert_eq!(snap.grid.len(), 2);
        assert!(snap.grid.iter().all(|row| row.len() == 6));
        assert_eq!(snap.grid[0][1].width, 2);
        assert_eq!(snap.grid[0][2].width, 0);
        assert_eq!(snap.lines[0], "a中");
        assert_eq!((snap.cursor.col, snap.cursor.row), (3, 0));
        assert!(snap.cursor.visible);
        assert_eq!(snap.title, "title");
    }

    #[test]
    fn test_cursor_hidden_by_blink_phase() {
        let screen = Screen::new(4, 1, 0);
        let snap = Snapshot::capture(&screen, "", None, false);
        assert!(!snap.cursor.visible);
    }

    #[test]
    fn test_selection_is_normalized() {
        let screen = Screen::new(4, 3, 0);
        let sel = Selection::range(
            SelectionPoint::new(2, 1),
            SelectionPoint::new(0, 3),
            SelectionKind::Normal,
        );
        let snap = Snapshot::capture(&screen, "", Some(&sel), true);
        assert_eq!(
            snap.selection,
            Some((SelectionPoint::new(0, 3), SelectionPoint::new(2, 1)))
        );
    }

    #[test]
    fn test_json_round_trip() {
        let mut screen = Screen::new(4, 1, 0);
        screen.cursor_mut().fg = Color::Rgb(1, 2, 3);
        screen.print('x');
        let snap = Snapshot::capture(&screen, "t", None, true);
        let json = snap.to_json().unwrap();
        assert_eq!(Snapshot::from_json(&json).unwrap(), snap);
    }
}
