//! Cursor and blink timer
//!
//! Besides its position the cursor carries the pen (colours and SGR flags)
//! that newly printed glyphs take, the DECAWM and DECTCEM flags, and the
//! deferred-wrap latch. A single saved slot backs DECSC/DECRC and CSI s/u.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use super::{Color, Style};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cursor {
    pub col: usize,
    pub row: usize,
    /// DECTCEM
    pub visible: bool,
    pub style: Style,
    pub fg: Color,
    pub bg: Color,
    /// DECAWM
    pub autowrap: bool,
    /// Set after drawing into the last column. The wrap happens when the
    /// next glyph arrives; any cursor motion clears it.
    pub pending_wrap: bool,
}

impl Default for Cursor {
    fn default() -> Self {
        Self {
            col: 0,
            row: 0,
            visible: true,
            style: Style::default(),
            fg: Color::Default,
            bg: Color::Default,
            autowrap: true,
            pending_wrap: false,
        }
    }
}

/// What DECSC keeps: position and pen
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedCursor {
    pub col: usize,
    pub row: usize,
    pub style: Style,
    pub fg: Color,
    pub bg: Color,
}

impl Cursor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Absolute move, clamped into a `cols × rows` grid
    pub fn move_to(&mut self, col: usize, row: usize, cols: usize, rows: usize) {
        self.col = col.min(cols.saturating_sub(1));
        self.row = row.min(rows.saturating_sub(1));
        self.pending_wrap = false;
    }

    /// Up `n` rows, no higher than `top`
    pub fn move_up(&mut self, n: usize, top: usize) {
        self.row = self.row.saturating_sub(n).max(top);
        self.pending_wrap = false;
    }

    /// Down `n` rows, no lower than `bottom`
    pub fn move_down(&mut self, n: usize, bottom: usize) {
        self.row = self.row.saturating_add(n).min(bottom);
        self.pending_wrap = false;
    }

    pub fn move_right(&mut self, n: usize, cols: usize) {
        self.col = self.col.saturating_add(n).min(cols.saturating_sub(1));
        self.pending_wrap = false;
    }

    pub fn move_left(&mut self, n: usize) {
        self.col = self.col.saturating_sub(n);
        self.pending_wrap = false;
    }

    /// Carriage return: column 0
    pub fn carriage_return(&mut self) {
        self.col = 0;
        self.pending_wrap = false;
    }

    /// Capture position and pen for a later restore
    pub fn save(&self) -> SavedCursor {
        SavedCursor {
            col: self.col,
            row: self.row,
            style: self.style,
            fg: self.fg,
            bg: self.bg,
        }
    }

    /// Restore a saved state, clamping into the current bounds
    pub fn restore(&mut self, saved: &SavedCursor, cols: usize, rows: usize) {
        self.move_to(saved.col, saved.row, cols, rows);
        self.style = saved.style;
        self.fg = saved.fg;
        self.bg = saved.bg;
    }

    /// SGR 0
    pub fn reset_attributes(&mut self) {
        self.style.reset();
        self.fg = Color::Default;
        self.bg = Color::Default;
    }
}

/// Default blink half-period
pub const DEFAULT_BLINK_INTERVAL: Duration = Duration::from_millis(530);

/// Fixed-interval blink phase for the cursor.
///
/// Only toggles a visibility flag; it never touches parser or grid state.
#[derive(Debug, Clone)]
pub struct CursorBlink {
    interval: Duration,
    last_toggle: Instant,
    visible: bool,
}

impl CursorBlink {
    pub fn new(interval: Duration) -> Self {
        Self::starting_at(interval, Instant::now())
    }

    pub fn starting_at(interval: Duration, now: Instant) -> Self {
        Self {
            interval,
            last_toggle: now,
            visible: true,
        }
    }

    /// Current blink phase
    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// The configured half-period
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Advance the timer to `now`; returns true if the phase changed
    pub fn tick(&mut self, now: Instant) -> bool {
        if self.interval.is_zero() {
            return false;
        }
        let elapsed = now.saturating_duration_since(self.last_toggle);
        let toggles = elapsed.as_nanos() / self.interval.as_nanos();
        if toggles == 0 {
            return false;
        }
        // Step by whole intervals so the phase does not drift
        self.last_toggle += self.interval * (toggles.min(u32::MAX as u128) as u32);
        if toggles % 2 == 1 {
            self.visible = !self.visible;
            true
        } else {
            false
        }
    }

    /// Show the cursor and restart the period (e.g. after a keystroke)
    pub fn reset(&mut self, now: Instant) {
        self.visible = true;
        self.last_toggle = now;
    }
}

impl Default for CursorBlink {
    fn default() -> Self {
        Self::new(DEFAULT_BLINK_INTERVAL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cursor_default() {
        let cursor = Cursor::new();
        assert_eq!((cursor.col, cursor.row), (0, 0));
        assert!(cursor.visible);
        assert!(cursor.autowrap);
        assert!(!cursor.pending_wrap);
    }

    #[test]
    fn test_cursor_move_to_clamps() {
        let mut cursor = Cursor::new();
        cursor.move_to(100, 50, 80, 24);
        assert_eq!((cursor.col, cursor.row), (79, 23));
    }

    #[test]
    fn test_cursor_relative_moves() {
        let mut cursor = Cursor::new();
        cursor.move_to(5, 5, 80, 24);
        cursor.move_up(10, 0);
        assert_eq!(cursor.row, 0);
        cursor.move_down(100, 23);
        assert_eq!(cursor.row, 23);
        cursor.move_left(10);
        assert_eq!(cursor.col, 0);
        cursor.move_right(200, 80);
        assert_eq!(cursor.col, 79);
    }

    #[test]
    fn test_cursor_save_restore() {
        let mut cursor = Cursor::new();
        cursor.move_to(10, 5, 80, 24);
        cursor.fg = Color::RED;
        let saved = cursor.save();

        cursor.move_to(0, 0, 80, 24);
        cursor.fg = Color::Default;
        cursor.restore(&saved, 80, 24);

        assert_eq!((cursor.col, cursor.row), (10, 5));
        assert_eq!(cursor.fg, Color::RED);

        cursor.restore(&saved, 8, 4);
        assert_eq!((cursor.col, cursor.row), (7, 3));
    }

    #[test]
    fn test_blink_toggles_on_interval() {
        let start = Instant::now();
        let mut blink = CursorBlink::starting_at(Duration::from_millis(500), start);
        assert!(blink.is_visible());

        assert!(!blink.tick(start + Duration::from_millis(100)));
        assert!(blink.is_visible());

        assert!(blink.tick(start + Duration::from_millis(510)));
        assert!(!blink.is_visible());

        // Two whole periods later the phase is unchanged
        assert!(!blink.tick(start + Duration::from_millis(1600)));
        assert!(!blink.is_visible());

        blink.reset(start + Duration::from_millis(1700));
        assert!(blink.is_visible());
    }

    #[test]
    fn test_blink_zero_interval_never_toggles() {
        let start = Instant::now();
        let mut blink = CursorBlink::starting_at(Duration::ZERO, start);
        assert!(!blink.tick(start + Duration::from_secs(5)));
        assert!(blink.is_visible());
    }
}
