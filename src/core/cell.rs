//! Grid cells
//!
//! A cell is one column of one row. It holds a glyph (plus any combining
//! marks), the pen it was drawn with, and its display width. Width 0 marks
//! the right half of a double-width glyph drawn in the column to its left.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cell {
    /// Base character followed by combining marks; empty when blank or a
    /// continuation
    pub content: String,
    /// 1 or 2 for a lead cell, 0 for a continuation
    pub width: u8,
    pub fg: Color,
    pub bg: Color,
    pub style: Style,
}

impl Default for Cell {
    fn default() -> Self {
        Self::blank(Color::Default)
    }
}

impl Cell {
    /// A blank cell painted with `bg`
    pub fn blank(bg: Color) -> Self {
        Self {
            content: String::new(),
            width: 1,
            fg: Color::Default,
            bg,
            style: Style::default(),
        }
    }

    pub fn new(c: char) -> Self {
        let mut cell = Self::default();
        cell.set_char(c);
        cell
    }

    /// Right half of a wide glyph
    pub fn continuation() -> Self {
        Self {
            width: 0,
            ..Self::default()
        }
    }

    /// No glyph. Continuations also count as empty.
    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    pub fn is_continuation(&self) -> bool {
        self.width == 0
    }

    pub fn is_wide(&self) -> bool {
        self.width == 2
    }

    /// Draw `c` with the given pen
    pub fn set(&mut self, c: char, width: u8, fg: Color, bg: Color, style: Style) {
        self.set_glyph(c, width);
        self.fg = fg;
        self.bg = bg;
        self.style = style;
    }

    /// Replace the glyph only; the pen stays
    pub fn set_char(&mut self, c: char) {
        self.set_glyph(c, char_width(c).max(1) as u8);
    }

    fn set_glyph(&mut self, c: char, width: u8) {
        self.content.clear();
        self.content.push(c);
        self.width = width;
    }

    /// Combining marks only stick to a cell that already has a glyph
    pub fn push_combining(&mut self, c: char) {
        if !self.is_empty() {
            self.content.push(c);
        }
    }

    /// Base character, or a space when blank
    pub fn display_char(&self) -> char {
        self.content.chars().next().unwrap_or(' ')
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Blank the cell. Erase operations keep the current background.
    pub fn erase(&mut self, bg: Color) {
        *self = Self::blank(bg);
    }
}

/// Columns occupied by `c`: 0 for controls and combining marks, 2 for
/// East-Asian wide and fullwidth characters (CJK, Hangul, most emoji).
pub fn char_width(c: char) -> usize {
    unicode_width::UnicodeWidthChar::width(c).unwrap_or(0)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Color {
    /// Whatever the renderer uses for an unstyled cell
    #[default]
    Default,
    /// 256-colour palette; 0..=15 are the ANSI and bright colours
    Indexed(u8),
    Rgb(u8, u8, u8),
}

impl Color {
    pub const RED: Color = Color::ansi(1);
    pub const GREEN: Color = Color::ansi(2);
    pub const BLUE: Color = Color::ansi(4);

    /// One of the eight base colours (SGR 30-37 / 40-47)
    pub const fn ansi(index: u8) -> Color {
        Color::Indexed(index & 7)
    }

    /// Bright variant of a base colour (SGR 90-97 / 100-107)
    pub const fn bright(index: u8) -> Color {
        Color::Indexed((index & 7) + 8)
    }
}

/// SGR rendition flags
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Style {
    pub bold: bool,
    pub faint: bool,
    pub italic: bool,
    pub underline: bool,
    pub blink: bool,
    pub inverse: bool,
    pub hidden: bool,
    pub strikethrough: bool,
}

impl Style {
    pub fn reset(&mut self) {
        *self = Style::default();
    }

    pub fn is_plain(&self) -> bool {
        *self == Style::default()
    }
}
