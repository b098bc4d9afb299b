//! Input Encoding Module
//!
//! Translates host keyboard, composition and paste events into the byte
//! sequences expected by programs running on the PTY.
//!
//! # Keyboard Encoding
//!
//! Different keys produce different sequences depending on:
//! - Application cursor mode (DECCKM)
//! - Modifier keys (Shift, Ctrl, Alt)
//!
//! Composition (IME) state lives in [`InputTranslator`].

mod ime;

pub use ime::{Composition, InputEvent, InputTranslator};

use std::borrow::Cow;

use crate::core::{Modes, SelectionKind};

/// Sent before pasted text when bracketed paste is enabled
pub const PASTE_START: &[u8] = b"\x1b[200~";
/// Sent after pasted text when bracketed paste is enabled
pub const PASTE_END: &[u8] = b"\x1b[201~";

/// Keyboard modifiers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
}

impl Modifiers {
    pub const NONE: Modifiers = Modifiers {
        shift: false,
        ctrl: false,
        alt: false,
    };
    pub const SHIFT: Modifiers = Modifiers {
        shift: true,
        ctrl: false,
        alt: false,
    };
    pub const CTRL: Modifiers = Modifiers {
        shift: false,
        ctrl: true,
        alt: false,
    };
    pub const ALT: Modifiers = Modifiers {
        shift: false,
        ctrl: false,
        alt: true,
    };

    /// Get the modifier parameter for CSI sequences (1 + bitmask)
    /// Shift=1, Alt=2, Ctrl=4
    pub fn as_csi_param(&self) -> u8 {
        let mut param = 1;
        if self.shift {
            param += 1;
        }
        if self.alt {
            param += 2;
        }
        if self.ctrl {
            param += 4;
        }
        param
    }

    /// Check if any modifier is pressed
    pub fn any(&self) -> bool {
        self.shift || self.ctrl || self.alt
    }
}

/// A key as reported by the host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    /// A character key; the char is the unshifted key label for Ctrl/Alt handling
    Char(char),

    Up,
    Down,
    Left,
    Right,

    Home,
    End,
    PageUp,
    PageDown,
    Insert,
    Delete,

    /// Function keys F1-F12
    F(u8),

    Backspace,
    Tab,
    Enter,
    Escape,
}

/// One key press
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyEvent {
    pub key: Key,
    pub modifiers: Modifiers,
    /// Text the platform produced for this press, if any (dead keys, layouts)
    pub text: Option<String>,
}

impl KeyEvent {
    pub fn new(key: Key, modifiers: Modifiers) -> Self {
        Self {
            key,
            modifiers,
            text: None,
        }
    }

    /// A plain character press carrying its own text
    pub fn text(text: impl Into<String>) -> Self {
        let text = text.into();
        let key = text.chars().next().map_or(Key::Char('\0'), Key::Char);
        Self {
            key,
            modifiers: Modifiers::NONE,
            text: Some(text),
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Ctrl on a key that has a C0 mapping; these never go through composition
    pub fn is_control_chord(&self) -> bool {
        match self.key {
            Key::Char(c) => self.modifiers.ctrl && control_byte(c).is_some(),
            _ => false,
        }
    }
}

/// Pointer phase for selection gestures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerPhase {
    Press,
    Drag,
    Release,
}

/// A pointer event in viewport coordinates (row 0 is the top screen row)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PointerEvent {
    pub phase: PointerPhase,
    pub col: usize,
    pub row: usize,
    /// 2 selects the word under the pointer on press
    pub click_count: u8,
    pub kind: SelectionKind,
}

impl PointerEvent {
    pub fn new(phase: PointerPhase, col: usize, row: usize) -> Self {
        Self {
            phase,
            col,
            row,
            click_count: 1,
            kind: SelectionKind::Normal,
        }
    }
}

/// Encode a key press into the terminal byte sequence
pub fn encode_key(event: &KeyEvent, modes: &Modes) -> Vec<u8> {
    let modifiers = event.modifiers;
    match event.key {
        Key::Char(c) => match &event.text {
            Some(text) if !modifiers.ctrl && !modifiers.alt => encode_text(text),
            Some(text) if !modifiers.ctrl => {
                let mut bytes = vec![0x1b];
                bytes.extend_from_slice(encode_text(text).as_slice());
                bytes
            },
            _ => encode_char(c, modifiers),
        },

        Key::Up => encode_cursor_key(b'A', modifiers, modes.application_cursor),
        Key::Down => encode_cursor_key(b'B', modifiers, modes.application_cursor),
        Key::Right => encode_cursor_key(b'C', modifiers, modes.application_cursor),
        Key::Left => encode_cursor_key(b'D', modifiers, modes.application_cursor),
        Key::Home => encode_cursor_key(b'H', modifiers, modes.application_cursor),
        Key::End => encode_cursor_key(b'F', modifiers, modes.application_cursor),

        Key::Insert => encode_special_key(2, modifiers),
        Key::Delete => encode_special_key(3, modifiers),
        Key::PageUp => encode_special_key(5, modifiers),
        Key::PageDown => encode_special_key(6, modifiers),

        Key::F(n @ 1..=4) => encode_function_key(n, modifiers),
        Key::F(5) => encode_special_key(15, modifiers),
        Key::F(6) => encode_special_key(17, modifiers),
        Key::F(7) => encode_special_key(18, modifiers),
        Key::F(8) => encode_special_key(19, modifiers),
        Key::F(9) => encode_special_key(20, modifiers),
        Key::F(10) => encode_special_key(21, modifiers),
        Key::F(11) => encode_special_key(23, modifiers),
        Key::F(12) => encode_special_key(24, modifiers),
        Key::F(_) => Vec::new(),

        Key::Backspace => {
            if modifiers.ctrl {
                vec![0x08] // Ctrl+Backspace = BS
            } else if modifiers.alt {
                vec![0x1b, 0x7f] // Alt+Backspace = ESC DEL
            } else {
                vec![0x7f] // DEL
            }
        },
        Key::Tab => {
            if modifiers.shift {
                b"\x1b[Z".to_vec() // Shift+Tab = CSI Z (backtab)
            } else if modifiers.alt {
                vec![0x1b, 0x09]
            } else {
                vec![0x09] // HT
            }
        },
        Key::Enter => {
            if modifiers.alt {
                vec![0x1b, 0x0d] // Alt+Enter
            } else {
                vec![0x0d] // CR
            }
        },
        Key::Escape => vec![0x1b],
    }
}

/// Encode a cursor key (arrows, Home, End)
fn encode_cursor_key(code: u8, modifiers: Modifiers, application_mode: bool) -> Vec<u8> {
    if modifiers.any() {
        // With modifiers: CSI 1 ; modifier code
        let param = modifiers.as_csi_param();
        format!("\x1b[1;{}{}", param, code as char).into_bytes()
    } else if application_mode {
        // Application mode: SS3 code
        vec![0x1b, b'O', code]
    } else {
        // Normal mode: CSI code
        vec![0x1b, b'[', code]
    }
}

/// Encode a `CSI n ~` key (Insert, Delete, PgUp, PgDn, F5-F12)
fn encode_special_key(number: u8, modifiers: Modifiers) -> Vec<u8> {
    if modifiers.any() {
        let param = modifiers.as_csi_param();
        format!("\x1b[{};{}~", number, param).into_bytes()
    } else {
        format!("\x1b[{}~", number).into_bytes()
    }
}

/// Encode function keys F1-F4 (SS3 unless modified)
fn encode_function_key(number: u8, modifiers: Modifiers) -> Vec<u8> {
    let code = match number {
        1 => b'P',
        2 => b'Q',
        3 => b'R',
        4 => b'S',
        _ => return Vec::new(),
    };

    if modifiers.any() {
        let param = modifiers.as_csi_param();
        format!("\x1b[1;{}{}", param, code as char).into_bytes()
    } else {
        vec![0x1b, b'O', code]
    }
}

/// The C0 byte Ctrl+`c` produces, if any
pub fn control_byte(c: char) -> Option<u8> {
    match c {
        'a'..='z' => Some(c as u8 - b'a' + 1),
        'A'..='Z' => Some(c as u8 - b'A' + 1),
        '@' | ' ' | '2' => Some(0x00),
        '[' | '3' => Some(0x1b),
        '\\' | '4' => Some(0x1c),
        ']' | '5' => Some(0x1d),
        '^' | '6' => Some(0x1e),
        '_' | '-' | '7' => Some(0x1f),
        '?' | '8' => Some(0x7f),
        _ => None,
    }
}

/// Encode a character with modifiers
pub fn encode_char(c: char, modifiers: Modifiers) -> Vec<u8> {
    if modifiers.ctrl {
        if let Some(byte) = control_byte(c) {
            return if modifiers.alt {
                vec![0x1b, byte]
            } else {
                vec![byte]
            };
        }
    }

    let mut buf = [0u8; 4];
    let text = normalize_text(c.encode_utf8(&mut buf));
    if modifiers.alt {
        // Alt+char sends ESC prefix
        let mut bytes = vec![0x1b];
        bytes.extend_from_slice(text.as_bytes());
        bytes
    } else {
        text.as_bytes().to_vec()
    }
}

/// Encode typed or committed text
pub fn encode_text(text: &str) -> Vec<u8> {
    normalize_text(text).as_bytes().to_vec()
}

/// ASCII stand-in for punctuation CJK input methods produce in fullwidth form
fn ascii_alias(c: char) -> Option<char> {
    match c {
        '\u{201C}' | '\u{201D}' => Some('"'),
        '\u{2018}' | '\u{2019}' => Some('\''),
        '\u{3010}' => Some('['),
        '\u{3011}' => Some(']'),
        '\u{FF01}'..='\u{FF5E}' => {
            let ascii = char::from_u32(c as u32 - 0xFEE0)?;
            ascii.is_ascii_punctuation().then_some(ascii)
        },
        _ => None,
    }
}

/// Collapse fullwidth punctuation to ASCII; borrows when nothing changes
pub fn normalize_text(text: &str) -> Cow<'_, str> {
    if !text.chars().any(|c| ascii_alias(c).is_some()) {
        return Cow::Borrowed(text);
    }
    Cow::Owned(
        text.chars()
            .map(|c| ascii_alias(c).unwrap_or(c))
            .collect(),
    )
}

/// Encode pasted text.
///
/// The payload is sent as is apart from line endings, which become CR as a
/// typed Return would send. Punctuation is not normalized. With bracketed
/// paste the payload is wrapped in start/end markers and any end marker
/// inside the payload is removed so the paste cannot close the bracket early.
pub fn encode_paste(text: &str, bracketed: bool) -> Vec<u8> {
    let text = text.replace("\r\n", "\r").replace('\n', "\r");

    if !bracketed {
        return text.into_bytes();
    }

    let mut payload = text.into_bytes();
    while let Some(pos) = find(&payload, PASTE_END) {
        payload.drain(pos..pos + PASTE_END.len());
    }

    let mut bytes = Vec::with_capacity(payload.len() + PASTE_START.len() + PASTE_END.len());
    bytes.extend_from_slice(PASTE_START);
    bytes.extend_from_slice(&payload);
    bytes.extend_from_slice(PASTE_END);
    bytes
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}
