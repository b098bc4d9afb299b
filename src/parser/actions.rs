//! Parser output
//!
//! The state machine reduces the byte stream to these values; applying them
//! to a screen is the job of [`crate::Terminal`].

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Action {
    /// A decoded scalar value in ground state
    Print(char),
    Control(ControlCode),
    Csi(CsiAction),
    Osc(OscAction),
    /// Two- or three-byte escape that is not CSI or a string introducer
    Esc(EscAction),
}

/// C0 bytes that reach the screen. ESC, CAN and SUB never get here since
/// the state machine consumes them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ControlCode {
    Bell,
    Backspace,
    Tab,
    LineFeed,
    /// Acts as LF
    VerticalTab,
    /// Acts as LF
    FormFeed,
    CarriageReturn,
    /// Swallowed
    Other(u8),
}

impl ControlCode {
    pub fn from_byte(byte: u8) -> Self {
        match byte {
            0x07 => ControlCode::Bell,
            0x08 => ControlCode::Backspace,
            0x09 => ControlCode::Tab,
            0x0A => ControlCode::LineFeed,
            0x0B => ControlCode::VerticalTab,
            0x0C => ControlCode::FormFeed,
            0x0D => ControlCode::CarriageReturn,
            other => ControlCode::Other(other),
        }
    }
}

/// `ESC [ marker? params intermediates final`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CsiAction {
    pub final_char: char,
    /// An omitted parameter is stored as 0
    pub params: Vec<u16>,
    pub intermediates: Vec<char>,
    /// One of `? > < =` when present
    pub private_marker: Option<char>,
}

impl CsiAction {
    /// Parameter `index`, or `default` when it was not sent
    pub fn param(&self, index: usize, default: u16) -> u16 {
        self.params.get(index).copied().unwrap_or(default)
    }

    /// Like [`param`](Self::param) but 0 also means `default`. Counts and
    /// coordinates use this.
    pub fn param_or_default(&self, index: usize, default: u16) -> u16 {
        match self.params.get(index) {
            Some(&0) | None => default,
            Some(&v) => v,
        }
    }

    pub fn is_dec_private(&self) -> bool {
        self.private_marker == Some('?')
    }
}

/// Operating system commands. None of them touch the grid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OscAction {
    /// OSC 0 and OSC 2
    SetTitle(String),
    /// OSC 1
    SetIconName(String),
    /// `command` is `None` when the selector was not a number
    Unknown { command: Option<u16> },
}

impl OscAction {
    /// Split `Ps ; Pt` at the first semicolon. The text may contain more.
    pub fn from_payload(payload: &[u8]) -> Self {
        let (command, text) = match payload.iter().position(|&b| b == b';') {
            Some(i) => (&payload[..i], &payload[i + 1..]),
            None => (payload, &[][..]),
        };
        let command = std::str::from_utf8(command)
            .ok()
            .and_then(|s| s.parse::<u16>().ok());
        let text = String::from_utf8_lossy(text).into_owned();
        match command {
            Some(0) | Some(2) => OscAction::SetTitle(text),
            Some(1) => OscAction::SetIconName(text),
            command => OscAction::Unknown { command },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EscAction {
    /// DECSC, `ESC 7`
    SaveCursor,
    /// DECRC, `ESC 8`
    RestoreCursor,
    /// IND, `ESC D`
    Index,
    /// RI, `ESC M`
    ReverseIndex,
    /// NEL, `ESC E`
    NextLine,
    /// RIS, `ESC c`
    FullReset,
    /// ST with no string open
    StringTerminator,
    /// `ESC ( B` and friends. Parsed so the final byte is not printed.
    DesignateCharset { slot: char, charset: char },
    Unknown(char),
}

impl EscAction {
    pub fn from_parts(intermediates: &[u8], final_byte: u8) -> Self {
        let final_char = final_byte as char;
        match intermediates {
            [] => match final_byte {
                b'7' => EscAction::SaveCursor,
                b'8' => EscAction::RestoreCursor,
                b'D' => EscAction::Index,
                b'M' => EscAction::ReverseIndex,
                b'E' => EscAction::NextLine,
                b'c' => EscAction::FullReset,
                b'\\' => EscAction::StringTerminator,
                _ => EscAction::Unknown(final_char),
            },
            [slot @ (b'(' | b')' | b'*' | b'+')] => EscAction::DesignateCharset {
                slot: *slot as char,
                charset: final_char,
            },
            _ => EscAction::Unknown(final_char),
        }
    }
}
