//! Parser State Machine
//!
//! A single forward pass over the byte stream that interleaves UTF-8
//! decoding, C0 control handling, and escape sequence recognition. The
//! parser handles arbitrary chunk boundaries and every byte either
//! advances or resolves the current state.
//!
//! States:
//! - Normal: text and C0 controls
//! - Escape: after ESC, collecting intermediates until a final byte
//! - Csi: after `ESC [`, collecting parameters until a final byte
//! - Osc: after `ESC ]` (or DCS/SOS/PM/APC), collecting a payload
//! - OscEscape: ESC seen inside a string, waiting for `\`
//!
//! Malformed input never stalls the machine: unknown finals are dropped,
//! CAN/SUB abort, and oversized sequences are abandoned.

use serde::{Deserialize, Serialize};

use super::actions::{Action, ControlCode, CsiAction, EscAction, OscAction};
use super::utf8::{Utf8Decoder, Utf8Step, REPLACEMENT_CHAR};

/// Maximum number of CSI parameters kept; extras are dropped
pub const MAX_PARAMS: usize = 32;
/// CSI sequences longer than this are ignored up to their final byte
pub const MAX_CSI_LEN: usize = 256;
/// OSC payload bytes kept; longer strings are consumed but not dispatched
pub const MAX_OSC_LEN: usize = 4096;

/// Parser state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ParserState {
    #[default]
    Normal,
    Escape,
    Csi,
    Osc,
    OscEscape,
}

/// What an in-progress string will be used for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StringKind {
    Osc,
    /// DCS, SOS, PM, APC: consumed and discarded
    Ignored,
}

/// The terminal parser
#[derive(Debug, Clone)]
pub struct Parser {
    state: ParserState,
    utf8: Utf8Decoder,
    /// Intermediate bytes collected for ESC or CSI
    intermediates: Vec<u8>,
    /// Parameters for CSI sequences
    params: Vec<u16>,
    /// Current parameter being built
    current_param: u16,
    /// Whether anything was written to the current parameter
    param_started: bool,
    private_marker: Option<u8>,
    /// Bytes consumed by the current CSI sequence
    csi_len: usize,
    /// The current CSI sequence is malformed or oversized
    csi_ignore: bool,
    string_kind: StringKind,
    osc: Vec<u8>,
    osc_overflow: bool,
}

impl Default for Parser {
    fn default() -> Self {
        Self::new()
    }
}

impl Parser {
    /// Create a new parser in the normal state
    pub fn new() -> Self {
        Self {
            state: ParserState::Normal,
            utf8: Utf8Decoder::new(),
            intermediates: Vec::with_capacity(4),
            params: Vec::with_capacity(16),
            current_param: 0,
            param_started: false,
            private_marker: None,
            csi_len: 0,
            csi_ignore: false,
            string_kind: StringKind::Osc,
            osc: Vec::with_capacity(256),
            osc_overflow: false,
        }
    }

    /// Reset the parser to initial state
    pub fn reset(&mut self) {
        self.state = ParserState::Normal;
        self.utf8.reset();
        self.clear_sequence();
        self.osc.clear();
        self.osc_overflow = false;
    }

    pub fn state(&self) -> ParserState {
        self.state
    }

    /// Normal state with no partial UTF-8 character held
    pub fn is_normal(&self) -> bool {
        self.state == ParserState::Normal && !self.utf8.is_pending()
    }

    /// Bytes of unresolved input currently buffered
    pub fn pending_len(&self) -> usize {
        self.utf8.pending_len() + self.params.len() + self.intermediates.len() + self.osc.len()
    }

    fn clear_sequence(&mut self) {
        self.intermediates.clear();
        self.params.clear();
        self.current_param = 0;
        self.param_started = false;
        self.private_marker = None;
        self.csi_len = 0;
        self.csi_ignore = false;
    }

    /// Process a chunk of bytes, returning actions
    pub fn parse(&mut self, data: &[u8]) -> Vec<Action> {
        let mut actions = Vec::new();
        self.parse_with(data, |action| actions.push(action));
        actions
    }

    /// Process a chunk of bytes, handing each action to `sink` as it is
    /// recognized
    pub fn parse_with<F: FnMut(Action)>(&mut self, data: &[u8], mut sink: F) {
        for &byte in data {
            self.advance(byte, &mut sink);
        }
    }

    fn advance<F: FnMut(Action)>(&mut self, byte: u8, sink: &mut F) {
        if self.state == ParserState::Normal && (byte >= 0x80 || self.utf8.is_pending()) {
            match self.utf8.feed(byte) {
                Utf8Step::Pending => return,
                Utf8Step::Char(c) => {
                    sink(Action::Print(c));
                    return;
                }
                Utf8Step::Invalid { reprocess } => {
                    tracing::trace!(byte, "invalid UTF-8");
                    sink(Action::Print(REPLACEMENT_CHAR));
                    if !reprocess {
                        return;
                    }
                }
            }
        }

        // CAN and SUB abort any sequence
        if byte == 0x18 || byte == 0x1A {
            if self.state != ParserState::Normal {
                tracing::trace!(state = ?self.state, "sequence cancelled");
            }
            self.state = ParserState::Normal;
            self.clear_sequence();
            self.osc.clear();
            self.osc_overflow = false;
            return;
        }

        match self.state {
            ParserState::Normal => self.normal(byte, sink),
            ParserState::Escape => self.escape(byte, sink),
            ParserState::Csi => self.csi(byte, sink),
            ParserState::Osc => self.osc_string(byte, sink),
            ParserState::OscEscape => self.osc_escape(byte, sink),
        }
    }

    fn normal<F: FnMut(Action)>(&mut self, byte: u8, sink: &mut F) {
        match byte {
            0x1B => self.enter_escape(),
            0x00..=0x1F => sink(Action::Control(ControlCode::from_byte(byte))),
            0x7F => {}
            _ => sink(Action::Print(byte as char)),
        }
    }

    fn enter_escape(&mut self) {
        self.state = ParserState::Escape;
        self.clear_sequence();
    }

    fn escape<F: FnMut(Action)>(&mut self, byte: u8, sink: &mut F) {
        match byte {
            0x1B => self.enter_escape(),
            // C0 controls execute without disturbing the sequence
            0x00..=0x1F => sink(Action::Control(ControlCode::from_byte(byte))),
            0x20..=0x2F => {
                if self.intermediates.len() < 2 {
                    self.intermediates.push(byte);
                }
            }
            b'[' if self.intermediates.is_empty() => {
                self.state = ParserState::Csi;
            }
            b']' if self.intermediates.is_empty() => self.enter_string(StringKind::Osc),
            b'P' | b'X' | b'^' | b'_' if self.intermediates.is_empty() => {
                self.enter_string(StringKind::Ignored)
            }
            0x30..=0x7E => {
                let action = EscAction::from_parts(&self.intermediates, byte);
                self.state = ParserState::Normal;
                self.clear_sequence();
                sink(Action::Esc(action));
            }
            0x7F => {}
            _ => {
                // Not part of any escape: resynchronize and treat as text
                self.state = ParserState::Normal;
                self.clear_sequence();
                self.advance(byte, sink);
            }
        }
    }

    fn csi<F: FnMut(Action)>(&mut self, byte: u8, sink: &mut F) {
        self.csi_len += 1;
        if self.csi_len > MAX_CSI_LEN && !self.csi_ignore {
            tracing::debug!("CSI sequence too long, ignoring");
            self.csi_ignore = true;
        }

        match byte {
            0x1B => self.enter_escape(),
            0x00..=0x1F => sink(Action::Control(ControlCode::from_byte(byte))),
            b'0'..=b'9' => {
                if !self.intermediates.is_empty() {
                    self.csi_ignore = true;
                }
                let digit = u16::from(byte - b'0');
                self.current_param = self.current_param.saturating_mul(10).saturating_add(digit);
                self.param_started = true;
            }
            b';' | b':' => {
                if !self.intermediates.is_empty() {
                    self.csi_ignore = true;
                }
                self.push_param();
            }
            0x3C..=0x3F => {
                let at_start = self.params.is_empty()
                    && !self.param_started
                    && self.private_marker.is_none()
                    && self.intermediates.is_empty();
                if at_start {
                    self.private_marker = Some(byte);
                } else {
                    self.csi_ignore = true;
                }
            }
            0x20..=0x2F => {
                if self.intermediates.len() < 2 {
                    self.intermediates.push(byte);
                } else {
                    self.csi_ignore = true;
                }
            }
            0x40..=0x7E => {
                if self.param_started || !self.params.is_empty() {
                    self.push_param();
                }
                if self.csi_ignore {
                    tracing::trace!(final_byte = byte, "dropping malformed CSI");
                } else {
                    let action = CsiAction {
                        final_char: byte as char,
                        params: std::mem::take(&mut self.params),
                        intermediates: self.intermediates.iter().map(|&b| b as char).collect(),
                        private_marker: self.private_marker.map(char::from),
                    };
                    sink(Action::Csi(action));
                }
                self.state = ParserState::Normal;
                self.clear_sequence();
            }
            0x7F => {}
            _ => {
                // Non-ASCII inside CSI: abandon and reprocess as text
                tracing::trace!(byte, "unexpected byte in CSI");
                self.state = ParserState::Normal;
                self.clear_sequence();
                self.advance(byte, sink);
            }
        }
    }

    fn push_param(&mut self) {
        if self.params.len() < MAX_PARAMS {
            self.params.push(self.current_param);
        }
        self.current_param = 0;
        self.param_started = false;
    }

    fn enter_string(&mut self, kind: StringKind) {
        self.state = ParserState::Osc;
        self.string_kind = kind;
        self.osc.clear();
        self.osc_overflow = false;
        self.clear_sequence();
    }

    fn osc_string<F: FnMut(Action)>(&mut self, byte: u8, sink: &mut F) {
        match byte {
            0x07 => self.finish_string(sink),
            0x1B => self.state = ParserState::OscEscape,
            0x00..=0x1F => {}
            _ => {
                if self.string_kind == StringKind::Ignored {
                    return;
                }
                if self.osc.len() < MAX_OSC_LEN {
                    self.osc.push(byte);
                } else if !self.osc_overflow {
                    tracing::debug!("OSC payload too long, discarding");
                    self.osc_overflow = true;
                }
            }
        }
    }

    fn osc_escape<F: FnMut(Action)>(&mut self, byte: u8, sink: &mut F) {
        if byte == b'\\' {
            self.finish_string(sink);
            return;
        }
        // Anything else abandons the string and starts a new escape
        self.osc.clear();
        self.osc_overflow = false;
        self.enter_escape();
        self.escape(byte, sink);
    }

    fn finish_string<F: FnMut(Action)>(&mut self, sink: &mut F) {
        self.state = ParserState::Normal;
        if self.string_kind == StringKind::Osc && !self.osc_overflow {
            sink(Action::Osc(OscAction::from_payload(&self.osc)));
        }
        self.osc.clear();
        self.osc_overflow = false;
    }
}
