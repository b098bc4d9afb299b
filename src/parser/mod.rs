//! Terminal escape sequence parser
//!
//! A stateful parser that converts bytes into terminal actions.
//! Loosely follows the VT500-series parser model from <https://vt100.net/emu/dec_ansi_parser>,
//! collapsed to the states the terminal actually needs.

mod actions;
mod state;
mod utf8;

pub use actions::{Action, ControlCode, CsiAction, EscAction, OscAction};
pub use state::{Parser, ParserState, MAX_CSI_LEN, MAX_OSC_LEN, MAX_PARAMS};
pub use utf8::{Utf8Decoder, Utf8Step, REPLACEMENT_CHAR};
