//! Pier Terminal Library
//!
//! The terminal engine behind a desktop terminal: it runs a child process on
//! a pseudoterminal, decodes its output into a screen model with scrollback,
//! and encodes keyboard, IME and paste input back into bytes.
//!
//! - `core`: Screen model, cells, cursor, scrollback, selection, snapshots
//! - `parser`: UTF-8 decoding and the VT/xterm escape sequence state machine
//! - `terminal`: Applies parsed actions to the screen
//! - `input`: Key table, paste encoding and IME composition
//! - `pty`: Unix PTY management
//! - `session`: PTY + terminal sessions, the session registry and pollers
//! - `config`: Session configuration

pub mod config;
pub mod core;
pub mod input;
pub mod parser;
pub mod pty;
pub mod session;
pub mod terminal;

pub use config::{ConfigError, TerminalConfig};
pub use session::{PollOutcome, Session, SessionError, SessionId, SessionRegistry};
pub use terminal::Terminal;
