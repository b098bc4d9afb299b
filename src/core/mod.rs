//! Terminal Core Module
//!
//! Platform-independent terminal state. This module contains:
//! - Screen model with scroll region and mode flags
//! - Cell representation with attributes and double-width accounting
//! - Cursor state, save/restore and the blink timer
//! - Scrollback buffer
//! - Selection over scrollback and screen
//! - Renderer snapshots
//!
//! Nothing here touches the OS: given the same sequence of operations the
//! state is always the same.

mod cell;
mod cursor;
mod screen;
mod scrollback;
mod selection;
mod snapshot;

pub use cell::{char_width, Cell, Color, Style};
pub use cursor::{Cursor, CursorBlink, SavedCursor, DEFAULT_BLINK_INTERVAL};
pub use screen::{Modes, Screen, TAB_WIDTH};
pub use scrollback::{Line, Scrollback, DEFAULT_SCROLLBACK};
pub use selection::{Selection, SelectionKind, SelectionPoint};
pub use snapshot::{CellSnapshot, CursorSnapshot, Snapshot};
