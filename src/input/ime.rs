//! Composition-aware input translation
//!
//! Platform input methods deliver text through a chain of callbacks: marked
//! (uncommitted) text is set and replaced, then either committed or
//! cancelled. Some platforms also deliver the raw key press that resolved a
//! composition after the commit. [`InputTranslator`] folds all of that into
//! one entry point with an explicit state so each event maps to exactly the
//! bytes the PTY should see.

use super::{encode_key, encode_paste, encode_text, KeyEvent, PointerEvent};
use crate::core::Modes;

/// Where the input method is in its lifecycle
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Composition {
    /// No marked text
    #[default]
    Idle,
    /// Marked text is showing; nothing has been sent yet
    Composing(String),
    /// The composition just committed this text; the next key press may be
    /// the platform replaying it
    Committing(String),
}

/// Everything the host can feed into the translator
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputEvent {
    Key(KeyEvent),
    /// Composition began or its marked text changed. Empty text cancels.
    SetMarkedText(String),
    /// Final text from the input method
    Commit(String),
    /// Marked text discarded
    CancelComposition,
    Paste(String),
    /// Selection gestures; never produce bytes
    Pointer(PointerEvent),
}

/// Turns host input events into PTY bytes
#[derive(Debug, Clone, Default)]
pub struct InputTranslator {
    composition: Composition,
}

impl InputTranslator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn composition(&self) -> &Composition {
        &self.composition
    }

    /// Marked text to draw at the cursor, if composing
    pub fn marked_text(&self) -> Option<&str> {
        match &self.composition {
            Composition::Composing(text) => Some(text),
            _ => None,
        }
    }

    pub fn is_composing(&self) -> bool {
        matches!(self.composition, Composition::Composing(_))
    }

    /// Translate one event. An empty result means nothing is written.
    pub fn handle_input_event(&mut self, event: &InputEvent, modes: &Modes) -> Vec<u8> {
        let previous = std::mem::take(&mut self.composition);

        match (event, previous) {
            (InputEvent::SetMarkedText(text), _) => {
                if !text.is_empty() {
                    self.composition = Composition::Composing(text.clone());
                }
                Vec::new()
            },

            (InputEvent::Commit(text), Composition::Composing(_)) => {
                self.composition = Composition::Committing(text.clone());
                encode_text(text)
            },
            (InputEvent::Commit(text), _) => encode_text(text),

            (InputEvent::CancelComposition, _) => Vec::new(),

            // Control chords bypass composition and drop any marked text
            (InputEvent::Key(key), _) if key.is_control_chord() => encode_key(key, modes),

            // The input method owns key presses while marked text exists
            (InputEvent::Key(_), previous @ Composition::Composing(_)) => {
                self.composition = previous;
                Vec::new()
            },

            (InputEvent::Key(key), Composition::Committing(committed))
                if key.text.as_deref() == Some(committed.as_str()) =>
            {
                tracing::trace!(text = %committed, "dropping key replaying committed text");
                Vec::new()
            },

            (InputEvent::Key(key), _) => encode_key(key, modes),

            // A paste replaces whatever the input method had marked
            (InputEvent::Paste(text), _) => encode_paste(text, modes.bracketed_paste),

            // Selection gestures leave composition alone
            (InputEvent::Pointer(_), previous @ Composition::Composing(_)) => {
                self.composition = previous;
                Vec::new()
            },
            (InputEvent::Pointer(_), _) => Vec::new(),
        }
    }
}
