//! Terminal Executor
//!
//! Ties together the parser and the screen model, applying parsed actions
//! to update the terminal state. This is the main integration point
//! between parsing and the screen model, and it also owns the state that
//! lives beside the grid: the window title and the current selection.

use crate::core::{Color, Modes, Screen, Selection, SelectionKind, SelectionPoint, Snapshot};
use crate::input::{PointerEvent, PointerPhase};
use crate::parser::{Action, ControlCode, CsiAction, EscAction, OscAction, Parser, ParserState};

/// Parser plus screen: bytes in, grid out
#[derive(Debug, Clone)]
pub struct Terminal {
    screen: Screen,
    parser: Parser,
    /// Window title (set via OSC 0/2)
    title: String,
    selection: Option<Selection>,
}

impl Terminal {
    /// Create a new terminal with the given dimensions
    pub fn new(cols: usize, rows: usize, scrollback_capacity: usize) -> Self {
        Self {
            screen: Screen::new(cols, rows, scrollback_capacity),
            parser: Parser::new(),
            title: String::new(),
            selection: None,
        }
    }

    pub fn screen(&self) -> &Screen {
        &self.screen
    }

    pub fn screen_mut(&mut self) -> &mut Screen {
        &mut self.screen
    }

    pub fn modes(&self) -> Modes {
        self.screen.modes
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn parser_state(&self) -> ParserState {
        self.parser.state()
    }

    /// Process output bytes from the child
    pub fn process(&mut self, data: &[u8]) {
        let Self {
            screen,
            parser,
            title,
            ..
        } = self;
        let mut performer = Performer { screen, title };
        parser.parse_with(data, |action| performer.apply(action));
    }

    /// Resize the grid. The selection is dropped since its rows may no
    /// longer address the same content.
    pub fn resize(&mut self, cols: usize, rows: usize) {
        self.screen.resize(cols, rows);
        self.selection = None;
    }

    /// Full reset of parser, screen and title
    pub fn reset(&mut self) {
        self.parser.reset();
        self.screen.reset();
        self.title.clear();
        self.selection = None;
    }

    pub fn selection(&self) -> Option<&Selection> {
        self.selection.as_ref()
    }

    /// Start a new selection at `point` (pointer down)
    pub fn begin_selection(&mut self, point: SelectionPoint, kind: SelectionKind) {
        self.selection = Some(Selection::new(point, kind));
    }

    /// Move the selection extent (pointer drag)
    pub fn extend_selection(&mut self, point: SelectionPoint) {
        if let Some(selection) = self.selection.as_mut() {
            selection.update(point);
        }
    }

    /// Pointer released
    pub fn finish_selection(&mut self) {
        if let Some(selection) = self.selection.as_mut() {
            selection.finish();
        }
    }

    /// Select the word under `point`
    pub fn select_word(&mut self, point: SelectionPoint) {
        self.selection = Selection::word_at(&self.screen, point);
    }

    pub fn clear_selection(&mut self) {
        self.selection = None;
    }

    /// Apply a pointer gesture to the selection. Rows in the event are
    /// viewport rows and are translated past the scrollback here.
    pub fn handle_pointer(&mut self, event: &PointerEvent) {
        let row = self.screen.scrollback().len() + event.row.min(self.screen.rows() - 1);
        let point = SelectionPoint::new(row, event.col.min(self.screen.cols() - 1));
        match event.phase {
            PointerPhase::Press if event.click_count >= 2 => self.select_word(point),
            PointerPhase::Press => self.begin_selection(point, event.kind),
            PointerPhase::Drag => self.extend_selection(point),
            PointerPhase::Release => self.finish_selection(),
        }
    }

    /// Text of the current selection, if any
    pub fn selected_text(&self) -> Option<String> {
        self.selection.as_ref().map(|s| s.text(&self.screen))
    }

    /// Capture a renderer snapshot
    pub fn snapshot(&self, blink_visible: bool) -> Snapshot {
        Snapshot::capture(
            &self.screen,
            &self.title,
            self.selection.as_ref(),
            blink_visible,
        )
    }
}

/// Applies actions to the screen while the parser is borrowed
struct Performer<'a> {
    screen: &'a mut Screen,
    title: &'a mut String,
}

impl Performer<'_> {
    fn apply(&mut self, action: Action) {
        match action {
            Action::Print(c) => self.screen.print(c),
            Action::Control(code) => self.execute_control(code),
            Action::Csi(csi) => self.execute_csi(&csi),
            Action::Esc(esc) => self.execute_esc(esc),
            Action::Osc(osc) => self.execute_osc(osc),
        }
    }

    fn execute_control(&mut self, code: ControlCode) {
        match code {
            ControlCode::Bell => tracing::trace!("bell"),
            ControlCode::Backspace => self.screen.backspace(),
            ControlCode::Tab => self.screen.tab(),
            // VT and FF are treated as LF
            ControlCode::LineFeed | ControlCode::VerticalTab | ControlCode::FormFeed => {
                self.screen.linefeed()
            }
            ControlCode::CarriageReturn => self.screen.carriage_return(),
            ControlCode::Other(_) => {}
        }
    }

    fn execute_csi(&mut self, csi: &CsiAction) {
        if !csi.intermediates.is_empty() {
            tracing::trace!(?csi, "ignoring CSI with intermediates");
            return;
        }
        if csi.is_dec_private() {
            match csi.final_char {
                'h' => self.set_dec_modes(csi, true),
                'l' => self.set_dec_modes(csi, false),
                _ => tracing::trace!(?csi, "unhandled private CSI"),
            }
            return;
        }
        if csi.private_marker.is_some() {
            tracing::trace!(?csi, "unhandled private CSI");
            return;
        }

        let n = csi.param_or_default(0, 1) as usize;
        match csi.final_char {
            // Cursor movement
            'A' => self.screen.move_cursor_up(n),
            'B' | 'e' => self.screen.move_cursor_down(n),
            'C' | 'a' => self.screen.move_cursor_forward(n),
            'D' => self.screen.move_cursor_backward(n),
            'E' => {
                self.screen.move_cursor_down(n);
                self.screen.carriage_return();
            }
            'F' => {
                self.screen.move_cursor_up(n);
                self.screen.carriage_return();
            }
            'G' | '`' => self.screen.move_cursor_to_col(n - 1),
            'H' | 'f' => {
                let row = csi.param_or_default(0, 1) as usize - 1;
                let col = csi.param_or_default(1, 1) as usize - 1;
                self.screen.move_cursor_to(row, col);
            }
            'd' => self.screen.move_cursor_to_row(n - 1),

            // Erasing
            'J' => self.screen.erase_in_display(csi.param(0, 0)),
            'K' => self.screen.erase_in_line(csi.param(0, 0)),
            'X' => self.screen.erase_chars(n),

            // Insert/delete
            'L' => self.screen.insert_lines(n),
            'M' => self.screen.delete_lines(n),
            'P' => self.screen.delete_chars(n),
            '@' => self.screen.insert_chars(n),

            // Scrolling
            'S' => self.screen.scroll_up(n),
            'T' => self.screen.scroll_down(n),
            'r' => {
                let rows = self.screen.rows();
                let top = csi.param_or_default(0, 1) as usize - 1;
                let bottom = csi.param_or_default(1, rows as u16) as usize - 1;
                self.screen.set_scroll_region(top, bottom);
            }

            's' => self.screen.save_cursor(),
            'u' => self.screen.restore_cursor(),

            // ANSI modes (insert mode, LNM) are not supported
            'h' | 'l' => tracing::trace!(?csi, "ignoring ANSI mode"),

            'm' => self.execute_sgr(csi),

            _ => tracing::trace!(?csi, "unhandled CSI"),
        }
    }

    fn set_dec_modes(&mut self, csi: &CsiAction, enable: bool) {
        for &mode in &csi.params {
            match mode {
                1 => self.screen.modes.application_cursor = enable,
                7 => {
                    let cursor = self.screen.cursor_mut();
                    cursor.autowrap = enable;
                    if !enable {
                        cursor.pending_wrap = false;
                    }
                }
                12 => self.screen.modes.cursor_blink = enable,
                25 => self.screen.cursor_mut().visible = enable,
                2004 => self.screen.modes.bracketed_paste = enable,
                _ => tracing::trace!(mode, enable, "unhandled DEC private mode"),
            }
        }
    }

    /// Select Graphic Rendition
    fn execute_sgr(&mut self, csi: &CsiAction) {
        let params: &[u16] = if csi.params.is_empty() {
            &[0]
        } else {
            &csi.params
        };
        let cursor = self.screen.cursor_mut();
        let mut i = 0;
        while i < params.len() {
            match params[i] {
                0 => cursor.reset_attributes(),
                1 => cursor.style.bold = true,
                2 => cursor.style.faint = true,
                3 => cursor.style.italic = true,
                4 | 21 => cursor.style.underline = true,
                5 | 6 => cursor.style.blink = true,
                7 => cursor.style.inverse = true,
                8 => cursor.style.hidden = true,
                9 => cursor.style.strikethrough = true,
                22 => {
                    cursor.style.bold = false;
                    cursor.style.faint = false;
                }
                23 => cursor.style.italic = false,
                24 => cursor.style.underline = false,
                25 => cursor.style.blink = false,
                27 => cursor.style.inverse = false,
                28 => cursor.style.hidden = false,
                29 => cursor.style.strikethrough = false,
                p @ 30..=37 => cursor.fg = Color::ansi((p - 30) as u8),
                38 => match extended_color(&params[i + 1..]) {
                    Some((color, used)) => {
                        cursor.fg = color;
                        i += used;
                    }
                    None => break,
                },
                39 => cursor.fg = Color::Default,
                p @ 40..=47 => cursor.bg = Color::ansi((p - 40) as u8),
                48 => match extended_color(&params[i + 1..]) {
                    Some((color, used)) => {
                        cursor.bg = color;
                        i += used;
                    }
                    None => break,
                },
                49 => cursor.bg = Color::Default,
                p @ 90..=97 => cursor.fg = Color::bright((p - 90) as u8),
                p @ 100..=107 => cursor.bg = Color::bright((p - 100) as u8),
                p => tracing::trace!(param = p, "unhandled SGR parameter"),
            }
            i += 1;
        }
    }

    fn execute_esc(&mut self, esc: EscAction) {
        match esc {
            EscAction::SaveCursor => self.screen.save_cursor(),
            EscAction::RestoreCursor => self.screen.restore_cursor(),
            EscAction::Index => self.screen.index(),
            EscAction::ReverseIndex => self.screen.reverse_index(),
            EscAction::NextLine => self.screen.next_line(),
            EscAction::FullReset => {
                self.screen.reset();
                self.title.clear();
            }
            EscAction::StringTerminator | EscAction::DesignateCharset { .. } => {}
            EscAction::Unknown(c) => tracing::trace!(final_char = %c, "unknown escape"),
        }
    }

    fn execute_osc(&mut self, osc: OscAction) {
        match osc {
            OscAction::SetTitle(title) => *self.title = title,
            OscAction::SetIconName(_) => {}
            OscAction::Unknown { command } => tracing::trace!(?command, "unhandled OSC"),
        }
    }
}

/// Parse the tail of `38;...`/`48;...`. Returns the color and how many
/// parameters it consumed.
fn extended_color(params: &[u16]) -> Option<(Color, usize)> {
    match params {
        [5, index, ..] => Some((Color::Indexed((*index).min(255) as u8), 2)),
        [2, r, g, b, ..] => Some((
            Color::Rgb((*r).min(255) as u8, (*g).min(255) as u8, (*b).min(255) as u8),
            4,
        )),
        _ => None,
    }
}
