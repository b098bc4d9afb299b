//! Golden tests for the terminal engine
//!
//! Each test feeds a byte stream through [`Terminal::process`] and checks
//! the resulting screen, cursor and scrollback against known-good state.

use pier_terminal::core::{Color, SelectionKind, SelectionPoint, Snapshot};
use pier_terminal::parser::ParserState;
use pier_terminal::Terminal;

fn run(cols: usize, rows: usize, input: &[u8]) -> Terminal {
    let mut term = Terminal::new(cols, rows, 1000);
    term.process(input);
    term
}

fn cursor(term: &Terminal) -> (usize, usize) {
    let cursor = term.screen().cursor();
    (cursor.col, cursor.row)
}

fn blank_screen(term: &Terminal) -> bool {
    (0..term.screen().rows()).all(|row| term.screen().row_text(row).is_empty())
}

#[test]
fn test_hello_clear_then_scroll() {
    let mut term = Terminal::new(80, 24, 1000);

    term.process(b"hello\r\n");
    assert_eq!(term.screen().row_text(0), "hello");
    assert_eq!(cursor(&term), (0, 1));

    term.process(b"\x1b[2J");
    assert!(blank_screen(&term));
    assert_eq!(cursor(&term), (0, 1));
    assert_eq!(term.screen().scrollback().len(), 0);

    // Starting from row 1, 25 linefeeds push 2 rows past the bottom plus the
    // blank one already above the cursor.
    term.process("x\n".repeat(25).as_bytes());
    let screen = term.screen();
    assert_eq!(screen.rows(), 24);
    assert_eq!(screen.scrollback().len(), 3);
    assert_eq!(screen.scrollback().get(0).unwrap().text(), "");
    assert_eq!(screen.scrollback().get(2).unwrap().text(), "x");
    assert!((0..23).all(|row| screen.row_text(row) == "x"));
    assert_eq!(screen.row_text(23), "");
    assert_eq!(cursor(&term), (0, 23));
}

#[test]
fn test_bare_newlines_keep_lines_intact_in_history() {
    let mut term = Terminal::new(80, 24, 10);
    for i in 0..40 {
        term.process(format!("line{i}\n").as_bytes());
    }

    let history: Vec<String> = term.screen().scrollback().iter().map(|l| l.text()).collect();
    let expected: Vec<String> = (7..17).map(|i| format!("line{i}")).collect();
    assert_eq!(history, expected);
    assert_eq!(term.screen().row_text(0), "line17");
    assert_eq!(term.screen().row_text(22), "line39");
    assert_eq!(cursor(&term), (0, 23));
}

#[test]
fn test_home_then_lines_scrolls_once() {
    let mut term = Terminal::new(80, 24, 1000);
    term.process(b"\x1b[H");
    let lines = vec!["x"; 25].join("\r\n");
    term.process(lines.as_bytes());

    let screen = term.screen();
    assert_eq!(screen.scrollback().len(), 1);
    assert_eq!(screen.scrollback().get(0).unwrap().text(), "x");
    assert!((0..24).all(|row| screen.row_text(row) == "x"));
    assert_eq!(cursor(&term), (1, 23));
}

#[test]
fn test_autowrap_defers_until_next_glyph() {
    let mut term = run(10, 3, b"0123456789");
    assert_eq!(cursor(&term), (9, 0));
    assert!(term.screen().cursor().pending_wrap);
    assert_eq!(term.screen().row_text(1), "");

    term.process(b"A");
    assert_eq!(term.screen().row_text(0), "0123456789");
    assert_eq!(term.screen().row_text(1), "A");
    assert_eq!(cursor(&term), (1, 1));
    assert!(term.screen().line(0).unwrap().wrapped);
}

#[test]
fn test_carriage_return_cancels_pending_wrap() {
    let term = run(5, 3, b"abcde\rX");
    assert_eq!(term.screen().row_text(0), "Xbcde");
    assert_eq!(term.screen().row_text(1), "");
}

#[test]
fn test_wrap_disabled_overwrites_last_column() {
    let term = run(5, 2, b"\x1b[?7labcdefg");
    assert_eq!(term.screen().row_text(0), "abcdg");
    assert_eq!(term.screen().row_text(1), "");
}

#[test]
fn test_wide_characters() {
    let term = run(10, 2, "a中b".as_bytes());
    let screen = term.screen();
    assert_eq!(screen.cell(1, 0).unwrap().content, "中");
    assert!(screen.cell(1, 0).unwrap().is_wide());
    assert!(screen.cell(2, 0).unwrap().is_continuation());
    assert_eq!(screen.cell(3, 0).unwrap().content, "b");
    assert_eq!(screen.row_text(0), "a中b");
    assert_eq!(cursor(&term), (4, 0));
}

#[test]
fn test_wide_character_at_last_column_wraps() {
    let term = run(5, 2, "abcd中".as_bytes());
    let screen = term.screen();
    assert_eq!(screen.row_text(0), "abcd");
    assert!(screen.cell(4, 0).unwrap().is_empty());
    assert_eq!(screen.cell(0, 1).unwrap().content, "中");
    assert!(screen.cell(1, 1).unwrap().is_continuation());
    assert_eq!(cursor(&term), (2, 1));
}

#[test]
fn test_overwriting_half_of_wide_character() {
    let term = run(10, 1, "中\x1b[2Gx".as_bytes());
    let screen = term.screen();
    assert!(screen.cell(0, 0).unwrap().is_empty());
    assert_eq!(screen.cell(1, 0).unwrap().content, "x");
    assert!(!screen.cell(1, 0).unwrap().is_continuation());
}

#[test]
fn test_utf8_split_across_chunks() {
    let bytes = "é中🙂".as_bytes();
    let mut term = Terminal::new(20, 2, 100);
    for byte in bytes {
        term.process(std::slice::from_ref(byte));
    }
    assert_eq!(term.screen().row_text(0), "é中🙂");
}

#[test]
fn test_invalid_utf8_becomes_replacement() {
    let term = run(20, 2, b"a\xffb\xe4\xb8c");
    assert_eq!(term.screen().row_text(0), "a\u{FFFD}b\u{FFFD}c");
}

#[test]
fn test_sgr_attributes_reach_cells() {
    let term = run(40, 2, b"\x1b[1;31mR\x1b[0;42mG\x1b[38;5;208mO\x1b[mN");
    let screen = term.screen();
    let r = screen.cell(0, 0).unwrap();
    assert_eq!(r.fg, Color::RED);
    assert!(r.style.bold);
    let g = screen.cell(1, 0).unwrap();
    assert_eq!(g.fg, Color::Default);
    assert_eq!(g.bg, Color::GREEN);
    assert!(!g.style.bold);
    assert_eq!(screen.cell(2, 0).unwrap().fg, Color::Indexed(208));
    assert_eq!(screen.cell(2, 0).unwrap().bg, Color::GREEN);
    let n = screen.cell(3, 0).unwrap();
    assert_eq!((n.fg, n.bg), (Color::Default, Color::Default));
}

#[test]
fn test_erase_in_line_modes() {
    let term = run(10, 3, b"abcdefghij\x1b[1;5H\x1b[K");
    assert_eq!(term.screen().row_text(0), "abcd");

    let term = run(10, 3, b"abcdefghij\x1b[1;5H\x1b[1K");
    assert_eq!(term.screen().row_text(0), "     fghij");

    let term = run(10, 3, b"abcdefghij\x1b[1;5H\x1b[2K");
    assert_eq!(term.screen().row_text(0), "");
}

#[test]
fn test_erase_display_above_includes_cursor() {
    let term = run(5, 3, b"aaaaa\r\nbbbbb\r\nccccc\x1b[2;3H\x1b[1J");
    let screen = term.screen();
    assert_eq!(screen.row_text(0), "");
    assert_eq!(screen.row_text(1), "   bb");
    assert_eq!(screen.row_text(2), "ccccc");
}

#[test]
fn test_erase_display_below_from_cursor() {
    let term = run(5, 3, b"aaaaa\r\nbbbbb\r\nccccc\x1b[2;3H\x1b[J");
    let screen = term.screen();
    assert_eq!(screen.row_text(0), "aaaaa");
    assert_eq!(screen.row_text(1), "bb");
    assert_eq!(screen.row_text(2), "");
}

#[test]
fn test_erase_scrollback() {
    let mut term = run(10, 2, b"1\r\n2\r\n3\r\n4");
    assert_eq!(term.screen().scrollback().len(), 2);
    term.process(b"\x1b[3J");
    assert_eq!(term.screen().scrollback().len(), 0);
}

#[test]
fn test_scroll_region_keeps_scrollback_clean() {
    // Region rows 2..=3 of 4; content scrolled inside it is discarded
    let term = run(10, 4, b"top\x1b[2;3r\x1b[2;1Ha\r\nb\r\nc\r\nd\x1b[4;1Hbottom");
    let screen = term.screen();
    assert_eq!(screen.scrollback().len(), 0);
    assert_eq!(screen.row_text(0), "top");
    assert_eq!(screen.row_text(1), "c");
    assert_eq!(screen.row_text(2), "d");
    assert_eq!(screen.row_text(3), "bottom");
}

#[test]
fn test_insert_and_delete_lines_in_region() {
    let term = run(5, 5, b"1\r\n2\r\n3\r\n4\r\n5\x1b[2;4r\x1b[2;1H\x1b[L");
    let rows: Vec<String> = (0..5).map(|r| term.screen().row_text(r)).collect();
    assert_eq!(rows, ["1", "", "2", "3", "5"]);

    let term = run(5, 5, b"1\r\n2\r\n3\r\n4\r\n5\x1b[2;4r\x1b[2;1H\x1b[M");
    let rows: Vec<String> = (0..5).map(|r| term.screen().row_text(r)).collect();
    assert_eq!(rows, ["1", "3", "4", "", "5"]);
}

#[test]
fn test_insert_and_delete_chars() {
    let term = run(8, 1, b"abcdef\x1b[1;3H\x1b[2@");
    assert_eq!(term.screen().row_text(0), "ab  cdef");

    let term = run(8, 1, b"abcdef\x1b[1;3H\x1b[2P");
    assert_eq!(term.screen().row_text(0), "abef");

    let term = run(8, 1, b"abcdef\x1b[1;2H\x1b[3X");
    assert_eq!(term.screen().row_text(0), "a   ef");
}

#[test]
fn test_reverse_index_at_top_scrolls_down() {
    let term = run(5, 3, b"a\r\nb\r\nc\x1b[H\x1bMz");
    let rows: Vec<String> = (0..3).map(|r| term.screen().row_text(r)).collect();
    assert_eq!(rows, ["z", "a", "b"]);
}

#[test]
fn test_tabs() {
    let term = run(20, 1, b"a\tb\tc\td");
    let screen = term.screen();
    assert_eq!(screen.cell(8, 0).unwrap().content, "b");
    assert_eq!(screen.cell(16, 0).unwrap().content, "c");
    // The last tab stop clamps to the right margin
    assert_eq!(screen.cell(19, 0).unwrap().content, "d");
}

#[test]
fn test_save_and_restore_cursor() {
    let term = run(20, 5, b"\x1b[3;4H\x1b7\x1b[H\x1b8X");
    assert_eq!(term.screen().cell(3, 2).unwrap().content, "X");

    let term = run(20, 5, b"\x1b[2;6H\x1b[s\x1b[5;1H\x1b[uY");
    assert_eq!(term.screen().cell(5, 1).unwrap().content, "Y");
}

#[test]
fn test_modes_and_title() {
    let term = run(20, 5, b"\x1b[?1h\x1b[?2004h\x1b[?25l\x1b]2;pier\x07ok");
    assert!(term.modes().application_cursor);
    assert!(term.modes().bracketed_paste);
    assert!(!term.screen().cursor().visible);
    assert_eq!(term.title(), "pier");
    assert_eq!(term.screen().row_text(0), "ok");

    let term = run(20, 5, b"\x1b]0;other\x1b\\\x1b[?2004h\x1b[?2004l");
    assert_eq!(term.title(), "other");
    assert!(!term.modes().bracketed_paste);
}

#[test]
fn test_malformed_sequences_do_not_corrupt_text() {
    let term = run(40, 2, b"\x1b[99999999999999;;;;;Zok\x1b[?\x18 fine\x1bP1$qignored\x1b\\!");
    assert_eq!(term.screen().row_text(0), "ok fine!");
    assert_eq!(term.parser_state(), ParserState::Normal);
}

#[test]
fn test_oversized_osc_is_dropped() {
    let mut input = b"\x1b]2;".to_vec();
    input.extend(std::iter::repeat(b'a').take(10_000));
    input.extend(b"\x07done");
    let term = run(10, 2, &input);
    assert_eq!(term.title(), "");
    assert_eq!(term.screen().row_text(0), "done");
}

#[test]
fn test_full_reset() {
    let term = run(10, 3, b"\x1b]2;t\x07\x1b[31mabc\x1b[2;2r\x1bc");
    assert!(blank_screen(&term));
    assert_eq!(term.title(), "");
    assert_eq!(cursor(&term), (0, 0));
    assert_eq!(term.screen().cursor().fg, Color::Default);
    assert_eq!(term.screen().scroll_region(), (0, 2));
}

#[test]
fn test_resize_shrink_moves_top_rows_to_scrollback() {
    let mut term = run(10, 4, b"1\r\n2\r\n3\r\n4");
    term.resize(10, 2);
    let screen = term.screen();
    assert_eq!(screen.rows(), 2);
    assert_eq!(screen.scrollback().len(), 2);
    assert_eq!(screen.row_text(0), "3");
    assert_eq!(screen.row_text(1), "4");
    assert_eq!(cursor(&term), (1, 1));
}

#[test]
fn test_resize_shrink_drops_blank_rows_below_cursor_first() {
    let mut term = run(10, 5, b"a\r\nb");
    term.resize(10, 3);
    let screen = term.screen();
    assert_eq!(screen.scrollback().len(), 0);
    assert_eq!(screen.row_text(0), "a");
    assert_eq!(screen.row_text(1), "b");
    assert_eq!(cursor(&term), (1, 1));
}

#[test]
fn test_resize_shrink_never_drops_content_below_cursor() {
    let mut term = run(10, 4, b"a\r\nb\x1b[4;1Hz\x1b[2;2H");
    term.resize(10, 2);
    let screen = term.screen();
    let history: Vec<String> = screen.scrollback().iter().map(|l| l.text()).collect();
    assert_eq!(history, vec!["a", "b"]);
    assert_eq!(screen.row_text(0), "");
    assert_eq!(screen.row_text(1), "z");
}

#[test]
fn test_resize_narrow_then_wide_keeps_short_rows() {
    let mut term = run(20, 3, b"short\r\nalso short");
    term.resize(8, 3);
    term.resize(20, 3);
    assert_eq!(term.screen().row_text(0), "short");
    assert_eq!(term.screen().row_text(1), "also sho");
}

#[test]
fn test_selection_spanning_scrollback() {
    let mut term = run(10, 2, b"first\r\nsecond\r\nthird");
    assert_eq!(term.screen().scrollback().len(), 1);
    term.begin_selection(SelectionPoint::new(0, 2), SelectionKind::Normal);
    term.extend_selection(SelectionPoint::new(1, 2));
    term.finish_selection();
    assert_eq!(term.selected_text().unwrap(), "rst\nsec");
}

#[test]
fn test_snapshot_is_deterministic_json() {
    let input = "\x1b[1;32mgreen\x1b[0m 中\r\n\x1b]2;snap\x07\x1b[?2004h".as_bytes();
    let a = run(20, 4, input).snapshot(true);
    let b = run(20, 4, input).snapshot(true);
    let json = a.to_json().unwrap();
    assert_eq!(json, b.to_json().unwrap());

    let parsed = Snapshot::from_json(&json).unwrap();
    assert_eq!(parsed, a);
    assert_eq!(parsed.lines[0], "green 中");
    assert_eq!(parsed.title, "snap");
    assert!(parsed.modes.bracketed_paste);
    assert_eq!((parsed.cursor.col, parsed.cursor.row), (0, 1));
}
