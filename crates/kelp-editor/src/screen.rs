//! The render engine — editor state in, one frame of bytes out.
//!
//! [`render_frame`] is deterministic and mutates nothing: it appends the
//! entire refresh (cursor hide, cursor home, every visible row, status
//! bar, message bar, cursor placement, cursor show) to an `OutputBuffer`
//! which the caller flushes as a single write. Scrolling has already
//! happened in the controller; this module only slices and formats.
//!
//! Rows past the end of the buffer get a `~` in column 0, and an empty
//! buffer shows a centered welcome line at one-third of the viewport.

use std::io;

use kelp_term::ansi;
use kelp_term::output::OutputBuffer;

use crate::editor::Editor;

/// Version string shown in the welcome line.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Truncate `text` to at most `max` bytes, backing up to a char boundary.
///
/// Status text is not guaranteed ASCII: filenames and OS error strings
/// may carry multi-byte characters, and `String::truncate` panics on a
/// mid-character index.
fn clip_to_width(text: &mut String, max: usize) {
    if text.len() <= max {
        return;
    }
    let mut end = max;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    text.truncate(end);
}

/// Render a complete frame of the editor into `out`.
///
/// # Errors
///
/// Propagates writer errors; writing into an `OutputBuffer` cannot fail
/// in practice.
pub fn render_frame(e: &Editor, out: &mut OutputBuffer) -> io::Result<()> {
    ansi::cursor_hide(out)?;
    ansi::cursor_home(out)?;

    draw_rows(e, out)?;
    draw_status_bar(e, out)?;
    draw_message_bar(e, out)?;

    let x = e.rx().saturating_sub(e.col_offset());
    let y = e.cy().saturating_sub(e.row_offset());
    ansi::cursor_to(
        out,
        u16::try_from(x).unwrap_or(u16::MAX),
        u16::try_from(y).unwrap_or(u16::MAX),
    )?;
    ansi::cursor_show(out)
}

/// Draw each visible text row: a clipped render slice, a `~` filler past
/// EOF, or the centered welcome line on an empty buffer.
fn draw_rows(e: &Editor, out: &mut OutputBuffer) -> io::Result<()> {
    for y in 0..e.screen_rows() {
        let file_row = y + e.row_offset();

        if let Some(row) = e.buffer().row(file_row) {
            let render = row.render();
            let start = e.col_offset().min(render.len());
            let end = (start + e.screen_cols()).min(render.len());
            out.push_bytes(&render[start..end]);
        } else if e.buffer().line_count() == 0 && y == e.screen_rows() / 3 {
            draw_welcome(e, out);
        } else {
            out.push_bytes(b"~");
        }

        ansi::clear_line(out)?;
        out.push_bytes(b"\r\n");
    }
    Ok(())
}

/// Center the welcome line, keeping the leading `~` that marks the row
/// as outside the file.
fn draw_welcome(e: &Editor, out: &mut OutputBuffer) {
    let mut welcome = format!("kelp editor -- version {VERSION}");
    clip_to_width(&mut welcome, e.screen_cols());

    let mut padding = (e.screen_cols() - welcome.len()) / 2;
    if padding > 0 {
        out.push_bytes(b"~");
        padding -= 1;
    }
    for _ in 0..padding {
        out.push_bytes(b" ");
    }
    out.push_bytes(welcome.as_bytes());
}

/// Inverted-video status bar: filename, line count, modified marker on
/// the left; `current/total` on the right; padded to the full width.
fn draw_status_bar(e: &Editor, out: &mut OutputBuffer) -> io::Result<()> {
    ansi::invert(out)?;

    let name = e
        .buffer()
        .path()
        .and_then(|p| p.file_name())
        .map_or_else(|| "[No Name]".to_string(), |n| n.to_string_lossy().into_owned());
    let modified = if e.buffer().is_dirty() { " (modified)" } else { "" };

    let mut left = format!(
        "{:.20} - {} lines{}",
        name,
        e.buffer().line_count(),
        modified
    );
    clip_to_width(&mut left, e.screen_cols());
    let right = format!("{}/{}", e.cy() + 1, e.buffer().line_count());

    out.push_bytes(left.as_bytes());
    let mut len = left.len();
    while len < e.screen_cols() {
        if e.screen_cols() - len == right.len() {
            out.push_bytes(right.as_bytes());
            break;
        }
        out.push_bytes(b" ");
        len += 1;
    }

    ansi::reset(out)?;
    out.push_bytes(b"\r\n");
    Ok(())
}

/// One line for the live status message (blank once it expires).
fn draw_message_bar(e: &Editor, out: &mut OutputBuffer) -> io::Result<()> {
    ansi::clear_line(out)?;
    if let Some(msg) = e.status() {
        if msg.is_live() {
            let mut text = msg.text().to_string();
            clip_to_width(&mut text, e.screen_cols());
            out.push_bytes(text.as_bytes());
        }
    }
    Ok(())
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::Buffer;
    use kelp_term::input::KeyCode;
    use kelp_term::terminal::Size;

    const SIZE: Size = Size { cols: 40, rows: 10 };

    fn editor_with(lines: &[&str]) -> Editor {
        let mut buf = Buffer::new();
        for (i, line) in lines.iter().enumerate() {
            buf.insert_row(i, line.as_bytes().to_vec());
        }
        Editor::new(buf, SIZE)
    }

    fn frame(e: &mut Editor) -> String {
        e.scroll();
        let mut out = OutputBuffer::new();
        render_frame(e, &mut out).unwrap();
        String::from_utf8(out.as_bytes().to_vec()).unwrap()
    }

    #[test]
    fn frame_hides_homes_then_shows_cursor() {
        let mut e = editor_with(&["hello"]);
        let f = frame(&mut e);
        assert!(f.starts_with("\x1b[?25l\x1b[H"));
        assert!(f.ends_with("\x1b[?25h"));
    }

    #[test]
    fn rows_past_eof_get_tildes() {
        let mut e = editor_with(&["only"]);
        let f = frame(&mut e);
        // 8 text rows, 1 with content, 7 tildes.
        assert_eq!(f.matches("~\x1b[K").count(), 7);
        assert!(f.contains("only"));
    }

    #[test]
    fn empty_buffer_shows_centered_welcome() {
        let mut e = editor_with(&[]);
        let f = frame(&mut e);
        assert!(f.contains("kelp editor -- version"));
        // The welcome row starts with the tilde marker.
        let row = f
            .lines()
            .find(|l| l.contains("kelp editor"))
            .unwrap();
        assert!(row.contains('~'));
    }

    #[test]
    fn nonempty_buffer_has_no_welcome() {
        let mut e = editor_with(&["x"]);
        assert!(!frame(&mut e).contains("kelp editor -- version"));
    }

    #[test]
    fn content_is_clipped_to_viewport_columns() {
        let long = "x".repeat(100);
        let mut e = editor_with(&[&long]);
        let f = frame(&mut e);
        assert!(f.contains(&"x".repeat(40)));
        assert!(!f.contains(&"x".repeat(41)));
    }

    #[test]
    fn horizontal_scroll_shifts_slice() {
        // A 4-column viewport so col_offset engages quickly.
        let mut e = Editor::new(Buffer::new(), Size { cols: 4, rows: 10 });
        e.buffer_mut().insert_row(0, b"abcdefghij".to_vec());
        for _ in 0..10 {
            e.move_cursor(KeyCode::Right);
        }
        let f = frame(&mut e);
        assert!(f.contains("hij"));
        assert!(!f.contains("abc"));
    }

    #[test]
    fn status_bar_shows_no_name_placeholder() {
        let mut e = editor_with(&["a"]);
        let f = frame(&mut e);
        assert!(f.contains("[No Name]"));
        assert!(f.contains("(modified)"));
    }

    #[test]
    fn status_bar_shows_position_and_count() {
        let mut e = editor_with(&["a", "b", "c"]);
        e.move_cursor(KeyCode::Down);
        let f = frame(&mut e);
        assert!(f.contains("3 lines"));
        assert!(f.contains("2/3"));
    }

    #[test]
    fn status_bar_is_inverted_and_full_width() {
        let mut e = editor_with(&["a"]);
        let f = frame(&mut e);
        let start = f.find("\x1b[7m").expect("invert on");
        let end = f[start..].find("\x1b[m").expect("invert off") + start;
        let bar = &f[start + 4..end];
        assert_eq!(bar.len(), 40);
    }

    #[test]
    fn message_bar_shows_live_status() {
        let mut e = editor_with(&["a"]);
        e.set_status("HELP: Ctrl-S = save | Ctrl-Q = quit");
        let f = frame(&mut e);
        assert!(f.contains("HELP: Ctrl-S = save"));
    }

    #[test]
    fn cursor_directive_is_viewport_relative() {
        let mut e = editor_with(&["abc", "def"]);
        e.move_cursor(KeyCode::Down);
        e.move_cursor(KeyCode::Right);
        let f = frame(&mut e);
        // (cx=1, cy=1) with zero offsets → ANSI 1-indexed row 2, col 2.
        assert!(f.ends_with("\x1b[2;2H\x1b[?25h"));
    }

    #[test]
    fn message_bar_clips_multibyte_text_on_char_boundary() {
        // 9 ASCII bytes + 35 two-byte chars: the 40-column clip lands
        // mid-character and must back up instead of panicking.
        let mut e = editor_with(&["a"]);
        let wide = "é".repeat(35);
        e.set_status(format!("Save as: {wide}"));
        let f = frame(&mut e);
        assert!(f.contains("Save as: é"));
    }

    #[test]
    fn status_bar_clips_multibyte_name_safely() {
        let mut e = Editor::new(Buffer::new(), Size { cols: 9, rows: 10 });
        e.buffer_mut().set_path("éééééééééé.txt");
        let f = frame(&mut e);
        // 9 bytes would split the fifth é; the clip keeps four.
        assert!(f.contains("éééé"));
    }

    #[test]
    fn tab_rows_render_expanded() {
        let mut e = editor_with(&["\tx"]);
        let f = frame(&mut e);
        assert!(f.contains("        x"));
    }
}
