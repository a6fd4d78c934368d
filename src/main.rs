// SPDX-License-Identifier: MIT
//
// kelp — a tiny raw-mode terminal text editor.
//
// This is the main binary that wires together the two crates:
//
//   kelp-term   → raw mode, window size, ANSI output, key decoding
//   kelp-editor → rows, buffer, controller, frame rendering
//
// The loop is strictly sequential: render a frame, block (with the
// terminal's ~100ms read timeout) on the next key, dispatch it. Saving
// and quitting are the only actions routed back to this layer, because
// the save-as prompt needs the same render/read cycle the main loop uses.
//
// Layout:
//
//   ┌──────────────────────────────┐
//   │ text area                    │  ← rows - 2
//   ├──────────────────────────────┤
//   │ status bar (INVERSE)         │  ← 1 row
//   ├──────────────────────────────┤
//   │ message bar / prompt         │  ← 1 row
//   └──────────────────────────────┘

use std::env;
use std::io::{self, Write};
use std::path::Path;
use std::process;

use kelp_editor::buffer::Buffer;
use kelp_editor::editor::{Action, Editor};
use kelp_editor::screen;

use kelp_term::input::{self, ByteSource, KeyCode, TtySource};
use kelp_term::output::OutputBuffer;
use kelp_term::terminal::{self, Terminal};

// ─── Entry point ────────────────────────────────────────────────────────────

fn main() {
    let args: Vec<String> = env::args().collect();

    let buffer = if let Some(path) = args.get(1) {
        Buffer::load(Path::new(path)).unwrap_or_else(|e| {
            eprintln!("kelp: {path}: {e}");
            process::exit(1);
        })
    } else {
        Buffer::new()
    };

    let mut term = Terminal::new();
    if let Err(e) = term.enter() {
        eprintln!("kelp: failed to enter raw mode: {e}");
        process::exit(1);
    }

    // Queried once at startup, after raw mode is up (the cursor-probe
    // fallback needs timeout reads).
    let Some(size) = terminal::window_size() else {
        drop(term);
        eprintln!("kelp: unable to determine terminal size");
        process::exit(1);
    };

    let mut editor = Editor::new(buffer, size);
    editor.set_status("HELP: Ctrl-S = save | Ctrl-Q = quit");

    let result = run(
        &mut editor,
        &mut TtySource::new(),
        &mut io::stdout().lock(),
    );

    // Restore the terminal before reporting anything.
    drop(term);
    if let Err(e) = result {
        eprintln!("kelp: {e}");
        process::exit(1);
    }
}

// ─── Main loop ──────────────────────────────────────────────────────────────

/// Render → read one key → dispatch, until quit or a fatal input error.
fn run(
    editor: &mut Editor,
    keys: &mut impl ByteSource,
    out: &mut impl Write,
) -> io::Result<()> {
    let mut frame = OutputBuffer::new();

    loop {
        refresh(editor, &mut frame, out)?;

        let key = input::read_key(keys)?;
        match editor.process_key(key) {
            Action::Continue => {}
            Action::Save => save(editor, keys, &mut frame, out)?,
            Action::Quit => return Ok(()),
        }
    }
}

/// Recompute scrolling, render a frame, and flush it as one write.
///
/// Display output is best-effort: a failed frame write is dropped (the
/// next refresh repaints everything), but the stale bytes must not pile
/// up in the buffer.
fn refresh(
    editor: &mut Editor,
    frame: &mut OutputBuffer,
    out: &mut impl Write,
) -> io::Result<()> {
    editor.scroll();
    screen::render_frame(editor, frame)?;
    if frame.flush_to(out).is_err() {
        frame.clear();
    }
    Ok(())
}

/// Handle Ctrl-S: prompt for a name if the buffer has none, then save.
fn save(
    editor: &mut Editor,
    keys: &mut impl ByteSource,
    frame: &mut OutputBuffer,
    out: &mut impl Write,
) -> io::Result<()> {
    if editor.buffer().path().is_none() {
        match prompt(editor, keys, frame, out, "Save as: ")? {
            Some(name) => editor.buffer_mut().set_path(name),
            None => {
                editor.set_status("Save aborted");
                return Ok(());
            }
        }
    }
    editor.save_buffer();
    Ok(())
}

// ─── Interactive prompt ─────────────────────────────────────────────────────

/// One-line prompt on the message bar, sharing the main render/read cycle.
///
/// Printable ASCII bytes append, Backspace/Delete remove the last
/// character, Enter commits a non-empty input, Escape cancels with `None`.
fn prompt(
    editor: &mut Editor,
    keys: &mut impl ByteSource,
    frame: &mut OutputBuffer,
    out: &mut impl Write,
    label: &str,
) -> io::Result<Option<String>> {
    let mut entry = String::new();

    loop {
        editor.set_status(format!("{label}{entry}"));
        refresh(editor, frame, out)?;

        let key = input::read_key(keys)?;
        match key.code {
            KeyCode::Enter if !entry.is_empty() => {
                editor.set_status("");
                return Ok(Some(entry));
            }
            KeyCode::Escape => {
                editor.set_status("");
                return Ok(None);
            }
            KeyCode::Backspace | KeyCode::Delete => {
                entry.pop();
            }
            KeyCode::Char(c) if key.modifiers.is_empty() && c.is_ascii() && !c.is_control() => {
                entry.push(c);
            }
            _ => {}
        }
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use kelp_term::input::SliceSource;
    use kelp_term::terminal::Size;
    use pretty_assertions::assert_eq;

    const SIZE: Size = Size { cols: 80, rows: 24 };

    fn editor() -> Editor {
        Editor::new(Buffer::new(), SIZE)
    }

    fn run_prompt(e: &mut Editor, script: &[u8]) -> Option<String> {
        let mut keys = SliceSource::new(script);
        let mut frame = OutputBuffer::new();
        let mut sink = Vec::new();
        prompt(e, &mut keys, &mut frame, &mut sink, "Save as: ").unwrap()
    }

    // ── Prompt ───────────────────────────────────────────────────────

    #[test]
    fn prompt_commits_on_enter() {
        let mut e = editor();
        assert_eq!(run_prompt(&mut e, b"notes.txt\r"), Some("notes.txt".into()));
    }

    #[test]
    fn prompt_cancels_on_escape() {
        // Lone ESC: the decoder times out on the follow-up reads and
        // degrades to the bare Escape key.
        let mut e = editor();
        assert_eq!(run_prompt(&mut e, b"half\x1b"), None);
    }

    #[test]
    fn prompt_backspace_edits() {
        let mut e = editor();
        assert_eq!(run_prompt(&mut e, b"ax\x7fb\r"), Some("ab".into()));
    }

    #[test]
    fn prompt_ignores_empty_enter() {
        let mut e = editor();
        assert_eq!(run_prompt(&mut e, b"\rok\r"), Some("ok".into()));
    }

    #[test]
    fn prompt_ignores_arrow_keys() {
        let mut e = editor();
        assert_eq!(run_prompt(&mut e, b"a\x1b[Cb\r"), Some("ab".into()));
    }

    #[test]
    fn prompt_ignores_non_ascii_bytes() {
        // The decoder maps each byte of a multi-byte sequence to its own
        // Char; accepting them would build a mojibake filename. Same
        // ASCII-only rule as text insertion in the editor.
        let mut e = editor();
        assert_eq!(run_prompt(&mut e, b"a\xc3\xa9b\r"), Some("ab".into()));
    }

    // ── Save wiring ──────────────────────────────────────────────────

    #[test]
    fn cancelled_save_as_reports_abort_and_keeps_buffer_unnamed() {
        let mut e = editor();
        e.process_key(kelp_term::input::KeyEvent::plain(KeyCode::Char('x')));

        let mut keys = SliceSource::new(b"\x1b");
        let mut frame = OutputBuffer::new();
        let mut sink = Vec::new();
        save(&mut e, &mut keys, &mut frame, &mut sink).unwrap();

        assert_eq!(e.status().unwrap().text(), "Save aborted");
        assert!(e.buffer().path().is_none());
        assert!(e.buffer().is_dirty());
    }

    // ── Main loop ────────────────────────────────────────────────────

    #[test]
    fn run_quits_on_ctrl_q() {
        let mut e = editor();
        let mut keys = SliceSource::new(&[0x11]);
        let mut sink = Vec::new();
        run(&mut e, &mut keys, &mut sink).unwrap();
        // At least one complete frame was flushed before reading the key.
        let text = String::from_utf8_lossy(&sink);
        assert!(text.starts_with("\x1b[?25l"));
        assert!(text.contains("kelp editor -- version"));
    }

    #[test]
    fn run_types_then_quits() {
        let mut e = editor();
        // "ok", then Ctrl-Q four times (dirty buffer needs the countdown).
        let mut keys = SliceSource::new(&[b'o', b'k', 0x11, 0x11, 0x11, 0x11]);
        let mut sink = Vec::new();
        run(&mut e, &mut keys, &mut sink).unwrap();

        assert_eq!(e.buffer().row(0).unwrap().raw(), b"ok");
        let text = String::from_utf8_lossy(&sink);
        assert!(text.contains("unsaved changes"));
    }
}
