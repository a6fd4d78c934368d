//! The editor controller — cursor, viewport, status message, dispatch.
//!
//! `Editor` owns the combined state: the row store, cursor position,
//! viewport offsets, status message, and the quit-confirmation counter.
//! [`process_key`](Editor::process_key) maps decoded keys to buffer
//! mutations or cursor movement and tells the caller when an action needs
//! terminal I/O (save, quit). Scrolling is recomputed from scratch before
//! every frame — never patched incrementally.

use std::time::{Duration, Instant};

use kelp_term::input::{KeyCode, KeyEvent, Modifiers};
use kelp_term::terminal::Size;

use crate::buffer::Buffer;

/// Extra consecutive Ctrl-Q presses required to quit a dirty buffer.
pub const QUIT_TIMES: u8 = 3;

/// How long a status message stays visible.
const STATUS_TIMEOUT: Duration = Duration::from_secs(5);

/// What the main loop should do after a keypress was dispatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Keep going.
    Continue,
    /// Save the buffer (prompting for a name if it has none).
    Save,
    /// Exit cleanly.
    Quit,
}

/// A transient status-bar message with its creation time.
#[derive(Debug)]
pub struct StatusMessage {
    text: String,
    set_at: Instant,
}

impl StatusMessage {
    fn new(text: String) -> Self {
        Self {
            text,
            set_at: Instant::now(),
        }
    }

    /// The message text.
    #[inline]
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Whether the message should still be displayed (younger than the
    /// five-second timeout, measured at render time).
    #[must_use]
    pub fn is_live(&self) -> bool {
        self.set_at.elapsed() < STATUS_TIMEOUT
    }
}

/// The complete editor state driven by the main loop.
pub struct Editor {
    buffer: Buffer,
    /// Cursor column in raw bytes within the current row.
    cx: usize,
    /// Cursor row; may equal `line_count()` (the virtual line past EOF).
    cy: usize,
    /// Cursor column in render coordinates; derived in [`scroll`](Self::scroll).
    rx: usize,
    row_offset: usize,
    col_offset: usize,
    screen_rows: usize,
    screen_cols: usize,
    status: Option<StatusMessage>,
    quit_times: u8,
}

impl Editor {
    /// Create an editor over a buffer, sized to the terminal.
    ///
    /// Two rows are reserved for the status bar and the message bar.
    #[must_use]
    pub fn new(buffer: Buffer, size: Size) -> Self {
        Self {
            buffer,
            cx: 0,
            cy: 0,
            rx: 0,
            row_offset: 0,
            col_offset: 0,
            screen_rows: usize::from(size.rows).saturating_sub(2),
            screen_cols: usize::from(size.cols),
            status: None,
            quit_times: QUIT_TIMES,
        }
    }

    // ── State accessors (used by the render engine) ─────────────────

    /// The row store.
    #[inline]
    #[must_use]
    pub const fn buffer(&self) -> &Buffer {
        &self.buffer
    }

    /// Mutable row store access (save-as needs to set the path).
    #[inline]
    pub const fn buffer_mut(&mut self) -> &mut Buffer {
        &mut self.buffer
    }

    /// Cursor column in raw bytes.
    #[inline]
    #[must_use]
    pub const fn cx(&self) -> usize {
        self.cx
    }

    /// Cursor row index.
    #[inline]
    #[must_use]
    pub const fn cy(&self) -> usize {
        self.cy
    }

    /// Cursor column in render coordinates (valid after [`scroll`](Self::scroll)).
    #[inline]
    #[must_use]
    pub const fn rx(&self) -> usize {
        self.rx
    }

    /// First visible buffer row.
    #[inline]
    #[must_use]
    pub const fn row_offset(&self) -> usize {
        self.row_offset
    }

    /// First visible render column.
    #[inline]
    #[must_use]
    pub const fn col_offset(&self) -> usize {
        self.col_offset
    }

    /// Visible text rows (terminal rows minus the two bars).
    #[inline]
    #[must_use]
    pub const fn screen_rows(&self) -> usize {
        self.screen_rows
    }

    /// Visible columns.
    #[inline]
    #[must_use]
    pub const fn screen_cols(&self) -> usize {
        self.screen_cols
    }

    /// The current status message, if any.
    #[inline]
    #[must_use]
    pub const fn status(&self) -> Option<&StatusMessage> {
        self.status.as_ref()
    }

    /// Set the status message; display expires after five seconds.
    pub fn set_status(&mut self, text: impl Into<String>) {
        self.status = Some(StatusMessage::new(text.into()));
    }

    // ── Scrolling ────────────────────────────────────────────────────

    /// Recompute `rx` and the viewport offsets from the cursor position.
    ///
    /// Called once per frame before rendering. Afterwards the cursor is
    /// always within the visible rectangle.
    pub fn scroll(&mut self) {
        self.rx = self
            .buffer
            .row(self.cy)
            .map_or(0, |row| row.cx_to_rx(self.cx));

        if self.cy < self.row_offset {
            self.row_offset = self.cy;
        }
        if self.cy >= self.row_offset + self.screen_rows {
            self.row_offset = self.cy + 1 - self.screen_rows;
        }
        if self.rx < self.col_offset {
            self.col_offset = self.rx;
        }
        if self.rx >= self.col_offset + self.screen_cols {
            self.col_offset = self.rx + 1 - self.screen_cols;
        }
    }

    // ── Key dispatch ─────────────────────────────────────────────────

    /// Route one decoded keypress.
    ///
    /// Pure state mutation except for the returned [`Action`]: saving and
    /// quitting need terminal I/O, which the main loop owns.
    pub fn process_key(&mut self, key: KeyEvent) -> Action {
        if key.modifiers.contains(Modifiers::CTRL) {
            match key.code {
                KeyCode::Char('q') => {
                    if self.buffer.is_dirty() && self.quit_times > 0 {
                        let remaining = self.quit_times;
                        self.set_status(format!(
                            "WARNING! File has unsaved changes. \
                             Press Ctrl-Q {remaining} more times to quit."
                        ));
                        self.quit_times -= 1;
                        return Action::Continue;
                    }
                    return Action::Quit;
                }
                KeyCode::Char('s') => {
                    self.quit_times = QUIT_TIMES;
                    return Action::Save;
                }
                KeyCode::Char('h') => self.delete_char(),
                _ => {}
            }
            self.quit_times = QUIT_TIMES;
            return Action::Continue;
        }

        match key.code {
            KeyCode::Up | KeyCode::Down | KeyCode::Left | KeyCode::Right => {
                self.move_cursor(key.code);
            }
            KeyCode::PageUp | KeyCode::PageDown => self.page_move(key.code),
            KeyCode::Home => self.cx = 0,
            KeyCode::End => {
                self.cx = self.buffer.row(self.cy).map_or(0, crate::row::Row::len);
            }
            KeyCode::Backspace => self.delete_char(),
            KeyCode::Delete => {
                self.move_cursor(KeyCode::Right);
                self.delete_char();
            }
            KeyCode::Enter => self.insert_newline(),
            KeyCode::Tab => self.insert_char(b'\t'),
            KeyCode::Char(c) if !c.is_control() && c.is_ascii() => {
                self.insert_char(c as u8);
            }
            // Escape and anything unprintable: no-op.
            _ => {}
        }

        // Any key other than Ctrl-Q rearms the quit confirmation.
        self.quit_times = QUIT_TIMES;
        Action::Continue
    }

    // ── Cursor movement ──────────────────────────────────────────────

    /// Move the cursor one cell, wrapping left/right across line ends and
    /// clamping the column when the target row is shorter.
    pub fn move_cursor(&mut self, code: KeyCode) {
        match code {
            KeyCode::Left => {
                if self.cx > 0 {
                    self.cx -= 1;
                } else if self.cy > 0 {
                    // Wrap to the end of the previous row.
                    self.cy -= 1;
                    self.cx = self.buffer.row(self.cy).map_or(0, crate::row::Row::len);
                }
            }
            KeyCode::Right => {
                if let Some(row) = self.buffer.row(self.cy) {
                    if self.cx < row.len() {
                        self.cx += 1;
                    } else {
                        // Wrap to the start of the next row (which may be
                        // the virtual line past EOF).
                        self.cy += 1;
                        self.cx = 0;
                    }
                }
                // On the virtual line there is nothing to the right.
            }
            KeyCode::Up => self.cy = self.cy.saturating_sub(1),
            KeyCode::Down => {
                if self.cy < self.buffer.line_count() {
                    self.cy += 1;
                }
            }
            _ => {}
        }

        // Vertical moves may land on a shorter row.
        let row_len = self.buffer.row(self.cy).map_or(0, crate::row::Row::len);
        self.cx = self.cx.min(row_len);
    }

    /// Page up/down: jump to the viewport edge, then move a full screen.
    fn page_move(&mut self, code: KeyCode) {
        let (step, edge) = match code {
            KeyCode::PageUp => (KeyCode::Up, self.row_offset),
            _ => (
                KeyCode::Down,
                (self.row_offset + self.screen_rows)
                    .saturating_sub(1)
                    .min(self.buffer.line_count()),
            ),
        };
        self.cy = edge;
        for _ in 0..self.screen_rows {
            self.move_cursor(step);
        }
    }

    // ── Text mutations ───────────────────────────────────────────────

    /// Insert one byte at the cursor and advance.
    pub fn insert_char(&mut self, byte: u8) {
        self.buffer.insert_char(self.cy, self.cx, byte);
        self.cx += 1;
    }

    /// Split the current row at the cursor (or insert a blank row when
    /// the cursor is at column 0) and move to the start of the new row.
    pub fn insert_newline(&mut self) {
        if self.cx == 0 {
            self.buffer.insert_row(self.cy, Vec::new());
        } else {
            self.buffer.split_row(self.cy, self.cx);
        }
        self.cy += 1;
        self.cx = 0;
    }

    /// Delete the byte before the cursor; at column 0, merge the current
    /// row into the previous one and leave the cursor at the junction.
    pub fn delete_char(&mut self) {
        if self.cy == self.buffer.line_count() {
            return;
        }
        if self.cx == 0 && self.cy == 0 {
            return;
        }

        if self.cx > 0 {
            self.buffer.delete_char(self.cy, self.cx - 1);
            self.cx -= 1;
        } else {
            self.cx = self.buffer.row(self.cy - 1).map_or(0, crate::row::Row::len);
            self.buffer.join_row(self.cy);
            self.cy -= 1;
        }
    }

    // ── Saving ───────────────────────────────────────────────────────

    /// Save the buffer to its path, reporting the result in the status bar.
    ///
    /// On failure the buffer stays dirty; the user may retry.
    pub fn save_buffer(&mut self) {
        match self.buffer.save() {
            Ok(written) => self.set_status(format!("{written} bytes written to disk")),
            Err(e) => self.set_status(format!("Can't save! I/O error: {e}")),
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
