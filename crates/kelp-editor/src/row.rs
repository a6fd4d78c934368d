//! One line of the edited file.
//!
//! A `Row` holds the authoritative raw bytes (no trailing newline) and a
//! derived render form with tabs expanded to the next tab stop. The render
//! form is rebuilt on every mutation, so the render engine never observes
//! a stale expansion.
//!
//! Columns are byte offsets. This editor is deliberately byte/column
//! oriented — no grapheme awareness, matching the rest of the pipeline.

/// Number of columns a tab advances to (the next multiple of this value).
pub const TAB_STOP: usize = 8;

/// One line of text: raw content plus its display expansion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    raw: Vec<u8>,
    render: Vec<u8>,
}

impl Row {
    /// Create a row from raw bytes and compute its render form.
    #[must_use]
    pub fn new(raw: Vec<u8>) -> Self {
        let mut row = Self {
            raw,
            render: Vec::new(),
        };
        row.rebuild_render();
        row
    }

    /// The authoritative raw bytes.
    #[inline]
    #[must_use]
    pub fn raw(&self) -> &[u8] {
        &self.raw
    }

    /// The display form: raw bytes with tabs expanded to spaces.
    #[inline]
    #[must_use]
    pub fn render(&self) -> &[u8] {
        &self.render
    }

    /// Raw length in bytes — the range of valid cursor columns is `0..=len`.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.raw.len()
    }

    /// True when the row holds no bytes.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    /// Render length in display columns.
    #[inline]
    #[must_use]
    pub fn render_len(&self) -> usize {
        self.render.len()
    }

    /// Insert one byte at column `at`, clamping `at` to the current length.
    pub fn insert_byte(&mut self, at: usize, byte: u8) {
        let at = at.min(self.raw.len());
        self.raw.insert(at, byte);
        self.rebuild_render();
    }

    /// Remove the byte at column `at`. No-op if `at` is out of range.
    pub fn delete_byte(&mut self, at: usize) -> bool {
        if at >= self.raw.len() {
            return false;
        }
        self.raw.remove(at);
        self.rebuild_render();
        true
    }

    /// Append bytes to the end of the row (line-merge on backspace).
    pub fn append_bytes(&mut self, bytes: &[u8]) {
        self.raw.extend_from_slice(bytes);
        self.rebuild_render();
    }

    /// Split the row at column `at`, keeping `[0, at)` and returning the
    /// tail. `at` is clamped to the row length.
    pub fn split_off(&mut self, at: usize) -> Vec<u8> {
        let at = at.min(self.raw.len());
        let tail = self.raw.split_off(at);
        self.rebuild_render();
        tail
    }

    /// Map a raw column to a render column, accounting for tab expansion.
    ///
    /// Pure: used to place the cursor visually and to compute horizontal
    /// scroll. `cx` beyond the row length behaves as if every byte up to
    /// the end were counted.
    #[must_use]
    pub fn cx_to_rx(&self, cx: usize) -> usize {
        let mut rx = 0;
        for &byte in self.raw.iter().take(cx) {
            if byte == b'\t' {
                rx += (TAB_STOP - 1) - (rx % TAB_STOP);
            }
            rx += 1;
        }
        rx
    }

    /// Recompute the render form from the raw bytes.
    fn rebuild_render(&mut self) {
        self.render.clear();
        for &byte in &self.raw {
            if byte == b'\t' {
                self.render.push(b' ');
                while self.render.len() % TAB_STOP != 0 {
                    self.render.push(b' ');
                }
            } else {
                self.render.push(byte);
            }
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
