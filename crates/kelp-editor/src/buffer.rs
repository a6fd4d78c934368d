//! The row store — an ordered sequence of [`Row`]s with file I/O.
//!
//! Indices are contiguous from 0; inserting or deleting a row shifts the
//! rest. Every mutation bumps a `dirty` counter, which resets to zero
//! exactly on successful load and successful save.
//!
//! # Saving
//!
//! [`save`](Buffer::save) serializes the rows (one `\n` after each row,
//! including the last) and writes through a sibling temporary file that
//! is renamed over the target. A failed write therefore never leaves the
//! target truncated — the previous file content survives and the buffer
//! stays dirty so the user can retry.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::row::Row;

/// The ordered sequence of rows being edited.
#[derive(Debug, Default)]
pub struct Buffer {
    rows: Vec<Row>,
    dirty: u64,
    path: Option<PathBuf>,
}

impl Buffer {
    // ── Construction ────────────────────────────────────────────────

    /// Create an empty, unnamed buffer (zero rows, not dirty).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a buffer from a file.
    ///
    /// Splits the content into one row per physical line, stripping the
    /// trailing `\n` (and a `\r` before it) from each. No other
    /// normalization. The buffer starts clean.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read. Load failures are
    /// fatal at startup — the editor never starts with a half-loaded
    /// buffer.
    pub fn load(path: &Path) -> io::Result<Self> {
        let data = fs::read(path)?;
        let mut rows: Vec<Row> = data
            .split(|&b| b == b'\n')
            .map(|line| {
                let line = line.strip_suffix(b"\r").unwrap_or(line);
                Row::new(line.to_vec())
            })
            .collect();
        // A trailing newline produces one empty split piece, not a row.
        if data.last() == Some(&b'\n') {
            rows.pop();
        }
        if data.is_empty() {
            rows.clear();
        }
        Ok(Self {
            rows,
            dirty: 0,
            path: Some(path.to_path_buf()),
        })
    }

    // ── Access ──────────────────────────────────────────────────────

    /// Number of rows.
    #[inline]
    #[must_use]
    pub fn line_count(&self) -> usize {
        self.rows.len()
    }

    /// Get a row by index.
    #[inline]
    #[must_use]
    pub fn row(&self, at: usize) -> Option<&Row> {
        self.rows.get(at)
    }

    /// The backing file path, if any. `None` means an unsaved new buffer.
    #[inline]
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Set the backing file path (save-as).
    pub fn set_path(&mut self, path: impl Into<PathBuf>) {
        self.path = Some(path.into());
    }

    /// Number of mutations since the last load or save.
    #[inline]
    #[must_use]
    pub const fn dirty(&self) -> u64 {
        self.dirty
    }

    /// Whether there are unsaved mutations.
    #[inline]
    #[must_use]
    pub const fn is_dirty(&self) -> bool {
        self.dirty > 0
    }

    // ── Row mutations ───────────────────────────────────────────────

    /// Insert a new row at `at`, shifting later rows up. Silent no-op if
    /// `at` is outside `[0, line_count]`.
    pub fn insert_row(&mut self, at: usize, bytes: Vec<u8>) {
        if at > self.rows.len() {
            return;
        }
        self.rows.insert(at, Row::new(bytes));
        self.dirty += 1;
    }

    /// Remove the row at `at`, shifting later rows down. Silent no-op if
    /// `at` is outside `[0, line_count)`.
    pub fn delete_row(&mut self, at: usize) {
        if at >= self.rows.len() {
            return;
        }
        self.rows.remove(at);
        self.dirty += 1;
    }

    /// Insert one byte into row `line` at column `col` (clamped to the
    /// row length). Typing on the virtual line past EOF first appends a
    /// fresh empty row.
    pub fn insert_char(&mut self, line: usize, col: usize, byte: u8) {
        if line == self.rows.len() {
            self.rows.push(Row::new(Vec::new()));
        }
        let Some(row) = self.rows.get_mut(line) else {
            return;
        };
        row.insert_byte(col, byte);
        self.dirty += 1;
    }

    /// Remove the byte at column `col` of row `line`. No-op when either
    /// index is out of range.
    pub fn delete_char(&mut self, line: usize, col: usize) {
        if let Some(row) = self.rows.get_mut(line) {
            if row.delete_byte(col) {
                self.dirty += 1;
            }
        }
    }

    /// Append bytes to the end of row `line`. No-op if the row doesn't exist.
    pub fn append_to_row(&mut self, line: usize, bytes: &[u8]) {
        if let Some(row) = self.rows.get_mut(line) {
            row.append_bytes(bytes);
            self.dirty += 1;
        }
    }

    /// Split row `line` at column `col`: the head stays, the tail becomes
    /// a new row at `line + 1`. No-op if the row doesn't exist.
    pub fn split_row(&mut self, line: usize, col: usize) {
        let Some(row) = self.rows.get_mut(line) else {
            return;
        };
        let tail = row.split_off(col);
        self.rows.insert(line + 1, Row::new(tail));
        self.dirty += 1;
    }

    /// Merge row `line` into the row above it (backspace at column 0).
    /// No-op for row 0 or a nonexistent row.
    pub fn join_row(&mut self, line: usize) {
        if line == 0 || line >= self.rows.len() {
            return;
        }
        let moved = self.rows.remove(line);
        // rows[line - 1] exists: line >= 1 and the vec was long enough.
        if let Some(prev) = self.rows.get_mut(line - 1) {
            prev.append_bytes(moved.raw());
        }
        self.dirty += 1;
    }

    // ── Persistence ─────────────────────────────────────────────────

    /// The exact bytes to persist: every row's raw content followed by a
    /// single `\n`, including one after the last row. Round-trips with
    /// [`load`](Self::load).
    #[must_use]
    pub fn serialize(&self) -> Vec<u8> {
        let total: usize = self.rows.iter().map(|r| r.len() + 1).sum();
        let mut out = Vec::with_capacity(total);
        for row in &self.rows {
            out.extend_from_slice(row.raw());
            out.push(b'\n');
        }
        out
    }

    /// Save to the stored path.
    ///
    /// On success the dirty counter resets and the number of bytes
    /// written is returned. On failure the buffer stays dirty and the
    /// target file is untouched.
    ///
    /// # Errors
    ///
    /// Returns an error if no path is set or the write fails.
    pub fn save(&mut self) -> io::Result<usize> {
        let path = self
            .path
            .clone()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "buffer has no file name"))?;
        self.save_to(&path)
    }

    /// Save to a specific path, updating the stored path on success.
    ///
    /// # Errors
    ///
    /// Returns an error if the write or rename fails.
    pub fn save_as(&mut self, path: impl Into<PathBuf>) -> io::Result<usize> {
        let path = path.into();
        let written = self.save_to(&path)?;
        self.path = Some(path);
        Ok(written)
    }

    /// Write through a sibling temp file renamed over the target, so a
    /// mid-write failure never truncates the existing file.
    fn save_to(&mut self, path: &Path) -> io::Result<usize> {
        let data = self.serialize();

        let mut tmp = path.as_os_str().to_owned();
        tmp.push(".tmp~");
        let tmp = PathBuf::from(tmp);

        if let Err(e) = fs::write(&tmp, &data) {
            let _ = fs::remove_file(&tmp);
            return Err(e);
        }
        if let Err(e) = fs::rename(&tmp, path) {
            let _ = fs::remove_file(&tmp);
            return Err(e);
        }

        self.dirty = 0;
        Ok(data.len())
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn buffer_with(lines: &[&str]) -> Buffer {
        let mut buf = Buffer::new();
        for (i, line) in lines.iter().enumerate() {
            buf.insert_row(i, line.as_bytes().to_vec());
        }
        buf
    }

    // ── Row insertion / deletion ─────────────────────────────────────

    #[test]
    fn insert_row_appends_and_shifts() {
        let mut buf = buffer_with(&["a", "c"]);
        buf.insert_row(1, b"b".to_vec());
        assert_eq!(buf.line_count(), 3);
        assert_eq!(buf.row(1).unwrap().raw(), b"b");
        assert_eq!(buf.row(2).unwrap().raw(), b"c");
    }

    #[test]
    fn insert_row_out_of_range_is_noop() {
        let mut buf = buffer_with(&["a"]);
        let before = buf.dirty();
        buf.insert_row(5, b"x".to_vec());
        assert_eq!(buf.line_count(), 1);
        assert_eq!(buf.dirty(), before);
    }

    #[test]
    fn delete_row_shifts_down() {
        let mut buf = buffer_with(&["a", "b", "c"]);
        buf.delete_row(1);
        assert_eq!(buf.line_count(), 2);
        assert_eq!(buf.row(1).unwrap().raw(), b"c");
    }

    #[test]
    fn delete_row_out_of_range_is_noop() {
        let mut buf = buffer_with(&["a"]);
        let before = buf.dirty();
        buf.delete_row(1);
        assert_eq!(buf.line_count(), 1);
        assert_eq!(buf.dirty(), before);
    }

    // ── Character mutations ──────────────────────────────────────────

    #[test]
    fn insert_char_on_virtual_line_creates_row() {
        let mut buf = Buffer::new();
        buf.insert_char(0, 0, b'h');
        assert_eq!(buf.line_count(), 1);
        assert_eq!(buf.row(0).unwrap().raw(), b"h");
        assert!(buf.is_dirty());
    }

    #[test]
    fn insert_char_clamps_column() {
        let mut buf = buffer_with(&["ab"]);
        buf.insert_char(0, 99, b'c');
        assert_eq!(buf.row(0).unwrap().raw(), b"abc");
    }

    #[test]
    fn delete_char_out_of_range_is_noop() {
        let mut buf = buffer_with(&["ab"]);
        let before = buf.dirty();
        buf.delete_char(0, 2);
        buf.delete_char(9, 0);
        assert_eq!(buf.dirty(), before);
        assert_eq!(buf.row(0).unwrap().raw(), b"ab");
    }

    #[test]
    fn split_then_join_restores_row() {
        let mut buf = buffer_with(&["hello"]);
        buf.split_row(0, 2);
        assert_eq!(buf.line_count(), 2);
        assert_eq!(buf.row(0).unwrap().raw(), b"he");
        assert_eq!(buf.row(1).unwrap().raw(), b"llo");

        buf.join_row(1);
        assert_eq!(buf.line_count(), 1);
        assert_eq!(buf.row(0).unwrap().raw(), b"hello");
    }

    #[test]
    fn join_row_zero_is_noop() {
        let mut buf = buffer_with(&["a", "b"]);
        let before = buf.dirty();
        buf.join_row(0);
        assert_eq!(buf.line_count(), 2);
        assert_eq!(buf.dirty(), before);
    }

    // ── Dirty lifecycle ──────────────────────────────────────────────

    #[test]
    fn new_buffer_is_clean() {
        assert_eq!(Buffer::new().dirty(), 0);
    }

    #[test]
    fn every_mutation_increments_dirty() {
        let mut buf = buffer_with(&["ab", "cd"]);
        let base = buf.dirty();
        buf.insert_char(0, 1, b'x');
        assert_eq!(buf.dirty(), base + 1);
        buf.delete_char(0, 0);
        assert_eq!(buf.dirty(), base + 2);
        buf.append_to_row(0, b"!");
        assert_eq!(buf.dirty(), base + 3);
    }

    // ── Serialization and persistence ────────────────────────────────

    #[test]
    fn serialize_ends_every_row_with_newline() {
        let buf = buffer_with(&["ab", "cd"]);
        assert_eq!(buf.serialize(), b"ab\ncd\n");
    }

    #[test]
    fn serialize_empty_buffer_is_empty() {
        assert_eq!(Buffer::new().serialize(), b"");
    }

    #[test]
    fn load_serialize_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("roundtrip.txt");
        fs::write(&path, b"one\ntwo\n\nthree\n").unwrap();

        let buf = Buffer::load(&path).unwrap();
        assert_eq!(buf.line_count(), 4);
        assert_eq!(buf.dirty(), 0);
        assert_eq!(buf.serialize(), b"one\ntwo\n\nthree\n");
    }

    #[test]
    fn load_normalizes_missing_trailing_newline() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("no-trailing.txt");
        fs::write(&path, b"ab\ncd").unwrap();

        let buf = Buffer::load(&path).unwrap();
        assert_eq!(buf.line_count(), 2);
        assert_eq!(buf.serialize(), b"ab\ncd\n");
    }

    #[test]
    fn load_strips_carriage_returns() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("crlf.txt");
        fs::write(&path, b"ab\r\ncd\r\n").unwrap();

        let buf = Buffer::load(&path).unwrap();
        assert_eq!(buf.row(0).unwrap().raw(), b"ab");
        assert_eq!(buf.serialize(), b"ab\ncd\n");
    }

    #[test]
    fn load_empty_file_has_zero_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.txt");
        fs::write(&path, b"").unwrap();

        let buf = Buffer::load(&path).unwrap();
        assert_eq!(buf.line_count(), 0);
    }

    #[test]
    fn save_resets_dirty_and_writes_serialized_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.txt");

        let mut buf = buffer_with(&["hi"]);
        buf.set_path(&path);
        assert!(buf.is_dirty());

        let written = buf.save().unwrap();
        assert_eq!(written, 3);
        assert_eq!(buf.dirty(), 0);
        assert_eq!(fs::read(&path).unwrap(), b"hi\n");
    }

    #[test]
    fn failed_save_leaves_dirty_and_target_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("keep.txt");
        fs::write(&target, b"original\n").unwrap();

        let mut buf = Buffer::load(&target).unwrap();
        buf.insert_char(0, 0, b'x');
        let dirty = buf.dirty();
        assert!(dirty > 0);

        // Point the buffer into a directory that doesn't exist.
        buf.set_path(dir.path().join("missing").join("keep.txt"));
        assert!(buf.save().is_err());
        assert_eq!(buf.dirty(), dirty);
        assert_eq!(fs::read(&target).unwrap(), b"original\n");
    }

    #[test]
    fn save_without_path_fails() {
        let mut buf = buffer_with(&["x"]);
        assert!(buf.save().is_err());
        assert!(buf.is_dirty());
    }

    #[test]
    fn save_as_updates_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("named.txt");

        let mut buf = buffer_with(&["x"]);
        buf.save_as(&path).unwrap();
        assert_eq!(buf.path(), Some(path.as_path()));
        assert_eq!(buf.dirty(), 0);
    }
}
