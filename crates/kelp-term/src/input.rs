// SPDX-License-Identifier: MIT
//
// Terminal input decoding.
//
// Turns raw stdin bytes into key events. The terminal is configured with
// VMIN=0 / VTIME=1, so a single-byte read either returns one byte or
// times out after ~100ms with nothing — the decoder is built around that
// timeout. A lone ESC byte is ambiguous (standalone Escape key, or the
// start of an escape sequence); when a follow-up read times out at any
// stage, the decoder degrades to a bare Escape rather than blocking.
//
// Sequences handled:
//
// - Legacy CSI: `ESC [ A/B/C/D` (arrows), `ESC [ H/F` (Home/End),
//   `ESC [ <digit> ~` (Home/Delete/End/PageUp/PageDown)
// - SS3: `ESC O A/B/C/D/H/F` (arrow and Home/End variants some
//   terminals emit)
// - Control bytes (0x00-0x1F) as `Char` with the CTRL modifier
// - 0x7F / 0x08 as Backspace, CR/LF as Enter, 0x09 as Tab
//
// Anything unrecognized after an ESC collapses to the bare Escape key.

use std::io;

use bitflags::bitflags;

// ─── Key Events ─────────────────────────────────────────────────────────────

/// A decoded keypress: key identity plus modifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    /// Which key was pressed.
    pub code: KeyCode,
    /// Active modifier keys (only CTRL is ever produced by this decoder).
    pub modifiers: Modifiers,
}

impl KeyEvent {
    /// A plain key press with no modifiers.
    #[must_use]
    pub const fn plain(code: KeyCode) -> Self {
        Self {
            code,
            modifiers: Modifiers::empty(),
        }
    }

    /// A Ctrl+key press.
    #[must_use]
    pub const fn ctrl(code: KeyCode) -> Self {
        Self {
            code,
            modifiers: Modifiers::CTRL,
        }
    }
}

/// Identity of a key.
///
/// Named keys have dedicated variants; printable bytes use
/// [`Char`](KeyCode::Char).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyCode {
    /// A printable character.
    Char(char),
    // ── Named keys ──────────────────────────────────────────────
    Enter,
    Tab,
    Backspace,
    Escape,
    Delete,
    // ── Navigation ──────────────────────────────────────────────
    Up,
    Down,
    Left,
    Right,
    Home,
    End,
    PageUp,
    PageDown,
}

bitflags! {
    /// Keyboard modifier flags.
    ///
    /// Raw mode strips bits 5 and 6 from Ctrl+letter combinations, so a
    /// control byte 0x01..=0x1A decodes as `Char(letter)` + `CTRL`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
    pub struct Modifiers: u8 {
        const CTRL = 0b0000_0001;
    }
}

// ─── Byte Source ────────────────────────────────────────────────────────────

/// A blocking-with-timeout source of single bytes.
///
/// `Ok(Some(b))` is one byte of input; `Ok(None)` means the read timed
/// out with no data. The tty implementation gets its timeout from the
/// raw-mode `VTIME` setting; test sources return `None` at end of input.
pub trait ByteSource {
    /// Read one byte, or `None` on timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying read fails.
    fn read_byte(&mut self) -> io::Result<Option<u8>>;
}

/// Byte source backed by an in-memory slice. Used in tests and anywhere
/// a scripted key stream is useful; "timeout" is simply end of input.
pub struct SliceSource<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> SliceSource<'a> {
    /// Wrap a byte slice as a source.
    #[must_use]
    pub const fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }
}

impl ByteSource for SliceSource<'_> {
    fn read_byte(&mut self) -> io::Result<Option<u8>> {
        match self.bytes.get(self.pos) {
            Some(&b) => {
                self.pos += 1;
                Ok(Some(b))
            }
            None => Ok(None),
        }
    }
}

/// Byte source reading from the real terminal (fd 0).
///
/// Relies on the raw-mode VMIN=0 / VTIME=1 configuration: each `read`
/// returns one byte, or zero bytes after the ~100ms timeout.
#[derive(Default)]
pub struct TtySource;

impl TtySource {
    /// Create a stdin-backed source.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

#[cfg(unix)]
impl ByteSource for TtySource {
    #[allow(unsafe_code)] // Raw fd read is the only way to honor VTIME.
    fn read_byte(&mut self) -> io::Result<Option<u8>> {
        let mut byte = 0u8;
        loop {
            let n = unsafe {
                libc::read(libc::STDIN_FILENO, (&raw mut byte).cast::<libc::c_void>(), 1)
            };
            match n {
                1 => return Ok(Some(byte)),
                0 => return Ok(None),
                _ => {
                    let err = io::Error::last_os_error();
                    // EINTR / EAGAIN are not fatal for a terminal read.
                    if !matches!(
                        err.kind(),
                        io::ErrorKind::Interrupted | io::ErrorKind::WouldBlock
                    ) {
                        return Err(err);
                    }
                }
            }
        }
    }
}

#[cfg(not(unix))]
impl ByteSource for TtySource {
    fn read_byte(&mut self) -> io::Result<Option<u8>> {
        use std::io::Read;
        let mut byte = [0u8; 1];
        match io::stdin().lock().read(&mut byte)? {
            1 => Ok(Some(byte[0])),
            _ => Ok(None),
        }
    }
}

// ─── Decoder ────────────────────────────────────────────────────────────────

/// Block until the next keypress and decode it.
///
/// Loops over timed-out reads until a byte arrives, then decodes either a
/// single byte or a multi-byte escape sequence. Truncated sequences
/// (timeout mid-sequence) degrade to a bare Escape key.
///
/// # Errors
///
/// Returns an error if the underlying byte source fails.
pub fn read_key(src: &mut impl ByteSource) -> io::Result<KeyEvent> {
    let byte = loop {
        if let Some(b) = src.read_byte()? {
            break b;
        }
    };

    if byte == 0x1B {
        return decode_escape(src);
    }
    Ok(decode_byte(byte))
}

/// Decode a single non-ESC byte into a key event.
fn decode_byte(byte: u8) -> KeyEvent {
    match byte {
        0x0A | 0x0D => KeyEvent::plain(KeyCode::Enter),
        0x09 => KeyEvent::plain(KeyCode::Tab),
        0x08 | 0x7F => KeyEvent::plain(KeyCode::Backspace),
        0x00 => KeyEvent::ctrl(KeyCode::Char('@')),
        b @ 0x01..=0x1A => KeyEvent::ctrl(KeyCode::Char((b + b'a' - 1) as char)),
        b @ 0x1C..=0x1F => KeyEvent::ctrl(KeyCode::Char((b + 0x40) as char)),
        b => KeyEvent::plain(KeyCode::Char(b as char)),
    }
}

/// Decode the bytes following an ESC.
///
/// Every read here may time out; each missing byte means "sequence
/// abandoned" and the caller gets a bare Escape.
fn decode_escape(src: &mut impl ByteSource) -> io::Result<KeyEvent> {
    let Some(first) = src.read_byte()? else {
        return Ok(KeyEvent::plain(KeyCode::Escape));
    };

    match first {
        b'[' => {
            let Some(second) = src.read_byte()? else {
                return Ok(KeyEvent::plain(KeyCode::Escape));
            };
            Ok(decode_csi(src, second)?.unwrap_or(KeyEvent::plain(KeyCode::Escape)))
        }
        b'O' => {
            let Some(second) = src.read_byte()? else {
                return Ok(KeyEvent::plain(KeyCode::Escape));
            };
            Ok(decode_ss3(second).unwrap_or(KeyEvent::plain(KeyCode::Escape)))
        }
        _ => Ok(KeyEvent::plain(KeyCode::Escape)),
    }
}

/// Decode `ESC [` sequences given the byte after the bracket.
fn decode_csi(src: &mut impl ByteSource, byte: u8) -> io::Result<Option<KeyEvent>> {
    if byte.is_ascii_digit() {
        // ESC [ <digit> ~ — editing and paging keys.
        let Some(tilde) = src.read_byte()? else {
            return Ok(None);
        };
        if tilde != b'~' {
            return Ok(None);
        }
        let code = match byte {
            b'1' | b'7' => KeyCode::Home,
            b'3' => KeyCode::Delete,
            b'4' | b'8' => KeyCode::End,
            b'5' => KeyCode::PageUp,
            b'6' => KeyCode::PageDown,
            _ => return Ok(None),
        };
        return Ok(Some(KeyEvent::plain(code)));
    }

    let code = match byte {
        b'A' => KeyCode::Up,
        b'B' => KeyCode::Down,
        b'C' => KeyCode::Right,
        b'D' => KeyCode::Left,
        b'H' => KeyCode::Home,
        b'F' => KeyCode::End,
        _ => return Ok(None),
    };
    Ok(Some(KeyEvent::plain(code)))
}

/// Decode `ESC O` (SS3) sequences given the final byte.
fn decode_ss3(byte: u8) -> Option<KeyEvent> {
    let code = match byte {
        b'A' => KeyCode::Up,
        b'B' => KeyCode::Down,
        b'C' => KeyCode::Right,
        b'D' => KeyCode::Left,
        b'H' => KeyCode::Home,
        b'F' => KeyCode::End,
        _ => return None,
    };
    Some(KeyEvent::plain(code))
}

// ─── Tests ───────────────────────────────────────────────────────────────────
