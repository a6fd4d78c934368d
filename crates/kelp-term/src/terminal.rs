// SPDX-License-Identifier: MIT
//
// Terminal control — raw mode, size queries, and RAII cleanup.
//
// Safety: This module necessarily uses `unsafe` for termios (tcgetattr,
// tcsetattr), ioctl (TIOCGWINSZ), isatty, and raw fd reads/writes. These
// are the standard POSIX interfaces for terminal control — there is no
// safe alternative. Each unsafe block is minimal.
#![allow(unsafe_code)]
//
// This module owns the terminal's raw state. It enters raw mode via
// termios and guarantees the original attributes come back on every exit
// path: normal drop, fatal-error drop, and panic (via a process-global
// hook that writes a restore sequence directly to fd 1).
//
// Raw mode here uses VMIN=0 / VTIME=1: a read returns one byte as soon
// as it arrives, or zero bytes after ~100ms. The input decoder builds
// its escape-sequence timeout on top of exactly that behavior.

use std::io::{self, Write};
use std::sync::{Mutex, Once};

use crate::ansi;

// ─── Size ───────────────────────────────────────────────────────────────────

/// Terminal dimensions in character cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Size {
    /// Number of columns (width in character cells).
    pub cols: u16,
    /// Number of rows (height in character cells).
    pub rows: u16,
}

// ─── Terminal Queries ───────────────────────────────────────────────────────

/// Query the current terminal size.
///
/// Tries `ioctl(TIOCGWINSZ)` first. Some terminals report a zero width
/// there; in that case we fall back to the cursor probe: push the cursor
/// to the bottom-right corner with large CUF/CUD moves, then ask for a
/// cursor position report. Returns `None` if neither method yields a
/// usable size — the caller treats that as fatal at startup.
#[cfg(unix)]
#[must_use]
pub fn window_size() -> Option<Size> {
    let mut ws: libc::winsize = unsafe { std::mem::zeroed() };
    let result = unsafe { libc::ioctl(libc::STDOUT_FILENO, libc::TIOCGWINSZ, &mut ws) };

    if result == 0 && ws.ws_col > 0 && ws.ws_row > 0 {
        Some(Size {
            cols: ws.ws_col,
            rows: ws.ws_row,
        })
    } else {
        cursor_probe_size()
    }
}

#[cfg(not(unix))]
#[must_use]
pub fn window_size() -> Option<Size> {
    None
}

/// Fallback size query via cursor position report (DSR 6).
///
/// `ESC [999C ESC [999B` moves the cursor to the bottom-right corner
/// (CUF/CUD clamp at the screen edge), then `ESC [6n` makes the terminal
/// reply `ESC [ rows ; cols R` on stdin.
#[cfg(unix)]
fn cursor_probe_size() -> Option<Size> {
    let probe = b"\x1b[999C\x1b[999B\x1b[6n";
    let written = unsafe {
        libc::write(
            libc::STDOUT_FILENO,
            probe.as_ptr().cast::<libc::c_void>(),
            probe.len(),
        )
    };
    if written != probe.len() as isize {
        return None;
    }

    // Read the reply up to the terminating 'R'. The terminal answers
    // immediately, but each read may still time out under VTIME.
    let mut reply = [0u8; 32];
    let mut len = 0;
    while len < reply.len() {
        let n = unsafe {
            libc::read(
                libc::STDIN_FILENO,
                (&raw mut reply[len]).cast::<libc::c_void>(),
                1,
            )
        };
        if n != 1 {
            break;
        }
        if reply[len] == b'R' {
            break;
        }
        len += 1;
    }

    parse_cursor_report(&reply[..len])
}

/// Parse `ESC [ rows ; cols` (the 'R' already stripped) into a size.
fn parse_cursor_report(reply: &[u8]) -> Option<Size> {
    let body = reply.strip_prefix(b"\x1b[")?;
    let text = std::str::from_utf8(body).ok()?;
    let (rows, cols) = text.split_once(';')?;
    let rows: u16 = rows.parse().ok()?;
    let cols: u16 = cols.parse().ok()?;
    if rows == 0 || cols == 0 {
        return None;
    }
    Some(Size { cols, rows })
}

/// Check whether stdin is connected to a terminal (TTY).
#[cfg(unix)]
#[must_use]
pub fn is_tty() -> bool {
    unsafe { libc::isatty(libc::STDIN_FILENO) != 0 }
}

#[cfg(not(unix))]
#[must_use]
pub fn is_tty() -> bool {
    false
}

// ─── Panic-Safe Terminal Restore ────────────────────────────────────────────

/// Global backup of original termios for panic recovery.
///
/// The [`Terminal`] struct owns its own copy, but the panic hook can't
/// access it. This global backup — behind a [`Mutex`], not `static mut` —
/// lets the hook restore raw mode without the struct.
#[cfg(unix)]
static TERMIOS_BACKUP: Mutex<Option<libc::termios>> = Mutex::new(None);

/// Restore termios from the global backup. Best-effort, ignores errors.
#[cfg(unix)]
fn restore_termios_from_backup() {
    if let Ok(guard) = TERMIOS_BACKUP.lock() {
        if let Some(ref original) = *guard {
            unsafe {
                let _ = libc::tcsetattr(libc::STDIN_FILENO, libc::TCSAFLUSH, original);
            }
        }
    }
}

/// Terminal restore sequence for emergency use: clear the screen, home
/// the cursor, make it visible. Ordered so the panic message that follows
/// prints at the top of a clean screen.
const EMERGENCY_RESTORE: &[u8] = b"\x1b[2J\x1b[H\x1b[?25h";

/// Panic hook guard — ensures the hook is installed at most once per process.
static PANIC_HOOK_INSTALLED: Once = Once::new();

/// Install a panic hook that restores the terminal before printing the error.
///
/// Without this, a panic in raw mode leaves the user's terminal broken:
/// no echo, no line editing, no way to read the error message. The hook
/// writes [`EMERGENCY_RESTORE`] directly to fd 1 (bypassing Rust's stdout
/// lock to avoid deadlock if the panic happened mid-frame), restores
/// termios, then delegates to the original panic handler.
fn install_panic_hook() {
    PANIC_HOOK_INSTALLED.call_once(|| {
        let original = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            emergency_restore();

            #[cfg(unix)]
            restore_termios_from_backup();

            original(info);
        }));
    });
}

/// Write the restore sequence directly to stdout's file descriptor.
fn emergency_restore() {
    #[cfg(unix)]
    unsafe {
        let _ = libc::write(
            libc::STDOUT_FILENO,
            EMERGENCY_RESTORE.as_ptr().cast::<libc::c_void>(),
            EMERGENCY_RESTORE.len(),
        );
    }

    #[cfg(not(unix))]
    {
        let _ = io::stdout().write_all(EMERGENCY_RESTORE);
        let _ = io::stdout().flush();
    }
}

// ─── Terminal ───────────────────────────────────────────────────────────────

/// Raw-mode terminal session with RAII cleanup.
///
/// Call [`enter`](Self::enter) to switch into raw mode. The original
/// termios attributes are restored and the screen cleared when the handle
/// is dropped — even on panic.
///
/// # Example
///
/// ```no_run
/// use kelp_term::terminal::Terminal;
///
/// let mut term = Terminal::new();
/// term.enter()?;
/// // ... render frames, read keys ...
/// // Terminal is restored automatically on drop.
/// # Ok::<(), std::io::Error>(())
/// ```
pub struct Terminal {
    /// Original termios saved before entering raw mode.
    #[cfg(unix)]
    original_termios: Option<libc::termios>,

    /// Whether raw mode is currently active.
    active: bool,
}

impl Terminal {
    /// Create an inactive terminal handle.
    ///
    /// Does **not** enter raw mode — call [`enter`](Self::enter) for that.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            #[cfg(unix)]
            original_termios: None,
            active: false,
        }
    }

    /// Whether raw mode is currently active.
    #[inline]
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.active
    }

    /// Enter raw mode.
    ///
    /// Disables echo, canonical line buffering, signal generation for the
    /// interrupt/suspend keys, software flow control, CR→NL translation,
    /// and output post-processing, and sets VMIN=0 / VTIME=1 so reads
    /// time out after ~100ms. Installs the panic hook on first use.
    ///
    /// Idempotent: calling `enter()` while already active is a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error if the termios get/set calls fail.
    pub fn enter(&mut self) -> io::Result<()> {
        if self.active {
            return Ok(());
        }

        install_panic_hook();
        self.enable_raw_mode()?;
        self.active = true;
        Ok(())
    }

    /// Leave raw mode and restore the terminal.
    ///
    /// Clears the screen, homes and shows the cursor, then restores the
    /// original termios attributes. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns an error if terminal output or the termios restore fails.
    pub fn leave(&mut self) -> io::Result<()> {
        if !self.active {
            return Ok(());
        }

        let stdout = io::stdout();
        let mut lock = stdout.lock();
        ansi::clear_screen(&mut lock)?;
        ansi::cursor_home(&mut lock)?;
        ansi::cursor_show(&mut lock)?;
        lock.flush()?;
        drop(lock);

        self.disable_raw_mode()?;
        self.active = false;
        Ok(())
    }

    // ── Raw Mode (termios) ──────────────────────────────────────────

    #[cfg(unix)]
    fn enable_raw_mode(&mut self) -> io::Result<()> {
        if !is_tty() {
            return Ok(());
        }

        unsafe {
            let mut termios: libc::termios = std::mem::zeroed();
            if libc::tcgetattr(libc::STDIN_FILENO, &raw mut termios) != 0 {
                return Err(io::Error::last_os_error());
            }

            // Save original for restore.
            self.original_termios = Some(termios);

            // Also save to the global backup for the panic hook.
            if let Ok(mut guard) = TERMIOS_BACKUP.lock() {
                *guard = Some(termios);
            }

            termios.c_iflag &=
                !(libc::BRKINT | libc::ICRNL | libc::INPCK | libc::ISTRIP | libc::IXON);
            termios.c_oflag &= !libc::OPOST;
            termios.c_lflag &= !(libc::ECHO | libc::ICANON | libc::ISIG | libc::IEXTEN);
            termios.c_cflag |= libc::CS8;

            // VMIN=0, VTIME=1: read() returns as soon as one byte is
            // available, or after ~100ms with nothing.
            termios.c_cc[libc::VMIN] = 0;
            termios.c_cc[libc::VTIME] = 1;

            if libc::tcsetattr(libc::STDIN_FILENO, libc::TCSAFLUSH, &raw const termios) != 0 {
                return Err(io::Error::last_os_error());
            }
        }

        Ok(())
    }

    #[cfg(not(unix))]
    fn enable_raw_mode(&mut self) -> io::Result<()> {
        Ok(())
    }

    #[cfg(unix)]
    fn disable_raw_mode(&mut self) -> io::Result<()> {
        if let Some(ref original) = self.original_termios {
            unsafe {
                if libc::tcsetattr(libc::STDIN_FILENO, libc::TCSAFLUSH, original) != 0 {
                    return Err(io::Error::last_os_error());
                }
            }

            // Clear the global backup — we've restored successfully.
            if let Ok(mut guard) = TERMIOS_BACKUP.lock() {
                *guard = None;
            }

            self.original_termios = None;
        }

        Ok(())
    }

    #[cfg(not(unix))]
    fn disable_raw_mode(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Default for Terminal {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Terminal {
    fn drop(&mut self) {
        if self.active {
            let _ = self.leave();
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
