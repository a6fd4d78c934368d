// SPDX-License-Identifier: MIT
//
// kelp-term — Terminal layer for kelp.
//
// Direct terminal control for a small raw-mode editor: termios-based
// raw mode with RAII restore, window-size queries (ioctl with a
// cursor-probe fallback), ANSI escape generation, a frame buffer that
// coalesces each screen refresh into one write, and a byte-at-a-time
// key decoder for legacy escape sequences.
//
// This crate intentionally avoids external TUI frameworks (ratatui,
// crossterm) in favor of direct control via ANSI escape sequences and
// raw termios. Every byte sent to the terminal is accounted for.

pub mod ansi;
pub mod input;
pub mod output;
pub mod terminal;
