//! # kelp-editor — Editor core for kelp
//!
//! This crate contains the fundamental building blocks of the editor:
//!
//! - **[`row`]** — one line of text: raw bytes plus the tab-expanded render form
//! - **[`buffer`]** — the ordered row store with dirty tracking and file I/O
//! - **[`editor`]** — cursor/viewport state and the key dispatch table
//! - **[`screen`]** — frame rendering into a single coalesced output buffer
//!
//! The terminal itself (raw mode, key decoding, the output buffer type)
//! lives in `kelp-term`; this crate only produces bytes and consumes key
//! events.

pub mod buffer;
pub mod editor;
pub mod row;
pub mod screen;
