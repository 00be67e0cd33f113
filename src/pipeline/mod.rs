//! Pipeline stages shared by every tool.
//!
//! Each submodule implements exactly one step; [`crate::controller`] strings
//! them together and owns the state.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ preview ──▶ remote ──▶ render
//! (validate)  (local)    (timeout,   (view,
//!                         cancel)    download)
//! ```
//!
//! 1. [`input`]: sniff the MIME type and check the tool's constraints
//! 2. [`preview`]: decode images in `spawn_blocking`, excerpt text
//! 3. [`remote`]: run the tool's processing step under a deadline and a
//!    cancellation token; the only stage with network I/O
//! 4. [`render`]: turn a result into a view; save downloads atomically

pub mod input;
pub mod preview;
pub mod remote;
pub mod render;
