//! Area client core
//!
//! Client lifecycle, stacking, focus and per-client state for an X11
//! window manager, plus the X11 plumbing that drives it.

pub mod config;
pub mod error;
pub mod shared;
pub mod wm;
