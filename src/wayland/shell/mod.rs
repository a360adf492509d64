//! Handler utilities for the shell protocols
//!
//! A shell gives meaning to a drawable surface: it turns it into a window that can be
//! stacked, maximized, or shown fullscreen by the compositor.
//!
//! - The [`xdg_v6`] module provides handlers for the unstable v6 revision of `xdg_shell`

pub mod xdg_v6;
