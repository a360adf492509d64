//! Protocol-related utilities
//!
//! This module contains the handlers managing the wayland protocol objects and the
//! clients:
//!
//! - [`compositor`] advertises `wl_compositor` and tracks the drawable surfaces
//! - [`shell::xdg_v6`] advertises `zxdg_shell_v6`
//! - [`socket`] provides a calloop source accepting new clients

pub mod compositor;
pub mod shell;
pub mod socket;
