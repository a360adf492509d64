#![warn(missing_docs, missing_debug_implementations, rust_2018_idioms)]

//! # Server side of the `xdg-shell-unstable-v6` protocol
//!
//! This crate implements the state machine a wayland compositor needs to serve clients
//! still speaking the unstable v6 revision of xdg-shell: shell surfaces wrapping a
//! `wl_surface`, the exclusive toplevel role, the pending/current double buffering of
//! window geometry and toplevel attributes, and the teardown of all of it whichever party
//! goes away first.
//!
//! ## Structure of the crate
//!
//! - [`wayland::compositor`] tracks the underlying drawable surfaces: their role tag and the
//!   hooks run on commit and destruction.
//! - [`wayland::shell::xdg_v6`] is the shell itself, built on top of these hooks.
//! - [`utils`] contains the event signalers, serials and geometry types shared by both.
//!
//! ## State handling
//!
//! Like the rest of the wayland-rs ecosystem, this crate does not own your compositor
//! state. Each module exposes a state struct to store in it, a handler trait giving access
//! to that struct and receiving callbacks, and a `delegate_*!` macro implementing the
//! `wayland_server` dispatch traits for your type. All handlers run sequentially on the
//! thread dispatching clients, usually from a [`calloop`] event loop.
//!
//! ### Logging
//!
//! The crate makes extensive use of [`tracing`] for its internal logging. It never installs
//! a subscriber itself.

pub mod reexports;
pub mod utils;
pub mod wayland;
