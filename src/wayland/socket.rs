//! Wayland listening socket
//!
//! [`ListeningSocketSource`] is a calloop [`EventSource`] yielding the stream of every client
//! connecting to the compositor socket. Each stream must be handed to
//! [`DisplayHandle::insert_client`](wayland_server::DisplayHandle::insert_client).
//!
//! ```no_run
//! use std::sync::Arc;
//! use xdg_shell_v6::wayland::socket::ListeningSocketSource;
//!
//! struct Example {
//!     display: wayland_server::Display<()>,
//! }
//!
//! # use wayland_server::backend::{ClientData, ClientId, DisconnectReason};
//! # struct ClientState;
//! # impl ClientData for ClientState {
//! #     fn initialized(&self, _: ClientId) {}
//! #     fn disconnected(&self, _: ClientId, _: DisconnectReason) {}
//! # }
//! let event_loop = calloop::EventLoop::<Example>::try_new().unwrap();
//! let source = ListeningSocketSource::new_auto().unwrap();
//!
//! event_loop
//!     .handle()
//!     .insert_source(source, |client_stream, _, state| {
//!         let _ = state
//!             .display
//!             .handle()
//!             .insert_client(client_stream, Arc::new(ClientState));
//!     })
//!     .unwrap();
//! ```

use std::{ffi::OsStr, io, os::unix::net::UnixStream};

use calloop::{
    generic::Generic, EventSource, Interest, Mode, Poll, PostAction, Readiness, Token, TokenFactory,
};
use tracing::{debug, info};
use wayland_server::{BindError, ListeningSocket};

/// A Wayland listening socket event source
#[derive(Debug)]
pub struct ListeningSocketSource {
    socket: Generic<ListeningSocket>,
}

impl ListeningSocketSource {
    /// Bind the first free `wayland-N` socket, N going from 1 to 32
    ///
    /// `wayland-0` is skipped, as clients without `WAYLAND_DISPLAY` fall back to it and
    /// would end up on a nested test compositor.
    pub fn new_auto() -> Result<ListeningSocketSource, BindError> {
        Self::from_socket(ListeningSocket::bind_auto("wayland", 1..33)?)
    }

    /// Bind a socket with the given name in `XDG_RUNTIME_DIR`
    pub fn with_name(name: &str) -> Result<ListeningSocketSource, BindError> {
        Self::from_socket(ListeningSocket::bind(name)?)
    }

    fn from_socket(socket: ListeningSocket) -> Result<ListeningSocketSource, BindError> {
        info!(name = ?socket.socket_name(), "Listening for shell clients");
        Ok(ListeningSocketSource {
            socket: Generic::new(socket, Interest::READ, Mode::Level),
        })
    }

    /// Name of the socket, to be exported as `WAYLAND_DISPLAY`
    pub fn socket_name(&self) -> Option<&OsStr> {
        self.socket.get_ref().socket_name()
    }
}

impl EventSource for ListeningSocketSource {
    type Event = UnixStream;
    type Metadata = ();
    type Ret = ();
    type Error = io::Error;

    fn process_events<F>(
        &mut self,
        readiness: Readiness,
        token: Token,
        mut callback: F,
    ) -> io::Result<PostAction>
    where
        F: FnMut(Self::Event, &mut Self::Metadata) -> Self::Ret,
    {
        self.socket.process_events(readiness, token, |_, socket| {
            while let Some(client) = socket.accept()? {
                debug!(socket = ?socket.socket_name(), "Client connected");
                callback(client, &mut ());
            }
            Ok(PostAction::Continue)
        })
    }

    fn register(&mut self, poll: &mut Poll, token_factory: &mut TokenFactory) -> calloop::Result<()> {
        self.socket.register(poll, token_factory)
    }

    fn reregister(&mut self, poll: &mut Poll, token_factory: &mut TokenFactory) -> calloop::Result<()> {
        self.socket.reregister(poll, token_factory)
    }

    fn unregister(&mut self, poll: &mut Poll) -> calloop::Result<()> {
        self.socket.unregister(poll)
    }
}
