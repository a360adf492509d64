use std::{
    collections::HashMap,
    ffi::{OsStr, OsString},
    sync::Arc,
};

use tracing::{debug, warn};
use xdg_shell_v6::{
    reexports::{
        calloop::{generic::Generic, EventLoop, Interest, Mode, PostAction},
        wayland_server::{
            backend::{ClientData, ClientId, DisconnectReason},
            Display, DisplayHandle,
        },
    },
    utils::signaling::SignalToken,
    wayland::{
        compositor::CompositorState,
        shell::xdg_v6::{ShellSurfaceId, XdgV6ShellConfig, XdgV6ShellState},
        socket::ListeningSocketSource,
    },
};

use crate::Cli;

pub struct Shellvil {
    pub socket_name: OsString,
    pub display_handle: DisplayHandle,
    pub activate_toplevels: bool,

    pub compositor_state: CompositorState<Shellvil>,
    pub xdg_v6_shell_state: XdgV6ShellState,

    // signal subscriptions of every live toplevel
    pub subscriptions: HashMap<ShellSurfaceId, Vec<SignalToken>>,
}

impl Shellvil {
    pub fn new(
        event_loop: &mut EventLoop<Shellvil>,
        display: Display<Shellvil>,
        args: &Cli,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let display_handle = display.handle();

        let compositor_state = CompositorState::new(&display_handle);
        let xdg_v6_shell_state = XdgV6ShellState::new_with_config::<Self>(
            &display_handle,
            XdgV6ShellConfig {
                max_surfaces_per_client: args.max_surfaces,
                ..Default::default()
            },
        );

        let socket_name = Self::init_wayland_listener(display, event_loop, args.socket.as_deref())?;

        Ok(Self {
            socket_name,
            display_handle,
            activate_toplevels: !args.no_activate,
            compositor_state,
            xdg_v6_shell_state,
            subscriptions: HashMap::new(),
        })
    }

    fn init_wayland_listener(
        display: Display<Shellvil>,
        event_loop: &mut EventLoop<Shellvil>,
        socket: Option<&str>,
    ) -> Result<OsString, Box<dyn std::error::Error>> {
        // Creates a new listening socket, either with the requested name or the next available `wayland` one.
        let listening_socket = match socket {
            Some(name) => ListeningSocketSource::with_name(name)?,
            None => ListeningSocketSource::new_auto()?,
        };

        // Clients will connect to this socket.
        let socket_name = listening_socket
            .socket_name()
            .map(OsStr::to_os_string)
            .unwrap_or_default();

        let handle = event_loop.handle();

        handle
            .insert_source(listening_socket, move |client_stream, _, state| {
                if let Err(err) = state
                    .display_handle
                    .insert_client(client_stream, Arc::new(ClientState))
                {
                    warn!(?err, "Failed to insert client");
                }
            })
            .map_err(|err| err.error)?;

        // The display itself is a source, so that client requests get dispatched.
        handle
            .insert_source(
                Generic::new(display, Interest::READ, Mode::Level),
                |_, display, state| {
                    // Safety: we don't drop the display
                    unsafe {
                        display.get_mut().dispatch_clients(state)?;
                    }
                    Ok(PostAction::Continue)
                },
            )
            .map_err(|err| err.error)?;

        Ok(socket_name)
    }
}

pub struct ClientState;

impl ClientData for ClientState {
    fn initialized(&self, client_id: ClientId) {
        debug!(client = ?client_id, "Client connected");
    }

    fn disconnected(&self, client_id: ClientId, reason: DisconnectReason) {
        debug!(client = ?client_id, ?reason, "Client disconnected");
    }
}
