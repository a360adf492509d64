// This module contains helpers functions and types that
// are not test in themselves, but are used by several tests.

#![allow(dead_code)]

pub extern crate wayland_client as wayc;
pub extern crate wayland_server as ways;

use std::os::unix::net::UnixStream;
use std::sync::Arc;

use xdg_shell_v6::wayland::{
    compositor::{CompositorHandler, CompositorState},
    shell::xdg_v6::{
        ConnectionId, ShellSurfaceId, ShellSurfaceSnapshot, ToplevelConfigure, XdgV6ShellConfig,
        XdgV6ShellHandler, XdgV6ShellState,
    },
};

use self::wayc::protocol::{
    wl_callback::{self, WlCallback},
    wl_compositor::WlCompositor,
    wl_display::WlDisplay,
    wl_registry::{self, WlRegistry},
    wl_surface::WlSurface,
};
use self::xdg_v6::{
    zxdg_shell_v6::{self, ZxdgShellV6},
    zxdg_surface_v6::{self, ZxdgSurfaceV6},
    zxdg_toplevel_v6::{self, ZxdgToplevelV6},
};

/// Client side of the protocol
pub mod xdg_v6 {
    #![allow(dead_code, non_camel_case_types, unused_unsafe, unused_variables)]
    #![allow(non_upper_case_globals, non_snake_case, unused_imports)]
    #![allow(missing_docs, clippy::all)]

    use wayland_client;
    use wayland_client::protocol::*;

    pub mod __interfaces {
        use wayland_client::protocol::__interfaces::*;
        wayland_scanner::generate_interfaces!("protocols/xdg-shell-unstable-v6.xml");
    }
    use self::__interfaces::*;

    wayland_scanner::generate_client_code!("protocols/xdg-shell-unstable-v6.xml");
}

const MAX_ITERATIONS: usize = 100;

/*
 * Server side
 */

pub struct ServerState {
    pub compositor: CompositorState<ServerState>,
    pub shell: XdgV6ShellState,
    pub clients: Vec<ConnectionId>,
    pub disconnected: Vec<ConnectionId>,
    pub toplevels: Vec<ShellSurfaceId>,
    pub commits: Vec<ShellSurfaceId>,
    pub destroyed: Vec<ShellSurfaceSnapshot>,
    pub acked: Vec<(ShellSurfaceId, ToplevelConfigure)>,
    pub pongs: usize,
}

impl CompositorHandler for ServerState {
    fn compositor_state(&mut self) -> &mut CompositorState<Self> {
        &mut self.compositor
    }
}

impl XdgV6ShellHandler for ServerState {
    fn xdg_v6_shell_state(&mut self) -> &mut XdgV6ShellState {
        &mut self.shell
    }

    fn new_client(&mut self, connection: ConnectionId) {
        self.clients.push(connection);
    }

    fn client_destroyed(&mut self, connection: ConnectionId) {
        self.disconnected.push(connection);
    }

    fn client_pong(&mut self, _connection: ConnectionId) {
        self.pongs += 1;
    }

    fn new_toplevel(&mut self, surface: ShellSurfaceId) {
        self.toplevels.push(surface);
    }

    fn surface_committed(&mut self, surface: ShellSurfaceId) {
        self.commits.push(surface);
    }

    fn surface_destroyed(&mut self, snapshot: ShellSurfaceSnapshot) {
        self.destroyed.push(snapshot);
    }

    fn ack_configure(&mut self, surface: ShellSurfaceId, configure: ToplevelConfigure) {
        self.acked.push((surface, configure));
    }
}

xdg_shell_v6::delegate_compositor!(ServerState);
xdg_shell_v6::delegate_xdg_shell_v6!(ServerState);

struct TestClientData;

impl ways::backend::ClientData for TestClientData {
    fn initialized(&self, _: ways::backend::ClientId) {}
    fn disconnected(&self, _: ways::backend::ClientId, _: ways::backend::DisconnectReason) {}
}

pub struct TestServer {
    pub display: ways::Display<ServerState>,
    pub state: ServerState,
}

/// Route the crate's logs to the test output, filtered by `RUST_LOG`
pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

impl TestServer {
    pub fn new() -> TestServer {
        TestServer::with_config(XdgV6ShellConfig::default())
    }

    pub fn with_config(config: XdgV6ShellConfig) -> TestServer {
        init_logging();
        let display = ways::Display::<ServerState>::new().unwrap();
        let compositor = CompositorState::new(&display.handle());
        let shell = XdgV6ShellState::new_with_config::<ServerState>(&display.handle(), config);
        TestServer {
            display,
            state: ServerState {
                compositor,
                shell,
                clients: Vec::new(),
                disconnected: Vec::new(),
                toplevels: Vec::new(),
                commits: Vec::new(),
                destroyed: Vec::new(),
                acked: Vec::new(),
                pongs: 0,
            },
        }
    }

    pub fn answer(&mut self) {
        self.display.dispatch_clients(&mut self.state).unwrap();
        self.display.flush_clients().unwrap();
    }

    pub fn add_client(&mut self) -> (ways::Client, TestClient) {
        let (server_socket, client_socket) = UnixStream::pair().unwrap();
        let client = self
            .display
            .handle()
            .insert_client(server_socket, Arc::new(TestClientData))
            .unwrap();
        (client, TestClient::new(client_socket))
    }
}

/*
 * Client side
 */

#[derive(Debug, Default)]
pub struct ClientState {
    pub globals: Vec<(u32, String, u32)>,
    pub syncs: usize,
    pub frames: usize,
    pub surface_configures: Vec<u32>,
    pub toplevel_configures: Vec<(i32, i32, Vec<u32>)>,
    pub pings: Vec<u32>,
}

impl ClientState {
    pub fn global(&self, interface: &str) -> Option<(u32, u32)> {
        self.globals
            .iter()
            .find(|(_, name, _)| name == interface)
            .map(|(name, _, version)| (*name, *version))
    }
}

pub struct SyncMarker;
pub struct FrameMarker;

impl wayc::Dispatch<WlRegistry, ()> for ClientState {
    fn event(
        state: &mut Self,
        _: &WlRegistry,
        event: wl_registry::Event,
        _: &(),
        _: &wayc::Connection,
        _: &wayc::QueueHandle<Self>,
    ) {
        if let wl_registry::Event::Global {
            name,
            interface,
            version,
        } = event
        {
            state.globals.push((name, interface, version));
        }
    }
}

impl wayc::Dispatch<WlCallback, SyncMarker> for ClientState {
    fn event(
        state: &mut Self,
        _: &WlCallback,
        event: wl_callback::Event,
        _: &SyncMarker,
        _: &wayc::Connection,
        _: &wayc::QueueHandle<Self>,
    ) {
        if let wl_callback::Event::Done { .. } = event {
            state.syncs += 1;
        }
    }
}

impl wayc::Dispatch<WlCallback, FrameMarker> for ClientState {
    fn event(
        state: &mut Self,
        _: &WlCallback,
        event: wl_callback::Event,
        _: &FrameMarker,
        _: &wayc::Connection,
        _: &wayc::QueueHandle<Self>,
    ) {
        if let wl_callback::Event::Done { .. } = event {
            state.frames += 1;
        }
    }
}

impl wayc::Dispatch<ZxdgShellV6, ()> for ClientState {
    fn event(
        state: &mut Self,
        shell: &ZxdgShellV6,
        event: zxdg_shell_v6::Event,
        _: &(),
        _: &wayc::Connection,
        _: &wayc::QueueHandle<Self>,
    ) {
        if let zxdg_shell_v6::Event::Ping { serial } = event {
            state.pings.push(serial);
            shell.pong(serial);
        }
    }
}

impl wayc::Dispatch<ZxdgSurfaceV6, ()> for ClientState {
    fn event(
        state: &mut Self,
        _: &ZxdgSurfaceV6,
        event: zxdg_surface_v6::Event,
        _: &(),
        _: &wayc::Connection,
        _: &wayc::QueueHandle<Self>,
    ) {
        if let zxdg_surface_v6::Event::Configure { serial } = event {
            state.surface_configures.push(serial);
        }
    }
}

impl wayc::Dispatch<ZxdgToplevelV6, ()> for ClientState {
    fn event(
        state: &mut Self,
        _: &ZxdgToplevelV6,
        event: zxdg_toplevel_v6::Event,
        _: &(),
        _: &wayc::Connection,
        _: &wayc::QueueHandle<Self>,
    ) {
        if let zxdg_toplevel_v6::Event::Configure {
            width,
            height,
            states,
        } = event
        {
            let states = states
                .chunks_exact(4)
                .map(|chunk| u32::from_ne_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
                .collect();
            state.toplevel_configures.push((width, height, states));
        }
    }
}

wayc::delegate_noop!(ClientState: WlCompositor);
wayc::delegate_noop!(ClientState: ignore WlSurface);

pub struct TestClient {
    pub conn: wayc::Connection,
    pub display: WlDisplay,
    pub event_queue: wayc::EventQueue<ClientState>,
    pub state: ClientState,
}

impl TestClient {
    pub fn new(socket: UnixStream) -> TestClient {
        let conn = wayc::Connection::from_socket(socket).expect("Failed to connect to server.");
        let event_queue = conn.new_event_queue();
        let display = conn.display();
        TestClient {
            conn,
            display,
            event_queue,
            state: ClientState::default(),
        }
    }

    pub fn handle(&self) -> wayc::QueueHandle<ClientState> {
        self.event_queue.handle()
    }
}

/// Send a `wl_display.sync` and pump both sides until its callback fires
pub fn roundtrip(client: &mut TestClient, server: &mut TestServer) -> Result<(), wayc::DispatchError> {
    let target = client.state.syncs + 1;
    client.display.sync(&client.event_queue.handle(), SyncMarker);

    for _ in 0..MAX_ITERATIONS {
        match client.conn.flush() {
            Ok(()) => {}
            Err(wayc::backend::WaylandError::Io(e)) if e.kind() == std::io::ErrorKind::BrokenPipe => {}
            Err(e) => return Err(wayc::DispatchError::Backend(e)),
        }
        // make it answer messages
        server.answer();

        if let Some(guard) = client.conn.prepare_read() {
            match guard.read() {
                Ok(_) => {}
                Err(wayc::backend::WaylandError::Io(e)) if e.kind() == std::io::ErrorKind::WouldBlock => {}
                Err(e) => {
                    // even if reading failed, some messages may need dispatching
                    client.event_queue.dispatch_pending(&mut client.state)?;
                    return Err(wayc::DispatchError::Backend(e));
                }
            }
        }
        client.event_queue.dispatch_pending(&mut client.state)?;

        if client.state.syncs >= target {
            return Ok(());
        }
    }
    panic!("roundtrip did not complete after {} iterations", MAX_ITERATIONS);
}
