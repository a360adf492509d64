mod helpers;

use helpers::{
    roundtrip,
    wayc::{
        self,
        protocol::{wl_compositor::WlCompositor, wl_surface::WlSurface},
        Proxy,
    },
    xdg_v6::{zxdg_shell_v6::ZxdgShellV6, zxdg_surface_v6::ZxdgSurfaceV6, zxdg_toplevel_v6::ZxdgToplevelV6},
    FrameMarker, TestClient, TestServer,
};
use xdg_shell_v6::{
    utils::Size,
    wayland::shell::xdg_v6::{ToplevelConfigure, ToplevelState, XdgV6ShellConfig},
};

const STATE_ACTIVATED: u32 = 4;

struct Env {
    server: TestServer,
    client: TestClient,
    _client_handle: helpers::ways::Client,
    compositor: WlCompositor,
    shell: ZxdgShellV6,
}

fn env() -> Env {
    env_with_config(XdgV6ShellConfig::default())
}

fn env_with_config(config: XdgV6ShellConfig) -> Env {
    let mut server = TestServer::with_config(config);
    let (client_handle, mut client) = server.add_client();

    let registry = client.display.get_registry(&client.handle(), ());
    roundtrip(&mut client, &mut server).unwrap();

    let (name, _) = client.state.global("wl_compositor").unwrap();
    let compositor = registry.bind::<WlCompositor, _, _>(name, 4, &client.handle(), ());
    let (name, version) = client.state.global("zxdg_shell_v6").unwrap();
    assert_eq!(version, 1);
    let shell = registry.bind::<ZxdgShellV6, _, _>(name, 1, &client.handle(), ());
    roundtrip(&mut client, &mut server).unwrap();

    Env {
        server,
        client,
        _client_handle: client_handle,
        compositor,
        shell,
    }
}

impl Env {
    fn roundtrip(&mut self) -> Result<(), wayc::DispatchError> {
        roundtrip(&mut self.client, &mut self.server)
    }

    fn toplevel(&mut self) -> (WlSurface, ZxdgSurfaceV6, ZxdgToplevelV6) {
        let qh = self.client.handle();
        let surface = self.compositor.create_surface(&qh, ());
        let xdg_surface = self.shell.get_xdg_surface(&surface, &qh, ());
        let toplevel = xdg_surface.get_toplevel(&qh, ());
        self.roundtrip().unwrap();
        (surface, xdg_surface, toplevel)
    }

    fn current(&self) -> ToplevelState {
        *self
            .server
            .state
            .shell
            .toplevels()
            .next()
            .unwrap()
            .toplevel()
            .unwrap()
            .current()
    }
}

#[test]
fn toplevel_gets_initial_configure() {
    let mut env = env();
    let (_surface, _xdg_surface, _toplevel) = env.toplevel();

    assert_eq!(env.server.state.clients.len(), 1);
    assert_eq!(env.server.state.toplevels.len(), 1);
    assert_eq!(env.client.state.toplevel_configures, vec![(0, 0, vec![])]);
    assert_eq!(env.client.state.surface_configures.len(), 1);
}

#[test]
fn second_toplevel_is_a_role_error() {
    let mut env = env();
    let (_surface, xdg_surface, _toplevel) = env.toplevel();

    let _second = xdg_surface.get_toplevel(&env.client.handle(), ());
    let _ = env.roundtrip();

    match env.client.conn.protocol_error() {
        Some(err) => {
            assert_eq!(err.code, 0);
            assert_eq!(err.object_interface, "zxdg_surface_v6");
            assert_eq!(err.object_id, xdg_surface.id().protocol_id());
        }
        None => panic!("Client did not get protocol error"),
    }
    assert_eq!(env.server.state.toplevels.len(), 1);
}

#[test]
fn pending_state_applies_on_commit() {
    let mut env = env();
    let (surface, xdg_surface, toplevel) = env.toplevel();

    toplevel.set_max_size(800, 600);
    toplevel.set_maximized();
    xdg_surface.set_window_geometry(0, 0, 800, 600);
    env.roundtrip().unwrap();
    assert_eq!(env.current(), ToplevelState::default());
    assert!(env.server.state.commits.is_empty());

    surface.commit();
    env.roundtrip().unwrap();
    assert_eq!(
        env.current(),
        ToplevelState {
            maximized: true,
            max_size: Size::from((800, 600)),
            ..Default::default()
        }
    );
    let shell_surface = env.server.state.shell.surfaces().next().unwrap();
    assert_eq!(shell_surface.geometry().size, Size::from((800, 600)));
    assert_eq!(env.server.state.commits.len(), 1);

    toplevel.unset_maximized();
    env.roundtrip().unwrap();
    assert!(env.current().maximized);

    surface.commit();
    env.roundtrip().unwrap();
    assert!(!env.current().maximized);
    assert_eq!(env.current().max_size, Size::from((800, 600)));
}

#[test]
fn acked_activation_applies_on_commit() {
    let mut env = env();
    let (surface, xdg_surface, _toplevel) = env.toplevel();
    let id = env.server.state.toplevels[0];

    env.server
        .state
        .shell
        .configure_toplevel(
            id,
            ToplevelConfigure {
                size: Size::from((640, 480)),
                activated: true,
                ..Default::default()
            },
        )
        .unwrap();
    env.roundtrip().unwrap();

    assert_eq!(
        env.client.state.toplevel_configures.last(),
        Some(&(640, 480, vec![STATE_ACTIVATED]))
    );
    let serial = *env.client.state.surface_configures.last().unwrap();

    xdg_surface.ack_configure(serial);
    env.roundtrip().unwrap();
    assert_eq!(env.server.state.acked.len(), 1);
    assert!(!env.current().activated);

    surface.commit();
    env.roundtrip().unwrap();
    assert!(env.current().activated);
}

#[test]
fn frame_callbacks_fire_on_commit() {
    let mut env = env();
    let (surface, _xdg_surface, _toplevel) = env.toplevel();

    surface.frame(&env.client.handle(), FrameMarker);
    env.roundtrip().unwrap();
    assert_eq!(env.client.state.frames, 0);

    surface.commit();
    env.roundtrip().unwrap();
    assert_eq!(env.client.state.frames, 1);
}

#[test]
fn requests_after_surface_destruction_are_ignored() {
    let mut env = env();
    let (surface, xdg_surface, toplevel) = env.toplevel();
    toplevel.set_title("doomed".into());

    surface.destroy();
    env.roundtrip().unwrap();
    assert_eq!(env.server.state.destroyed.len(), 1);
    assert_eq!(env.server.state.destroyed[0].title.as_deref(), Some("doomed"));
    assert_eq!(env.server.state.shell.surfaces().count(), 0);

    xdg_surface.set_window_geometry(0, 0, 10, 10);
    xdg_surface.ack_configure(1);
    toplevel.set_maximized();
    toplevel.set_title("ignored".into());
    env.roundtrip().unwrap();
    assert!(env.client.conn.protocol_error().is_none());

    toplevel.destroy();
    xdg_surface.destroy();
    env.roundtrip().unwrap();
    assert_eq!(env.server.state.destroyed.len(), 1);
}

#[test]
fn explicit_destroy_then_surface_destroy() {
    let mut env = env();
    let (surface, xdg_surface, toplevel) = env.toplevel();

    toplevel.destroy();
    xdg_surface.destroy();
    env.roundtrip().unwrap();
    assert_eq!(env.server.state.destroyed.len(), 1);

    surface.commit();
    surface.destroy();
    env.roundtrip().unwrap();
    assert_eq!(env.server.state.destroyed.len(), 1);
    assert!(env.server.state.commits.is_empty());
}

#[test]
fn shell_destroyed_before_surfaces() {
    let mut env = env();
    let (_surface, _xdg_surface, _toplevel) = env.toplevel();

    env.shell.destroy();
    let _ = env.roundtrip();

    match env.client.conn.protocol_error() {
        Some(err) => {
            assert_eq!(err.code, 1);
            assert_eq!(err.object_interface, "zxdg_shell_v6");
        }
        None => panic!("Client did not get protocol error"),
    }
}

#[test]
fn surface_limit_is_a_no_memory_error() {
    let mut env = env_with_config(XdgV6ShellConfig {
        max_surfaces_per_client: Some(1),
        ..Default::default()
    });
    let qh = env.client.handle();
    let first = env.compositor.create_surface(&qh, ());
    let _first = env.shell.get_xdg_surface(&first, &qh, ());
    env.roundtrip().unwrap();

    let second = env.compositor.create_surface(&qh, ());
    let _second = env.shell.get_xdg_surface(&second, &qh, ());
    let _ = env.roundtrip();

    match env.client.conn.protocol_error() {
        Some(err) => {
            assert_eq!(err.code, 2);
            assert_eq!(err.object_interface, "wl_display");
            assert_eq!(err.object_id, 1);
        }
        None => panic!("Client did not get protocol error"),
    }
}

#[test]
fn ping_pong() {
    let mut env = env();
    let connection = env.server.state.clients[0];

    let serial = env.server.state.shell.send_ping(connection).unwrap();
    env.roundtrip().unwrap();
    assert_eq!(env.client.state.pings, vec![u32::from(serial)]);

    env.roundtrip().unwrap();
    assert_eq!(env.server.state.pongs, 1);
    assert_eq!(
        env.server.state.shell.connection(connection).unwrap().pending_ping(),
        None
    );
}

#[test]
fn client_disconnect_tears_everything_down() {
    let mut env = env();
    let _objects = env.toplevel();
    let Env { mut server, client, .. } = env;

    drop(client);
    server.answer();
    server.answer();

    assert_eq!(server.state.destroyed.len(), 1);
    assert_eq!(server.state.disconnected, server.state.clients);
    assert_eq!(server.state.shell.surfaces().count(), 0);
    assert_eq!(server.state.shell.connections().count(), 0);
}
