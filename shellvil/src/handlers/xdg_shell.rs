use tracing::{debug, info, warn};
use xdg_shell_v6::{
    delegate_xdg_shell_v6,
    reexports::wayland_server::protocol::wl_seat::WlSeat,
    utils::{Point, Serial},
    wayland::shell::xdg_v6::{
        ConnectionId, ResizeEdge, ShellSurfaceId, ShellSurfaceSnapshot, ToplevelConfigure, XdgV6ShellHandler,
        XdgV6ShellState,
    },
};

use crate::Shellvil;

impl XdgV6ShellHandler for Shellvil {
    fn xdg_v6_shell_state(&mut self) -> &mut XdgV6ShellState {
        &mut self.xdg_v6_shell_state
    }

    fn new_client(&mut self, connection: ConnectionId) {
        info!(?connection, "New shell client");
    }

    fn client_destroyed(&mut self, connection: ConnectionId) {
        info!(?connection, "Shell client gone");
    }

    fn client_pong(&mut self, connection: ConnectionId) {
        debug!(?connection, "Pong");
    }

    fn new_toplevel(&mut self, surface: ShellSurfaceId) {
        let Some(events) = self
            .xdg_v6_shell_state
            .surface(surface)
            .map(|shell_surface| shell_surface.events().clone())
        else {
            return;
        };

        let commit = events.commit.register(|window| {
            debug!(
                surface = %window.id,
                geometry = %window.geometry,
                state = ?window.toplevel,
                title = ?window.title,
                "Window committed"
            );
        });
        let minimize = events.request_minimize.register(|window| {
            info!(surface = %window.id, title = ?window.title, "Window asked to be minimized");
        });
        self.subscriptions.insert(surface, vec![commit, minimize]);

        info!(%surface, "New toplevel");

        if self.activate_toplevels {
            let configure = ToplevelConfigure {
                activated: true,
                ..Default::default()
            };
            if let Err(err) = self.xdg_v6_shell_state.configure_toplevel(surface, configure) {
                warn!(%surface, %err, "Failed to activate toplevel");
            }
        }
    }

    fn new_popup(&mut self, surface: ShellSurfaceId) {
        info!(%surface, "New popup");
    }

    fn surface_destroyed(&mut self, window: ShellSurfaceSnapshot) {
        self.subscriptions.remove(&window.id);
        info!(surface = %window.id, title = ?window.title, "Window destroyed");
    }

    fn ack_configure(&mut self, surface: ShellSurfaceId, configure: ToplevelConfigure) {
        debug!(%surface, ?configure, "Configure acknowledged");
    }

    fn move_request(&mut self, surface: ShellSurfaceId, _seat: WlSeat, serial: Serial) {
        info!(%surface, %serial, "Move request ignored, no seat");
    }

    fn resize_request(&mut self, surface: ShellSurfaceId, _seat: WlSeat, serial: Serial, edges: ResizeEdge) {
        info!(%surface, %serial, ?edges, "Resize request ignored, no seat");
    }

    fn show_window_menu(&mut self, surface: ShellSurfaceId, _seat: WlSeat, serial: Serial, location: Point) {
        info!(%surface, %serial, %location, "Window menu request ignored");
    }
}

delegate_xdg_shell_v6!(Shellvil);
