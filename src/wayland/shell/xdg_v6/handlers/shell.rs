use once_cell::sync::OnceCell;
use tracing::debug;
use wayland_server::{
    backend::ClientId, Client, DataInit, Dispatch, DisplayHandle, GlobalDispatch, New, Resource,
};

use crate::wayland::compositor::SurfaceId;

use super::super::{
    post_shell_error,
    protocol::server::{
        zxdg_positioner_v6::ZxdgPositionerV6,
        zxdg_shell_v6::{self, ZxdgShellV6},
        zxdg_surface_v6::ZxdgSurfaceV6,
    },
    ConnectionId, ShellError, XdgV6ShellHandler, XdgV6ShellState,
};
use super::{XdgPositionerUserData, XdgSurfaceUserData};

/// User data of a `zxdg_shell_v6` object
///
/// The connection is unset if the bind was refused, in which case every request on the
/// object is ignored until the client is disconnected.
#[derive(Debug, Default)]
pub struct XdgShellUserData {
    connection: OnceCell<ConnectionId>,
}

impl XdgShellUserData {
    /// Shell connection registered for this object
    pub fn connection(&self) -> Option<ConnectionId> {
        self.connection.get().copied()
    }
}

impl<D> GlobalDispatch<ZxdgShellV6, (), D> for XdgV6ShellState
where
    D: GlobalDispatch<ZxdgShellV6, ()>,
    D: Dispatch<ZxdgShellV6, XdgShellUserData>,
    D: XdgV6ShellHandler,
{
    fn bind(
        state: &mut D,
        handle: &DisplayHandle,
        _client: &Client,
        resource: New<ZxdgShellV6>,
        _global_data: &(),
        data_init: &mut DataInit<'_, D>,
    ) {
        let shell = data_init.init(resource, XdgShellUserData::default());

        match state
            .xdg_v6_shell_state()
            .bind(shell.version(), Some(shell.clone()))
        {
            Ok(connection) => {
                if let Some(data) = shell.data::<XdgShellUserData>() {
                    let _ = data.connection.set(connection);
                }
                state.new_client(connection);
            }
            Err(err) => post_shell_error(handle, &shell, &err),
        }
    }
}

impl<D> Dispatch<ZxdgShellV6, XdgShellUserData, D> for XdgV6ShellState
where
    D: Dispatch<ZxdgShellV6, XdgShellUserData>,
    D: Dispatch<ZxdgSurfaceV6, XdgSurfaceUserData>,
    D: Dispatch<ZxdgPositionerV6, XdgPositionerUserData>,
    D: XdgV6ShellHandler,
{
    fn request(
        state: &mut D,
        _client: &Client,
        shell: &ZxdgShellV6,
        request: zxdg_shell_v6::Request,
        data: &XdgShellUserData,
        dhandle: &DisplayHandle,
        data_init: &mut DataInit<'_, D>,
    ) {
        match request {
            zxdg_shell_v6::Request::Destroy => {
                if let Some(connection) = data.connection() {
                    if state.xdg_v6_shell_state().surface_count(connection) > 0 {
                        shell.post_error(
                            zxdg_shell_v6::Error::DefunctSurfaces,
                            "zxdg_shell_v6 was destroyed before its surfaces",
                        );
                    }
                }
            }
            zxdg_shell_v6::Request::CreatePositioner { id } => {
                data_init.init(id, XdgPositionerUserData::default());
            }
            zxdg_shell_v6::Request::GetXdgSurface { id, surface } => {
                let xdg_surface = data_init.init(id, XdgSurfaceUserData::new(surface.clone()));

                let Some(connection) = data.connection() else {
                    return;
                };
                let Some(surface_id) = SurfaceId::from_wl_surface(&surface) else {
                    post_shell_error(dhandle, &xdg_surface, &ShellError::UnmanagedSurface);
                    return;
                };

                match XdgV6ShellState::get_shell_surface(
                    state,
                    connection,
                    surface_id,
                    Some(xdg_surface.clone()),
                ) {
                    Ok(shell_surface) => {
                        if let Some(data) = xdg_surface.data::<XdgSurfaceUserData>() {
                            data.set_shell_surface(shell_surface);
                        }
                    }
                    Err(err) => post_shell_error(dhandle, &xdg_surface, &err),
                }
            }
            zxdg_shell_v6::Request::Pong { serial } => {
                let Some(connection) = data.connection() else {
                    return;
                };
                if state.xdg_v6_shell_state().pong(connection, serial.into()) {
                    state.client_pong(connection);
                } else {
                    debug!(connection = ?connection, serial, "Unexpected pong");
                }
            }
        }
    }

    fn destroyed(state: &mut D, _client_id: ClientId, _shell: &ZxdgShellV6, data: &XdgShellUserData) {
        if let Some(connection) = data.connection() {
            if state.xdg_v6_shell_state().remove_connection(connection) {
                state.client_destroyed(connection);
            }
        }
    }
}
