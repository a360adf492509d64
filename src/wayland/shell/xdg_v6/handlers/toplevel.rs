use once_cell::sync::OnceCell;
use tracing::debug;
use wayland_server::{backend::ClientId, Client, DataInit, Dispatch, DisplayHandle, Resource};

use crate::utils::{Point, Size};

use super::super::{
    post_shell_error,
    protocol::server::zxdg_toplevel_v6::{self, ResizeEdge, ZxdgToplevelV6},
    ShellSurfaceId, XdgV6ShellHandler, XdgV6ShellState,
};

/// User data of a `zxdg_toplevel_v6` object
#[derive(Debug, Default)]
pub struct XdgToplevelUserData {
    shell_surface: OnceCell<ShellSurfaceId>,
}

impl XdgToplevelUserData {
    pub(super) fn set_shell_surface(&self, id: ShellSurfaceId) {
        let _ = self.shell_surface.set(id);
    }

    /// Shell surface this toplevel role belongs to
    ///
    /// `None` if the role assignment was refused.
    pub fn shell_surface(&self) -> Option<ShellSurfaceId> {
        self.shell_surface.get().copied()
    }
}

impl<D> Dispatch<ZxdgToplevelV6, XdgToplevelUserData, D> for XdgV6ShellState
where
    D: Dispatch<ZxdgToplevelV6, XdgToplevelUserData>,
    D: XdgV6ShellHandler,
{
    fn request(
        state: &mut D,
        _client: &Client,
        toplevel: &ZxdgToplevelV6,
        request: zxdg_toplevel_v6::Request,
        data: &XdgToplevelUserData,
        dhandle: &DisplayHandle,
        _data_init: &mut DataInit<'_, D>,
    ) {
        let Some(id) = data.shell_surface() else {
            debug!(toplevel = %toplevel.id(), "Request on an inert toplevel ignored");
            return;
        };

        let result = match request {
            zxdg_toplevel_v6::Request::Destroy => Ok(()),
            zxdg_toplevel_v6::Request::SetParent { parent } => {
                let parent = parent
                    .as_ref()
                    .and_then(|parent| parent.data::<XdgToplevelUserData>())
                    .and_then(XdgToplevelUserData::shell_surface);
                state.xdg_v6_shell_state().set_parent(id, parent)
            }
            zxdg_toplevel_v6::Request::SetTitle { title } => state.xdg_v6_shell_state().set_title(id, title),
            zxdg_toplevel_v6::Request::SetAppId { app_id } => {
                state.xdg_v6_shell_state().set_app_id(id, app_id)
            }
            zxdg_toplevel_v6::Request::ShowWindowMenu { seat, serial, x, y } => {
                state.show_window_menu(id, seat, serial.into(), Point { x, y });
                Ok(())
            }
            zxdg_toplevel_v6::Request::Move { seat, serial } => {
                state.move_request(id, seat, serial.into());
                Ok(())
            }
            zxdg_toplevel_v6::Request::Resize { seat, serial, edges } => {
                match ResizeEdge::try_from(edges) {
                    Ok(edges) => state.resize_request(id, seat, serial.into(), edges),
                    Err(_) => debug!(toplevel = %toplevel.id(), edges, "Resize with invalid edges ignored"),
                }
                Ok(())
            }
            zxdg_toplevel_v6::Request::SetMaxSize { width, height } => state
                .xdg_v6_shell_state()
                .set_max_size(id, Size { w: width, h: height }),
            zxdg_toplevel_v6::Request::SetMinSize { width, height } => state
                .xdg_v6_shell_state()
                .set_min_size(id, Size { w: width, h: height }),
            zxdg_toplevel_v6::Request::SetMaximized => state.xdg_v6_shell_state().set_maximized(id, true),
            zxdg_toplevel_v6::Request::UnsetMaximized => state.xdg_v6_shell_state().set_maximized(id, false),
            zxdg_toplevel_v6::Request::SetFullscreen { .. } => {
                state.xdg_v6_shell_state().set_fullscreen(id, true)
            }
            zxdg_toplevel_v6::Request::UnsetFullscreen => {
                state.xdg_v6_shell_state().set_fullscreen(id, false)
            }
            zxdg_toplevel_v6::Request::SetMinimized => state.xdg_v6_shell_state().request_minimize(id),
        };

        if let Err(err) = result {
            post_shell_error(dhandle, toplevel, &err);
        }
    }

    fn destroyed(state: &mut D, _client_id: ClientId, _toplevel: &ZxdgToplevelV6, data: &XdgToplevelUserData) {
        if let Some(id) = data.shell_surface() {
            state.xdg_v6_shell_state().detach_toplevel_resource(id);
        }
    }
}
