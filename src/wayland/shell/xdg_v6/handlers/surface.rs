use once_cell::sync::OnceCell;
use tracing::trace;
use wayland_server::{
    backend::ClientId, protocol::wl_surface::WlSurface, Client, DataInit, Dispatch, DisplayHandle, Resource,
};

use crate::utils::Rectangle;

use super::super::{
    post_shell_error,
    protocol::server::{
        zxdg_popup_v6::{self, ZxdgPopupV6},
        zxdg_surface_v6::{self, ZxdgSurfaceV6},
        zxdg_toplevel_v6::ZxdgToplevelV6,
    },
    ShellSurfaceId, XdgV6ShellHandler, XdgV6ShellState,
};
use super::XdgToplevelUserData;

/// User data of a `zxdg_surface_v6` object
#[derive(Debug)]
pub struct XdgSurfaceUserData {
    shell_surface: OnceCell<ShellSurfaceId>,
    wl_surface: WlSurface,
}

impl XdgSurfaceUserData {
    pub(super) fn new(wl_surface: WlSurface) -> Self {
        XdgSurfaceUserData {
            shell_surface: OnceCell::new(),
            wl_surface,
        }
    }

    pub(super) fn set_shell_surface(&self, id: ShellSurfaceId) {
        let _ = self.shell_surface.set(id);
    }

    /// Shell surface backing this object
    ///
    /// `None` if the creation of the shell surface was refused.
    pub fn shell_surface(&self) -> Option<ShellSurfaceId> {
        self.shell_surface.get().copied()
    }

    /// The `wl_surface` this object was created for
    pub fn wl_surface(&self) -> &WlSurface {
        &self.wl_surface
    }
}

impl<D> Dispatch<ZxdgSurfaceV6, XdgSurfaceUserData, D> for XdgV6ShellState
where
    D: Dispatch<ZxdgSurfaceV6, XdgSurfaceUserData>,
    D: Dispatch<ZxdgToplevelV6, XdgToplevelUserData>,
    D: Dispatch<ZxdgPopupV6, XdgPopupUserData>,
    D: XdgV6ShellHandler,
{
    fn request(
        state: &mut D,
        _client: &Client,
        xdg_surface: &ZxdgSurfaceV6,
        request: zxdg_surface_v6::Request,
        data: &XdgSurfaceUserData,
        dhandle: &DisplayHandle,
        data_init: &mut DataInit<'_, D>,
    ) {
        match request {
            zxdg_surface_v6::Request::Destroy => {
                // handled by the destructor
            }
            zxdg_surface_v6::Request::GetToplevel { id } => {
                let toplevel = data_init.init(id, XdgToplevelUserData::default());

                let Some(shell_surface) = data.shell_surface() else {
                    return;
                };
                match XdgV6ShellState::get_toplevel(state, shell_surface, Some(toplevel.clone())) {
                    Ok(_) => {
                        if let Some(data) = toplevel.data::<XdgToplevelUserData>() {
                            data.set_shell_surface(shell_surface);
                        }
                    }
                    Err(err) => post_shell_error(dhandle, xdg_surface, &err),
                }
            }
            zxdg_surface_v6::Request::GetPopup { id, parent, .. } => {
                data_init.init(id, XdgPopupUserData { _private: () });

                let Some(shell_surface) = data.shell_surface() else {
                    return;
                };
                let parent = parent
                    .data::<XdgSurfaceUserData>()
                    .and_then(XdgSurfaceUserData::shell_surface);
                if let Err(err) = XdgV6ShellState::get_popup(state, shell_surface, parent) {
                    post_shell_error(dhandle, xdg_surface, &err);
                }
            }
            zxdg_surface_v6::Request::SetWindowGeometry { x, y, width, height } => {
                let Some(shell_surface) = data.shell_surface() else {
                    return;
                };
                let geometry = Rectangle::from_loc_and_size((x, y), (width, height));
                if let Err(err) = state
                    .xdg_v6_shell_state()
                    .set_window_geometry(shell_surface, geometry)
                {
                    post_shell_error(dhandle, xdg_surface, &err);
                }
            }
            zxdg_surface_v6::Request::AckConfigure { serial } => {
                let Some(shell_surface) = data.shell_surface() else {
                    return;
                };
                match state
                    .xdg_v6_shell_state()
                    .ack_configure(shell_surface, serial.into())
                {
                    Ok(Some(configure)) => state.ack_configure(shell_surface, configure),
                    Ok(None) => {}
                    Err(err) => post_shell_error(dhandle, xdg_surface, &err),
                }
            }
        }
    }

    fn destroyed(state: &mut D, _client_id: ClientId, _xdg_surface: &ZxdgSurfaceV6, data: &XdgSurfaceUserData) {
        if let Some(shell_surface) = data.shell_surface() {
            XdgV6ShellState::destroy_shell_surface(state, shell_surface);
        }
    }
}

/// User data of a `zxdg_popup_v6` object
#[derive(Debug)]
pub struct XdgPopupUserData {
    _private: (),
}

impl<D> Dispatch<ZxdgPopupV6, XdgPopupUserData, D> for XdgV6ShellState
where
    D: Dispatch<ZxdgPopupV6, XdgPopupUserData>,
    D: XdgV6ShellHandler,
{
    fn request(
        _state: &mut D,
        _client: &Client,
        popup: &ZxdgPopupV6,
        request: zxdg_popup_v6::Request,
        _data: &XdgPopupUserData,
        _dhandle: &DisplayHandle,
        _data_init: &mut DataInit<'_, D>,
    ) {
        match request {
            zxdg_popup_v6::Request::Grab { serial, .. } => {
                trace!(popup = %popup.id(), serial, "Popup grab ignored");
            }
            zxdg_popup_v6::Request::Destroy => {}
        }
    }
}
