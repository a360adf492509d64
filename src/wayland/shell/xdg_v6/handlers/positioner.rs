use tracing::trace;
use wayland_server::{Client, DataInit, Dispatch, DisplayHandle, Resource};

use super::super::{
    protocol::server::zxdg_positioner_v6::{self, ZxdgPositionerV6},
    XdgV6ShellHandler, XdgV6ShellState,
};

/// User data of a `zxdg_positioner_v6` object
///
/// Positioner rules are accepted and dropped: popup placement is up to the compositor.
#[derive(Debug, Default)]
pub struct XdgPositionerUserData {
    _private: (),
}

impl<D> Dispatch<ZxdgPositionerV6, XdgPositionerUserData, D> for XdgV6ShellState
where
    D: Dispatch<ZxdgPositionerV6, XdgPositionerUserData>,
    D: XdgV6ShellHandler,
{
    fn request(
        _state: &mut D,
        _client: &Client,
        positioner: &ZxdgPositionerV6,
        request: zxdg_positioner_v6::Request,
        _data: &XdgPositionerUserData,
        _dhandle: &DisplayHandle,
        _data_init: &mut DataInit<'_, D>,
    ) {
        match request {
            zxdg_positioner_v6::Request::SetSize { .. }
            | zxdg_positioner_v6::Request::SetAnchorRect { .. }
            | zxdg_positioner_v6::Request::SetAnchor { .. }
            | zxdg_positioner_v6::Request::SetGravity { .. }
            | zxdg_positioner_v6::Request::SetConstraintAdjustment { .. }
            | zxdg_positioner_v6::Request::SetOffset { .. } => {
                trace!(positioner = %positioner.id(), "Positioner rule ignored");
            }
            zxdg_positioner_v6::Request::Destroy => {}
        }
    }
}
