use tracing::trace;
use wayland_server::{
    backend::ClientId,
    protocol::{
        wl_callback::{self, WlCallback},
        wl_compositor::{self, WlCompositor},
        wl_region::{self, WlRegion},
        wl_surface::{self, WlSurface},
    },
    Client, DataInit, Dispatch, DisplayHandle, GlobalDispatch, New,
};

use super::{commit, destroy_surface, CompositorHandler, CompositorState, SurfaceId};

/*
 * wl_compositor
 */

impl<D> GlobalDispatch<WlCompositor, (), D> for CompositorState<D>
where
    D: GlobalDispatch<WlCompositor, ()>,
    D: Dispatch<WlCompositor, ()>,
    D: Dispatch<WlSurface, SurfaceUserData>,
    D: Dispatch<WlRegion, RegionUserData>,
    D: Dispatch<WlCallback, ()>,
    D: CompositorHandler,
{
    fn bind(
        _state: &mut D,
        _handle: &DisplayHandle,
        _client: &Client,
        resource: New<WlCompositor>,
        _global_data: &(),
        data_init: &mut DataInit<'_, D>,
    ) {
        data_init.init(resource, ());
    }
}

impl<D> Dispatch<WlCompositor, (), D> for CompositorState<D>
where
    D: Dispatch<WlCompositor, ()>,
    D: Dispatch<WlSurface, SurfaceUserData>,
    D: Dispatch<WlRegion, RegionUserData>,
    D: Dispatch<WlCallback, ()>,
    D: CompositorHandler,
{
    fn request(
        state: &mut D,
        _client: &Client,
        _resource: &WlCompositor,
        request: wl_compositor::Request,
        _data: &(),
        _dhandle: &DisplayHandle,
        data_init: &mut DataInit<'_, D>,
    ) {
        match request {
            wl_compositor::Request::CreateSurface { id } => {
                let surface = state.compositor_state().create_surface();
                data_init.init(id, SurfaceUserData { id: surface });
                state.new_surface(surface);
            }
            wl_compositor::Request::CreateRegion { id } => {
                trace!("Creating a new wl_region.");
                data_init.init(id, RegionUserData { _private: () });
            }
            _ => unreachable!(),
        }
    }
}

/*
 * wl_surface
 */

/// User data of a `wl_surface` created by this compositor
#[derive(Debug)]
pub struct SurfaceUserData {
    pub(crate) id: SurfaceId,
}

impl SurfaceUserData {
    /// Id of the surface
    pub fn id(&self) -> SurfaceId {
        self.id
    }
}

impl<D> Dispatch<WlSurface, SurfaceUserData, D> for CompositorState<D>
where
    D: Dispatch<WlSurface, SurfaceUserData>,
    D: Dispatch<WlCallback, ()>,
    D: CompositorHandler,
{
    fn request(
        state: &mut D,
        _client: &Client,
        _surface: &WlSurface,
        request: wl_surface::Request,
        data: &SurfaceUserData,
        _dhandle: &DisplayHandle,
        data_init: &mut DataInit<'_, D>,
    ) {
        match request {
            wl_surface::Request::Frame { callback } => {
                let callback = data_init.init(callback, ());
                state.compositor_state().queue_frame_callback(data.id, callback);
            }
            wl_surface::Request::Commit => {
                commit(state, data.id);

                let compositor = state.compositor_state();
                let time = compositor.elapsed_millis();
                for callback in compositor.take_frame_callbacks(data.id) {
                    callback.done(time);
                }
            }
            wl_surface::Request::Attach { .. }
            | wl_surface::Request::Damage { .. }
            | wl_surface::Request::DamageBuffer { .. }
            | wl_surface::Request::SetOpaqueRegion { .. }
            | wl_surface::Request::SetInputRegion { .. }
            | wl_surface::Request::SetBufferTransform { .. }
            | wl_surface::Request::SetBufferScale { .. }
            | wl_surface::Request::Offset { .. } => {
                // no renderer, content state is dropped
            }
            wl_surface::Request::Destroy => {
                // handled by the destructor
            }
            _ => unreachable!(),
        }
    }

    fn destroyed(state: &mut D, _client_id: ClientId, _surface: &WlSurface, data: &SurfaceUserData) {
        destroy_surface(state, data.id);
    }
}

/*
 * wl_region
 */

/// User data of a `wl_region`
///
/// Regions are accepted but their content is not tracked.
#[derive(Debug)]
pub struct RegionUserData {
    _private: (),
}

impl<D> Dispatch<WlRegion, RegionUserData, D> for CompositorState<D>
where
    D: Dispatch<WlRegion, RegionUserData>,
    D: CompositorHandler,
{
    fn request(
        _state: &mut D,
        _client: &Client,
        _region: &WlRegion,
        request: wl_region::Request,
        _data: &RegionUserData,
        _dhandle: &DisplayHandle,
        _data_init: &mut DataInit<'_, D>,
    ) {
        match request {
            wl_region::Request::Add { .. } | wl_region::Request::Subtract { .. } => {}
            wl_region::Request::Destroy => {}
            _ => unreachable!(),
        }
    }
}

/*
 * wl_callback
 */

impl<D> Dispatch<WlCallback, (), D> for CompositorState<D>
where
    D: Dispatch<WlCallback, ()>,
    D: CompositorHandler,
{
    fn request(
        _state: &mut D,
        _client: &Client,
        _resource: &WlCallback,
        _request: wl_callback::Request,
        _data: &(),
        _dhandle: &DisplayHandle,
        _data_init: &mut DataInit<'_, D>,
    ) {
    }
}
