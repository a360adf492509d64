use tracing::trace;
use xdg_shell_v6::{
    delegate_compositor,
    wayland::compositor::{CompositorHandler, CompositorState, SurfaceId},
};

use crate::Shellvil;

impl CompositorHandler for Shellvil {
    fn compositor_state(&mut self) -> &mut CompositorState<Self> {
        &mut self.compositor_state
    }

    fn new_surface(&mut self, surface: SurfaceId) {
        trace!(%surface, "New surface");
    }

    fn destroyed(&mut self, surface: SurfaceId) {
        trace!(%surface, "Surface destroyed");
    }
}

delegate_compositor!(Shellvil);
