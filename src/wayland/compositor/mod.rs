//! Minimal `wl_compositor` implementation
//!
//! This module tracks the drawable surfaces the shell layer builds upon. It only keeps
//! what a shell needs from a surface:
//!
//! - a stable [`SurfaceId`], never reused while the state lives
//! - an exclusive role tag (see [`CompositorState::give_role`])
//! - commit and destruction hooks, run in registration order
//!
//! Pixel content (buffers, damage, regions, scale and transform) is accepted on the wire
//! and ignored, since nothing here renders. Frame callbacks are answered right after the
//! commit that carried them.
//!
//! ## How to use it
//!
//! ```
//! use xdg_shell_v6::delegate_compositor;
//! use xdg_shell_v6::wayland::compositor::{CompositorHandler, CompositorState};
//!
//! # struct State { compositor_state: CompositorState<State> }
//! # let mut display = wayland_server::Display::<State>::new().unwrap();
//! let compositor_state = CompositorState::<State>::new(&display.handle());
//!
//! impl CompositorHandler for State {
//!     fn compositor_state(&mut self) -> &mut CompositorState<Self> {
//!         &mut self.compositor_state
//!     }
//! }
//! delegate_compositor!(State);
//! ```

use std::{sync::Arc, time::Instant};

use indexmap::IndexMap;
use tracing::trace;
use wayland_server::{
    backend::GlobalId,
    protocol::{wl_callback::WlCallback, wl_compositor::WlCompositor, wl_region::WlRegion, wl_surface::WlSurface},
    Dispatch, DisplayHandle, GlobalDispatch, Resource,
};

use crate::utils::hook::Hook;
pub use crate::utils::HookId;

mod handlers;
mod roles;

pub use self::handlers::{RegionUserData, SurfaceUserData};
pub use self::roles::RoleError;

const COMPOSITOR_VERSION: u32 = 4;

/// Identifier of a surface tracked by a [`CompositorState`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SurfaceId(u64);

impl std::fmt::Display for SurfaceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "surface#{}", self.0)
    }
}

impl SurfaceId {
    /// Retrieve the id of a `wl_surface` created by this compositor
    ///
    /// Returns `None` if the surface was created by another `wl_compositor` implementation.
    pub fn from_wl_surface(surface: &WlSurface) -> Option<SurfaceId> {
        surface.data::<SurfaceUserData>().map(|data| data.id)
    }
}

pub(crate) type SurfaceHook<D> = dyn Fn(&mut D, SurfaceId);

pub(crate) struct SurfaceData<D> {
    pub(crate) role: Option<&'static str>,
    commit_hooks: Vec<Hook<SurfaceHook<D>>>,
    destruction_hooks: Vec<Hook<SurfaceHook<D>>>,
    frame_callbacks: Vec<WlCallback>,
}

impl<D> Default for SurfaceData<D> {
    fn default() -> Self {
        SurfaceData {
            role: None,
            commit_hooks: Vec::new(),
            destruction_hooks: Vec::new(),
            frame_callbacks: Vec::new(),
        }
    }
}

/// State of the `wl_compositor` global and of every surface it created
pub struct CompositorState<D> {
    pub(crate) surfaces: IndexMap<SurfaceId, SurfaceData<D>>,
    next_surface_id: u64,
    global: Option<GlobalId>,
    started: Instant,
}

impl<D> std::fmt::Debug for CompositorState<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompositorState")
            .field("surfaces", &self.surfaces.len())
            .field("next_surface_id", &self.next_surface_id)
            .field("global", &self.global)
            .finish()
    }
}

impl<D: CompositorHandler> CompositorState<D> {
    /// Create the `wl_compositor` global and its surface bookkeeping
    pub fn new(display: &DisplayHandle) -> Self
    where
        D: GlobalDispatch<WlCompositor, ()>
            + Dispatch<WlCompositor, ()>
            + Dispatch<WlSurface, SurfaceUserData>
            + Dispatch<WlRegion, RegionUserData>
            + Dispatch<WlCallback, ()>
            + 'static,
    {
        let global = display.create_global::<D, WlCompositor, ()>(COMPOSITOR_VERSION, ());
        CompositorState {
            global: Some(global),
            ..Self::headless()
        }
    }
}

impl<D> CompositorState<D> {
    /// Surface bookkeeping without an advertised global
    ///
    /// Surfaces are then only created through [`CompositorState::create_surface`].
    pub fn headless() -> Self {
        CompositorState {
            surfaces: IndexMap::new(),
            next_surface_id: 0,
            global: None,
            started: Instant::now(),
        }
    }

    /// Id of the `wl_compositor` global, if one was advertised
    pub fn global(&self) -> Option<GlobalId> {
        self.global.clone()
    }

    /// Start tracking a new surface
    pub fn create_surface(&mut self) -> SurfaceId {
        let id = SurfaceId(self.next_surface_id);
        self.next_surface_id += 1;
        self.surfaces.insert(id, SurfaceData::default());
        trace!(surface = %id, "New surface");
        id
    }

    /// Whether the surface is still alive
    pub fn alive(&self, surface: SurfaceId) -> bool {
        self.surfaces.contains_key(&surface)
    }

    /// Iterate over all live surfaces
    pub fn surfaces(&self) -> impl Iterator<Item = SurfaceId> + '_ {
        self.surfaces.keys().copied()
    }

    /// Register a hook run on every commit of this surface
    ///
    /// Returns `None` if the surface is already dead.
    pub fn add_commit_hook<F>(&mut self, surface: SurfaceId, hook: F) -> Option<HookId>
    where
        F: Fn(&mut D, SurfaceId) + 'static,
    {
        let data = self.surfaces.get_mut(&surface)?;
        let hook = Hook::new(Arc::new(hook) as Arc<SurfaceHook<D>>);
        let id = hook.id;
        data.commit_hooks.push(hook);
        Some(id)
    }

    /// Register a hook run when this surface is destroyed
    ///
    /// Returns `None` if the surface is already dead.
    pub fn add_destruction_hook<F>(&mut self, surface: SurfaceId, hook: F) -> Option<HookId>
    where
        F: Fn(&mut D, SurfaceId) + 'static,
    {
        let data = self.surfaces.get_mut(&surface)?;
        let hook = Hook::new(Arc::new(hook) as Arc<SurfaceHook<D>>);
        let id = hook.id;
        data.destruction_hooks.push(hook);
        Some(id)
    }

    /// Unregister a commit hook
    pub fn remove_commit_hook(&mut self, surface: SurfaceId, hook_id: HookId) {
        if let Some(data) = self.surfaces.get_mut(&surface) {
            data.commit_hooks.retain(|hook| hook.id != hook_id);
        }
    }

    /// Unregister a destruction hook
    pub fn remove_destruction_hook(&mut self, surface: SurfaceId, hook_id: HookId) {
        if let Some(data) = self.surfaces.get_mut(&surface) {
            data.destruction_hooks.retain(|hook| hook.id != hook_id);
        }
    }

    /// Number of hooks currently registered on a surface, as (commit, destruction)
    pub fn hook_count(&self, surface: SurfaceId) -> (usize, usize) {
        self.surfaces
            .get(&surface)
            .map(|data| (data.commit_hooks.len(), data.destruction_hooks.len()))
            .unwrap_or((0, 0))
    }

    fn has_commit_hook(&self, surface: SurfaceId, hook_id: HookId) -> bool {
        self.surfaces
            .get(&surface)
            .is_some_and(|data| data.commit_hooks.iter().any(|hook| hook.id == hook_id))
    }

    fn has_destruction_hook(&self, surface: SurfaceId, hook_id: HookId) -> bool {
        self.surfaces
            .get(&surface)
            .is_some_and(|data| data.destruction_hooks.iter().any(|hook| hook.id == hook_id))
    }

    pub(crate) fn queue_frame_callback(&mut self, surface: SurfaceId, callback: WlCallback) {
        if let Some(data) = self.surfaces.get_mut(&surface) {
            data.frame_callbacks.push(callback);
        }
    }

    pub(crate) fn take_frame_callbacks(&mut self, surface: SurfaceId) -> Vec<WlCallback> {
        self.surfaces
            .get_mut(&surface)
            .map(|data| std::mem::take(&mut data.frame_callbacks))
            .unwrap_or_default()
    }

    pub(crate) fn elapsed_millis(&self) -> u32 {
        self.started.elapsed().as_millis() as u32
    }
}

/// Handler trait for the compositor
pub trait CompositorHandler: Sized + 'static {
    /// [`CompositorState`] getter
    fn compositor_state(&mut self) -> &mut CompositorState<Self>;

    /// A client created a new surface
    fn new_surface(&mut self, _surface: SurfaceId) {}

    /// A surface was committed, after all commit hooks ran
    fn commit(&mut self, _surface: SurfaceId) {}

    /// A surface was destroyed, after all destruction hooks ran
    fn destroyed(&mut self, _surface: SurfaceId) {}
}

/// Commit a surface: run its commit hooks, then [`CompositorHandler::commit`]
///
/// Hooks removed by an earlier hook of the same commit are skipped. Committing a dead
/// surface does nothing.
pub fn commit<D: CompositorHandler>(state: &mut D, surface: SurfaceId) {
    let hooks = match state.compositor_state().surfaces.get(&surface) {
        Some(data) => data.commit_hooks.clone(),
        None => {
            trace!(surface = %surface, "Commit of a dead surface ignored");
            return;
        }
    };
    for hook in hooks {
        if state.compositor_state().has_commit_hook(surface, hook.id) {
            (hook.cb)(state, surface);
        }
    }
    if state.compositor_state().alive(surface) {
        state.commit(surface);
    }
}

/// Destroy a surface: run its destruction hooks, forget it, then call
/// [`CompositorHandler::destroyed`]
///
/// Destroying a surface twice does nothing the second time.
pub fn destroy_surface<D: CompositorHandler>(state: &mut D, surface: SurfaceId) {
    let hooks = match state.compositor_state().surfaces.get(&surface) {
        Some(data) => data.destruction_hooks.clone(),
        None => return,
    };
    for hook in hooks {
        if state.compositor_state().has_destruction_hook(surface, hook.id) {
            (hook.cb)(state, surface);
        }
    }
    if state.compositor_state().surfaces.shift_remove(&surface).is_some() {
        trace!(surface = %surface, "Surface destroyed");
        state.destroyed(surface);
    }
}

#[allow(missing_docs)]
#[macro_export]
macro_rules! delegate_compositor {
    ($(@<$( $lt:tt $( : $clt:tt $(+ $dlt:tt )* )? ),+>)? $ty: ty) => {
        $crate::reexports::wayland_server::delegate_global_dispatch!($(@< $( $lt $( : $clt $(+ $dlt )* )? ),+ >)? $ty: [
            $crate::reexports::wayland_server::protocol::wl_compositor::WlCompositor: ()
        ] => $crate::wayland::compositor::CompositorState<$ty>);
        $crate::reexports::wayland_server::delegate_dispatch!($(@< $( $lt $( : $clt $(+ $dlt )* )? ),+ >)? $ty: [
            $crate::reexports::wayland_server::protocol::wl_compositor::WlCompositor: ()
        ] => $crate::wayland::compositor::CompositorState<$ty>);
        $crate::reexports::wayland_server::delegate_dispatch!($(@< $( $lt $( : $clt $(+ $dlt )* )? ),+ >)? $ty: [
            $crate::reexports::wayland_server::protocol::wl_surface::WlSurface: $crate::wayland::compositor::SurfaceUserData
        ] => $crate::wayland::compositor::CompositorState<$ty>);
        $crate::reexports::wayland_server::delegate_dispatch!($(@< $( $lt $( : $clt $(+ $dlt )* )? ),+ >)? $ty: [
            $crate::reexports::wayland_server::protocol::wl_region::WlRegion: $crate::wayland::compositor::RegionUserData
        ] => $crate::wayland::compositor::CompositorState<$ty>);
        $crate::reexports::wayland_server::delegate_dispatch!($(@< $( $lt $( : $clt $(+ $dlt )* )? ),+ >)? $ty: [
            $crate::reexports::wayland_server::protocol::wl_callback::WlCallback: ()
        ] => $crate::wayland::compositor::CompositorState<$ty>);
    };
}
