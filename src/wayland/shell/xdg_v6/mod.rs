//! Utilities for handling shell surfaces with the `xdg_shell_unstable_v6` protocol
//!
//! This module provides the server side of the unstable v6 revision of xdg-shell. It
//! tracks every bound shell connection and every `zxdg_surface_v6` created by clients,
//! and implements the double-buffered state machine of toplevel surfaces:
//!
//! - window geometry and toplevel attributes are written to a *pending* copy by client
//!   requests and only become *current* when the underlying `wl_surface` is committed
//! - a surface gets at most one role in its lifetime, and that role tag is exclusive at
//!   the `wl_surface` level
//! - a shell surface is torn down exactly once, whether the client destroys the
//!   `zxdg_surface_v6` first or the underlying `wl_surface` goes away first
//!
//! External consumers observe shell surfaces in two ways: through the
//! [`XdgV6ShellHandler`] callbacks, and through the per-surface [`ShellSurfaceEvents`]
//! signalers (destroy, commit, request-minimize).
//!
//! ## How to use it
//!
//! ### Initialization
//!
//! ```
//! use xdg_shell_v6::{delegate_compositor, delegate_xdg_shell_v6};
//! use xdg_shell_v6::wayland::compositor::{CompositorHandler, CompositorState};
//! use xdg_shell_v6::wayland::shell::xdg_v6::{XdgV6ShellHandler, XdgV6ShellState};
//!
//! # struct State { compositor_state: CompositorState<State>, xdg_shell_state: XdgV6ShellState }
//! # let mut display = wayland_server::Display::<State>::new().unwrap();
//! let compositor_state = CompositorState::<State>::new(&display.handle());
//! let xdg_shell_state = XdgV6ShellState::new::<State>(&display.handle());
//!
//! impl CompositorHandler for State {
//!     fn compositor_state(&mut self) -> &mut CompositorState<Self> {
//!         &mut self.compositor_state
//!     }
//! }
//!
//! impl XdgV6ShellHandler for State {
//!     fn xdg_v6_shell_state(&mut self) -> &mut XdgV6ShellState {
//!         &mut self.xdg_shell_state
//!     }
//! }
//! delegate_compositor!(State);
//! delegate_xdg_shell_v6!(State);
//! ```
//!
//! ### Observing a surface
//!
//! Every [`ShellSurface`] carries a set of signalers. Registering on them returns a
//! [`SignalToken`](crate::utils::signaling::SignalToken) which must be kept alive for as
//! long as the callback should stay registered:
//!
//! ```no_run
//! # use xdg_shell_v6::wayland::shell::xdg_v6::{ShellSurfaceId, XdgV6ShellState};
//! # fn f(shell: &XdgV6ShellState, id: ShellSurfaceId) {
//! let token = shell.surface(id).unwrap().events().commit.register(|snapshot| {
//!     println!("{:?} committed geometry {}", snapshot.id, snapshot.geometry);
//! });
//! # }
//! ```

use std::fmt;

use indexmap::IndexMap;
use thiserror::Error;
use tracing::{debug, info, trace, warn};
use wayland_server::{
    backend::{protocol::ProtocolError, GlobalId},
    protocol::wl_seat::WlSeat,
    Dispatch, DisplayHandle, GlobalDispatch, Resource,
};

use crate::utils::{signaling::Signaler, HookId, Point, Rectangle, Serial, Size, SERIAL_COUNTER};
use crate::wayland::compositor::{CompositorHandler, RoleError, SurfaceId};

mod handlers;
pub mod protocol;


pub use self::handlers::{
    XdgPopupUserData, XdgPositionerUserData, XdgShellUserData, XdgSurfaceUserData, XdgToplevelUserData,
};

use self::protocol::server::{
    zxdg_popup_v6::ZxdgPopupV6,
    zxdg_positioner_v6::ZxdgPositionerV6,
    zxdg_shell_v6::{self, ZxdgShellV6},
    zxdg_surface_v6::ZxdgSurfaceV6,
    zxdg_toplevel_v6::{self, ZxdgToplevelV6},
};

pub use self::protocol::server::zxdg_toplevel_v6::ResizeEdge;

/// Role tag given to the `wl_surface` of a toplevel
pub const XDG_TOPLEVEL_ROLE: &str = "zxdg_toplevel_v6";
/// Role tag given to the `wl_surface` of a popup
pub const XDG_POPUP_ROLE: &str = "zxdg_popup_v6";

const SHELL_VERSION: u32 = 1;

/// Identifier of a client binding of the shell global
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

/// Identifier of a shell surface
///
/// Identifiers are never reused, so a lookup failing means the surface is defunct.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShellSurfaceId(u64);

impl fmt::Display for ShellSurfaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "xdg_surface#{}", self.0)
    }
}

/// Role of a shell surface
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShellSurfaceRole {
    /// No role was assigned yet
    #[default]
    None,
    /// The surface is a toplevel window
    Toplevel,
    /// The surface is a popup; only the role claim is tracked
    Popup,
}

impl ShellSurfaceRole {
    fn tag(self) -> Option<&'static str> {
        match self {
            ShellSurfaceRole::None => None,
            ShellSurfaceRole::Toplevel => Some(XDG_TOPLEVEL_ROLE),
            ShellSurfaceRole::Popup => Some(XDG_POPUP_ROLE),
        }
    }
}

/// Double-buffered attributes of a toplevel
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ToplevelState {
    /// The window is maximized
    pub maximized: bool,
    /// The window is fullscreen
    pub fullscreen: bool,
    /// The window is being interactively resized
    pub resizing: bool,
    /// The window is activated (has focus decorations)
    pub activated: bool,
    /// Minimum size requested by the client, zero meaning unconstrained
    pub min_size: Size,
    /// Maximum size requested by the client, zero meaning unconstrained
    pub max_size: Size,
}

/// State proposed by the compositor to a toplevel through a configure
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ToplevelConfigure {
    /// Proposed window geometry size, `0x0` lets the client decide
    pub size: Size,
    /// The window should be maximized
    pub maximized: bool,
    /// The window should be fullscreen
    pub fullscreen: bool,
    /// The window is being resized
    pub resizing: bool,
    /// The window is activated
    pub activated: bool,
}

impl ToplevelConfigure {
    fn states(&self) -> Vec<zxdg_toplevel_v6::State> {
        let mut states = Vec::new();
        if self.maximized {
            states.push(zxdg_toplevel_v6::State::Maximized);
        }
        if self.fullscreen {
            states.push(zxdg_toplevel_v6::State::Fullscreen);
        }
        if self.resizing {
            states.push(zxdg_toplevel_v6::State::Resizing);
        }
        if self.activated {
            states.push(zxdg_toplevel_v6::State::Activated);
        }
        states
    }

    // array of native-endian u32, as the wire expects
    fn encode_states(&self) -> Vec<u8> {
        self.states()
            .into_iter()
            .flat_map(|state| u32::from(state).to_ne_bytes())
            .collect()
    }
}

/// Role data of a toplevel shell surface
#[derive(Debug)]
pub struct ToplevelRoleData {
    current: ToplevelState,
    pending: ToplevelState,
    title: Option<String>,
    app_id: Option<String>,
    parent: Option<ShellSurfaceId>,
    resource: Option<ZxdgToplevelV6>,
}

impl ToplevelRoleData {
    fn new(resource: Option<ZxdgToplevelV6>) -> Self {
        ToplevelRoleData {
            current: ToplevelState::default(),
            pending: ToplevelState::default(),
            title: None,
            app_id: None,
            parent: None,
            resource,
        }
    }

    /// State applied by the last commit
    pub fn current(&self) -> &ToplevelState {
        &self.current
    }

    /// State that the next commit will apply
    pub fn pending(&self) -> &ToplevelState {
        &self.pending
    }

    /// Window title
    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    /// Application identifier
    pub fn app_id(&self) -> Option<&str> {
        self.app_id.as_deref()
    }

    /// Parent toplevel
    pub fn parent(&self) -> Option<ShellSurfaceId> {
        self.parent
    }
}

/// A point-in-time copy of the observable state of a shell surface
///
/// This is the payload of every [`ShellSurfaceEvents`] signal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellSurfaceSnapshot {
    /// Shell surface this snapshot was taken from
    pub id: ShellSurfaceId,
    /// Underlying surface
    pub surface: SurfaceId,
    /// Role of the surface
    pub role: ShellSurfaceRole,
    /// Current window geometry
    pub geometry: Rectangle,
    /// Current toplevel state, if the surface is a toplevel
    pub toplevel: Option<ToplevelState>,
    /// Toplevel title
    pub title: Option<String>,
    /// Toplevel application identifier
    pub app_id: Option<String>,
}

/// Signalers of a shell surface
#[derive(Debug, Default, Clone)]
pub struct ShellSurfaceEvents {
    /// Fired once, right before the shell surface is torn down
    pub destroy: Signaler<ShellSurfaceSnapshot>,
    /// Fired after every commit, once pending state was applied
    pub commit: Signaler<ShellSurfaceSnapshot>,
    /// Fired when a toplevel asks to be minimized
    pub request_minimize: Signaler<ShellSurfaceSnapshot>,
}

#[derive(Debug, Clone, Copy)]
struct PendingConfigure {
    serial: Serial,
    toplevel: Option<ToplevelConfigure>,
}

/// A `zxdg_surface_v6` tracked by the shell
#[derive(Debug)]
pub struct ShellSurface {
    id: ShellSurfaceId,
    connection: ConnectionId,
    surface: SurfaceId,
    role: ShellSurfaceRole,
    geometry: Rectangle,
    pending_geometry: Option<Rectangle>,
    toplevel: Option<ToplevelRoleData>,
    popup_parent: Option<ShellSurfaceId>,
    pending_configures: Vec<PendingConfigure>,
    last_acked: Option<Serial>,
    events: ShellSurfaceEvents,
    commit_hook: HookId,
    destruction_hook: HookId,
    resource: Option<ZxdgSurfaceV6>,
}

impl ShellSurface {
    /// Id of this shell surface
    pub fn id(&self) -> ShellSurfaceId {
        self.id
    }

    /// Connection that created this shell surface
    pub fn connection(&self) -> ConnectionId {
        self.connection
    }

    /// Underlying surface
    pub fn surface(&self) -> SurfaceId {
        self.surface
    }

    /// Role of this shell surface
    pub fn role(&self) -> ShellSurfaceRole {
        self.role
    }

    /// Window geometry applied by the last commit
    pub fn geometry(&self) -> Rectangle {
        self.geometry
    }

    /// Window geometry waiting for the next commit
    pub fn pending_geometry(&self) -> Option<Rectangle> {
        self.pending_geometry
    }

    /// Toplevel role data, if this is a toplevel
    pub fn toplevel(&self) -> Option<&ToplevelRoleData> {
        self.toplevel.as_ref()
    }

    /// Parent of this surface, if it is a popup
    pub fn popup_parent(&self) -> Option<ShellSurfaceId> {
        self.popup_parent
    }

    /// Last configure serial acknowledged by the client
    pub fn last_acked_configure(&self) -> Option<Serial> {
        self.last_acked
    }

    /// Number of configures sent but not yet acknowledged
    pub fn pending_configure_count(&self) -> usize {
        self.pending_configures.len()
    }

    /// Signalers of this shell surface
    pub fn events(&self) -> &ShellSurfaceEvents {
        &self.events
    }

    /// Protocol object of this shell surface, if created through the protocol
    pub fn resource(&self) -> Option<&ZxdgSurfaceV6> {
        self.resource.as_ref()
    }

    /// Copy of the observable state
    pub fn snapshot(&self) -> ShellSurfaceSnapshot {
        ShellSurfaceSnapshot {
            id: self.id,
            surface: self.surface,
            role: self.role,
            geometry: self.geometry,
            toplevel: self.toplevel.as_ref().map(|toplevel| toplevel.current),
            title: self.toplevel.as_ref().and_then(|toplevel| toplevel.title.clone()),
            app_id: self.toplevel.as_ref().and_then(|toplevel| toplevel.app_id.clone()),
        }
    }

    fn toplevel_mut(&mut self) -> Result<&mut ToplevelRoleData, ShellError> {
        self.toplevel.as_mut().ok_or(ShellError::NotToplevel)
    }

    fn send_configure(&self, serial: Serial, toplevel: Option<&ToplevelConfigure>) {
        if let (Some(configure), Some(resource)) = (
            toplevel,
            self.toplevel.as_ref().and_then(|data| data.resource.as_ref()),
        ) {
            resource.configure(configure.size.w, configure.size.h, configure.encode_states());
        }
        if let Some(resource) = self.resource.as_ref() {
            resource.configure(serial.into());
        }
    }
}

/// A client binding of the shell global
#[derive(Debug)]
pub struct ShellConnection {
    id: ConnectionId,
    version: u32,
    resource: Option<ZxdgShellV6>,
    pending_ping: Option<Serial>,
}

impl ShellConnection {
    /// Id of this connection
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Negotiated protocol version
    pub fn version(&self) -> u32 {
        self.version
    }

    /// Serial of the ping waiting for a pong, if any
    pub fn pending_ping(&self) -> Option<Serial> {
        self.pending_ping
    }
}

/// Configuration of the shell global
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct XdgV6ShellConfig {
    /// Highest protocol version advertised, clamped to the supported version
    pub max_version: u32,
    /// Maximum number of live shell surfaces per connection, `None` for no limit
    pub max_surfaces_per_client: Option<usize>,
}

impl Default for XdgV6ShellConfig {
    fn default() -> Self {
        XdgV6ShellConfig {
            max_version: SHELL_VERSION,
            max_surfaces_per_client: None,
        }
    }
}

/// Errors of shell operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ShellError {
    /// The client asked for a newer protocol version than advertised
    #[error("unsupported version {requested}, the shell supports up to {supported}")]
    UnsupportedVersion {
        /// requested version
        requested: u32,
        /// highest advertised version
        supported: u32,
    },
    /// The underlying surface already has a role
    #[error(transparent)]
    Role(#[from] RoleError),
    /// The shell surface was already destroyed
    #[error("the shell surface is defunct")]
    Defunct,
    /// The operation requires a toplevel
    #[error("the shell surface is not a toplevel")]
    NotToplevel,
    /// The underlying surface is dead
    #[error("the underlying surface is dead")]
    DeadSurface,
    /// The `wl_surface` was not created by this compositor
    #[error("the surface is not managed by this compositor")]
    UnmanagedSurface,
    /// The connection is not bound anymore
    #[error("unknown shell connection")]
    UnknownConnection,
    /// The connection reached its shell surface limit
    #[error("shell surface limit of {limit} reached")]
    NoMemory {
        /// configured limit
        limit: usize,
    },
}

/// Shell global state
#[derive(Debug)]
pub struct XdgV6ShellState {
    global: Option<GlobalId>,
    config: XdgV6ShellConfig,
    connections: IndexMap<ConnectionId, ShellConnection>,
    surfaces: IndexMap<ShellSurfaceId, ShellSurface>,
    next_id: u64,
}

impl XdgV6ShellState {
    /// Create a new `zxdg_shell_v6` global with the default configuration
    pub fn new<D>(display: &DisplayHandle) -> XdgV6ShellState
    where
        D: GlobalDispatch<ZxdgShellV6, ()>
            + Dispatch<ZxdgShellV6, XdgShellUserData>
            + Dispatch<ZxdgSurfaceV6, XdgSurfaceUserData>
            + Dispatch<ZxdgToplevelV6, XdgToplevelUserData>
            + Dispatch<ZxdgPopupV6, XdgPopupUserData>
            + Dispatch<ZxdgPositionerV6, XdgPositionerUserData>
            + XdgV6ShellHandler,
    {
        Self::new_with_config::<D>(display, XdgV6ShellConfig::default())
    }

    /// Create a new `zxdg_shell_v6` global
    pub fn new_with_config<D>(display: &DisplayHandle, config: XdgV6ShellConfig) -> XdgV6ShellState
    where
        D: GlobalDispatch<ZxdgShellV6, ()>
            + Dispatch<ZxdgShellV6, XdgShellUserData>
            + Dispatch<ZxdgSurfaceV6, XdgSurfaceUserData>
            + Dispatch<ZxdgToplevelV6, XdgToplevelUserData>
            + Dispatch<ZxdgPopupV6, XdgPopupUserData>
            + Dispatch<ZxdgPositionerV6, XdgPositionerUserData>
            + XdgV6ShellHandler,
    {
        let config = XdgV6ShellConfig {
            max_version: config.max_version.clamp(1, SHELL_VERSION),
            ..config
        };
        let global = display.create_global::<D, ZxdgShellV6, _>(config.max_version, ());
        info!(version = config.max_version, "Created zxdg_shell_v6 global");

        XdgV6ShellState {
            global: Some(global),
            config,
            connections: IndexMap::new(),
            surfaces: IndexMap::new(),
            next_id: 0,
        }
    }

    /// Id of the global, until [`XdgV6ShellState::shutdown`]
    pub fn global(&self) -> Option<GlobalId> {
        self.global.clone()
    }

    /// Advertised protocol version
    pub fn version(&self) -> u32 {
        self.config.max_version
    }

    /// Configuration in use
    pub fn config(&self) -> &XdgV6ShellConfig {
        &self.config
    }

    fn next_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Register a client binding
    ///
    /// Fails without registering anything if `version` is above the advertised version.
    pub fn bind(&mut self, version: u32, resource: Option<ZxdgShellV6>) -> Result<ConnectionId, ShellError> {
        if version > self.version() {
            warn!(requested = version, supported = self.version(), "Client requested unsupported zxdg_shell_v6 version");
            return Err(ShellError::UnsupportedVersion {
                requested: version,
                supported: self.version(),
            });
        }
        let id = ConnectionId(self.next_id());
        self.connections.insert(
            id,
            ShellConnection {
                id,
                version,
                resource,
                pending_ping: None,
            },
        );
        debug!(connection = ?id, version, "New zxdg_shell_v6 connection");
        Ok(id)
    }

    /// Forget a client binding
    ///
    /// Shell surfaces created through it are left alone: they are torn down by their own
    /// destroy triggers.
    pub fn remove_connection(&mut self, connection: ConnectionId) -> bool {
        self.connections.shift_remove(&connection).is_some()
    }

    /// Access a connection
    pub fn connection(&self, connection: ConnectionId) -> Option<&ShellConnection> {
        self.connections.get(&connection)
    }

    /// Iterate over bound connections
    pub fn connections(&self) -> impl Iterator<Item = &ShellConnection> {
        self.connections.values()
    }

    /// Access a shell surface
    pub fn surface(&self, id: ShellSurfaceId) -> Option<&ShellSurface> {
        self.surfaces.get(&id)
    }

    /// Iterate over live shell surfaces, in creation order
    pub fn surfaces(&self) -> impl Iterator<Item = &ShellSurface> {
        self.surfaces.values()
    }

    /// Iterate over live toplevels, in creation order
    pub fn toplevels(&self) -> impl Iterator<Item = &ShellSurface> {
        self.surfaces.values().filter(|surface| surface.toplevel.is_some())
    }

    /// Number of live shell surfaces created through a connection
    pub fn surface_count(&self, connection: ConnectionId) -> usize {
        self.surfaces
            .values()
            .filter(|surface| surface.connection == connection)
            .count()
    }

    /// Shell surface wrapping a given surface, if any
    pub fn surface_for(&self, surface: SurfaceId) -> Option<&ShellSurface> {
        self.surfaces.values().find(|shell_surface| shell_surface.surface == surface)
    }

    fn get_mut(&mut self, id: ShellSurfaceId) -> Result<&mut ShellSurface, ShellError> {
        self.surfaces.get_mut(&id).ok_or(ShellError::Defunct)
    }

    /// Set the pending window geometry
    ///
    /// The last value set before a commit wins. No validation is done against the
    /// surface extents.
    pub fn set_window_geometry(&mut self, id: ShellSurfaceId, geometry: Rectangle) -> Result<(), ShellError> {
        self.get_mut(id)?.pending_geometry = Some(geometry);
        Ok(())
    }

    /// Set the pending maximum size of a toplevel
    pub fn set_max_size(&mut self, id: ShellSurfaceId, size: Size) -> Result<(), ShellError> {
        self.get_mut(id)?.toplevel_mut()?.pending.max_size = size;
        Ok(())
    }

    /// Set the pending minimum size of a toplevel
    pub fn set_min_size(&mut self, id: ShellSurfaceId, size: Size) -> Result<(), ShellError> {
        self.get_mut(id)?.toplevel_mut()?.pending.min_size = size;
        Ok(())
    }

    /// Set or unset the pending maximized flag of a toplevel
    pub fn set_maximized(&mut self, id: ShellSurfaceId, maximized: bool) -> Result<(), ShellError> {
        self.get_mut(id)?.toplevel_mut()?.pending.maximized = maximized;
        Ok(())
    }

    /// Set or unset the pending fullscreen flag of a toplevel
    pub fn set_fullscreen(&mut self, id: ShellSurfaceId, fullscreen: bool) -> Result<(), ShellError> {
        self.get_mut(id)?.toplevel_mut()?.pending.fullscreen = fullscreen;
        Ok(())
    }

    /// Set the title of a toplevel, effective immediately
    pub fn set_title(&mut self, id: ShellSurfaceId, title: String) -> Result<(), ShellError> {
        self.get_mut(id)?.toplevel_mut()?.title = Some(title);
        Ok(())
    }

    /// Set the application id of a toplevel, effective immediately
    pub fn set_app_id(&mut self, id: ShellSurfaceId, app_id: String) -> Result<(), ShellError> {
        self.get_mut(id)?.toplevel_mut()?.app_id = Some(app_id);
        Ok(())
    }

    /// Set the parent of a toplevel, effective immediately
    ///
    /// Anything else than another live toplevel clears the parent.
    pub fn set_parent(&mut self, id: ShellSurfaceId, parent: Option<ShellSurfaceId>) -> Result<(), ShellError> {
        let parent = parent.filter(|parent| {
            *parent != id
                && self
                    .surfaces
                    .get(parent)
                    .is_some_and(|surface| surface.toplevel.is_some())
        });
        self.get_mut(id)?.toplevel_mut()?.parent = parent;
        Ok(())
    }

    /// Forward a minimize request of a toplevel to the `request_minimize` subscribers
    ///
    /// Minimization is a one-shot request, nothing is buffered.
    pub fn request_minimize(&mut self, id: ShellSurfaceId) -> Result<(), ShellError> {
        let surface = self.get_mut(id)?;
        surface.toplevel_mut()?;
        let snapshot = surface.snapshot();
        let signal = surface.events.request_minimize.clone();
        signal.signal(snapshot);
        Ok(())
    }

    /// Propose a new state to a toplevel
    ///
    /// Sends a toplevel configure followed by a surface configure and returns the serial
    /// the client is expected to acknowledge.
    pub fn configure_toplevel(
        &mut self,
        id: ShellSurfaceId,
        configure: ToplevelConfigure,
    ) -> Result<Serial, ShellError> {
        let surface = self.get_mut(id)?;
        surface.toplevel_mut()?;
        let serial = SERIAL_COUNTER.next_serial();
        surface.pending_configures.push(PendingConfigure {
            serial,
            toplevel: Some(configure),
        });
        surface.send_configure(serial, Some(&configure));
        trace!(surface = %id, serial = %serial, ?configure, "Configure sent");
        Ok(serial)
    }

    /// Handle the acknowledgement of a configure
    ///
    /// Every configure up to the acknowledged one is retired. The compositor-owned flags
    /// of the acknowledged configure (`activated` and `resizing`) are written to the
    /// pending toplevel state, and become current with the next commit. An unknown serial
    /// is ignored and `None` is returned.
    pub fn ack_configure(
        &mut self,
        id: ShellSurfaceId,
        serial: Serial,
    ) -> Result<Option<ToplevelConfigure>, ShellError> {
        let surface = self.get_mut(id)?;
        let Some(position) = surface
            .pending_configures
            .iter()
            .position(|configure| configure.serial == serial)
        else {
            debug!(surface = %id, serial = %serial, "Ack of an unknown configure serial");
            return Ok(None);
        };
        let acked = surface.pending_configures.drain(..=position).last();
        surface.last_acked = Some(serial);

        let configure = acked.and_then(|acked| acked.toplevel);
        if let (Some(configure), Some(toplevel)) = (configure, surface.toplevel.as_mut()) {
            toplevel.pending.activated = configure.activated;
            toplevel.pending.resizing = configure.resizing;
        }
        Ok(configure)
    }

    pub(crate) fn detach_toplevel_resource(&mut self, id: ShellSurfaceId) {
        if let Some(toplevel) = self.surfaces.get_mut(&id).and_then(|surface| surface.toplevel.as_mut()) {
            toplevel.resource = None;
        }
    }

    /// Send a ping to a connection
    pub fn send_ping(&mut self, connection: ConnectionId) -> Result<Serial, ShellError> {
        let connection = self
            .connections
            .get_mut(&connection)
            .ok_or(ShellError::UnknownConnection)?;
        let serial = SERIAL_COUNTER.next_serial();
        connection.pending_ping = Some(serial);
        if let Some(resource) = connection.resource.as_ref() {
            resource.ping(serial.into());
        }
        Ok(serial)
    }

    /// Handle a pong, returns whether it answered the outstanding ping
    pub fn pong(&mut self, connection: ConnectionId, serial: Serial) -> bool {
        match self.connections.get_mut(&connection) {
            Some(connection) if connection.pending_ping == Some(serial) => {
                connection.pending_ping = None;
                true
            }
            _ => false,
        }
    }

    /// Create a shell surface on top of `surface`
    ///
    /// The shell surface starts without role. Hooks are installed on the underlying
    /// surface so that its commits run the commit pipeline and its destruction tears the
    /// shell surface down. Nothing is installed if any check fails.
    pub fn get_shell_surface<D>(
        state: &mut D,
        connection: ConnectionId,
        surface: SurfaceId,
        resource: Option<ZxdgSurfaceV6>,
    ) -> Result<ShellSurfaceId, ShellError>
    where
        D: XdgV6ShellHandler,
    {
        let shell = state.xdg_v6_shell_state();
        if !shell.connections.contains_key(&connection) {
            return Err(ShellError::UnknownConnection);
        }
        if let Some(limit) = shell.config.max_surfaces_per_client {
            if shell.surface_count(connection) >= limit {
                warn!(connection = ?connection, limit, "Shell surface limit reached");
                return Err(ShellError::NoMemory { limit });
            }
        }
        if !state.compositor_state().alive(surface) {
            return Err(ShellError::DeadSurface);
        }

        let id = ShellSurfaceId(state.xdg_v6_shell_state().next_id());
        let compositor = state.compositor_state();
        let commit_hook = compositor
            .add_commit_hook(surface, move |state: &mut D, _| {
                XdgV6ShellState::handle_commit(state, id);
            })
            .ok_or(ShellError::DeadSurface)?;
        let Some(destruction_hook) = compositor.add_destruction_hook(surface, move |state: &mut D, _| {
            XdgV6ShellState::destroy_shell_surface(state, id);
        }) else {
            compositor.remove_commit_hook(surface, commit_hook);
            return Err(ShellError::DeadSurface);
        };

        state.xdg_v6_shell_state().surfaces.insert(
            id,
            ShellSurface {
                id,
                connection,
                surface,
                role: ShellSurfaceRole::None,
                geometry: Rectangle::default(),
                pending_geometry: None,
                toplevel: None,
                popup_parent: None,
                pending_configures: Vec::new(),
                last_acked: None,
                events: ShellSurfaceEvents::default(),
                commit_hook,
                destruction_hook,
                resource,
            },
        );
        debug!(surface = %id, wl_surface = %surface, "New shell surface");
        state.new_shell_surface(id);
        Ok(id)
    }

    /// Give the toplevel role to a shell surface
    ///
    /// The role tag is claimed on the underlying surface, so a surface already holding any
    /// role is rejected. On success the initial configure is sent and its serial returned.
    pub fn get_toplevel<D>(
        state: &mut D,
        id: ShellSurfaceId,
        resource: Option<ZxdgToplevelV6>,
    ) -> Result<Serial, ShellError>
    where
        D: XdgV6ShellHandler,
    {
        let shell_surface = state.xdg_v6_shell_state().get_mut(id)?;
        if let Some(current) = shell_surface.role.tag() {
            return Err(RoleError::AlreadyHasRole {
                current,
                requested: XDG_TOPLEVEL_ROLE,
            }
            .into());
        }
        let surface = shell_surface.surface;
        let role_data = ToplevelRoleData::new(resource);

        state.compositor_state().give_role(surface, XDG_TOPLEVEL_ROLE)?;

        let Some(shell_surface) = state.xdg_v6_shell_state().surfaces.get_mut(&id) else {
            state.compositor_state().remove_role(surface, XDG_TOPLEVEL_ROLE);
            return Err(ShellError::Defunct);
        };
        shell_surface.role = ShellSurfaceRole::Toplevel;
        shell_surface.toplevel = Some(role_data);

        let serial = SERIAL_COUNTER.next_serial();
        let configure = ToplevelConfigure::default();
        shell_surface.pending_configures.push(PendingConfigure {
            serial,
            toplevel: Some(configure),
        });
        shell_surface.send_configure(serial, Some(&configure));
        debug!(surface = %id, serial = %serial, "New toplevel");

        state.new_toplevel(id);
        Ok(serial)
    }

    /// Give the popup role to a shell surface
    ///
    /// Only the role claim is performed; popup placement is left to the compositor.
    pub fn get_popup<D>(state: &mut D, id: ShellSurfaceId, parent: Option<ShellSurfaceId>) -> Result<(), ShellError>
    where
        D: XdgV6ShellHandler,
    {
        let shell_surface = state.xdg_v6_shell_state().get_mut(id)?;
        if let Some(current) = shell_surface.role.tag() {
            return Err(RoleError::AlreadyHasRole {
                current,
                requested: XDG_POPUP_ROLE,
            }
            .into());
        }
        let surface = shell_surface.surface;

        state.compositor_state().give_role(surface, XDG_POPUP_ROLE)?;

        let shell = state.xdg_v6_shell_state();
        let parent = parent.filter(|parent| shell.surfaces.contains_key(parent));
        let Some(shell_surface) = shell.surfaces.get_mut(&id) else {
            state.compositor_state().remove_role(surface, XDG_POPUP_ROLE);
            return Err(ShellError::Defunct);
        };
        shell_surface.role = ShellSurfaceRole::Popup;
        shell_surface.popup_parent = parent;
        debug!(surface = %id, parent = ?parent, "New popup");

        state.new_popup(id);
        Ok(())
    }

    /// Commit pipeline of a shell surface
    ///
    /// Runs on every commit of the underlying surface: promotes the pending geometry if
    /// one was set, promotes the whole pending toplevel state if the surface is a
    /// toplevel, and then fires the `commit` signal with the promoted state.
    pub fn handle_commit<D>(state: &mut D, id: ShellSurfaceId)
    where
        D: XdgV6ShellHandler,
    {
        let Some(shell_surface) = state.xdg_v6_shell_state().surfaces.get_mut(&id) else {
            return;
        };
        if let Some(geometry) = shell_surface.pending_geometry.take() {
            shell_surface.geometry = geometry;
        }
        if let Some(toplevel) = shell_surface.toplevel.as_mut() {
            toplevel.current = toplevel.pending;
        }

        let snapshot = shell_surface.snapshot();
        let signal = shell_surface.events.commit.clone();
        trace!(surface = %id, geometry = %snapshot.geometry, "Shell surface committed");
        signal.signal(snapshot);

        state.surface_committed(id);
    }

    /// Destroy pipeline of a shell surface
    ///
    /// Fires the `destroy` signal while the surface is still fully readable, then removes
    /// the hooks from the underlying surface and forgets the shell surface. Returns
    /// `false` if the surface was already destroyed.
    pub fn destroy_shell_surface<D>(state: &mut D, id: ShellSurfaceId) -> bool
    where
        D: XdgV6ShellHandler,
    {
        let shell = state.xdg_v6_shell_state();
        let Some(shell_surface) = shell.surfaces.get(&id) else {
            trace!(surface = %id, "Shell surface already destroyed");
            return false;
        };
        let snapshot = shell_surface.snapshot();
        let signal = shell_surface.events.destroy.clone();
        signal.signal(snapshot.clone());

        let shell = state.xdg_v6_shell_state();
        let Some(shell_surface) = shell.surfaces.shift_remove(&id) else {
            return false;
        };
        for other in shell.surfaces.values_mut() {
            if let Some(toplevel) = other.toplevel.as_mut() {
                if toplevel.parent == Some(id) {
                    toplevel.parent = None;
                }
            }
            if other.popup_parent == Some(id) {
                other.popup_parent = None;
            }
        }

        let compositor = state.compositor_state();
        compositor.remove_commit_hook(shell_surface.surface, shell_surface.commit_hook);
        compositor.remove_destruction_hook(shell_surface.surface, shell_surface.destruction_hook);
        debug!(surface = %id, "Shell surface destroyed");

        state.surface_destroyed(snapshot);
        true
    }

    /// Tear the shell down
    ///
    /// Every live shell surface goes through the destroy pipeline, the connections are
    /// forgotten and the global is removed. Later requests on remaining protocol objects
    /// are ignored.
    pub fn shutdown<D>(state: &mut D, display: &DisplayHandle)
    where
        D: XdgV6ShellHandler,
    {
        let ids: Vec<ShellSurfaceId> = state.xdg_v6_shell_state().surfaces.keys().copied().collect();
        for id in ids {
            XdgV6ShellState::destroy_shell_surface(state, id);
        }

        let shell = state.xdg_v6_shell_state();
        shell.connections.clear();
        if let Some(global) = shell.global.take() {
            display.remove_global::<D>(global);
            info!("Removed zxdg_shell_v6 global");
        }
    }
}

/// Handler trait for xdg shell v6
///
/// Every method but [`XdgV6ShellHandler::xdg_v6_shell_state`] has a default
/// implementation doing nothing.
#[allow(unused_variables)]
pub trait XdgV6ShellHandler: CompositorHandler {
    /// [`XdgV6ShellState`] getter
    fn xdg_v6_shell_state(&mut self) -> &mut XdgV6ShellState;

    /// A client bound the shell global
    fn new_client(&mut self, connection: ConnectionId) {}

    /// A client binding of the shell global was destroyed
    fn client_destroyed(&mut self, connection: ConnectionId) {}

    /// A client answered the outstanding ping
    fn client_pong(&mut self, connection: ConnectionId) {}

    /// A shell surface was created
    fn new_shell_surface(&mut self, surface: ShellSurfaceId) {}

    /// A shell surface became a toplevel; the initial configure was already sent
    fn new_toplevel(&mut self, surface: ShellSurfaceId) {}

    /// A shell surface became a popup
    fn new_popup(&mut self, surface: ShellSurfaceId) {}

    /// A shell surface was committed and its pending state applied
    fn surface_committed(&mut self, surface: ShellSurfaceId) {}

    /// A shell surface was destroyed
    fn surface_destroyed(&mut self, snapshot: ShellSurfaceSnapshot) {}

    /// A client acknowledged a configure
    fn ack_configure(&mut self, surface: ShellSurfaceId, configure: ToplevelConfigure) {}

    /// A toplevel asked for an interactive move
    fn move_request(&mut self, surface: ShellSurfaceId, seat: WlSeat, serial: Serial) {}

    /// A toplevel asked for an interactive resize
    fn resize_request(&mut self, surface: ShellSurfaceId, seat: WlSeat, serial: Serial, edges: ResizeEdge) {}

    /// A toplevel asked for the window menu
    fn show_window_menu(&mut self, surface: ShellSurfaceId, seat: WlSeat, serial: Serial, location: Point) {}
}

// `wl_display.error` codes
const DISPLAY_ERROR_INVALID_OBJECT: u32 = 0;
const DISPLAY_ERROR_NO_MEMORY: u32 = 2;

/// Report a failed request to the client owning `resource`
///
/// Role conflicts are errors of the shell interface. Exhausted resources and bad surface
/// arguments are `wl_display` errors, so the client is killed with an error on the display
/// object. Requests on defunct objects are dropped.
pub(crate) fn post_shell_error(dh: &DisplayHandle, resource: &impl Resource, error: &ShellError) {
    match error {
        ShellError::Role(RoleError::AlreadyHasRole { .. }) => {
            resource.post_error(zxdg_shell_v6::Error::Role, error.to_string())
        }
        ShellError::NoMemory { .. } => kill_client(dh, resource, DISPLAY_ERROR_NO_MEMORY, error),
        ShellError::UnsupportedVersion { .. }
        | ShellError::UnmanagedSurface
        | ShellError::DeadSurface
        | ShellError::Role(RoleError::DeadSurface) => {
            kill_client(dh, resource, DISPLAY_ERROR_INVALID_OBJECT, error)
        }
        ShellError::Defunct | ShellError::NotToplevel | ShellError::UnknownConnection => {
            debug!(object = %resource.id(), %error, "Request ignored");
        }
    }
}

fn kill_client(dh: &DisplayHandle, resource: &impl Resource, code: u32, error: &ShellError) {
    let Some(client) = resource.client() else {
        debug!(object = %resource.id(), %error, "Client already gone");
        return;
    };
    warn!(object = %resource.id(), %error, code, "Killing client");
    client.kill(
        dh,
        ProtocolError {
            code,
            object_id: 1,
            object_interface: "wl_display".into(),
            message: error.to_string(),
        },
    );
}

#[allow(missing_docs)]
#[macro_export]
macro_rules! delegate_xdg_shell_v6 {
    ($(@<$( $lt:tt $( : $clt:tt $(+ $dlt:tt )* )? ),+>)? $ty: ty) => {
        $crate::reexports::wayland_server::delegate_global_dispatch!($(@< $( $lt $( : $clt $(+ $dlt )* )? ),+ >)? $ty: [
            $crate::wayland::shell::xdg_v6::protocol::server::zxdg_shell_v6::ZxdgShellV6: ()
        ] => $crate::wayland::shell::xdg_v6::XdgV6ShellState);
        $crate::reexports::wayland_server::delegate_dispatch!($(@< $( $lt $( : $clt $(+ $dlt )* )? ),+ >)? $ty: [
            $crate::wayland::shell::xdg_v6::protocol::server::zxdg_shell_v6::ZxdgShellV6: $crate::wayland::shell::xdg_v6::XdgShellUserData
        ] => $crate::wayland::shell::xdg_v6::XdgV6ShellState);
        $crate::reexports::wayland_server::delegate_dispatch!($(@< $( $lt $( : $clt $(+ $dlt )* )? ),+ >)? $ty: [
            $crate::wayland::shell::xdg_v6::protocol::server::zxdg_surface_v6::ZxdgSurfaceV6: $crate::wayland::shell::xdg_v6::XdgSurfaceUserData
        ] => $crate::wayland::shell::xdg_v6::XdgV6ShellState);
        $crate::reexports::wayland_server::delegate_dispatch!($(@< $( $lt $( : $clt $(+ $dlt )* )? ),+ >)? $ty: [
            $crate::wayland::shell::xdg_v6::protocol::server::zxdg_toplevel_v6::ZxdgToplevelV6: $crate::wayland::shell::xdg_v6::XdgToplevelUserData
        ] => $crate::wayland::shell::xdg_v6::XdgV6ShellState);
        $crate::reexports::wayland_server::delegate_dispatch!($(@< $( $lt $( : $clt $(+ $dlt )* )? ),+ >)? $ty: [
            $crate::wayland::shell::xdg_v6::protocol::server::zxdg_popup_v6::ZxdgPopupV6: $crate::wayland::shell::xdg_v6::XdgPopupUserData
        ] => $crate::wayland::shell::xdg_v6::XdgV6ShellState);
        $crate::reexports::wayland_server::delegate_dispatch!($(@< $( $lt $( : $clt $(+ $dlt )* )? ),+ >)? $ty: [
            $crate::wayland::shell::xdg_v6::protocol::server::zxdg_positioner_v6::ZxdgPositionerV6: $crate::wayland::shell::xdg_v6::XdgPositionerUserData
        ] => $crate::wayland::shell::xdg_v6::XdgV6ShellState);
    };
}
