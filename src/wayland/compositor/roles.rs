//! Surface role tags
//!
//! A role is an exclusive tag attached to a surface: once a surface carries one, any
//! further claim fails, whether it is for the same role or another one. The tag is
//! identified by a static string, usually the name of the protocol interface granting it.

use thiserror::Error;
use tracing::debug;

use super::{CompositorState, SurfaceId};

/// Failure to assign a role to a surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RoleError {
    /// The surface already carries a role
    #[error("surface already has the role {current:?}, cannot give it {requested:?}")]
    AlreadyHasRole {
        /// role currently held by the surface
        current: &'static str,
        /// role that was requested
        requested: &'static str,
    },
    /// The surface was destroyed
    #[error("the surface is dead")]
    DeadSurface,
}

impl<D> CompositorState<D> {
    /// Give a role to a surface
    pub fn give_role(&mut self, surface: SurfaceId, role: &'static str) -> Result<(), RoleError> {
        let data = self.surfaces.get_mut(&surface).ok_or(RoleError::DeadSurface)?;
        if let Some(current) = data.role {
            debug!(surface = %surface, current, requested = role, "Role conflict");
            return Err(RoleError::AlreadyHasRole {
                current,
                requested: role,
            });
        }
        data.role = Some(role);
        Ok(())
    }

    /// Role currently held by a surface
    pub fn get_role(&self, surface: SurfaceId) -> Option<&'static str> {
        self.surfaces.get(&surface).and_then(|data| data.role)
    }

    /// Whether the surface carries any role
    pub fn has_a_role(&self, surface: SurfaceId) -> bool {
        self.get_role(surface).is_some()
    }

    /// Release a role tag
    ///
    /// Only releases it if `role` is the role the surface actually holds. Returns whether
    /// a role was released.
    pub fn remove_role(&mut self, surface: SurfaceId, role: &'static str) -> bool {
        match self.surfaces.get_mut(&surface) {
            Some(data) if data.role == Some(role) => {
                data.role = None;
                true
            }
            _ => false,
        }
    }
}
