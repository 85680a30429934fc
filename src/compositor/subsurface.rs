//! Sub-surface role handling
//!
//! A sub-surface ties a surface to a parent surface, positioned in the
//! parent's coordinate space. Its commits are either applied on their own
//! (desynchronized) or deferred and folded into the next ancestor commit
//! (synchronized). A sub-surface is *effectively* synchronized if itself or
//! any of its ancestors is in synchronized mode.

use tracing::trace;

use crate::error::{ErrorCode, ObjectRef, ProtocolError};
use crate::utils::{Logical, Point};
use crate::{Display, SurfaceId};

/// Role of a surface turned into a sub-surface
pub const SUBSURFACE_ROLE: &str = "subsurface";

#[derive(Debug)]
pub(crate) struct SubsurfaceState {
    /// Synchronized commit mode; sub-surfaces start out synchronized
    pub(crate) sync: bool,
    /// Applied position relative to the parent
    pub(crate) position: Point<i32, Logical>,
    /// Position staged for the next parent commit
    pub(crate) pending_position: Option<Point<i32, Logical>>,
}

impl Default for SubsurfaceState {
    fn default() -> Self {
        SubsurfaceState {
            sync: true,
            position: Point::default(),
            pending_position: None,
        }
    }
}

/// Sibling placement anchor used by the reordering requests
#[derive(Debug, Clone, Copy)]
enum Location {
    Before,
    After,
}

impl Display {
    /// Give `surface` the sub-surface role with `parent` as its parent
    ///
    /// Fails with a role error when the surface already has another role,
    /// and with `bad_surface` when the parent relation would create a
    /// cycle.
    pub fn get_subsurface(&mut self, surface: SurfaceId, parent: SurfaceId) -> Result<(), ProtocolError> {
        if !self.surfaces.contains_key(&surface) || !self.surfaces.contains_key(&parent) {
            return Ok(());
        }
        if surface == parent || self.is_ancestor(surface, parent) {
            return Err(ProtocolError::new(
                ObjectRef::Subsurface(surface),
                ErrorCode::BadSurface,
                "requested parent is the surface itself or one of its descendants",
            ));
        }
        {
            let data = self.surfaces.get_mut(&surface).unwrap();
            if data.role.is_some() {
                return Err(ProtocolError::new(
                    ObjectRef::Surface(surface),
                    ErrorCode::Role,
                    "surface already has a role",
                ));
            }
            data.role = Some(SUBSURFACE_ROLE);
            data.parent = Some(parent);
            data.subsurface = Some(SubsurfaceState::default());
        }
        let parent_data = self.surfaces.get_mut(&parent).unwrap();
        parent_data.children.push(surface);
        parent_data.pending_children.push(surface);
        trace!(surface = ?surface, parent = ?parent, "new subsurface");
        Ok(())
    }

    /// Destroy the sub-surface object of `surface`
    ///
    /// The surface itself keeps existing, detached from its parent and
    /// with no role attached anymore.
    pub fn destroy_subsurface(&mut self, surface: SurfaceId) {
        let Some(data) = self.surfaces.get_mut(&surface) else {
            return;
        };
        if data.subsurface.is_none() {
            return;
        }
        data.subsurface = None;
        data.role = None;
        let parent = data.parent.take();
        if let Some(parent) = parent {
            if let Some(parent_data) = self.surfaces.get_mut(&parent) {
                parent_data.children.retain(|c| *c != surface);
                parent_data.pending_children.retain(|c| *c != surface);
            }
        }
    }

    /// Stage a new position for the sub-surface, relative to its parent
    ///
    /// Applied on the next parent commit.
    pub fn subsurface_set_position(&mut self, surface: SurfaceId, position: Point<i32, Logical>) {
        if let Some(sub) = self
            .surfaces
            .get_mut(&surface)
            .and_then(|data| data.subsurface.as_mut())
        {
            sub.pending_position = Some(position);
        }
    }

    /// Applied position of the sub-surface relative to its parent
    pub fn subsurface_position(&self, surface: SurfaceId) -> Option<Point<i32, Logical>> {
        self.surfaces
            .get(&surface)
            .and_then(|data| data.subsurface.as_ref())
            .map(|sub| sub.position)
    }

    /// Stage `surface` directly above `sibling` in the parent's stacking
    ///
    /// `sibling` may be the parent itself. Applied on the next parent
    /// commit.
    pub fn subsurface_place_above(
        &mut self,
        surface: SurfaceId,
        sibling: SurfaceId,
    ) -> Result<(), ProtocolError> {
        self.reorder(surface, Location::After, sibling)
    }

    /// Stage `surface` directly below `sibling` in the parent's stacking
    pub fn subsurface_place_below(
        &mut self,
        surface: SurfaceId,
        sibling: SurfaceId,
    ) -> Result<(), ProtocolError> {
        self.reorder(surface, Location::Before, sibling)
    }

    /// Put the sub-surface in synchronized mode
    pub fn subsurface_set_sync(&mut self, surface: SurfaceId) {
        if let Some(sub) = self
            .surfaces
            .get_mut(&surface)
            .and_then(|data| data.subsurface.as_mut())
        {
            sub.sync = true;
        }
    }

    /// Put the sub-surface in desynchronized mode
    ///
    /// If the surface becomes effectively desynchronized, its queued
    /// commits (and those of its synchronized subtree) are flushed
    /// immediately, in order, as one atomic batch.
    pub fn subsurface_set_desync(&mut self, surface: SurfaceId) {
        let Some(sub) = self
            .surfaces
            .get_mut(&surface)
            .and_then(|data| data.subsurface.as_mut())
        else {
            return;
        };
        if !sub.sync {
            return;
        }
        sub.sync = false;
        if !self.surface_effectively_sync(surface) {
            trace!(surface = ?surface, "flushing cached commits after desync switch");
            self.apply_sync_subtree(surface);
        }
    }

    /// Whether the surface's commits are currently deferred to an
    /// ancestor commit
    ///
    /// A sub-surface whose parent is gone behaves like a root surface
    /// again.
    pub fn surface_effectively_sync(&self, surface: SurfaceId) -> bool {
        let mut cursor = Some(surface);
        while let Some(id) = cursor {
            let Some(data) = self.surfaces.get(&id) else {
                return false;
            };
            match (&data.subsurface, data.parent) {
                (Some(sub), Some(parent)) => {
                    if sub.sync {
                        return true;
                    }
                    cursor = Some(parent);
                }
                _ => return false,
            }
        }
        false
    }

    /// Parent of the sub-surface, if any
    pub fn surface_parent(&self, surface: SurfaceId) -> Option<SurfaceId> {
        self.surfaces.get(&surface).and_then(|data| data.parent)
    }

    /// Applied stacking order below `surface`, bottom to top, with the
    /// surface itself included
    pub fn surface_stack(&self, surface: SurfaceId) -> Vec<SurfaceId> {
        self.surfaces
            .get(&surface)
            .map(|data| data.children.clone())
            .unwrap_or_default()
    }

    /// Checks whether `a` is an ancestor of `b`
    pub(crate) fn is_ancestor(&self, a: SurfaceId, b: SurfaceId) -> bool {
        let mut cursor = self.surfaces.get(&b).and_then(|data| data.parent);
        while let Some(id) = cursor {
            if id == a {
                return true;
            }
            cursor = self.surfaces.get(&id).and_then(|data| data.parent);
        }
        false
    }

    fn reorder(
        &mut self,
        surface: SurfaceId,
        to: Location,
        sibling: SurfaceId,
    ) -> Result<(), ProtocolError> {
        let Some(parent) = self
            .surfaces
            .get(&surface)
            .filter(|data| data.subsurface.is_some())
            .and_then(|data| data.parent)
        else {
            return Ok(());
        };

        let parent_data = self.surfaces.get_mut(&parent).unwrap();
        let my_index = match parent_data.pending_children.iter().position(|c| *c == surface) {
            Some(idx) => idx,
            None => return Ok(()),
        };
        let Some(mut other_index) = parent_data.pending_children.iter().position(|c| *c == sibling) else {
            return Err(ProtocolError::new(
                ObjectRef::Subsurface(surface),
                ErrorCode::BadSurface,
                "anchor is not a sibling or the parent of the sub-surface",
            ));
        };
        let me = parent_data.pending_children.remove(my_index);
        if my_index < other_index {
            other_index -= 1;
        }
        let new_index = match to {
            Location::Before => other_index,
            Location::After => other_index + 1,
        };
        parent_data.pending_children.insert(new_index, me);
        Ok(())
    }
}
