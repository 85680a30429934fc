//! Surface state handling
//!
//! Surfaces are opaque renderable regions owned by a client. All mutating
//! requests are double-buffered: they land in the pending state and only
//! become observable on `commit`. A surface may carry at most one *role*
//! (sub-surface, drag icon, …) which is fixed for its lifetime, with the
//! single exception of the sub-surface role, which ends when the
//! sub-surface object is destroyed.
//!
//! The compositor never inspects buffer contents; buffers are opaque
//! handles supplied by the host's buffer management.

mod cache;
pub(crate) mod subsurface;

use std::collections::HashMap;

use tracing::{debug, trace};

use crate::error::{ErrorCode, ObjectRef, ProtocolError};
use crate::event::ClientEvent;
use crate::pointer_constraints::PointerConstraint;
use crate::utils::{Logical, Point, Rectangle, RegionAttributes};
use crate::{CallbackId, ClientId, Display, SeatId, SurfaceId};

pub use self::cache::{Cacheable, CachedState};
pub use self::subsurface::SUBSURFACE_ROLE;

/// Role of a surface promoted to a drag-and-drop icon
pub const DND_ICON_ROLE: &str = "dnd_icon";

/// An opaque handle to client buffer contents
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferHandle(pub u64);

/// Contents of a surface attach
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferAssignment {
    /// The surface got detached from its buffer
    Removed,
    /// A new buffer was attached
    NewBuffer(BufferHandle),
}

/// Double-buffered attributes of a surface
#[derive(Debug, Default)]
pub struct SurfaceAttributes {
    /// Buffer attached since the last generation, if any
    ///
    /// `None` means the attachment did not change; the current state keeps
    /// whatever buffer was applied last.
    pub buffer: Option<BufferAssignment>,
    /// Offset of the attach relative to the previous buffer origin
    ///
    /// Accumulates when several generations are drained in one batch; it
    /// is consumed by role handlers (the drag icon tracks its position
    /// with it) when a commit is applied.
    pub buffer_delta: Option<Point<i32, Logical>>,
    /// Damage accumulated since the state was last applied
    pub damage: Vec<Rectangle<i32, Logical>>,
    /// Region of the surface accepting input, `None` for the whole surface
    pub input_region: Option<RegionAttributes>,
    /// Region of the surface known to be opaque, `None` for none of it
    pub opaque_region: Option<RegionAttributes>,
    /// Frame callbacks requested since the state was last applied
    pub frame_callbacks: Vec<CallbackId>,
}

impl Cacheable for SurfaceAttributes {
    fn commit(&mut self) -> Self {
        SurfaceAttributes {
            buffer: self.buffer.take(),
            buffer_delta: self.buffer_delta.take(),
            damage: std::mem::take(&mut self.damage),
            input_region: self.input_region.clone(),
            opaque_region: self.opaque_region.clone(),
            frame_callbacks: std::mem::take(&mut self.frame_callbacks),
        }
    }

    fn merge_into(self, into: &mut Self) {
        if self.buffer.is_some() {
            into.buffer = self.buffer;
        }
        if let Some(delta) = self.buffer_delta {
            match &mut into.buffer_delta {
                Some(acc) => *acc += delta,
                None => into.buffer_delta = Some(delta),
            }
        }
        into.damage.extend(self.damage);
        into.input_region = self.input_region;
        into.opaque_region = self.opaque_region;
        into.frame_callbacks.extend(self.frame_callbacks);
    }
}

#[derive(Debug)]
pub(crate) struct SurfaceData {
    pub(crate) client: ClientId,
    pub(crate) role: Option<&'static str>,
    pub(crate) state: CachedState<SurfaceAttributes>,
    pub(crate) parent: Option<SurfaceId>,
    /// Stacking order of the surface and its sub-surfaces, bottom to top.
    /// The surface itself appears in its own list so that sub-surfaces can
    /// be placed below it.
    pub(crate) children: Vec<SurfaceId>,
    pub(crate) pending_children: Vec<SurfaceId>,
    pub(crate) subsurface: Option<subsurface::SubsurfaceState>,
    pub(crate) constraints: HashMap<SeatId, PointerConstraint>,
    pub(crate) dnd_icon_offset: Point<i32, Logical>,
}

impl SurfaceData {
    fn new(id: SurfaceId, client: ClientId) -> Self {
        SurfaceData {
            client,
            role: None,
            state: Default::default(),
            parent: None,
            children: vec![id],
            pending_children: vec![id],
            subsurface: None,
            constraints: HashMap::new(),
            dnd_icon_offset: Point::default(),
        }
    }
}

impl Display {
    /// Create a new surface for `client`
    pub fn create_surface(&mut self, client: ClientId) -> SurfaceId {
        let id = SurfaceId(self.alloc_id());
        self.surfaces.insert(id, SurfaceData::new(id, client));
        trace!(surface = ?id, client = ?client, "new surface");
        id
    }

    /// Client owning the surface
    pub fn surface_client(&self, surface: SurfaceId) -> Option<ClientId> {
        self.surfaces.get(&surface).map(|data| data.client)
    }

    /// Whether the surface still exists
    pub fn surface_alive(&self, surface: SurfaceId) -> bool {
        self.surfaces.contains_key(&surface)
    }

    /// Role currently assigned to the surface, if any
    pub fn surface_role(&self, surface: SurfaceId) -> Option<&'static str> {
        self.surfaces.get(&surface).and_then(|data| data.role)
    }

    /// Assign a role to the surface
    ///
    /// A role can be assigned only once; re-assigning the same role is
    /// harmless, any other role is a protocol error on the surface.
    pub fn surface_set_role(
        &mut self,
        surface: SurfaceId,
        role: &'static str,
    ) -> Result<(), ProtocolError> {
        let Some(data) = self.surfaces.get_mut(&surface) else {
            return Ok(());
        };
        match data.role {
            None => {
                data.role = Some(role);
                Ok(())
            }
            Some(current) if current == role => Ok(()),
            Some(_) => Err(ProtocolError::new(
                ObjectRef::Surface(surface),
                ErrorCode::Role,
                "surface already has a role",
            )),
        }
    }

    /// Attach a buffer to the pending state
    ///
    /// `None` detaches the current buffer. The offset is relative to the
    /// previous buffer origin.
    pub fn surface_attach(&mut self, surface: SurfaceId, buffer: Option<BufferHandle>, dx: i32, dy: i32) {
        if let Some(data) = self.surfaces.get_mut(&surface) {
            data.state.pending.buffer = Some(match buffer {
                Some(handle) => BufferAssignment::NewBuffer(handle),
                None => BufferAssignment::Removed,
            });
            let delta = Point::from((dx, dy));
            match &mut data.state.pending.buffer_delta {
                Some(acc) => *acc += delta,
                None => data.state.pending.buffer_delta = Some(delta),
            }
        }
    }

    /// Add damage to the pending state
    pub fn surface_damage(&mut self, surface: SurfaceId, damage: Rectangle<i32, Logical>) {
        if let Some(data) = self.surfaces.get_mut(&surface) {
            data.state.pending.damage.push(damage);
        }
    }

    /// Set the pending input region, `None` meaning the whole surface
    pub fn surface_set_input_region(&mut self, surface: SurfaceId, region: Option<RegionAttributes>) {
        if let Some(data) = self.surfaces.get_mut(&surface) {
            data.state.pending.input_region = region;
        }
    }

    /// Set the pending opaque region, `None` meaning none of the surface
    pub fn surface_set_opaque_region(&mut self, surface: SurfaceId, region: Option<RegionAttributes>) {
        if let Some(data) = self.surfaces.get_mut(&surface) {
            data.state.pending.opaque_region = region;
        }
    }

    /// Request a frame callback with the next applied commit
    pub fn surface_frame(&mut self, surface: SurfaceId) -> Option<CallbackId> {
        let callback = CallbackId(self.alloc_id());
        let data = self.surfaces.get_mut(&surface)?;
        data.state.pending.frame_callbacks.push(callback);
        Some(callback)
    }

    /// Commit the pending state of the surface
    ///
    /// For an effectively synchronized sub-surface this only queues a new
    /// generation; it becomes observable when the nearest desynchronized
    /// ancestor commits. Otherwise the pending state, along with every
    /// queued generation of the surface and of its synchronized
    /// sub-surface trees, is applied as one atomic batch.
    pub fn surface_commit(&mut self, surface: SurfaceId) {
        if !self.surfaces.contains_key(&surface) {
            return;
        }
        self.surfaces.get_mut(&surface).unwrap().state.enqueue();
        if self.surface_effectively_sync(surface) {
            trace!(surface = ?surface, "commit cached (synchronized)");
            return;
        }
        self.apply_surface(surface);
    }

    /// Access the applied state of the surface
    pub fn surface_state(&self, surface: SurfaceId) -> Option<&SurfaceAttributes> {
        self.surfaces.get(&surface).map(|data| &data.state.current)
    }

    /// Queue `done` events for all frame callbacks of the applied state
    ///
    /// Called by the host when the surface was presented. This keeps
    /// firing for drag icons during drags, so they can animate.
    pub fn send_frame_callbacks(&mut self, surface: SurfaceId) {
        let Some(data) = self.surfaces.get_mut(&surface) else {
            return;
        };
        let client = data.client;
        let callbacks = std::mem::take(&mut data.state.current.frame_callbacks);
        for callback in callbacks {
            self.queue(client, ClientEvent::FrameCallback { surface, callback });
        }
    }

    /// Take the damage accumulated on the applied state
    pub fn take_surface_damage(&mut self, surface: SurfaceId) -> Vec<Rectangle<i32, Logical>> {
        self.surfaces
            .get_mut(&surface)
            .map(|data| std::mem::take(&mut data.state.current.damage))
            .unwrap_or_default()
    }

    /// Cumulative position offset of a drag-icon surface
    pub fn dnd_icon_offset(&self, surface: SurfaceId) -> Point<i32, Logical> {
        self.surfaces
            .get(&surface)
            .map(|data| data.dnd_icon_offset)
            .unwrap_or_default()
    }

    /// Destroy a surface
    ///
    /// The surface leaves every focus it holds, its pointer constraints
    /// die with it, a drag it participates in moves on without it, and its
    /// sub-surfaces become root surfaces.
    pub fn destroy_surface(&mut self, surface: SurfaceId) {
        if !self.surfaces.contains_key(&surface) {
            return;
        }
        debug!(surface = ?surface, "destroying surface");

        self.pointer_forget_surface(surface);
        self.keyboard_forget_surface(surface);
        self.touch_forget_surface(surface);
        self.drag_forget_surface(surface);

        let data = self.surfaces.shift_remove(&surface).unwrap();

        // orphan the children; they keep living as root surfaces
        for child in data.children {
            if child == surface {
                continue;
            }
            if let Some(child_data) = self.surfaces.get_mut(&child) {
                child_data.parent = None;
            }
        }

        // unregister from the parent's stacking lists
        if let Some(parent) = data.parent {
            if let Some(parent_data) = self.surfaces.get_mut(&parent) {
                parent_data.children.retain(|c| *c != surface);
                parent_data.pending_children.retain(|c| *c != surface);
            }
        }
    }

    /// Applies the queued state of `surface` and of all its synchronized
    /// sub-surface trees.
    pub(crate) fn apply_surface(&mut self, surface: SurfaceId) {
        {
            let Some(data) = self.surfaces.get_mut(&surface) else {
                return;
            };
            data.state.apply_queued();
            let order = data.pending_children.clone();
            data.children = order;
        }
        self.after_surface_apply(surface);

        let children = self.surfaces.get(&surface).unwrap().children.clone();
        for child in children {
            if child == surface {
                continue;
            }
            // sub-surface placement is buffered against the parent commit
            let mut sync_child = false;
            if let Some(child_data) = self.surfaces.get_mut(&child) {
                if let Some(sub) = child_data.subsurface.as_mut() {
                    if let Some(position) = sub.pending_position.take() {
                        sub.position = position;
                    }
                    sync_child = sub.sync;
                }
            }
            if sync_child {
                self.apply_sync_subtree(child);
            }
        }
    }

    /// Drains a synchronized sub-surface and everything below it.
    ///
    /// Below a synchronized sub-surface every descendant is effectively
    /// synchronized, so the whole subtree drains unconditionally.
    pub(crate) fn apply_sync_subtree(&mut self, surface: SurfaceId) {
        {
            let Some(data) = self.surfaces.get_mut(&surface) else {
                return;
            };
            data.state.apply_queued();
            let order = data.pending_children.clone();
            data.children = order;
        }
        self.after_surface_apply(surface);

        let children = self.surfaces.get(&surface).unwrap().children.clone();
        for child in children {
            if child == surface {
                continue;
            }
            if let Some(child_data) = self.surfaces.get_mut(&child) {
                if let Some(sub) = child_data.subsurface.as_mut() {
                    if let Some(position) = sub.pending_position.take() {
                        sub.position = position;
                    }
                }
            }
            self.apply_sync_subtree(child);
        }
    }

    /// Role and constraint bookkeeping run whenever a commit is applied.
    fn after_surface_apply(&mut self, surface: SurfaceId) {
        let delta = {
            let data = self.surfaces.get_mut(&surface).unwrap();
            if data.role == Some(DND_ICON_ROLE) {
                data.state.current.buffer_delta.take()
            } else {
                None
            }
        };
        if let Some(delta) = delta {
            let data = self.surfaces.get_mut(&surface).unwrap();
            data.dnd_icon_offset += delta;
        }

        self.constraints_after_commit(surface);
    }
}
