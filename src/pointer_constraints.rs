//! Pointer confinement and locking
//!
//! A client may ask for the pointer to be confined to a region of one of
//! its surfaces, or locked in place while over it. Each (surface, pointer)
//! pair carries at most one such constraint; asking for a second is a
//! protocol error.
//!
//! Constraints start out inactive. Activation is compositor policy; here a
//! constraint activates whenever its surface gains pointer focus and
//! deactivates when focus leaves, when its committed region becomes empty,
//! or when the client destroys it. One-shot constraints are destroyed by
//! the compositor on their first deactivation, persistent ones survive and
//! re-activate on the next focus.

use tracing::{debug, trace};

use crate::error::{ErrorCode, ObjectRef, ProtocolError};
use crate::event::{ClientEvent, HostEvent, PointerConstraintEvent};
use crate::utils::{Logical, Point, RegionAttributes};
use crate::{Display, SeatId, SurfaceId};

/// Lifetime of a pointer constraint across deactivations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintLifetime {
    /// The constraint is destroyed on its first deactivation
    OneShot,
    /// The constraint survives deactivation and may activate again
    Persistent,
}

/// Constraint confining the pointer to a region of the surface
#[derive(Debug)]
pub struct ConfinedPointer {
    pub(crate) region: Option<RegionAttributes>,
    pub(crate) pending_region: Option<RegionAttributes>,
    pub(crate) lifetime: ConstraintLifetime,
    pub(crate) active: bool,
}

impl ConfinedPointer {
    /// Region in which to confine the pointer, `None` for the whole
    /// surface
    pub fn region(&self) -> Option<&RegionAttributes> {
        self.region.as_ref()
    }
}

/// Constraint locking the pointer in place
#[derive(Debug)]
pub struct LockedPointer {
    pub(crate) region: Option<RegionAttributes>,
    pub(crate) pending_region: Option<RegionAttributes>,
    pub(crate) lifetime: ConstraintLifetime,
    pub(crate) cursor_position_hint: Option<Point<f64, Logical>>,
    pub(crate) pending_cursor_position_hint: Option<Point<f64, Logical>>,
    pub(crate) active: bool,
}

impl LockedPointer {
    /// Region in which to activate the lock, `None` for the whole surface
    pub fn region(&self) -> Option<&RegionAttributes> {
        self.region.as_ref()
    }

    /// Position the client is rendering a cursor at, if it told us
    pub fn cursor_position_hint(&self) -> Option<Point<f64, Logical>> {
        self.cursor_position_hint
    }
}

/// A constraint imposed on a pointer over a surface
#[derive(Debug)]
pub enum PointerConstraint {
    /// Pointer is confined to a region of the surface
    Confined(ConfinedPointer),
    /// Pointer is locked in place
    Locked(LockedPointer),
}

impl PointerConstraint {
    /// Whether the constraint is currently active
    pub fn is_active(&self) -> bool {
        match self {
            PointerConstraint::Confined(confined) => confined.active,
            PointerConstraint::Locked(locked) => locked.active,
        }
    }

    /// Region the constraint applies in, `None` for the whole surface
    pub fn region(&self) -> Option<&RegionAttributes> {
        match self {
            PointerConstraint::Confined(confined) => confined.region(),
            PointerConstraint::Locked(locked) => locked.region(),
        }
    }

    fn lifetime(&self) -> ConstraintLifetime {
        match self {
            PointerConstraint::Confined(confined) => confined.lifetime,
            PointerConstraint::Locked(locked) => locked.lifetime,
        }
    }

    fn set_active(&mut self, active: bool) {
        match self {
            PointerConstraint::Confined(confined) => confined.active = active,
            PointerConstraint::Locked(locked) => locked.active = active,
        }
    }

    /// Applies the pending double-buffered state, returning a committed
    /// cursor position hint if one was staged.
    fn commit(&mut self) -> Option<Point<f64, Logical>> {
        match self {
            PointerConstraint::Confined(confined) => {
                confined.region.clone_from(&confined.pending_region);
                None
            }
            PointerConstraint::Locked(locked) => {
                locked.region.clone_from(&locked.pending_region);
                locked.pending_cursor_position_hint.take().map(|hint| {
                    locked.cursor_position_hint = Some(hint);
                    hint
                })
            }
        }
    }
}

impl Display {
    /// Confine the pointer of `seat` to a region of `surface`
    ///
    /// The constraint starts inactive; it activates as soon as the
    /// surface holds (or gains) pointer focus. At most one constraint per
    /// (surface, pointer) may exist.
    pub fn confine_pointer(
        &mut self,
        surface: SurfaceId,
        seat: SeatId,
        region: Option<RegionAttributes>,
        lifetime: ConstraintLifetime,
    ) -> Result<(), ProtocolError> {
        self.add_constraint(
            surface,
            seat,
            PointerConstraint::Confined(ConfinedPointer {
                region: region.clone(),
                pending_region: region,
                lifetime,
                active: false,
            }),
        )
    }

    /// Lock the pointer of `seat` in place while over `surface`
    pub fn lock_pointer(
        &mut self,
        surface: SurfaceId,
        seat: SeatId,
        region: Option<RegionAttributes>,
        lifetime: ConstraintLifetime,
    ) -> Result<(), ProtocolError> {
        self.add_constraint(
            surface,
            seat,
            PointerConstraint::Locked(LockedPointer {
                region: region.clone(),
                pending_region: region,
                lifetime,
                cursor_position_hint: None,
                pending_cursor_position_hint: None,
                active: false,
            }),
        )
    }

    /// Stage a new constraint region; applied on the next surface commit
    pub fn pointer_constraint_set_region(
        &mut self,
        surface: SurfaceId,
        seat: SeatId,
        region: Option<RegionAttributes>,
    ) {
        if let Some(constraint) = self
            .surfaces
            .get_mut(&surface)
            .and_then(|data| data.constraints.get_mut(&seat))
        {
            match constraint {
                PointerConstraint::Confined(confined) => confined.pending_region = region,
                PointerConstraint::Locked(locked) => locked.pending_region = region,
            }
        }
    }

    /// Stage a cursor position hint on a locked pointer; applied (and
    /// surfaced to the host) on the next surface commit
    pub fn locked_pointer_set_cursor_position_hint(
        &mut self,
        surface: SurfaceId,
        seat: SeatId,
        hint: Point<f64, Logical>,
    ) {
        if let Some(PointerConstraint::Locked(locked)) = self
            .surfaces
            .get_mut(&surface)
            .and_then(|data| data.constraints.get_mut(&seat))
        {
            locked.pending_cursor_position_hint = Some(hint);
        }
    }

    /// Destroy the constraint on (surface, pointer), if any
    pub fn destroy_pointer_constraint(&mut self, surface: SurfaceId, seat: SeatId) {
        if let Some(data) = self.surfaces.get_mut(&surface) {
            data.constraints.remove(&seat);
        }
    }

    /// Run `f` with the constraint on (surface, pointer), if one exists
    pub fn with_pointer_constraint<T, F: FnOnce(Option<&PointerConstraint>) -> T>(
        &self,
        surface: SurfaceId,
        seat: SeatId,
        f: F,
    ) -> T {
        f(self
            .surfaces
            .get(&surface)
            .and_then(|data| data.constraints.get(&seat)))
    }

    fn add_constraint(
        &mut self,
        surface: SurfaceId,
        seat: SeatId,
        constraint: PointerConstraint,
    ) -> Result<(), ProtocolError> {
        if !self.seats.contains_key(&seat) {
            return Ok(());
        }
        let Some(data) = self.surfaces.get_mut(&surface) else {
            return Ok(());
        };
        if data.constraints.contains_key(&seat) {
            return Err(ProtocolError::new(
                ObjectRef::Constraint(surface, seat),
                ErrorCode::AlreadyConstrained,
                "pointer constraint already exists for this surface and seat",
            ));
        }
        data.constraints.insert(seat, constraint);
        debug!(surface = ?surface, seat = ?seat, "new pointer constraint");

        if self.pointer_focus(seat) == Some(surface) {
            self.activate_constraint_on_focus(surface, seat);
        }
        Ok(())
    }

    /// Activates the constraint of (surface, pointer) if one is present
    /// and inactive.
    pub(crate) fn activate_constraint_on_focus(&mut self, surface: SurfaceId, seat: SeatId) {
        let Some(constraint) = self
            .surfaces
            .get_mut(&surface)
            .and_then(|data| data.constraints.get_mut(&seat))
        else {
            return;
        };
        if constraint.is_active() {
            return;
        }
        // an empty committed region can never contain the pointer
        if constraint.region().map(|r| r.is_empty()).unwrap_or(false) {
            return;
        }
        constraint.set_active(true);
        let event = match constraint {
            PointerConstraint::Confined(_) => PointerConstraintEvent::Confined,
            PointerConstraint::Locked(_) => PointerConstraintEvent::Locked,
        };
        trace!(surface = ?surface, seat = ?seat, ?event, "pointer constraint activated");
        let client = self.surfaces.get(&surface).unwrap().client;
        self.queue(
            client,
            ClientEvent::PointerConstraint {
                surface,
                seat,
                event,
            },
        );
    }

    /// Deactivates the constraint of (surface, pointer) if it is active,
    /// destroying it afterwards when it is one-shot.
    pub(crate) fn deactivate_constraint(&mut self, surface: SurfaceId, seat: SeatId) {
        let Some(data) = self.surfaces.get_mut(&surface) else {
            return;
        };
        let Some(constraint) = data.constraints.get_mut(&seat) else {
            return;
        };
        if !constraint.is_active() {
            return;
        }
        constraint.set_active(false);
        let event = match constraint {
            PointerConstraint::Confined(_) => PointerConstraintEvent::Unconfined,
            PointerConstraint::Locked(_) => PointerConstraintEvent::Unlocked,
        };
        let oneshot = constraint.lifetime() == ConstraintLifetime::OneShot;
        if oneshot {
            data.constraints.remove(&seat);
        }
        trace!(surface = ?surface, seat = ?seat, ?event, oneshot, "pointer constraint deactivated");
        let client = self.surfaces.get(&surface).unwrap().client;
        self.queue(
            client,
            ClientEvent::PointerConstraint {
                surface,
                seat,
                event,
            },
        );
    }

    /// Whether motion to `local` (surface-local) is allowed under the
    /// constraint of (surface, pointer).
    pub(crate) fn constraint_allows_motion(
        &self,
        surface: SurfaceId,
        seat: SeatId,
        local: Point<f64, Logical>,
    ) -> bool {
        let Some(data) = self.surfaces.get(&surface) else {
            return true;
        };
        let Some(constraint) = data.constraints.get(&seat) else {
            return true;
        };
        if !constraint.is_active() {
            return true;
        }
        match constraint {
            PointerConstraint::Locked(_) => false,
            PointerConstraint::Confined(confined) => {
                let point = local.to_i32_round();
                if let Some(region) = confined.region() {
                    if !region.contains(point) {
                        return false;
                    }
                }
                if let Some(input) = data.state.current.input_region.as_ref() {
                    if !input.contains(point) {
                        return false;
                    }
                }
                true
            }
        }
    }

    /// Applies the double-buffered constraint state of a surface after a
    /// commit was applied.
    pub(crate) fn constraints_after_commit(&mut self, surface: SurfaceId) {
        let Some(data) = self.surfaces.get_mut(&surface) else {
            return;
        };
        let seats: Vec<SeatId> = data.constraints.keys().copied().collect();
        let mut hints = Vec::new();
        let mut emptied = Vec::new();
        for seat in seats {
            let constraint = data.constraints.get_mut(&seat).unwrap();
            if let Some(hint) = constraint.commit() {
                hints.push((seat, hint));
            }
            if constraint.is_active() && constraint.region().map(|r| r.is_empty()).unwrap_or(false) {
                emptied.push(seat);
            }
        }
        for (seat, position) in hints {
            self.queue_host(HostEvent::CursorPositionHint {
                surface,
                seat,
                position,
            });
        }
        for seat in emptied {
            self.deactivate_constraint(surface, seat);
        }
    }
}
