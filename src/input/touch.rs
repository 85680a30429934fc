//! Touch focus routing
//!
//! Every touch point tracks the surface it went down on and the serial of
//! its down event; that serial is what authorizes touch-initiated drags
//! while the point stays in contact. Several points may share a surface;
//! the per-surface interaction is reference counted and remembers the
//! surface location of the first touch so later events can be translated
//! into surface-local coordinates.

use std::collections::HashMap;

use crate::event::{ClientEvent, TouchEvent};
use crate::selection::dnd::DragMode;
use crate::utils::{Logical, Point, Serial};
use crate::{Display, SeatId, SurfaceId};

#[derive(Debug, Default)]
pub(crate) struct TouchState {
    pub(crate) points: HashMap<i32, TouchPoint>,
    pub(crate) interactions: HashMap<SurfaceId, TouchInteraction>,
}

#[derive(Debug)]
pub(crate) struct TouchPoint {
    pub(crate) surface: Option<SurfaceId>,
    pub(crate) serial: Serial,
    pub(crate) position: Point<f64, Logical>,
}

#[derive(Debug)]
pub(crate) struct TouchInteraction {
    /// Location of the surface in seat space when its first touch went
    /// down
    pub(crate) location: Point<f64, Logical>,
    pub(crate) refs: u32,
}

impl TouchState {
    pub(crate) fn down_serial(&self, serial: Serial) -> Option<i32> {
        self.points
            .iter()
            .find(|(_, point)| point.serial == serial)
            .map(|(id, _)| *id)
    }
}

impl Display {
    /// A touch point went down on `surface`, located at `location` in
    /// seat space
    pub fn notify_touch_down(
        &mut self,
        seat: SeatId,
        surface: SurfaceId,
        location: Point<f64, Logical>,
        id: i32,
        time: u32,
        position: Point<f64, Logical>,
    ) {
        self.seat_update_timestamp(seat, time);
        if !self.surfaces.contains_key(&surface) {
            return;
        }
        let serial = self.seat_serial(seat);
        let Some(seat_data) = self.seats.get_mut(&seat) else {
            return;
        };
        let in_touch_drag = matches!(seat_data.drag.as_ref().map(|d| &d.mode), Some(DragMode::Touch { .. }));
        let Some(touch) = seat_data.touch.as_mut() else {
            return;
        };
        if touch.points.contains_key(&id) {
            return;
        }
        touch.points.insert(
            id,
            TouchPoint {
                surface: Some(surface),
                serial,
                position,
            },
        );
        let interaction = touch.interactions.entry(surface).or_insert(TouchInteraction {
            location,
            refs: 0,
        });
        interaction.refs += 1;
        let local = position - interaction.location;

        if in_touch_drag {
            return;
        }

        if let Some(client) = self.surface_client(surface) {
            self.queue(
                client,
                ClientEvent::Touch {
                    seat,
                    event: TouchEvent::Down {
                        serial,
                        time,
                        surface,
                        id,
                        position: local,
                    },
                },
            );
        }
    }

    /// A touch point moved
    pub fn notify_touch_motion(&mut self, seat: SeatId, id: i32, time: u32, position: Point<f64, Logical>) {
        self.seat_update_timestamp(seat, time);
        let Some(seat_data) = self.seats.get_mut(&seat) else {
            return;
        };
        let dragging = matches!(
            seat_data.drag.as_ref().map(|d| &d.mode),
            Some(DragMode::Touch { id: drag_id }) if *drag_id == id
        );
        let Some(touch) = seat_data.touch.as_mut() else {
            return;
        };
        let Some(point) = touch.points.get_mut(&id) else {
            return;
        };
        point.position = position;
        let surface = point.surface;

        if dragging {
            self.drag_motion(seat, time, position);
            return;
        }

        let Some(surface) = surface.filter(|s| self.surfaces.contains_key(s)) else {
            return;
        };
        let location = seat_data
            .touch
            .as_ref()
            .unwrap()
            .interactions
            .get(&surface)
            .map(|i| i.location)
            .unwrap_or_default();
        if let Some(client) = self.surface_client(surface) {
            self.queue(
                client,
                ClientEvent::Touch {
                    seat,
                    event: TouchEvent::Motion {
                        time,
                        id,
                        position: position - location,
                    },
                },
            );
        }
    }

    /// A touch point was lifted
    ///
    /// Lifting the point that authorized a touch drag performs the drop.
    pub fn notify_touch_up(&mut self, seat: SeatId, id: i32, time: u32) {
        self.seat_update_timestamp(seat, time);
        let serial = self.seat_serial(seat);
        let Some(seat_data) = self.seats.get_mut(&seat) else {
            return;
        };
        let dragging = matches!(
            seat_data.drag.as_ref().map(|d| &d.mode),
            Some(DragMode::Touch { id: drag_id }) if *drag_id == id
        );
        let Some(touch) = seat_data.touch.as_mut() else {
            return;
        };
        let Some(point) = touch.points.remove(&id) else {
            return;
        };
        if let Some(surface) = point.surface {
            if let Some(interaction) = touch.interactions.get_mut(&surface) {
                interaction.refs -= 1;
                if interaction.refs == 0 {
                    touch.interactions.remove(&surface);
                }
            }
        }

        if dragging {
            self.finish_drag_drop(seat, time);
            return;
        }

        let Some(surface) = point.surface.filter(|s| self.surfaces.contains_key(s)) else {
            return;
        };
        if let Some(client) = self.surface_client(surface) {
            self.queue(
                client,
                ClientEvent::Touch {
                    seat,
                    event: TouchEvent::Up { serial, time, id },
                },
            );
        }
    }

    /// Ends the current group of logically simultaneous touch events
    pub fn notify_touch_frame(&mut self, seat: SeatId) {
        let Some(seat_data) = self.seats.get(&seat) else {
            return;
        };
        if matches!(seat_data.drag.as_ref().map(|d| &d.mode), Some(DragMode::Touch { .. })) {
            return;
        }
        let Some(touch) = seat_data.touch.as_ref() else {
            return;
        };
        let mut clients = Vec::new();
        for point in touch.points.values() {
            if let Some(client) = point.surface.and_then(|s| self.surface_client(s)) {
                if !clients.contains(&client) {
                    clients.push(client);
                }
            }
        }
        for client in clients {
            self.queue(
                client,
                ClientEvent::Touch {
                    seat,
                    event: TouchEvent::Frame,
                },
            );
        }
    }

    /// Serial of the down event of touch point `id`, while it is in
    /// contact
    pub fn touch_down_serial(&self, seat: SeatId, id: i32) -> Option<Serial> {
        self.seats
            .get(&seat)?
            .touch
            .as_ref()?
            .points
            .get(&id)
            .map(|p| p.serial)
    }

    /// Forgets a dying surface without emitting anything towards it.
    pub(crate) fn touch_forget_surface(&mut self, surface: SurfaceId) {
        let seats: Vec<_> = self.seats.keys().copied().collect();
        for seat in seats {
            let Some(touch) = self.seats.get_mut(&seat).and_then(|s| s.touch.as_mut()) else {
                continue;
            };
            touch.interactions.remove(&surface);
            for point in touch.points.values_mut() {
                if point.surface == Some(surface) {
                    point.surface = None;
                }
            }
        }
    }
}
