//! Pointer focus routing
//!
//! The pointer keeps at most one focused surface, the seat-space location
//! of that surface (to translate into surface-local coordinates), the set
//! of currently pressed buttons and the serial of each button press. Press
//! serials are what later authorizes implicit-grab requests such as
//! starting a drag.
//!
//! While a drag runs on the pointer, normal delivery to clients stops and
//! the focus notifications feed the drag-and-drop machinery instead.

use std::collections::HashMap;

use tracing::trace;

use crate::client::POINTER_FRAME_SINCE;
use crate::event::{ClientEvent, PointerEvent};
use crate::selection::dnd::DragMode;
use crate::utils::{Logical, Point, Serial};
use crate::{ClientId, Display, SeatId, SurfaceId};

/// State of a pointer button
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonState {
    /// The button was released
    Released,
    /// The button was pressed
    Pressed,
}

/// Scroll axes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    /// Vertical scrolling
    VerticalScroll,
    /// Horizontal scrolling
    HorizontalScroll,
}

/// Source of an axis event, with the wire values of
/// `wl_pointer.axis_source`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AxisSource {
    /// A physical wheel rotation
    Wheel,
    /// Finger motion on a touchpad
    Finger,
    /// Continuous motion of some other device
    Continuous,
    /// Sideways tilt of a wheel
    WheelTilt,
}

#[derive(Debug, Default)]
pub(crate) struct PointerState {
    pub(crate) focus: Option<PointerFocus>,
    pub(crate) position: Point<f64, Logical>,
    pub(crate) pressed_buttons: Vec<u32>,
    pub(crate) button_serials: HashMap<u32, Serial>,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct PointerFocus {
    pub(crate) surface: SurfaceId,
    /// Location of the surface in seat space, used to translate pointer
    /// positions into surface-local coordinates
    pub(crate) location: Point<f64, Logical>,
    #[allow(dead_code)]
    pub(crate) serial: Serial,
}

impl PointerState {
    pub(crate) fn has_implicit_grab(&self, serial: Serial) -> bool {
        self.button_serials
            .iter()
            .any(|(button, s)| *s == serial && self.pressed_buttons.contains(button))
    }
}

impl Display {
    /// The pointer moved onto `surface`, located at `location` in seat
    /// space
    ///
    /// Leaves the previous focus first. During a pointer drag this drives
    /// the drag target instead of the pointer protocol.
    pub fn notify_pointer_enter(
        &mut self,
        seat: SeatId,
        surface: SurfaceId,
        location: Point<f64, Logical>,
        position: Point<f64, Logical>,
    ) {
        let Some(seat_data) = self.seats.get_mut(&seat) else {
            return;
        };
        let Some(pointer) = seat_data.pointer.as_mut() else {
            return;
        };
        pointer.position = position;

        if matches!(
            seat_data.drag.as_ref().map(|d| &d.mode),
            Some(DragMode::Pointer)
        ) {
            self.set_drag_target(seat, Some((surface, location)), position);
            return;
        }

        if !self.surfaces.contains_key(&surface) {
            return;
        }

        if let Some(focus) = seat_data.pointer.as_mut().unwrap().focus.as_mut() {
            if focus.surface == surface {
                focus.location = location;
                return;
            }
        }

        self.pointer_clear_focus(seat);

        let serial = self.seat_serial(seat);
        let client = self.surfaces.get(&surface).unwrap().client;
        let seat_data = self.seats.get_mut(&seat).unwrap();
        let pointer = seat_data.pointer.as_mut().unwrap();
        pointer.focus = Some(PointerFocus {
            surface,
            location,
            serial,
        });
        trace!(seat = ?seat, surface = ?surface, "pointer focus enter");
        self.queue(
            client,
            ClientEvent::Pointer {
                seat,
                event: PointerEvent::Enter {
                    serial,
                    surface,
                    position: position - location,
                },
            },
        );
        self.queue_pointer_frame(seat, client);

        self.activate_constraint_on_focus(surface, seat);
    }

    /// The pointer left its focused surface
    pub fn notify_pointer_leave(&mut self, seat: SeatId) {
        let Some(seat_data) = self.seats.get(&seat) else {
            return;
        };
        if matches!(seat_data.drag.as_ref().map(|d| &d.mode), Some(DragMode::Pointer)) {
            let position = self.pointer_position(seat).unwrap_or_default();
            self.set_drag_target(seat, None, position);
            return;
        }
        self.pointer_clear_focus(seat);
    }

    /// The pointer moved to `position` in seat space
    ///
    /// An active lock constraint swallows the motion entirely; an active
    /// confine constraint swallows any motion that would leave the
    /// constraint region.
    pub fn notify_pointer_motion(&mut self, seat: SeatId, time: u32, position: Point<f64, Logical>) {
        self.seat_update_timestamp(seat, time);
        let Some(seat_data) = self.seats.get_mut(&seat) else {
            return;
        };
        let Some(pointer) = seat_data.pointer.as_mut() else {
            return;
        };

        if matches!(seat_data.drag.as_ref().map(|d| &d.mode), Some(DragMode::Pointer)) {
            seat_data.pointer.as_mut().unwrap().position = position;
            self.drag_motion(seat, time, position);
            return;
        }

        let Some(focus) = pointer.focus else {
            pointer.position = position;
            return;
        };

        if !self.constraint_allows_motion(focus.surface, seat, position - focus.location) {
            return;
        }

        let seat_data = self.seats.get_mut(&seat).unwrap();
        seat_data.pointer.as_mut().unwrap().position = position;

        if let Some(client) = self.surface_client(focus.surface) {
            self.queue(
                client,
                ClientEvent::Pointer {
                    seat,
                    event: PointerEvent::Motion {
                        time,
                        position: position - focus.location,
                    },
                },
            );
        }
    }

    /// A pointer button changed state
    ///
    /// Presses remember their serial so later requests can refer back to
    /// them.
    pub fn notify_pointer_button(&mut self, seat: SeatId, time: u32, button: u32, state: ButtonState) {
        self.seat_update_timestamp(seat, time);
        let serial = self.seat_serial(seat);
        let Some(seat_data) = self.seats.get_mut(&seat) else {
            return;
        };
        let Some(pointer) = seat_data.pointer.as_mut() else {
            return;
        };

        match state {
            ButtonState::Pressed => {
                pointer.pressed_buttons.push(button);
                pointer.button_serials.insert(button, serial);
            }
            ButtonState::Released => {
                pointer.pressed_buttons.retain(|b| *b != button);
            }
        }

        if matches!(seat_data.drag.as_ref().map(|d| &d.mode), Some(DragMode::Pointer)) {
            let released_all = seat_data
                .pointer
                .as_ref()
                .map(|p| p.pressed_buttons.is_empty())
                .unwrap_or(true);
            if state == ButtonState::Released && released_all {
                self.finish_drag_drop(seat, time);
            }
            return;
        }

        let focus = seat_data.pointer.as_ref().unwrap().focus;
        if let Some(focus) = focus {
            if let Some(client) = self.surface_client(focus.surface) {
                self.queue(
                    client,
                    ClientEvent::Pointer {
                        seat,
                        event: PointerEvent::Button {
                            serial,
                            time,
                            button,
                            state,
                        },
                    },
                );
            }
        }
    }

    /// The pointer scrolled
    ///
    /// `discrete` carries the step count for sources with detents.
    pub fn notify_pointer_axis(
        &mut self,
        seat: SeatId,
        time: u32,
        axis: Axis,
        value: f64,
        discrete: Option<i32>,
        source: AxisSource,
    ) {
        self.seat_update_timestamp(seat, time);
        let Some(seat_data) = self.seats.get(&seat) else {
            return;
        };
        if matches!(seat_data.drag.as_ref().map(|d| &d.mode), Some(DragMode::Pointer)) {
            return;
        }
        let focus = seat_data.pointer.as_ref().and_then(|p| p.focus);
        if let Some(focus) = focus {
            if let Some(client) = self.surface_client(focus.surface) {
                self.queue(
                    client,
                    ClientEvent::Pointer {
                        seat,
                        event: PointerEvent::Axis {
                            time,
                            axis,
                            value,
                            discrete,
                            source,
                        },
                    },
                );
            }
        }
    }

    /// Ends the current group of logically simultaneous pointer events
    ///
    /// The burst of motion, button and axis events since the last frame
    /// belongs together; clients with new enough seats get an explicit
    /// marker.
    pub fn notify_pointer_frame(&mut self, seat: SeatId) {
        let Some(seat_data) = self.seats.get(&seat) else {
            return;
        };
        if matches!(seat_data.drag.as_ref().map(|d| &d.mode), Some(DragMode::Pointer)) {
            return;
        }
        let focus = seat_data.pointer.as_ref().and_then(|p| p.focus);
        if let Some(focus) = focus {
            if let Some(client) = self.surface_client(focus.surface) {
                self.queue_pointer_frame(seat, client);
            }
        }
    }

    /// Surface currently holding the pointer focus of the seat
    pub fn pointer_focus(&self, seat: SeatId) -> Option<SurfaceId> {
        self.seats
            .get(&seat)?
            .pointer
            .as_ref()?
            .focus
            .map(|f| f.surface)
    }

    /// Current pointer position in seat space
    pub fn pointer_position(&self, seat: SeatId) -> Option<Point<f64, Logical>> {
        self.seats.get(&seat)?.pointer.as_ref().map(|p| p.position)
    }

    /// Serial of the press of `button`, if it is currently pressed
    pub fn pointer_press_serial(&self, seat: SeatId, button: u32) -> Option<Serial> {
        let pointer = self.seats.get(&seat)?.pointer.as_ref()?;
        if !pointer.pressed_buttons.contains(&button) {
            return None;
        }
        pointer.button_serials.get(&button).copied()
    }

    pub(crate) fn queue_pointer_frame(&mut self, seat: SeatId, client: ClientId) {
        let versioned = self
            .client_versions(client)
            .map(|v| v.wl_seat >= POINTER_FRAME_SINCE)
            .unwrap_or(false);
        if versioned {
            self.queue(
                client,
                ClientEvent::Pointer {
                    seat,
                    event: PointerEvent::Frame,
                },
            );
        }
    }

    /// Drops the pointer focus, sending `leave` if the surface still
    /// exists and deactivating its pointer constraint.
    pub(crate) fn pointer_clear_focus(&mut self, seat: SeatId) {
        let focus = {
            let Some(pointer) = self.seats.get_mut(&seat).and_then(|s| s.pointer.as_mut()) else {
                return;
            };
            pointer.focus.take()
        };
        let Some(focus) = focus else {
            return;
        };

        self.deactivate_constraint(focus.surface, seat);

        if let Some(client) = self.surface_client(focus.surface) {
            let serial = self.seat_serial(seat);
            trace!(seat = ?seat, surface = ?focus.surface, "pointer focus leave");
            self.queue(
                client,
                ClientEvent::Pointer {
                    seat,
                    event: PointerEvent::Leave {
                        serial,
                        surface: focus.surface,
                    },
                },
            );
            self.queue_pointer_frame(seat, client);
        }
    }

    /// Forgets a dying surface without emitting anything towards it.
    pub(crate) fn pointer_forget_surface(&mut self, surface: SurfaceId) {
        let seats: Vec<_> = self.seats.keys().copied().collect();
        for seat in seats {
            let Some(pointer) = self.seats.get_mut(&seat).and_then(|s| s.pointer.as_mut()) else {
                continue;
            };
            if pointer.focus.map(|f| f.surface) == Some(surface) {
                pointer.focus = None;
            }
        }
    }
}
