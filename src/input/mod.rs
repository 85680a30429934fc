//! Seat handling and input focus routing
//!
//! A seat aggregates at most one pointer, one keyboard and one touch
//! device and owns the serial counter that authorizes follow-up requests
//! referring to past input events. The host dispatcher feeds input through
//! the `notify_*` methods; the seat routes the resulting protocol events to
//! the client owning the focused surface.

pub mod keyboard;
pub mod pointer;
pub mod touch;

use bitflags::bitflags;
use tracing::debug;

use crate::event::{ClientEvent, SeatEvent};
use crate::selection::dnd::DragState;
use crate::selection::SelectionSlot;
use crate::utils::{Serial, SerialCounter};
use crate::{Display, SeatId};

use self::keyboard::KeyboardState;
use self::pointer::PointerState;
use self::touch::TouchState;

bitflags! {
    /// Capabilities advertised by a seat, with the wire values of
    /// `wl_seat.capability`
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Capability: u32 {
        /// The seat has a pointer
        const POINTER = 1;
        /// The seat has a keyboard
        const KEYBOARD = 2;
        /// The seat has a touch device
        const TOUCH = 4;
    }
}

#[derive(Debug)]
pub(crate) struct Seat {
    pub(crate) name: String,
    pub(crate) serials: SerialCounter,
    pub(crate) timestamp: u32,
    pub(crate) pointer: Option<PointerState>,
    pub(crate) keyboard: Option<KeyboardState>,
    pub(crate) touch: Option<TouchState>,
    pub(crate) selection: SelectionSlot,
    pub(crate) primary_selection: SelectionSlot,
    pub(crate) drag: Option<DragState>,
}

impl Seat {
    fn new(name: String) -> Self {
        Seat {
            name,
            serials: SerialCounter::new(),
            timestamp: 0,
            pointer: None,
            keyboard: None,
            touch: None,
            selection: SelectionSlot::default(),
            primary_selection: SelectionSlot::default(),
            drag: None,
        }
    }

    pub(crate) fn capabilities(&self) -> Capability {
        let mut caps = Capability::empty();
        if self.pointer.is_some() {
            caps |= Capability::POINTER;
        }
        if self.keyboard.is_some() {
            caps |= Capability::KEYBOARD;
        }
        if self.touch.is_some() {
            caps |= Capability::TOUCH;
        }
        caps
    }
}

impl Display {
    /// Create a new seat with no capabilities
    pub fn create_seat(&mut self, name: impl Into<String>) -> SeatId {
        let id = SeatId(self.alloc_id());
        let name = name.into();
        debug!(seat = ?id, name = %name, "new seat");
        self.seats.insert(id, Seat::new(name));
        id
    }

    /// Create a new seat and add the given capabilities right away
    pub fn create_seat_with_capabilities(
        &mut self,
        name: impl Into<String>,
        capabilities: Capability,
    ) -> SeatId {
        let id = self.create_seat(name);
        if capabilities.contains(Capability::POINTER) {
            self.seat_add_pointer(id);
        }
        if capabilities.contains(Capability::KEYBOARD) {
            self.seat_add_keyboard(id);
        }
        if capabilities.contains(Capability::TOUCH) {
            self.seat_add_touch(id);
        }
        id
    }

    /// Name the seat was created with
    pub fn seat_name(&self, seat: SeatId) -> Option<&str> {
        self.seats.get(&seat).map(|s| s.name.as_str())
    }

    /// Capabilities the seat currently advertises
    pub fn seat_capabilities(&self, seat: SeatId) -> Capability {
        self.seats
            .get(&seat)
            .map(|s| s.capabilities())
            .unwrap_or_else(Capability::empty)
    }

    /// Add the pointer capability to the seat
    ///
    /// An existing pointer is replaced; clients observe the change through
    /// a capability update.
    pub fn seat_add_pointer(&mut self, seat: SeatId) {
        if let Some(data) = self.seats.get_mut(&seat) {
            data.pointer = Some(PointerState::default());
            self.broadcast_capabilities(seat);
        }
    }

    /// Remove the pointer capability from the seat
    pub fn seat_remove_pointer(&mut self, seat: SeatId) {
        if let Some(data) = self.seats.get_mut(&seat) {
            if data.pointer.take().is_some() {
                self.broadcast_capabilities(seat);
            }
        }
    }

    /// Add the keyboard capability to the seat
    pub fn seat_add_keyboard(&mut self, seat: SeatId) {
        if let Some(data) = self.seats.get_mut(&seat) {
            data.keyboard = Some(KeyboardState::default());
            self.broadcast_capabilities(seat);
        }
    }

    /// Remove the keyboard capability from the seat
    pub fn seat_remove_keyboard(&mut self, seat: SeatId) {
        if let Some(data) = self.seats.get_mut(&seat) {
            if data.keyboard.take().is_some() {
                self.broadcast_capabilities(seat);
            }
        }
    }

    /// Add the touch capability to the seat
    pub fn seat_add_touch(&mut self, seat: SeatId) {
        if let Some(data) = self.seats.get_mut(&seat) {
            data.touch = Some(TouchState::default());
            self.broadcast_capabilities(seat);
        }
    }

    /// Remove the touch capability from the seat
    pub fn seat_remove_touch(&mut self, seat: SeatId) {
        if let Some(data) = self.seats.get_mut(&seat) {
            if data.touch.take().is_some() {
                self.broadcast_capabilities(seat);
            }
        }
    }

    /// Destroy a seat
    ///
    /// An active drag is treated as losing focus and then being
    /// cancelled, in that order; data devices bound to the seat die with
    /// it.
    pub fn destroy_seat(&mut self, seat: SeatId) {
        if !self.seats.contains_key(&seat) {
            return;
        }
        if self.seats.get(&seat).unwrap().drag.is_some() {
            let position = self.pointer_position(seat).unwrap_or_default();
            self.set_drag_target(seat, None, position);
            self.end_drag(seat, true);
        }
        let devices: Vec<_> = self
            .devices
            .iter()
            .filter(|(_, d)| d.seat == seat)
            .map(|(id, _)| *id)
            .collect();
        for device in devices {
            self.release_data_device(device);
        }
        self.seats.shift_remove(&seat);
    }

    /// Last timestamp the seat saw, in milliseconds
    pub fn seat_timestamp(&self, seat: SeatId) -> Option<u32> {
        self.seats.get(&seat).map(|s| s.timestamp)
    }

    /// Hand out the next serial of the seat
    ///
    /// Mostly useful for hosts implementing protocols on top of the core
    /// that need serials of their own.
    pub fn next_serial(&mut self, seat: SeatId) -> Serial {
        self.seat_serial(seat)
    }

    pub(crate) fn seat_serial(&mut self, seat: SeatId) -> Serial {
        self.seats
            .get(&seat)
            .map(|s| s.serials.next_serial())
            .unwrap_or(Serial(0))
    }

    pub(crate) fn seat_update_timestamp(&mut self, seat: SeatId, time: u32) {
        if let Some(data) = self.seats.get_mut(&seat) {
            if time > data.timestamp {
                data.timestamp = time;
            }
        }
    }

    fn broadcast_capabilities(&mut self, seat: SeatId) {
        let Some(capabilities) = self.seats.get(&seat).map(|s| s.capabilities()) else {
            return;
        };
        let clients: Vec<_> = self.clients.keys().copied().collect();
        for client in clients {
            self.queue(
                client,
                ClientEvent::Seat {
                    seat,
                    event: SeatEvent::Capabilities { capabilities },
                },
            );
        }
    }
}
