//! Keyboard focus routing
//!
//! Besides forwarding keys and modifiers to the focused client, keyboard
//! focus changes are what re-publish the seat's selections: the freshly
//! focused client receives new offers for the clipboard and primary
//! selection before any key event reaches it.
//!
//! Keymap handling lives in the host; the core only forwards scan codes
//! and receives the already decoded modifier state.

use tracing::trace;

use crate::event::{ClientEvent, KeyboardEvent};
use crate::utils::Serial;
use crate::{Display, SeatId, SurfaceId};

/// State of a key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyState {
    /// The key was released
    Released,
    /// The key was pressed
    Pressed,
}

/// Decoded state of the keyboard modifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ModifiersState {
    /// The "control" key
    pub ctrl: bool,
    /// The "alt" key
    pub alt: bool,
    /// The "shift" key
    pub shift: bool,
    /// The "caps lock" key
    pub caps_lock: bool,
    /// The "logo" key, also known as the "windows" key
    pub logo: bool,
    /// The "num lock" key
    pub num_lock: bool,
}

#[derive(Debug, Default)]
pub(crate) struct KeyboardState {
    pub(crate) focus: Option<KeyboardFocus>,
    pub(crate) pressed_keys: Vec<u32>,
    pub(crate) modifiers: ModifiersState,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct KeyboardFocus {
    pub(crate) surface: SurfaceId,
    #[allow(dead_code)]
    pub(crate) serial: Serial,
}

impl Display {
    /// Move the keyboard focus of the seat to `surface`
    ///
    /// Sends `leave` to the previous surface, `enter` (with the pressed
    /// keys and current modifiers) to the new one, and then mirrors the
    /// current selection and primary selection to the new client's data
    /// devices, all before any further key event.
    pub fn set_focused_keyboard_surface(&mut self, seat: SeatId, surface: Option<SurfaceId>) {
        let Some(seat_data) = self.seats.get(&seat) else {
            return;
        };
        let Some(keyboard) = seat_data.keyboard.as_ref() else {
            return;
        };

        let surface = surface.filter(|s| self.surfaces.contains_key(s));
        if keyboard.focus.map(|f| f.surface) == surface {
            return;
        }

        // leave the old surface
        let old = {
            let keyboard = self.seats.get_mut(&seat).unwrap().keyboard.as_mut().unwrap();
            keyboard.focus.take()
        };
        if let Some(old) = old {
            if let Some(client) = self.surface_client(old.surface) {
                let serial = self.seat_serial(seat);
                self.queue(
                    client,
                    ClientEvent::Keyboard {
                        seat,
                        event: KeyboardEvent::Leave {
                            serial,
                            surface: old.surface,
                        },
                    },
                );
            }
        }

        let Some(surface) = surface else {
            trace!(seat = ?seat, "keyboard focus cleared");
            return;
        };

        let serial = self.seat_serial(seat);
        let client = self.surface_client(surface).unwrap();
        let (keys, modifiers) = {
            let keyboard = self.seats.get_mut(&seat).unwrap().keyboard.as_mut().unwrap();
            keyboard.focus = Some(KeyboardFocus { surface, serial });
            (keyboard.pressed_keys.clone(), keyboard.modifiers)
        };
        trace!(seat = ?seat, surface = ?surface, "keyboard focus enter");
        self.queue(
            client,
            ClientEvent::Keyboard {
                seat,
                event: KeyboardEvent::Enter {
                    serial,
                    surface,
                    keys,
                },
            },
        );
        self.queue(
            client,
            ClientEvent::Keyboard {
                seat,
                event: KeyboardEvent::Modifiers { serial, modifiers },
            },
        );

        // republish the selections to the freshly focused client
        self.send_selections_to_focused(seat);
    }

    /// Surface currently holding the keyboard focus of the seat
    pub fn keyboard_focus(&self, seat: SeatId) -> Option<SurfaceId> {
        self.seats
            .get(&seat)?
            .keyboard
            .as_ref()?
            .focus
            .map(|f| f.surface)
    }

    /// A key was pressed or released
    pub fn notify_keyboard_key(&mut self, seat: SeatId, time: u32, key: u32, state: KeyState) {
        self.seat_update_timestamp(seat, time);
        let serial = self.seat_serial(seat);
        let Some(keyboard) = self.seats.get_mut(&seat).and_then(|s| s.keyboard.as_mut()) else {
            return;
        };
        match state {
            KeyState::Pressed => keyboard.pressed_keys.push(key),
            KeyState::Released => keyboard.pressed_keys.retain(|k| *k != key),
        }
        let focus = keyboard.focus;
        if let Some(focus) = focus {
            if let Some(client) = self.surface_client(focus.surface) {
                self.queue(
                    client,
                    ClientEvent::Keyboard {
                        seat,
                        event: KeyboardEvent::Key {
                            serial,
                            time,
                            key,
                            state,
                        },
                    },
                );
            }
        }
    }

    /// The decoded modifier state changed
    ///
    /// Forwarded to the focused client, and fed into the drag-and-drop
    /// action negotiation while a drag with a pending (not yet dropped)
    /// payload is running.
    pub fn notify_keyboard_modifiers(&mut self, seat: SeatId, modifiers: ModifiersState) {
        let Some(keyboard) = self.seats.get_mut(&seat).and_then(|s| s.keyboard.as_mut()) else {
            return;
        };
        if keyboard.modifiers == modifiers {
            return;
        }
        keyboard.modifiers = modifiers;
        let focus = keyboard.focus;

        if let Some(focus) = focus {
            if let Some(client) = self.surface_client(focus.surface) {
                let serial = self.seat_serial(seat);
                self.queue(
                    client,
                    ClientEvent::Keyboard {
                        seat,
                        event: KeyboardEvent::Modifiers { serial, modifiers },
                    },
                );
            }
        }

        self.refresh_drag_action(seat, false);
    }

    /// Current modifier state of the seat's keyboard
    pub fn keyboard_modifiers(&self, seat: SeatId) -> ModifiersState {
        self.seats
            .get(&seat)
            .and_then(|s| s.keyboard.as_ref())
            .map(|k| k.modifiers)
            .unwrap_or_default()
    }

    /// Forgets a dying surface without emitting anything towards it.
    pub(crate) fn keyboard_forget_surface(&mut self, surface: SurfaceId) {
        let seats: Vec<_> = self.seats.keys().copied().collect();
        for seat in seats {
            let Some(keyboard) = self.seats.get_mut(&seat).and_then(|s| s.keyboard.as_mut()) else {
                continue;
            };
            if keyboard.focus.map(|f| f.surface) == Some(surface) {
                keyboard.focus = None;
            }
        }
    }
}
