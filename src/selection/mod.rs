//! Clipboard, primary selection and drag-and-drop
//!
//! Each seat carries two independent selection slots (clipboard and
//! primary). A slot holds a reference to the data source currently backing
//! it; installing a new source cancels the displaced one and publishes a
//! fresh offer to every data device of the keyboard-focused client.
//! Sources that were replaced stay readable through offers that still
//! reference them, until those offers die.

pub mod device;
pub(crate) mod dnd;
pub mod offer;
pub mod source;

use bitflags::bitflags;
use tracing::debug;

use crate::event::{ClientEvent, DataDeviceEvent};
use crate::utils::Serial;
use crate::{ClientId, DeviceId, Display, SeatId, SourceId};

bitflags! {
    /// Mask of drag-and-drop actions, with the wire values of
    /// `wl_data_device_manager.dnd_action`
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct DndActions: u32 {
        /// Data will be copied
        const COPY = 1;
        /// Data will be moved
        const MOVE = 2;
        /// The user will be asked what to do with the data
        const ASK = 4;
    }
}

/// A single negotiated drag-and-drop action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DndAction {
    /// No action
    #[default]
    None,
    /// Data will be copied
    Copy,
    /// Data will be moved
    Move,
    /// The user will be asked what to do with the data
    Ask,
}

impl DndAction {
    /// The mask bit of this action; empty for [`DndAction::None`]
    pub fn as_flags(self) -> DndActions {
        match self {
            DndAction::None => DndActions::empty(),
            DndAction::Copy => DndActions::COPY,
            DndAction::Move => DndActions::MOVE,
            DndAction::Ask => DndActions::ASK,
        }
    }

    /// Parse a wire value carrying at most one action bit
    pub fn from_raw(raw: u32) -> Option<DndAction> {
        match raw {
            0 => Some(DndAction::None),
            1 => Some(DndAction::Copy),
            2 => Some(DndAction::Move),
            4 => Some(DndAction::Ask),
            _ => None,
        }
    }
}

/// The two kinds of selection a seat can hold
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionTarget {
    /// The regular clipboard selection
    Clipboard,
    /// The (select-to-copy) primary selection
    Primary,
}

/// One selection slot of a seat
#[derive(Debug, Default)]
pub(crate) struct SelectionSlot {
    pub(crate) source: Option<SourceId>,
    pub(crate) serial: Option<Serial>,
}

impl Display {
    /// Set the clipboard selection of the device's seat
    ///
    /// `serial` must have been issued by the seat; unknown or outdated
    /// serials are ignored without error. A source carrying drag-and-drop
    /// actions (or mounted as a toplevel-drag payload) cannot become a
    /// selection; that is a protocol error on the source.
    pub fn set_selection(
        &mut self,
        device: DeviceId,
        source: Option<SourceId>,
        serial: Serial,
    ) -> Result<(), crate::ProtocolError> {
        self.set_selection_impl(device, source, serial, SelectionTarget::Clipboard)
    }

    /// Set the primary selection of the device's seat
    pub fn set_primary_selection(
        &mut self,
        device: DeviceId,
        source: Option<SourceId>,
        serial: Serial,
    ) -> Result<(), crate::ProtocolError> {
        self.set_selection_impl(device, source, serial, SelectionTarget::Primary)
    }

    /// Drop the clipboard selection; shorthand for setting a null source
    pub fn clear_selection(&mut self, device: DeviceId, serial: Serial) {
        let _ = self.set_selection(device, None, serial);
    }

    /// Drop the primary selection; shorthand for setting a null source
    pub fn clear_primary_selection(&mut self, device: DeviceId, serial: Serial) {
        let _ = self.set_primary_selection(device, None, serial);
    }

    /// Source currently backing a selection slot of the seat
    pub fn selection_source(&self, seat: SeatId, target: SelectionTarget) -> Option<SourceId> {
        let seat_data = self.seats.get(&seat)?;
        match target {
            SelectionTarget::Clipboard => seat_data.selection.source,
            SelectionTarget::Primary => seat_data.primary_selection.source,
        }
    }

    fn set_selection_impl(
        &mut self,
        device: DeviceId,
        source: Option<SourceId>,
        serial: Serial,
        target: SelectionTarget,
    ) -> Result<(), crate::ProtocolError> {
        use crate::error::{ErrorCode, ObjectRef, ProtocolError};
        use crate::selection::source::SourceKind;

        let Some(seat) = self.devices.get(&device).map(|d| d.seat) else {
            return Ok(());
        };
        let Some(seat_data) = self.seats.get(&seat) else {
            return Ok(());
        };

        if !seat_data.serials.already_issued(serial) {
            debug!(?serial, "ignoring selection request with unknown serial");
            return Ok(());
        }

        let source = match source {
            Some(id) => match self.sources.get(&id) {
                Some(data) => {
                    let wanted_kind = match target {
                        SelectionTarget::Clipboard => SourceKind::Data,
                        SelectionTarget::Primary => SourceKind::Primary,
                    };
                    if data.kind != wanted_kind {
                        debug!(source = ?id, "ignoring selection request with mismatched source kind");
                        return Ok(());
                    }
                    if !data.dnd_actions.is_empty() {
                        return Err(ProtocolError::new(
                            ObjectRef::Source(id),
                            ErrorCode::InvalidSource,
                            "selection sources cannot carry drag-and-drop actions",
                        ));
                    }
                    if data.toplevel_drag {
                        return Err(ProtocolError::new(
                            ObjectRef::Source(id),
                            ErrorCode::InvalidSource,
                            "source is in use as a toplevel drag payload",
                        ));
                    }
                    Some(id)
                }
                // the source died before the request got here
                None => None,
            },
            None => None,
        };

        let slot = {
            let seat_data = self.seats.get_mut(&seat).unwrap();
            match target {
                SelectionTarget::Clipboard => &mut seat_data.selection,
                SelectionTarget::Primary => &mut seat_data.primary_selection,
            }
        };

        if let Some(installed) = slot.serial {
            if serial < installed {
                debug!(?serial, "ignoring outdated selection request");
                return Ok(());
            }
        }
        if slot.source == source {
            slot.serial = Some(serial);
            return Ok(());
        }

        let displaced = slot.source.take();
        slot.source = source;
        slot.serial = Some(serial);
        debug!(seat = ?seat, ?target, ?source, "selection changed");

        if let Some(displaced) = displaced {
            self.cancel_source(displaced);
        }

        self.broadcast_selection(seat, target);
        Ok(())
    }

    /// Publish the current content of a selection slot to the data
    /// devices of the keyboard-focused client.
    pub(crate) fn broadcast_selection(&mut self, seat: SeatId, target: SelectionTarget) {
        // sanitize the slot first, the backing source may be long gone
        {
            let Some(seat_data) = self.seats.get_mut(&seat) else {
                return;
            };
            let slot = match target {
                SelectionTarget::Clipboard => &mut seat_data.selection,
                SelectionTarget::Primary => &mut seat_data.primary_selection,
            };
            if let Some(id) = slot.source {
                if !self.sources.get(&id).map(|s| s.alive).unwrap_or(false) {
                    slot.source = None;
                }
            }
        }

        let Some(focused_client) = self
            .keyboard_focus(seat)
            .and_then(|surface| self.surface_client(surface))
        else {
            return;
        };

        let source = match target {
            SelectionTarget::Clipboard => self.seats.get(&seat).unwrap().selection.source,
            SelectionTarget::Primary => self.seats.get(&seat).unwrap().primary_selection.source,
        };

        for device in self.devices_for(seat, focused_client) {
            let offer = source.map(|source| {
                self.new_selection_offer(device, source, target)
            });
            let event = match target {
                SelectionTarget::Clipboard => DataDeviceEvent::Selection { offer },
                SelectionTarget::Primary => DataDeviceEvent::PrimarySelection { offer },
            };
            self.queue(focused_client, ClientEvent::DataDevice { device, event });
        }
    }

    /// Re-publish both selections, used when keyboard focus changes.
    pub(crate) fn send_selections_to_focused(&mut self, seat: SeatId) {
        self.broadcast_selection(seat, SelectionTarget::Clipboard);
        self.broadcast_selection(seat, SelectionTarget::Primary);
    }

    pub(crate) fn devices_for(&self, seat: SeatId, client: ClientId) -> Vec<DeviceId> {
        self.devices
            .iter()
            .filter(|(_, d)| d.seat == seat && d.client == client)
            .map(|(id, _)| *id)
            .collect()
    }
}
