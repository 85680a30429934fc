//! Data devices
//!
//! A data device is the per-(seat, client) endpoint of the selection and
//! drag-and-drop protocol: selection offers, drag enters and drops all
//! arrive on it. Requesting the device for the same (seat, client) pair
//! again yields the existing one.

use crate::{ClientId, DeviceId, Display, SeatId};

#[derive(Debug)]
pub(crate) struct DataDevice {
    pub(crate) client: ClientId,
    pub(crate) seat: SeatId,
}

impl Display {
    /// Get the data device of `client` on `seat`, creating it on first
    /// use
    pub fn get_data_device(&mut self, client: ClientId, seat: SeatId) -> DeviceId {
        if let Some(existing) = self
            .devices
            .iter()
            .find(|(_, d)| d.client == client && d.seat == seat)
            .map(|(id, _)| *id)
        {
            return existing;
        }
        let id = DeviceId(self.alloc_id());
        self.devices.insert(id, DataDevice { client, seat });
        id
    }

    /// Release a data device
    ///
    /// A drag currently targeting it keeps running, it just loses its
    /// endpoint.
    pub fn release_data_device(&mut self, device: DeviceId) {
        if self.devices.shift_remove(&device).is_none() {
            return;
        }
        let seats: Vec<_> = self.seats.keys().copied().collect();
        for seat in seats {
            if let Some(drag) = self.seats.get_mut(&seat).unwrap().drag.as_mut() {
                if let Some(focus) = drag.focus.as_mut() {
                    if focus.device == Some(device) {
                        focus.device = None;
                    }
                }
            }
        }
    }

    /// Seat a data device is bound to
    pub fn data_device_seat(&self, device: DeviceId) -> Option<SeatId> {
        self.devices.get(&device).map(|d| d.seat)
    }

    /// Client a data device belongs to
    pub fn data_device_client(&self, device: DeviceId) -> Option<ClientId> {
        self.devices.get(&device).map(|d| d.client)
    }
}
