//! The object arenas and event plumbing
//!
//! [`Display`] owns every protocol object of the core: clients, surfaces,
//! seats, data sources, data offers and data devices, each in an id-keyed
//! arena. Requests coming from clients and notifications coming from the
//! host are methods on it; the protocol events they produce are buffered in
//! per-client queues until the host drains them.
//!
//! The whole structure is single-threaded and run-to-completion: no method
//! suspends, and no state is touched from anywhere else.

use std::collections::VecDeque;

use indexmap::IndexMap;
use tracing::debug;

use crate::client::{ClientData, ClientVersions};
use crate::compositor::SurfaceData;
use crate::event::{ClientEvent, HostEvent};
use crate::input::Seat;
use crate::selection::device::DataDevice;
use crate::selection::offer::DataOffer;
use crate::selection::source::DataSource;
use crate::utils::ids::id_type;

id_type!(
    /// Id of a connected client
    ClientId
);
id_type!(
    /// Id of a surface
    SurfaceId
);
id_type!(
    /// Id of a seat
    SeatId
);
id_type!(
    /// Id of a data source (clipboard, primary selection or drag payload)
    SourceId
);
id_type!(
    /// Id of a data offer
    OfferId
);
id_type!(
    /// Id of a data device
    DeviceId
);
id_type!(
    /// Id of a frame callback
    CallbackId
);

/// The root object of the core
///
/// All state lives here; the host dispatcher drives it by forwarding client
/// requests and input notifications, then drains the event queues.
#[derive(Debug, Default)]
pub struct Display {
    pub(crate) clients: IndexMap<ClientId, ClientData>,
    pub(crate) surfaces: IndexMap<SurfaceId, SurfaceData>,
    pub(crate) seats: IndexMap<SeatId, Seat>,
    pub(crate) sources: IndexMap<SourceId, DataSource>,
    pub(crate) offers: IndexMap<OfferId, DataOffer>,
    pub(crate) devices: IndexMap<DeviceId, DataDevice>,
    pub(crate) host_events: VecDeque<HostEvent>,
    next_id: u32,
}

impl Display {
    /// Create an empty display
    pub fn new() -> Self {
        Default::default()
    }

    pub(crate) fn alloc_id(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }

    /// Register a new client with default (most recent) protocol versions
    pub fn create_client(&mut self) -> ClientId {
        self.create_client_with_versions(ClientVersions::default())
    }

    /// Register a new client with the given bound protocol versions
    pub fn create_client_with_versions(&mut self, versions: ClientVersions) -> ClientId {
        let id = ClientId(self.alloc_id());
        self.clients.insert(id, ClientData::new(versions));
        debug!(client = ?id, ?versions, "new client");
        id
    }

    /// Whether the client is still connected
    pub fn client_alive(&self, client: ClientId) -> bool {
        self.clients.contains_key(&client)
    }

    /// Disconnect a client, tearing down everything it owns
    ///
    /// Its surfaces leave all foci, its constraints die, selections it
    /// holds are cleared and re-broadcast, and drags it initiated are
    /// cancelled. Other clients only observe the protocol events these
    /// transitions produce; their own state is never corrupted.
    pub fn destroy_client(&mut self, client: ClientId) {
        if !self.clients.contains_key(&client) {
            return;
        }
        debug!(client = ?client, "destroying client");

        let offers: Vec<_> = self
            .offers
            .iter()
            .filter(|(_, o)| o.client == client)
            .map(|(id, _)| *id)
            .collect();
        for offer in offers {
            self.destroy_offer(offer);
        }

        let sources: Vec<_> = self
            .sources
            .iter()
            .filter(|(_, s)| s.client == client)
            .map(|(id, _)| *id)
            .collect();
        for source in sources {
            self.destroy_data_source(source);
        }

        let surfaces: Vec<_> = self
            .surfaces
            .iter()
            .filter(|(_, s)| s.client == client)
            .map(|(id, _)| *id)
            .collect();
        for surface in surfaces {
            self.destroy_surface(surface);
        }

        // drags the client initiated die with it, payload or not
        let seats: Vec<_> = self.seats.keys().copied().collect();
        for seat in seats {
            let initiated = self
                .seats
                .get(&seat)
                .and_then(|s| s.drag.as_ref())
                .map(|d| d.origin_client == client)
                .unwrap_or(false);
            if initiated {
                self.end_drag(seat, true);
            }
        }

        let devices: Vec<_> = self
            .devices
            .iter()
            .filter(|(_, d)| d.client == client)
            .map(|(id, _)| *id)
            .collect();
        for device in devices {
            self.release_data_device(device);
        }

        self.clients.shift_remove(&client);
    }

    /// Drain the queued events for one client, in emission order
    pub fn take_events(&mut self, client: ClientId) -> Vec<ClientEvent> {
        self.clients
            .get_mut(&client)
            .map(|data| data.events.drain(..).collect())
            .unwrap_or_default()
    }

    /// Drain the notifications addressed at the host
    pub fn take_host_events(&mut self) -> Vec<HostEvent> {
        self.host_events.drain(..).collect()
    }

    /// Versions the client bound the globals with
    pub fn client_versions(&self, client: ClientId) -> Option<ClientVersions> {
        self.clients.get(&client).map(|data| data.versions)
    }

    pub(crate) fn queue(&mut self, client: ClientId, event: ClientEvent) {
        if let Some(data) = self.clients.get_mut(&client) {
            data.events.push_back(event);
        }
    }

    pub(crate) fn queue_host(&mut self, event: HostEvent) {
        self.host_events.push_back(event);
    }
}
