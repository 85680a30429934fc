//! Client registry
//!
//! A [`ClientId`](crate::ClientId) stands for one connected client. The
//! core keeps, per client, the protocol versions its bindings were created
//! with and the FIFO queue of outbound events.

use std::collections::VecDeque;

use crate::event::ClientEvent;

/// Versions a client bound the relevant globals with
///
/// These gate which events the core emits towards that client, the same
/// way a real connection negotiates interface versions at bind time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientVersions {
    /// Version of `wl_seat`; the explicit pointer frame event exists
    /// starting with version 5
    pub wl_seat: u32,
    /// Version of `wl_data_device_manager`; drag-and-drop actions exist
    /// starting with version 3
    pub wl_data_device: u32,
}

/// `wl_pointer.frame` is part of seat version 5 and above.
pub(crate) const POINTER_FRAME_SINCE: u32 = 5;
/// `source_actions`, `action` and the action requests appeared in
/// version 3 of the data-device protocol.
pub(crate) const DND_ACTIONS_SINCE: u32 = 3;

impl Default for ClientVersions {
    fn default() -> Self {
        ClientVersions {
            wl_seat: 7,
            wl_data_device: 3,
        }
    }
}

#[derive(Debug)]
pub(crate) struct ClientData {
    pub(crate) versions: ClientVersions,
    pub(crate) events: VecDeque<ClientEvent>,
}

impl ClientData {
    pub(crate) fn new(versions: ClientVersions) -> Self {
        ClientData {
            versions,
            events: VecDeque::new(),
        }
    }
}
