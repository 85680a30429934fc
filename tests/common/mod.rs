//! Shared helpers for the protocol tests: filtering the per-client event
//! queues down to the object streams a test wants to look at.

#![allow(dead_code)]

use std::os::fd::OwnedFd;

use keelson::event::{
    ClientEvent, DataDeviceEvent, DataOfferEvent, DataSourceEvent, HostEvent, KeyboardEvent,
    PointerConstraintEvent, PointerEvent, SeatEvent, TouchEvent,
};
use keelson::{DeviceId, Display, OfferId, SeatId, SourceId};

pub fn pointer_events(events: &[ClientEvent]) -> Vec<&PointerEvent> {
    events
        .iter()
        .filter_map(|e| match e {
            ClientEvent::Pointer { event, .. } => Some(event),
            _ => None,
        })
        .collect()
}

pub fn keyboard_events(events: &[ClientEvent]) -> Vec<&KeyboardEvent> {
    events
        .iter()
        .filter_map(|e| match e {
            ClientEvent::Keyboard { event, .. } => Some(event),
            _ => None,
        })
        .collect()
}

pub fn touch_events(events: &[ClientEvent]) -> Vec<&TouchEvent> {
    events
        .iter()
        .filter_map(|e| match e {
            ClientEvent::Touch { event, .. } => Some(event),
            _ => None,
        })
        .collect()
}

pub fn seat_events(events: &[ClientEvent]) -> Vec<&SeatEvent> {
    events
        .iter()
        .filter_map(|e| match e {
            ClientEvent::Seat { event, .. } => Some(event),
            _ => None,
        })
        .collect()
}

pub fn device_events<'a>(events: &'a [ClientEvent], device: DeviceId) -> Vec<&'a DataDeviceEvent> {
    events
        .iter()
        .filter_map(|e| match e {
            ClientEvent::DataDevice {
                device: d, event, ..
            } if *d == device => Some(event),
            _ => None,
        })
        .collect()
}

pub fn source_events<'a>(events: &'a [ClientEvent], source: SourceId) -> Vec<&'a DataSourceEvent> {
    events
        .iter()
        .filter_map(|e| match e {
            ClientEvent::DataSource {
                source: s, event, ..
            } if *s == source => Some(event),
            _ => None,
        })
        .collect()
}

pub fn offer_events<'a>(events: &'a [ClientEvent], offer: OfferId) -> Vec<&'a DataOfferEvent> {
    events
        .iter()
        .filter_map(|e| match e {
            ClientEvent::DataOffer { offer: o, event } if *o == offer => Some(event),
            _ => None,
        })
        .collect()
}

pub fn constraint_events(events: &[ClientEvent]) -> Vec<&PointerConstraintEvent> {
    events
        .iter()
        .filter_map(|e| match e {
            ClientEvent::PointerConstraint { event, .. } => Some(event),
            _ => None,
        })
        .collect()
}

/// Offer carried by the last clipboard-selection event, if any.
pub fn selection_offer(events: &[ClientEvent]) -> Option<Option<OfferId>> {
    events
        .iter()
        .filter_map(|e| match e {
            ClientEvent::DataDevice {
                event: DataDeviceEvent::Selection { offer },
                ..
            } => Some(*offer),
            _ => None,
        })
        .last()
}

/// Offer carried by the last primary-selection event, if any.
pub fn primary_selection_offer(events: &[ClientEvent]) -> Option<Option<OfferId>> {
    events
        .iter()
        .filter_map(|e| match e {
            ClientEvent::DataDevice {
                event: DataDeviceEvent::PrimarySelection { offer },
                ..
            } => Some(*offer),
            _ => None,
        })
        .last()
}

/// Offer carried by the last drag `enter` on any device.
pub fn entered_offer(events: &[ClientEvent]) -> Option<Option<OfferId>> {
    events
        .iter()
        .filter_map(|e| match e {
            ClientEvent::DataDevice {
                event: DataDeviceEvent::Enter { offer, .. },
                ..
            } => Some(*offer),
            _ => None,
        })
        .last()
}

/// Pull every `Send` transfer out of an event batch, with ownership of
/// the file descriptors.
pub fn take_send_fds(events: Vec<ClientEvent>) -> Vec<(String, OwnedFd)> {
    events
        .into_iter()
        .filter_map(|e| match e {
            ClientEvent::DataSource {
                event: DataSourceEvent::Send { mime_type, fd },
                ..
            } => Some((mime_type, fd)),
            _ => None,
        })
        .collect()
}

/// Asserts the canonical per-target drag sequence:
/// `enter motion* (leave | drop leave?)`.
pub fn assert_drag_sequence(events: &[&DataDeviceEvent]) {
    let mut iter = events
        .iter()
        .filter(|e| {
            matches!(
                e,
                DataDeviceEvent::Enter { .. }
                    | DataDeviceEvent::Motion { .. }
                    | DataDeviceEvent::Leave
                    | DataDeviceEvent::Drop
            )
        })
        .peekable();
    while iter.peek().is_some() {
        assert!(
            matches!(iter.next(), Some(DataDeviceEvent::Enter { .. })),
            "drag sequence must start with enter: {events:?}"
        );
        while matches!(iter.peek(), Some(DataDeviceEvent::Motion { .. })) {
            iter.next();
        }
        match iter.next() {
            Some(DataDeviceEvent::Leave) => {}
            Some(DataDeviceEvent::Drop) => {
                if matches!(iter.peek(), Some(DataDeviceEvent::Leave)) {
                    iter.next();
                }
            }
            other => panic!("unexpected drag event {other:?} in {events:?}"),
        }
    }
}

pub fn host_drag_ended(display: &mut Display, seat: SeatId) -> Option<bool> {
    display
        .take_host_events()
        .into_iter()
        .filter_map(|e| match e {
            HostEvent::DragEnded { seat: s, dropped } if s == seat => Some(dropped),
            _ => None,
        })
        .last()
}
