//! Data offers
//!
//! An offer is the compositor-minted view of a source handed to a
//! receiving client. Selection offers only ever serve `receive`; drag
//! offers additionally take part in action negotiation and carry the
//! accept/drop/finish state machine.
//!
//! The reference an offer keeps to its source is weak: the source is
//! looked up on every use and a vanished source simply makes the request
//! fall flat (closing any file descriptor that came with it). The one
//! exception is a performed drop, which pins the source until `finish`
//! arrives or the offer dies.

use std::os::fd::OwnedFd;

use tracing::debug;

use crate::client::DND_ACTIONS_SINCE;
use crate::error::{ErrorCode, ObjectRef, ProtocolError};
use crate::event::{ClientEvent, DataDeviceEvent, DataOfferEvent, DataSourceEvent};
use crate::selection::{DndAction, DndActions, SelectionTarget};
use crate::utils::Serial;
use crate::{ClientId, DeviceId, Display, OfferId, SourceId};

/// What an offer stands for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum OfferKind {
    /// Mirrors a selection slot
    Selection(SelectionTarget),
    /// Describes the payload of an active drag
    Dnd,
}

#[derive(Debug)]
pub(crate) struct DataOffer {
    pub(crate) client: ClientId,
    #[allow(dead_code)]
    pub(crate) device: DeviceId,
    pub(crate) source: SourceId,
    pub(crate) kind: OfferKind,
    pub(crate) version: u32,
    /// Actions the receiving client supports; defaulted for clients
    /// predating action negotiation
    pub(crate) supported_actions: Option<DndActions>,
    /// Action the receiving client prefers; defaulted like
    /// `supported_actions`
    pub(crate) preferred_action: Option<DndAction>,
    pub(crate) accepted: bool,
    pub(crate) chosen_action: DndAction,
    pub(crate) dropped: bool,
}

impl Display {
    /// Mint an offer mirroring `source` towards the client of `device`,
    /// introducing it and its mime types.
    pub(crate) fn new_offer(&mut self, device: DeviceId, source: SourceId, kind: OfferKind) -> OfferId {
        let client = self.devices.get(&device).map(|d| d.client).unwrap();
        let version = self
            .client_versions(client)
            .map(|v| v.wl_data_device)
            .unwrap_or(DND_ACTIONS_SINCE);
        let (supported_actions, preferred_action) = if version < DND_ACTIONS_SINCE {
            // clients predating negotiation get the historical defaults
            (Some(DndActions::COPY | DndActions::MOVE), Some(DndAction::Copy))
        } else {
            (None, None)
        };

        let id = OfferId(self.alloc_id());
        self.offers.insert(
            id,
            DataOffer {
                client,
                device,
                source,
                kind,
                version,
                supported_actions,
                preferred_action,
                accepted: false,
                chosen_action: DndAction::None,
                dropped: false,
            },
        );

        self.queue(
            client,
            ClientEvent::DataDevice {
                device,
                event: DataDeviceEvent::DataOffer { offer: id },
            },
        );
        for mime_type in self.data_source_mime_types(source) {
            self.queue(
                client,
                ClientEvent::DataOffer {
                    offer: id,
                    event: DataOfferEvent::Offer { mime_type },
                },
            );
        }
        id
    }

    /// Mint a selection offer for one device.
    pub(crate) fn new_selection_offer(
        &mut self,
        device: DeviceId,
        source: SourceId,
        target: SelectionTarget,
    ) -> OfferId {
        self.new_offer(device, source, OfferKind::Selection(target))
    }

    /// The receiving client accepts (or, with `None`, rejects) a mime
    /// type
    ///
    /// Forwarded to the source; whether a drop may complete tracks the
    /// most recent accept.
    pub fn offer_accept(&mut self, offer: OfferId, _serial: Serial, mime_type: Option<String>) {
        let Some(offer_data) = self.offers.get(&offer) else {
            return;
        };
        let source = offer_data.source;
        let accepted = match (&mime_type, self.sources.get(&source)) {
            (Some(mime), Some(source_data)) => source_data.mime_types.contains(mime),
            _ => false,
        };
        if let Some(offer_data) = self.offers.get_mut(&offer) {
            offer_data.accepted = accepted;
        }
        if let Some(source_data) = self.sources.get_mut(&source) {
            source_data.accepted_mime = if accepted { mime_type.clone() } else { None };
        }
        self.queue_source_event(source, DataSourceEvent::Target { mime_type });
    }

    /// The receiving client wants the data for `mime_type` written to
    /// `fd`
    ///
    /// If the mime type was never offered or the source is gone, the
    /// descriptor is closed and the request ignored. Otherwise the
    /// descriptor moves to the source client, which writes and closes it.
    pub fn offer_receive(&mut self, offer: OfferId, mime_type: impl Into<String>, fd: OwnedFd) {
        let mime_type = mime_type.into();
        let Some(offer_data) = self.offers.get(&offer) else {
            debug!("denying receive on a dead offer");
            return;
        };
        let source = offer_data.source;
        let valid = self
            .sources
            .get(&source)
            .map(|s| s.alive && s.mime_types.contains(&mime_type))
            .unwrap_or(false);
        if !valid {
            debug!(offer = ?offer, mime_type = %mime_type, "denying receive with invalid source or mime type");
            drop(fd);
            return;
        }
        self.queue_source_event(source, DataSourceEvent::Send { mime_type, fd });
    }

    /// The receiving client is done with a dropped drag offer
    ///
    /// Only valid on a drag offer whose drop has been performed with an
    /// accepted mime type and a negotiated action; anything else is a
    /// protocol error. Tells the source the transfer succeeded and
    /// releases the pin on it.
    pub fn offer_finish(&mut self, offer: OfferId) -> Result<(), ProtocolError> {
        let Some(offer_data) = self.offers.get(&offer) else {
            return Ok(());
        };
        if offer_data.kind != OfferKind::Dnd {
            return Err(ProtocolError::new(
                ObjectRef::Offer(offer),
                ErrorCode::InvalidFinish,
                "cannot finish an offer that is not a drag offer",
            ));
        }
        if !offer_data.dropped {
            return Err(ProtocolError::new(
                ObjectRef::Offer(offer),
                ErrorCode::InvalidFinish,
                "cannot finish an offer that has not been dropped",
            ));
        }
        if !offer_data.accepted {
            return Err(ProtocolError::new(
                ObjectRef::Offer(offer),
                ErrorCode::InvalidFinish,
                "cannot finish an offer that has not been accepted",
            ));
        }
        if offer_data.chosen_action == DndAction::None {
            return Err(ProtocolError::new(
                ObjectRef::Offer(offer),
                ErrorCode::InvalidFinish,
                "cannot finish an offer with no valid action",
            ));
        }

        let source = offer_data.source;
        self.queue_source_event(source, DataSourceEvent::DndFinished);
        self.offers.shift_remove(&offer);
        self.release_defunct_source(source);
        Ok(())
    }

    /// The receiving client adjusts its side of the action negotiation
    ///
    /// `actions` is the raw wire mask and `preferred` the raw preferred
    /// action; out-of-range values are protocol errors. On the offer of
    /// an active drag the negotiation is re-run immediately.
    pub fn offer_set_actions(
        &mut self,
        offer: OfferId,
        actions: u32,
        preferred: u32,
    ) -> Result<(), ProtocolError> {
        let Some(actions) = DndActions::from_bits(actions) else {
            return Err(ProtocolError::new(
                ObjectRef::Offer(offer),
                ErrorCode::InvalidActionMask,
                "invalid action mask",
            ));
        };
        let Some(preferred) = DndAction::from_raw(preferred) else {
            return Err(ProtocolError::new(
                ObjectRef::Offer(offer),
                ErrorCode::InvalidAction,
                "invalid preferred action",
            ));
        };

        let Some(offer_data) = self.offers.get_mut(&offer) else {
            return Ok(());
        };
        let changed = offer_data.supported_actions != Some(actions)
            || offer_data.preferred_action != Some(preferred);
        offer_data.supported_actions = Some(actions);
        offer_data.preferred_action = Some(preferred);
        let dropped = offer_data.dropped;

        if changed {
            let seat = self
                .seats
                .iter()
                .find(|(_, s)| {
                    s.drag
                        .as_ref()
                        .map(|d| d.offer == Some(offer))
                        .unwrap_or(false)
                })
                .map(|(id, _)| *id);
            if let Some(seat) = seat {
                self.refresh_drag_action(seat, false);
            } else if dropped {
                // an "ask" drop settles its action between drop and finish
                self.refresh_dropped_offer_action(offer);
            }
        }
        Ok(())
    }

    /// Re-run negotiation for an offer whose drop already happened; used
    /// while the target resolves an `ask` action before finishing.
    fn refresh_dropped_offer_action(&mut self, offer: OfferId) {
        let Some(offer_data) = self.offers.get(&offer) else {
            return;
        };
        let source = offer_data.source;
        let Some(source_data) = self.sources.get(&source) else {
            return;
        };
        let action = crate::selection::dnd::choose_dnd_action(
            source_data.dnd_actions,
            offer_data.supported_actions,
            offer_data.preferred_action,
            Default::default(),
            true,
        );
        if action != offer_data.chosen_action {
            self.queue_offer_action(offer, action);
            self.queue_source_action(source, action);
        }
    }

    /// The receiving client destroys the offer
    ///
    /// Destroying a dropped drag offer before `finish` tells the source
    /// the drop did not confirm success.
    pub fn destroy_offer(&mut self, offer: OfferId) {
        let Some(offer_data) = self.offers.get(&offer) else {
            return;
        };
        let source = offer_data.source;
        let unconfirmed_drop = offer_data.kind == OfferKind::Dnd && offer_data.dropped;

        // a drag offer destroyed mid-flight leaves the drag without
        // negotiation state
        let seat = self
            .seats
            .iter()
            .find(|(_, s)| {
                s.drag
                    .as_ref()
                    .map(|d| d.offer == Some(offer))
                    .unwrap_or(false)
            })
            .map(|(id, _)| *id);
        if let Some(seat) = seat {
            if let Some(drag) = self.seats.get_mut(&seat).unwrap().drag.as_mut() {
                drag.offer = None;
            }
        }

        self.offers.shift_remove(&offer);

        if unconfirmed_drop {
            self.cancel_source(source);
            self.release_defunct_source(source);
        }
    }

    /// Whether the offer still exists
    pub fn offer_alive(&self, offer: OfferId) -> bool {
        self.offers.contains_key(&offer)
    }

    /// Source the offer mirrors, while both still exist
    pub fn offer_source(&self, offer: OfferId) -> Option<SourceId> {
        let offer_data = self.offers.get(&offer)?;
        self.sources.get(&offer_data.source)?;
        Some(offer_data.source)
    }

    /// Action currently negotiated on the offer
    pub fn offer_chosen_action(&self, offer: OfferId) -> DndAction {
        self.offers
            .get(&offer)
            .map(|o| o.chosen_action)
            .unwrap_or_default()
    }

    /// Drops the arena entry of a destroyed source once nothing keeps it
    /// on life support anymore.
    pub(crate) fn release_defunct_source(&mut self, source: SourceId) {
        let defunct = self
            .sources
            .get(&source)
            .map(|s| !s.alive)
            .unwrap_or(false);
        if !defunct {
            return;
        }
        let still_pinned = self
            .offers
            .values()
            .any(|offer| offer.source == source && offer.dropped);
        if !still_pinned {
            self.sources.shift_remove(&source);
        }
    }

    /// Queue an action event on an offer, respecting its bound version.
    pub(crate) fn queue_offer_action(&mut self, offer: OfferId, action: DndAction) {
        let Some(offer_data) = self.offers.get_mut(&offer) else {
            return;
        };
        offer_data.chosen_action = action;
        if offer_data.version < DND_ACTIONS_SINCE {
            return;
        }
        let client = offer_data.client;
        self.queue(
            client,
            ClientEvent::DataOffer {
                offer,
                event: DataOfferEvent::Action { action },
            },
        );
    }

    /// Queue the source-actions event on an offer, respecting its bound
    /// version.
    pub(crate) fn queue_offer_source_actions(&mut self, offer: OfferId, actions: DndActions) {
        let Some(offer_data) = self.offers.get(&offer) else {
            return;
        };
        if offer_data.version < DND_ACTIONS_SINCE {
            return;
        }
        let client = offer_data.client;
        self.queue(
            client,
            ClientEvent::DataOffer {
                offer,
                event: DataOfferEvent::SourceActions { actions },
            },
        );
    }
}
