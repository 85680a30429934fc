//! Data sources
//!
//! A source is the donating side of a data transfer: an ordered set of
//! mime types plus, for drag-and-drop payloads, the mask of actions the
//! origin supports. Clipboard and primary-selection sources are the same
//! machinery under different protocol interfaces, so they share one arena
//! distinguished by a kind tag.
//!
//! A source whose drop has been performed outlives its own destruction:
//! the arena entry is kept in a defunct state until the retained offer is
//! finished or destroyed, so the bookkeeping around `finish` stays sound.
//! Reads from a defunct source fail and close the passed file descriptor.

use smallvec::SmallVec;
use tracing::debug;

use crate::client::DND_ACTIONS_SINCE;
use crate::error::{ErrorCode, ObjectRef, ProtocolError};
use crate::event::{ClientEvent, DataSourceEvent};
use crate::selection::{DndAction, DndActions, SelectionTarget};
use crate::{ClientId, Display, SourceId};

/// Protocol flavor of a data source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// A `wl_data_source`: clipboard or drag-and-drop payload
    Data,
    /// A primary-selection source
    Primary,
}

#[derive(Debug)]
pub(crate) struct DataSource {
    pub(crate) client: ClientId,
    pub(crate) kind: SourceKind,
    pub(crate) version: u32,
    pub(crate) mime_types: SmallVec<[String; 4]>,
    pub(crate) dnd_actions: DndActions,
    pub(crate) accepted_mime: Option<String>,
    pub(crate) selected_action: DndAction,
    pub(crate) drop_performed: bool,
    pub(crate) cancelled: bool,
    /// Cleared when the client destroys the source while a drop keeps it
    /// on life support
    pub(crate) alive: bool,
    pub(crate) toplevel_drag: bool,
}

impl DataSource {
    fn new(client: ClientId, kind: SourceKind, version: u32) -> Self {
        DataSource {
            client,
            kind,
            version,
            mime_types: SmallVec::new(),
            dnd_actions: DndActions::empty(),
            accepted_mime: None,
            selected_action: DndAction::None,
            drop_performed: false,
            cancelled: false,
            alive: true,
            toplevel_drag: false,
        }
    }
}

impl Display {
    /// Create a new `wl_data_source` for `client`
    pub fn create_data_source(&mut self, client: ClientId) -> SourceId {
        let version = self
            .client_versions(client)
            .map(|v| v.wl_data_device)
            .unwrap_or(DND_ACTIONS_SINCE);
        let id = SourceId(self.alloc_id());
        self.sources
            .insert(id, DataSource::new(client, SourceKind::Data, version));
        id
    }

    /// Create a new primary-selection source for `client`
    pub fn create_primary_source(&mut self, client: ClientId) -> SourceId {
        let version = self
            .client_versions(client)
            .map(|v| v.wl_data_device)
            .unwrap_or(DND_ACTIONS_SINCE);
        let id = SourceId(self.alloc_id());
        self.sources
            .insert(id, DataSource::new(client, SourceKind::Primary, version));
        id
    }

    /// Add a mime type to the source's offer list
    ///
    /// Offer order is preserved; duplicates are dropped.
    pub fn data_source_offer(&mut self, source: SourceId, mime_type: impl Into<String>) {
        let mime_type = mime_type.into();
        if let Some(data) = self.sources.get_mut(&source) {
            if !data.mime_types.contains(&mime_type) {
                data.mime_types.push(mime_type);
            }
        }
    }

    /// Set the drag-and-drop actions the source supports
    ///
    /// `actions` is the raw wire mask; carrying any bit outside the
    /// defined actions is a protocol error. Primary-selection sources
    /// have no actions and ignore the request.
    pub fn data_source_set_actions(&mut self, source: SourceId, actions: u32) -> Result<(), ProtocolError> {
        let Some(data) = self.sources.get_mut(&source) else {
            return Ok(());
        };
        if data.kind != SourceKind::Data {
            return Ok(());
        }
        let Some(actions) = DndActions::from_bits(actions) else {
            return Err(ProtocolError::new(
                ObjectRef::Source(source),
                ErrorCode::InvalidActionMask,
                "invalid action mask",
            ));
        };
        data.dnd_actions = actions;
        let changed_during_drag = self
            .seats
            .iter()
            .find(|(_, s)| {
                s.drag
                    .as_ref()
                    .map(|d| d.source == Some(source))
                    .unwrap_or(false)
            })
            .map(|(id, _)| *id);
        if let Some(seat) = changed_during_drag {
            self.refresh_drag_action(seat, false);
        }
        Ok(())
    }

    /// Mark (or unmark) the source as the payload of a toplevel drag
    ///
    /// Such a source cannot be installed as a selection.
    pub fn data_source_set_toplevel_drag(&mut self, source: SourceId, toplevel_drag: bool) {
        if let Some(data) = self.sources.get_mut(&source) {
            data.toplevel_drag = toplevel_drag;
        }
    }

    /// Mime types the source offers, in offer order
    pub fn data_source_mime_types(&self, source: SourceId) -> Vec<String> {
        self.sources
            .get(&source)
            .map(|data| data.mime_types.to_vec())
            .unwrap_or_default()
    }

    /// Actions the source advertises for drags
    pub fn data_source_actions(&self, source: SourceId) -> DndActions {
        self.sources
            .get(&source)
            .map(|data| data.dnd_actions)
            .unwrap_or_else(DndActions::empty)
    }

    /// Whether the source still exists and was not destroyed by its
    /// client
    pub fn data_source_alive(&self, source: SourceId) -> bool {
        self.sources.get(&source).map(|data| data.alive).unwrap_or(false)
    }

    /// Destroy a data source
    ///
    /// A source backing a selection slot clears the slot and the focused
    /// client observes an empty selection. A source fueling an active
    /// drag aborts it. If a drop was already performed the entry is kept
    /// defunct until the retained offer settles.
    pub fn destroy_data_source(&mut self, source: SourceId) {
        let Some(data) = self.sources.get_mut(&source) else {
            return;
        };
        data.alive = false;
        let kind = data.kind;
        debug!(source = ?source, "data source destroyed");

        // drop the source from the selection slot it backs
        let target = match kind {
            SourceKind::Data => SelectionTarget::Clipboard,
            SourceKind::Primary => SelectionTarget::Primary,
        };
        let seats: Vec<_> = self.seats.keys().copied().collect();
        for seat in seats {
            let slot = {
                let seat_data = self.seats.get_mut(&seat).unwrap();
                match target {
                    SelectionTarget::Clipboard => &mut seat_data.selection,
                    SelectionTarget::Primary => &mut seat_data.primary_selection,
                }
            };
            if slot.source == Some(source) {
                slot.source = None;
                self.broadcast_selection(seat, target);
            }

            // a drag fueled by the source cannot continue
            let fueled_drag = self
                .seats
                .get(&seat)
                .and_then(|s| s.drag.as_ref())
                .map(|d| d.source == Some(source))
                .unwrap_or(false);
            if fueled_drag {
                self.end_drag(seat, false);
            }
        }

        // keep the entry around while a performed drop still needs it
        let retained = self
            .offers
            .values()
            .any(|offer| offer.source == source && offer.dropped);
        if !retained {
            self.sources.shift_remove(&source);
        }
    }

    /// Sends `cancelled` to a source that got displaced or whose drag
    /// failed.
    pub(crate) fn cancel_source(&mut self, source: SourceId) {
        let Some(data) = self.sources.get_mut(&source) else {
            return;
        };
        if !data.alive || data.cancelled {
            return;
        }
        data.cancelled = true;
        let client = data.client;
        self.queue(
            client,
            ClientEvent::DataSource {
                source,
                event: DataSourceEvent::Cancelled,
            },
        );
    }

    /// Queue an event on a source if it is still alive.
    pub(crate) fn queue_source_event(&mut self, source: SourceId, event: DataSourceEvent) {
        let Some(data) = self.sources.get(&source) else {
            return;
        };
        if !data.alive {
            return;
        }
        let client = data.client;
        self.queue(client, ClientEvent::DataSource { source, event });
    }

    /// Queue an action event on a source, respecting its bound version.
    pub(crate) fn queue_source_action(&mut self, source: SourceId, action: DndAction) {
        let Some(data) = self.sources.get_mut(&source) else {
            return;
        };
        data.selected_action = action;
        if data.version < DND_ACTIONS_SINCE {
            return;
        }
        self.queue_source_event(source, DataSourceEvent::Action { action });
    }
}
