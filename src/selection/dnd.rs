//! Drag-and-drop sessions
//!
//! A drag is authorized by an implicit grab: the serial of a pointer
//! button press that is still held, or of a touch point still in contact.
//! While it runs, the dragging device stops talking to clients; focus
//! changes drive the data-device protocol of whichever client owns the
//! surface under the input point instead.
//!
//! The chosen action is negotiated continuously between the source's
//! advertised mask, the target offer's mask and preference, and the
//! keyboard modifiers, until a drop freezes it. A performed drop keeps
//! the target's offer (and through it the source) alive until the target
//! finishes or gives up.

use tracing::debug;

use crate::compositor::DND_ICON_ROLE;
use crate::error::ProtocolError;
use crate::event::{ClientEvent, DataDeviceEvent, DataSourceEvent, HostEvent};
use crate::input::keyboard::ModifiersState;
use crate::selection::offer::OfferKind;
use crate::selection::{DndAction, DndActions};
use crate::utils::{Logical, Point, Serial};
use crate::{ClientId, DeviceId, Display, OfferId, SeatId, SourceId, SurfaceId};

/// Input device a drag is riding on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DragMode {
    /// Pointer-initiated; ends when the last button is released
    Pointer,
    /// Touch-initiated; ends when the authorizing point goes up
    Touch {
        /// Touch point holding the grab
        id: i32,
    },
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct DragFocus {
    pub(crate) surface: SurfaceId,
    /// Location of the surface in seat space
    pub(crate) location: Point<f64, Logical>,
    /// Data device of the surface's client, when it has one
    pub(crate) device: Option<DeviceId>,
}

#[derive(Debug)]
pub(crate) struct DragState {
    pub(crate) mode: DragMode,
    /// `None` for client-internal drags that carry no payload across
    /// clients
    pub(crate) source: Option<SourceId>,
    pub(crate) origin_client: ClientId,
    pub(crate) icon: Option<SurfaceId>,
    pub(crate) focus: Option<DragFocus>,
    pub(crate) offer: Option<OfferId>,
}

/// Picks the drag-and-drop action for the current negotiation inputs.
///
/// Modifier keys win while the drop is still pending (control asks for a
/// copy, shift for a move), then the target's preference if the source can
/// honor it, then the first action both sides support in a fixed order.
pub(crate) fn choose_dnd_action(
    source_actions: DndActions,
    offer_actions: Option<DndActions>,
    offer_preferred: Option<DndAction>,
    modifiers: ModifiersState,
    drop_performed: bool,
) -> DndAction {
    let both = |action: DndActions| {
        source_actions.contains(action) && offer_actions.map(|o| o.contains(action)).unwrap_or(false)
    };

    if !drop_performed {
        if modifiers.ctrl && both(DndActions::COPY) {
            return DndAction::Copy;
        }
        if modifiers.shift && both(DndActions::MOVE) {
            return DndAction::Move;
        }
    }

    if let Some(preferred) = offer_preferred {
        if preferred != DndAction::None && source_actions.contains(preferred.as_flags()) {
            return preferred;
        }
    }

    for action in [DndAction::Copy, DndAction::Move, DndAction::Ask] {
        if both(action.as_flags()) {
            return action;
        }
    }

    DndAction::None
}

impl Display {
    /// Start a drag on the seat of `device`
    ///
    /// `serial` must name a still-held implicit grab on the seat,
    /// otherwise the request is ignored without error. An icon surface is
    /// promoted to the drag-icon role, which fails on a surface that
    /// already has another role. Without a source the drag stays internal
    /// to the originating client.
    pub fn start_drag(
        &mut self,
        device: DeviceId,
        source: Option<SourceId>,
        origin: SurfaceId,
        icon: Option<SurfaceId>,
        serial: Serial,
    ) -> Result<(), ProtocolError> {
        let Some(seat) = self.devices.get(&device).map(|d| d.seat) else {
            return Ok(());
        };
        let Some(seat_data) = self.seats.get(&seat) else {
            return Ok(());
        };
        if seat_data.drag.is_some() {
            debug!(seat = ?seat, "denying start_drag while a drag is running");
            return Ok(());
        }

        let mode = if seat_data
            .pointer
            .as_ref()
            .map(|p| p.has_implicit_grab(serial))
            .unwrap_or(false)
        {
            Some(DragMode::Pointer)
        } else {
            seat_data
                .touch
                .as_ref()
                .and_then(|t| t.down_serial(serial))
                .map(|id| DragMode::Touch { id })
        };
        let Some(mode) = mode else {
            debug!(seat = ?seat, ?serial, "denying start_drag without implicit grab");
            return Ok(());
        };

        let Some(origin_client) = self.surface_client(origin) else {
            return Ok(());
        };
        let source = match source {
            Some(id) => {
                if !self.data_source_alive(id) {
                    return Ok(());
                }
                Some(id)
            }
            None => None,
        };

        if let Some(icon_surface) = icon {
            self.surface_set_role(icon_surface, DND_ICON_ROLE)?;
            if let Some(icon_data) = self.surfaces.get_mut(&icon_surface) {
                icon_data.dnd_icon_offset = Point::default();
            }
        }

        let (position, origin_location) = match mode {
            DragMode::Pointer => {
                let pointer = self.seats.get(&seat).unwrap().pointer.as_ref().unwrap();
                let location = pointer
                    .focus
                    .filter(|f| f.surface == origin)
                    .map(|f| f.location)
                    .unwrap_or_default();
                (pointer.position, location)
            }
            DragMode::Touch { id } => {
                let touch = self.seats.get(&seat).unwrap().touch.as_ref().unwrap();
                let position = touch.points.get(&id).map(|p| p.position).unwrap_or_default();
                let location = touch
                    .interactions
                    .get(&origin)
                    .map(|i| i.location)
                    .unwrap_or_default();
                (position, location)
            }
        };

        // the dragging pointer goes silent for its regular client
        if mode == DragMode::Pointer {
            self.pointer_clear_focus(seat);
        }

        debug!(seat = ?seat, ?mode, ?source, origin = ?origin, "drag started");
        self.seats.get_mut(&seat).unwrap().drag = Some(DragState {
            mode,
            source,
            origin_client,
            icon,
            focus: None,
            offer: None,
        });
        self.queue_host(HostEvent::DragStarted { seat });

        // the drag begins over its origin surface
        self.set_drag_target(seat, Some((origin, origin_location)), position);
        Ok(())
    }

    /// Point the running drag at a new surface (or nowhere)
    ///
    /// During a pointer drag the pointer focus notifications call this on
    /// their own; touch drags (and host-side grab tracking) drive it
    /// directly. The previous target receives `leave` and loses its
    /// offer; the new target receives a fresh offer, the source's action
    /// mask and `enter`, and action negotiation is wired up.
    pub fn set_drag_target(
        &mut self,
        seat: SeatId,
        target: Option<(SurfaceId, Point<f64, Logical>)>,
        position: Point<f64, Logical>,
    ) {
        let Some(seat_data) = self.seats.get_mut(&seat) else {
            return;
        };
        let Some(drag) = seat_data.drag.as_mut() else {
            return;
        };

        if let Some((surface, location)) = target {
            if let Some(focus) = drag.focus.as_mut() {
                if focus.surface == surface {
                    focus.location = location;
                    return;
                }
            }
        }

        let source = drag.source;
        let origin_client = drag.origin_client;
        let old_focus = drag.focus.take();
        let old_offer = drag.offer.take();

        if let Some(old) = old_focus {
            if let Some(device) = old.device {
                if let Some(client) = self.data_device_client(device) {
                    self.queue(
                        client,
                        ClientEvent::DataDevice {
                            device,
                            event: DataDeviceEvent::Leave,
                        },
                    );
                }
            }
        }
        if let Some(offer) = old_offer {
            // a pre-drop target change invalidates the offer entirely
            self.offers.shift_remove(&offer);
        }

        let target = target.filter(|(surface, _)| self.surfaces.contains_key(surface));
        let Some((surface, location)) = target else {
            if let Some(source) = source {
                self.queue_source_action(source, DndAction::None);
            }
            return;
        };

        let target_client = self.surface_client(surface).unwrap();
        let visible = source.is_some() || target_client == origin_client;
        let device = self
            .devices_for(seat, target_client)
            .into_iter()
            .next()
            .filter(|_| visible);
        let Some(device) = device else {
            // keep tracking the surface, there is just nobody to talk to
            self.seats.get_mut(&seat).unwrap().drag.as_mut().unwrap().focus = Some(DragFocus {
                surface,
                location,
                device: None,
            });
            return;
        };

        let serial = self.seat_serial(seat);
        if let Some(source) = source {
            // the new target has not accepted anything yet
            if let Some(source_data) = self.sources.get_mut(&source) {
                source_data.accepted_mime = None;
            }
            self.queue_source_event(source, DataSourceEvent::Target { mime_type: None });

            let offer = self.new_offer(device, source, OfferKind::Dnd);
            let actions = self.data_source_actions(source);
            self.queue_offer_source_actions(offer, actions);
            self.queue(
                target_client,
                ClientEvent::DataDevice {
                    device,
                    event: DataDeviceEvent::Enter {
                        serial,
                        surface,
                        position: position - location,
                        offer: Some(offer),
                    },
                },
            );
            let drag = self.seats.get_mut(&seat).unwrap().drag.as_mut().unwrap();
            drag.focus = Some(DragFocus {
                surface,
                location,
                device: Some(device),
            });
            drag.offer = Some(offer);
            self.refresh_drag_action(seat, true);
        } else {
            self.queue(
                target_client,
                ClientEvent::DataDevice {
                    device,
                    event: DataDeviceEvent::Enter {
                        serial,
                        surface,
                        position: position - location,
                        offer: None,
                    },
                },
            );
            let drag = self.seats.get_mut(&seat).unwrap().drag.as_mut().unwrap();
            drag.focus = Some(DragFocus {
                surface,
                location,
                device: Some(device),
            });
        }
    }

    /// Whether a drag is running on the seat
    pub fn drag_active(&self, seat: SeatId) -> bool {
        self.seats
            .get(&seat)
            .map(|s| s.drag.is_some())
            .unwrap_or(false)
    }

    /// Source of the running drag, if it carries one
    pub fn drag_source(&self, seat: SeatId) -> Option<SourceId> {
        self.seats.get(&seat)?.drag.as_ref()?.source
    }

    /// Icon surface of the running drag
    pub fn drag_icon(&self, seat: SeatId) -> Option<SurfaceId> {
        self.seats.get(&seat)?.drag.as_ref()?.icon
    }

    /// Surface the drag currently points at
    pub fn drag_target(&self, seat: SeatId) -> Option<SurfaceId> {
        self.seats
            .get(&seat)?
            .drag
            .as_ref()?
            .focus
            .as_ref()
            .map(|f| f.surface)
    }

    /// Abort the running drag
    ///
    /// For compositor-side interruptions such as a session lock: the
    /// target receives `leave`, the source is cancelled, no drop happens.
    pub fn abort_drag(&mut self, seat: SeatId) {
        self.end_drag(seat, true);
    }

    /// Forward motion to the drag target.
    pub(crate) fn drag_motion(&mut self, seat: SeatId, time: u32, position: Point<f64, Logical>) {
        let Some(seat_data) = self.seats.get(&seat) else {
            return;
        };
        let Some(focus) = seat_data.drag.as_ref().and_then(|d| d.focus.as_ref()) else {
            return;
        };
        let Some(device) = focus.device else {
            return;
        };
        let local = position - focus.location;
        if let Some(client) = self.data_device_client(device) {
            self.queue(
                client,
                ClientEvent::DataDevice {
                    device,
                    event: DataDeviceEvent::Motion {
                        time,
                        position: local,
                    },
                },
            );
        }
    }

    /// The user let go: drop on the current target if negotiation allows
    /// it, cancel the drag otherwise.
    pub(crate) fn finish_drag_drop(&mut self, seat: SeatId, _time: u32) {
        let Some(drag) = self.seats.get_mut(&seat).and_then(|s| s.drag.take()) else {
            return;
        };

        let target_device = drag.focus.as_ref().and_then(|f| f.device);
        let offer_ok = drag
            .offer
            .and_then(|o| self.offers.get(&o))
            .map(|o| o.accepted && o.chosen_action != DndAction::None)
            .unwrap_or(false);
        let validated = offer_ok && target_device.is_some();

        if validated {
            let offer = drag.offer.unwrap();
            let device = target_device.unwrap();
            let source = drag.source.unwrap();

            if let Some(source_data) = self.sources.get_mut(&source) {
                source_data.drop_performed = true;
            }
            if let Some(offer_data) = self.offers.get_mut(&offer) {
                offer_data.dropped = true;
            }

            let versioned = self
                .sources
                .get(&source)
                .map(|s| s.version >= crate::client::DND_ACTIONS_SINCE)
                .unwrap_or(false);
            if versioned {
                self.queue_source_event(source, DataSourceEvent::DndDropPerformed);
            }

            if let Some(client) = self.data_device_client(device) {
                self.queue(
                    client,
                    ClientEvent::DataDevice {
                        device,
                        event: DataDeviceEvent::Drop,
                    },
                );
                self.queue(
                    client,
                    ClientEvent::DataDevice {
                        device,
                        event: DataDeviceEvent::Leave,
                    },
                );
            }
            debug!(seat = ?seat, source = ?source, "drop performed");
        } else {
            if let Some(device) = target_device {
                if let Some(client) = self.data_device_client(device) {
                    self.queue(
                        client,
                        ClientEvent::DataDevice {
                            device,
                            event: DataDeviceEvent::Leave,
                        },
                    );
                }
            }
            if let Some(offer) = drag.offer {
                self.offers.shift_remove(&offer);
            }
            if let Some(source) = drag.source {
                self.cancel_source(source);
            }
            debug!(seat = ?seat, "drag cancelled at drop");
        }

        self.queue_host(HostEvent::DragEnded {
            seat,
            dropped: validated,
        });
    }

    /// Tear down the running drag without a drop.
    ///
    /// `notify_source` is false when the source itself is the reason the
    /// drag dies, so that no event targets the gone object.
    pub(crate) fn end_drag(&mut self, seat: SeatId, notify_source: bool) {
        let Some(drag) = self.seats.get_mut(&seat).and_then(|s| s.drag.take()) else {
            return;
        };
        if let Some(device) = drag.focus.as_ref().and_then(|f| f.device) {
            if let Some(client) = self.data_device_client(device) {
                self.queue(
                    client,
                    ClientEvent::DataDevice {
                        device,
                        event: DataDeviceEvent::Leave,
                    },
                );
            }
        }
        if let Some(offer) = drag.offer {
            self.offers.shift_remove(&offer);
        }
        if notify_source {
            if let Some(source) = drag.source {
                self.cancel_source(source);
            }
        }
        debug!(seat = ?seat, "drag ended without drop");
        self.queue_host(HostEvent::DragEnded {
            seat,
            dropped: false,
        });
    }

    /// Re-run action negotiation for the running drag and mirror a
    /// changed choice to both sides. `force` emits even without a
    /// change, used when a fresh target is wired up.
    pub(crate) fn refresh_drag_action(&mut self, seat: SeatId, force: bool) {
        let Some(seat_data) = self.seats.get(&seat) else {
            return;
        };
        let Some(drag) = seat_data.drag.as_ref() else {
            return;
        };
        let (Some(source), Some(offer)) = (drag.source, drag.offer) else {
            return;
        };
        let Some(source_data) = self.sources.get(&source) else {
            return;
        };
        let Some(offer_data) = self.offers.get(&offer) else {
            return;
        };
        let modifiers = seat_data
            .keyboard
            .as_ref()
            .map(|k| k.modifiers)
            .unwrap_or_default();

        let action = choose_dnd_action(
            source_data.dnd_actions,
            offer_data.supported_actions,
            offer_data.preferred_action,
            modifiers,
            source_data.drop_performed,
        );
        if force || action != offer_data.chosen_action {
            self.queue_offer_action(offer, action);
            self.queue_source_action(source, action);
        }
    }

    /// A surface died; the drag sheds every reference to it but keeps
    /// running.
    pub(crate) fn drag_forget_surface(&mut self, surface: SurfaceId) {
        let seats: Vec<_> = self.seats.keys().copied().collect();
        for seat in seats {
            let Some(drag) = self.seats.get_mut(&seat).and_then(|s| s.drag.as_mut()) else {
                continue;
            };
            if drag.icon == Some(surface) {
                drag.icon = None;
            }
            if drag.focus.as_ref().map(|f| f.surface) != Some(surface) {
                continue;
            }
            let focus = drag.focus.take();
            let offer = drag.offer.take();
            if let Some(device) = focus.and_then(|f| f.device) {
                if let Some(client) = self.data_device_client(device) {
                    self.queue(
                        client,
                        ClientEvent::DataDevice {
                            device,
                            event: DataDeviceEvent::Leave,
                        },
                    );
                }
            }
            if let Some(offer) = offer {
                self.offers.shift_remove(&offer);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mods(ctrl: bool, shift: bool) -> ModifiersState {
        ModifiersState {
            ctrl,
            shift,
            ..Default::default()
        }
    }

    #[test]
    fn modifiers_pick_the_action_before_a_drop() {
        let both = DndActions::COPY | DndActions::MOVE;
        assert_eq!(
            choose_dnd_action(both, Some(both), Some(DndAction::Move), mods(true, false), false),
            DndAction::Copy
        );
        assert_eq!(
            choose_dnd_action(both, Some(both), Some(DndAction::Copy), mods(false, true), false),
            DndAction::Move
        );
    }

    #[test]
    fn modifiers_are_ignored_after_the_drop() {
        let both = DndActions::COPY | DndActions::MOVE;
        assert_eq!(
            choose_dnd_action(both, Some(both), Some(DndAction::Move), mods(true, false), true),
            DndAction::Move
        );
    }

    #[test]
    fn modifier_needs_support_on_both_sides() {
        assert_eq!(
            choose_dnd_action(
                DndActions::MOVE,
                Some(DndActions::COPY | DndActions::MOVE),
                None,
                mods(true, false),
                false
            ),
            DndAction::Move
        );
    }

    #[test]
    fn preference_of_the_target_wins_when_the_source_can_honor_it() {
        assert_eq!(
            choose_dnd_action(
                DndActions::COPY | DndActions::ASK,
                Some(DndActions::COPY),
                Some(DndAction::Ask),
                mods(false, false),
                false
            ),
            DndAction::Ask
        );
    }

    #[test]
    fn fixed_order_fallback() {
        let all = DndActions::COPY | DndActions::MOVE | DndActions::ASK;
        assert_eq!(
            choose_dnd_action(all, Some(all), None, mods(false, false), false),
            DndAction::Copy
        );
        assert_eq!(
            choose_dnd_action(
                DndActions::MOVE | DndActions::ASK,
                Some(all),
                None,
                mods(false, false),
                false
            ),
            DndAction::Move
        );
        assert_eq!(
            choose_dnd_action(DndActions::ASK, Some(all), None, mods(false, false), false),
            DndAction::Ask
        );
    }

    #[test]
    fn no_overlap_means_no_action() {
        assert_eq!(
            choose_dnd_action(
                DndActions::COPY,
                Some(DndActions::MOVE),
                None,
                mods(false, false),
                false
            ),
            DndAction::None
        );
        assert_eq!(
            choose_dnd_action(DndActions::COPY, None, None, mods(false, false), false),
            DndAction::None
        );
    }
}
