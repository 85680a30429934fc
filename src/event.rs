//! Typed outbound events
//!
//! Every event the compositor would send over the wire is pushed, in order,
//! onto the queue of the client owning the target object. The host drains
//! these with [`Display::take_events`](crate::Display::take_events) and
//! serializes them onto the sockets. Notifications addressed at the
//! compositor itself (rather than a client) use the separate [`HostEvent`]
//! queue.

use std::os::fd::OwnedFd;

use crate::input::keyboard::{KeyState, ModifiersState};
use crate::input::pointer::{Axis, AxisSource, ButtonState};
use crate::input::Capability;
use crate::selection::{DndAction, DndActions};
use crate::utils::{Logical, Point, Serial};
use crate::{CallbackId, DeviceId, OfferId, SeatId, SourceId, SurfaceId};

/// Events of the `wl_seat` global
#[derive(Debug, PartialEq, Eq)]
pub enum SeatEvent {
    /// The set of capabilities of the seat changed
    Capabilities {
        /// Currently advertised capabilities
        capabilities: Capability,
    },
}

/// Events of a `wl_pointer`
#[derive(Debug, PartialEq)]
pub enum PointerEvent {
    /// The pointer entered a surface
    Enter {
        /// Serial of the enter
        serial: Serial,
        /// Surface gaining pointer focus
        surface: SurfaceId,
        /// Position in surface-local coordinates
        position: Point<f64, Logical>,
    },
    /// The pointer left a surface
    Leave {
        /// Serial of the leave
        serial: Serial,
        /// Surface losing pointer focus
        surface: SurfaceId,
    },
    /// The pointer moved within the focused surface
    Motion {
        /// Timestamp in milliseconds
        time: u32,
        /// Position in surface-local coordinates
        position: Point<f64, Logical>,
    },
    /// A button was pressed or released
    Button {
        /// Serial of the button event
        serial: Serial,
        /// Timestamp in milliseconds
        time: u32,
        /// Button code
        button: u32,
        /// New state of the button
        state: ButtonState,
    },
    /// Scroll or other axis motion
    Axis {
        /// Timestamp in milliseconds
        time: u32,
        /// Axis that moved
        axis: Axis,
        /// Amount of motion
        value: f64,
        /// Step count for sources with detents
        discrete: Option<i32>,
        /// What produced the motion
        source: AxisSource,
    },
    /// End of a group of logically simultaneous pointer events
    ///
    /// Only emitted to clients whose `wl_seat` is recent enough to know
    /// the event.
    Frame,
}

/// Events of a `wl_keyboard`
#[derive(Debug, PartialEq, Eq)]
pub enum KeyboardEvent {
    /// The surface gained keyboard focus
    Enter {
        /// Serial of the enter
        serial: Serial,
        /// Surface gaining keyboard focus
        surface: SurfaceId,
        /// Keys pressed at the time of the enter
        keys: Vec<u32>,
    },
    /// The surface lost keyboard focus
    Leave {
        /// Serial of the leave
        serial: Serial,
        /// Surface losing keyboard focus
        surface: SurfaceId,
    },
    /// A key was pressed or released
    Key {
        /// Serial of the key event
        serial: Serial,
        /// Timestamp in milliseconds
        time: u32,
        /// Key code
        key: u32,
        /// New state of the key
        state: KeyState,
    },
    /// The modifier state changed
    Modifiers {
        /// Serial of the modifiers update
        serial: Serial,
        /// New modifier state
        modifiers: ModifiersState,
    },
}

/// Events of a `wl_touch`
#[derive(Debug, PartialEq)]
pub enum TouchEvent {
    /// A new touch point appeared on a surface
    Down {
        /// Serial of the down event
        serial: Serial,
        /// Timestamp in milliseconds
        time: u32,
        /// Surface under the touch point
        surface: SurfaceId,
        /// Id of the touch point
        id: i32,
        /// Position in surface-local coordinates
        position: Point<f64, Logical>,
    },
    /// A touch point was lifted
    Up {
        /// Serial of the up event
        serial: Serial,
        /// Timestamp in milliseconds
        time: u32,
        /// Id of the touch point
        id: i32,
    },
    /// A touch point moved
    Motion {
        /// Timestamp in milliseconds
        time: u32,
        /// Id of the touch point
        id: i32,
        /// Position in surface-local coordinates
        position: Point<f64, Logical>,
    },
    /// End of a group of logically simultaneous touch events
    Frame,
    /// The compositor dropped the touch session
    Cancel,
}

/// Events of a `wl_data_device` (or primary-selection device)
#[derive(Debug, PartialEq)]
pub enum DataDeviceEvent {
    /// Introduces a freshly minted data offer to the client
    ///
    /// Always followed by the offer's mime types and by the event that
    /// attaches the offer to a selection slot or drag.
    DataOffer {
        /// The new offer
        offer: OfferId,
    },
    /// An active drag entered one of the client's surfaces
    Enter {
        /// Serial of the enter
        serial: Serial,
        /// Surface being dragged over
        surface: SurfaceId,
        /// Position in surface-local coordinates
        position: Point<f64, Logical>,
        /// The offer describing the dragged data, absent for
        /// client-internal drags
        offer: Option<OfferId>,
    },
    /// The drag left the client's surface
    Leave,
    /// The drag moved over the client's surface
    Motion {
        /// Timestamp in milliseconds
        time: u32,
        /// Position in surface-local coordinates
        position: Point<f64, Logical>,
    },
    /// The drag was dropped on the client's surface
    Drop,
    /// The clipboard selection changed
    Selection {
        /// Offer mirroring the new selection, `None` if the selection is
        /// empty
        offer: Option<OfferId>,
    },
    /// The primary selection changed
    PrimarySelection {
        /// Offer mirroring the new primary selection, `None` if it is
        /// empty
        offer: Option<OfferId>,
    },
}

/// Events of a `wl_data_source` (or primary-selection source)
#[derive(Debug)]
pub enum DataSourceEvent {
    /// A target accepted (or rejected, with `None`) one of the offered
    /// mime types
    Target {
        /// Accepted mime type
        mime_type: Option<String>,
    },
    /// A receiving client asked for the data; write it to `fd` and close
    /// it
    Send {
        /// Requested mime type
        mime_type: String,
        /// Writing end handed over to the source client
        fd: OwnedFd,
    },
    /// The source has been replaced or the drag it backed failed; release
    /// it
    Cancelled,
    /// The user performed the drop; the transfer may still be in progress
    DndDropPerformed,
    /// The drop target confirmed the transfer; for a `Move` the origin may
    /// now delete the data
    DndFinished,
    /// The action the target chose for the drag
    Action {
        /// Currently negotiated action
        action: DndAction,
    },
}

/// Events of a `wl_data_offer` (or primary-selection offer)
#[derive(Debug, PartialEq, Eq)]
pub enum DataOfferEvent {
    /// The offer provides data under this mime type
    Offer {
        /// Offered mime type
        mime_type: String,
    },
    /// The actions the source advertises for the drag
    SourceActions {
        /// Supported action mask
        actions: DndActions,
    },
    /// The action currently negotiated for the drag
    Action {
        /// Currently negotiated action
        action: DndAction,
    },
}

/// Events of a pointer constraint object
#[derive(Debug, PartialEq, Eq)]
pub enum PointerConstraintEvent {
    /// The lock is active
    Locked,
    /// The lock was deactivated; one-shot locks are dead afterwards
    Unlocked,
    /// The confinement is active
    Confined,
    /// The confinement was deactivated; one-shot confinements are dead
    /// afterwards
    Unconfined,
}

/// A protocol event queued for a particular client
#[derive(Debug)]
pub enum ClientEvent {
    /// `wl_seat` event
    Seat {
        /// Seat the event belongs to
        seat: SeatId,
        /// The event
        event: SeatEvent,
    },
    /// `wl_pointer` event
    Pointer {
        /// Seat the pointer belongs to
        seat: SeatId,
        /// The event
        event: PointerEvent,
    },
    /// `wl_keyboard` event
    Keyboard {
        /// Seat the keyboard belongs to
        seat: SeatId,
        /// The event
        event: KeyboardEvent,
    },
    /// `wl_touch` event
    Touch {
        /// Seat the touch device belongs to
        seat: SeatId,
        /// The event
        event: TouchEvent,
    },
    /// Data-device event
    DataDevice {
        /// Receiving device
        device: DeviceId,
        /// The event
        event: DataDeviceEvent,
    },
    /// Data-source event
    DataSource {
        /// Source the event belongs to
        source: SourceId,
        /// The event
        event: DataSourceEvent,
    },
    /// Data-offer event
    DataOffer {
        /// Offer the event belongs to
        offer: OfferId,
        /// The event
        event: DataOfferEvent,
    },
    /// Pointer-constraint event
    PointerConstraint {
        /// Surface the constraint is attached to
        surface: SurfaceId,
        /// Seat whose pointer is constrained
        seat: SeatId,
        /// The event
        event: PointerConstraintEvent,
    },
    /// A frame callback fired
    FrameCallback {
        /// Surface the callback was requested on
        surface: SurfaceId,
        /// The callback
        callback: CallbackId,
    },
}

/// Notifications addressed at the host compositor instead of a client
#[derive(Debug, PartialEq)]
pub enum HostEvent {
    /// A drag session started on the seat
    DragStarted {
        /// Seat the drag runs on
        seat: SeatId,
    },
    /// The drag session on the seat ended
    DragEnded {
        /// Seat the drag ran on
        seat: SeatId,
        /// Whether a drop was delivered to a target
        dropped: bool,
    },
    /// A client holding a pointer lock committed a new cursor position
    /// hint
    CursorPositionHint {
        /// Surface holding the lock
        surface: SurfaceId,
        /// Seat whose pointer is locked
        seat: SeatId,
        /// Hint in surface-local coordinates
        position: Point<f64, Logical>,
    },
}
