//! Protocol error reporting
//!
//! Fatal client mistakes surface as a [`ProtocolError`] returned from the
//! request that triggered them. The error names the object the error should
//! be posted on; actually posting it and disconnecting the client is the
//! job of the host's socket layer. The display's own state is left
//! consistent when a request fails this way.

use crate::{ClientId, DeviceId, OfferId, SeatId, SourceId, SurfaceId};

/// Protocol object an error is posted on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectRef {
    /// A `wl_surface`
    Surface(SurfaceId),
    /// A `wl_subsurface` (referenced through its surface)
    Subsurface(SurfaceId),
    /// A `wl_data_source` or primary-selection source
    Source(SourceId),
    /// A `wl_data_offer` or primary-selection offer
    Offer(OfferId),
    /// A `wl_data_device`
    Device(DeviceId),
    /// A pointer constraint, identified by its (surface, seat) pair
    Constraint(SurfaceId, SeatId),
}

/// Error codes of the wire protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// The surface already has a different role assigned
    Role,
    /// A sub-surface parent relation would create a cycle
    BadSurface,
    /// `set_actions` carried bits outside of the defined action mask
    InvalidActionMask,
    /// The preferred action is not a single defined action
    InvalidAction,
    /// A selection was set from a source carrying drag-and-drop state
    InvalidSource,
    /// `finish` on an offer whose drop has not (validly) been performed
    InvalidFinish,
    /// A second constraint was requested for a (surface, pointer) pair
    AlreadyConstrained,
    /// A protocol object could not be allocated
    NoMemory,
}

impl ErrorCode {
    /// Protocol name of the error, as found in the interface definitions
    pub fn protocol_name(&self) -> &'static str {
        match self {
            ErrorCode::Role => "role",
            ErrorCode::BadSurface => "bad_surface",
            ErrorCode::InvalidActionMask => "invalid_action_mask",
            ErrorCode::InvalidAction => "invalid_action",
            ErrorCode::InvalidSource => "invalid_source",
            ErrorCode::InvalidFinish => "invalid_finish",
            ErrorCode::AlreadyConstrained => "already_constrained",
            ErrorCode::NoMemory => "no_memory",
        }
    }
}

/// A fatal protocol violation committed by a client
///
/// The host is expected to post this on `object` and disconnect the
/// offending client. Errors never propagate to other clients.
#[derive(Debug, Clone, thiserror::Error)]
#[error("protocol error {} on {object:?}: {message}", .code.protocol_name())]
pub struct ProtocolError {
    /// Object to post the error on
    pub object: ObjectRef,
    /// Protocol error code
    pub code: ErrorCode,
    /// Human readable description
    pub message: &'static str,
}

impl ProtocolError {
    pub(crate) fn new(object: ObjectRef, code: ErrorCode, message: &'static str) -> Self {
        ProtocolError {
            object,
            code,
            message,
        }
    }

    /// Client the error is attributed to, if it can still be resolved
    pub fn client(&self, display: &crate::Display) -> Option<ClientId> {
        match self.object {
            ObjectRef::Surface(s) | ObjectRef::Subsurface(s) | ObjectRef::Constraint(s, _) => {
                display.surfaces.get(&s).map(|data| data.client)
            }
            ObjectRef::Source(s) => display.sources.get(&s).map(|data| data.client),
            ObjectRef::Offer(o) => display.offers.get(&o).map(|data| data.client),
            ObjectRef::Device(d) => display.devices.get(&d).map(|data| data.client),
        }
    }
}
