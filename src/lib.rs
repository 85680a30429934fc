#![warn(missing_docs, missing_debug_implementations, rust_2018_idioms)]

//! # Keelson: the input and selection core of a Wayland compositor
//!
//! This crate implements the per-seat input routing of a compositor
//! together with the clipboard and drag-and-drop machinery built on top of
//! it: seats with their pointer/keyboard/touch focus, the data
//! device/source/offer protocol including full drag-and-drop sessions,
//! pointer constraints (confinement and locking), and the double-buffered
//! surface and sub-surface state these sit on.
//!
//! ## Structure of the crate
//!
//! Everything hangs off a [`Display`]: protocol objects live in id-keyed
//! arenas inside it and reference each other by id, so a dangling
//! reference degrades into "not found" instead of undefined behavior.
//! Client requests are methods on the display; host input lands through
//! the `notify_*` family on the seat modules. The protocol events these
//! produce queue up per client and are drained with
//! [`Display::take_events`]; notifications addressed at the compositor
//! itself come out of [`Display::take_host_events`].
//!
//! The crate is deliberately transport-agnostic: it has no socket or wire
//! format handling, no event loop and no rendering. The host dispatcher
//! owns all of those and drives the core between events. Everything here
//! is single-threaded and run-to-completion.
//!
//! ## Error handling
//!
//! Fatal client mistakes (double role assignment, invalid action masks,
//! selection sources carrying drag state, sub-surface cycles, premature
//! `finish`) surface as a [`ProtocolError`] naming the offending object;
//! the host posts it and disconnects that client. Requests referencing
//! stale serials or dead objects are ignored without error, as the
//! protocol demands.

pub mod client;
pub mod compositor;
mod display;
mod error;
pub mod event;
pub mod input;
pub mod pointer_constraints;
pub mod selection;
pub mod utils;

pub use client::ClientVersions;
pub use display::{CallbackId, ClientId, DeviceId, Display, OfferId, SeatId, SourceId, SurfaceId};
pub use error::{ErrorCode, ObjectRef, ProtocolError};
