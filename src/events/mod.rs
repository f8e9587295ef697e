//! Event dispatch core for the Orbit UI framework
//!
//! The event system provides:
//! - An event record with target, phase and stop/prevent annotations
//! - Listener handles compared by identity, bound with a receiver and priority
//! - A per-phase registry keeping listeners in priority order
//! - A dispatcher delivering events to one node's listeners
//! - A reusable shared event for allocation-free convenience dispatch

pub mod dispatcher;
pub mod error;
pub mod event;
pub mod listener;
pub mod registry;
mod shared;

pub use dispatcher::EventDispatcher;
pub use error::DispatchError;
pub use event::{Event, EventPhase, Payload, TargetId};
pub use listener::{Listener, ListenerBinding, ListenerResult, Receiver};
pub use registry::{ListenerPhase, PhaseRegistry};
pub use shared::shared_event_in_use;
