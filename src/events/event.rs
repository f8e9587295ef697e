//! Event record for the Orbit dispatch core

use std::any::Any;
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Opaque user data carried by an event
pub type Payload = Rc<dyn Any>;

static NEXT_TARGET_ID: AtomicUsize = AtomicUsize::new(1);

/// Identity of an [`EventDispatcher`](crate::events::EventDispatcher)
///
/// Events refer to dispatchers by id rather than by reference so that an
/// event can outlive the nodes it travelled through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TargetId(usize);

impl TargetId {
    /// Allocate a fresh, process-unique id
    pub(crate) fn next() -> Self {
        Self(NEXT_TARGET_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw numeric value, mostly useful for logging
    pub fn value(self) -> usize {
        self.0
    }
}

impl fmt::Display for TargetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Specifies the event propagation phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EventPhase {
    /// Event is traveling down from the root to the target
    Capture,

    /// Event is at the target
    #[default]
    Target,

    /// Event is traveling up from the target to the root
    Bubble,
}

/// A message delivered to listeners
///
/// The type key, bubbles flag and payload describe the event. Target,
/// current target and the stop/prevent flags are dispatch-time annotations
/// written by the dispatcher and by listener code.
pub struct Event {
    type_key: String,
    bubbles: bool,
    payload: Option<Payload>,
    target: Option<TargetId>,
    current_target: Option<TargetId>,
    phase: EventPhase,
    propagation_stopped: bool,
    immediate_propagation_stopped: bool,
    default_prevented: bool,
}

impl Event {
    /// Create a new event without payload
    pub fn new(type_key: impl Into<String>, bubbles: bool) -> Self {
        Self {
            type_key: type_key.into(),
            bubbles,
            payload: None,
            target: None,
            current_target: None,
            phase: EventPhase::Target,
            propagation_stopped: false,
            immediate_propagation_stopped: false,
            default_prevented: false,
        }
    }

    /// Create a new event carrying `payload`
    pub fn with_payload(type_key: impl Into<String>, bubbles: bool, payload: Payload) -> Self {
        let mut event = Self::new(type_key, bubbles);
        event.payload = Some(payload);
        event
    }

    pub fn type_key(&self) -> &str {
        &self.type_key
    }

    pub fn bubbles(&self) -> bool {
        self.bubbles
    }

    pub fn payload(&self) -> Option<&Payload> {
        self.payload.as_ref()
    }

    /// Downcast the payload to a concrete type
    pub fn payload_as<T: 'static>(&self) -> Option<&T> {
        self.payload.as_ref()?.downcast_ref::<T>()
    }

    /// The dispatcher's declared target, set when dispatch begins
    pub fn target(&self) -> Option<TargetId> {
        self.target
    }

    /// The node currently notifying listeners
    pub fn current_target(&self) -> Option<TargetId> {
        self.current_target
    }

    pub fn phase(&self) -> EventPhase {
        self.phase
    }

    /// Set by whoever drives propagation across a chain of nodes
    pub fn set_phase(&mut self, phase: EventPhase) {
        self.phase = phase;
    }

    /// Set by whoever drives propagation across a chain of nodes
    pub fn set_current_target(&mut self, target: TargetId) {
        self.current_target = Some(target);
    }

    /// Stop delivery to further nodes of the chain
    pub fn stop_propagation(&mut self) {
        self.propagation_stopped = true;
    }

    /// Stop delivery to any further listener, including the ones on this node
    pub fn stop_immediate_propagation(&mut self) {
        self.propagation_stopped = true;
        self.immediate_propagation_stopped = true;
    }

    /// Signal that the default action should not occur
    pub fn prevent_default(&mut self) {
        self.default_prevented = true;
    }

    pub fn is_propagation_stopped(&self) -> bool {
        self.propagation_stopped
    }

    pub fn is_immediate_propagation_stopped(&self) -> bool {
        self.immediate_propagation_stopped
    }

    pub fn is_default_prevented(&self) -> bool {
        self.default_prevented
    }

    /// Clear every flag a listener can set
    pub(crate) fn reset_flags(&mut self) {
        self.propagation_stopped = false;
        self.immediate_propagation_stopped = false;
        self.default_prevented = false;
    }

    pub(crate) fn stamp_target(&mut self, target: TargetId) {
        self.target = Some(target);
        self.current_target = Some(target);
    }

    /// Rewrite the descriptive fields ahead of a reused dispatch
    pub(crate) fn reinit(&mut self, type_key: &str, bubbles: bool, payload: Option<Payload>) {
        self.type_key.clear();
        self.type_key.push_str(type_key);
        self.bubbles = bubbles;
        self.payload = payload;
        self.phase = EventPhase::Target;
    }

    pub(crate) fn take_payload(&mut self) -> Option<Payload> {
        self.payload.take()
    }
}

impl fmt::Debug for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Event")
            .field("type_key", &self.type_key)
            .field("bubbles", &self.bubbles)
            .field("payload", &self.payload.as_ref().map(|_| "[Payload]"))
            .field("target", &self.target)
            .field("current_target", &self.current_target)
            .field("phase", &self.phase)
            .field("propagation_stopped", &self.propagation_stopped)
            .field(
                "immediate_propagation_stopped",
                &self.immediate_propagation_stopped,
            )
            .field("default_prevented", &self.default_prevented)
            .finish()
    }
}
