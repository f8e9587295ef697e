//! Event dispatcher
//!
//! An [`EventDispatcher`] owns the listener lists of one event source and
//! delivers events to them synchronously. Delivery across a hierarchy of
//! nodes is left to the caller, which invokes [`EventDispatcher::dispatch`]
//! or [`EventDispatcher::notify`] once per node with the event's phase and
//! current target updated along the way.

use std::cell::RefCell;

use super::shared::SharedEventLease;
use super::{
    DispatchError, Event, Listener, ListenerBinding, ListenerPhase, Payload, PhaseRegistry,
    Receiver, TargetId,
};
use crate::config::{DispatcherConfig, IterationMode};

/// Synchronous, single-threaded event source
#[derive(Debug)]
pub struct EventDispatcher {
    /// Identity of this dispatcher
    id: TargetId,

    /// Identity stamped as the event target; `id` unless delegated
    declared_target: TargetId,

    /// Listener lists, mutable while a dispatch is in progress
    registry: RefCell<PhaseRegistry>,

    config: DispatcherConfig,
}

impl Default for EventDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl EventDispatcher {
    /// Create a dispatcher that reports itself as the event target
    pub fn new() -> Self {
        let id = TargetId::next();
        Self {
            id,
            declared_target: id,
            registry: RefCell::new(PhaseRegistry::new()),
            config: DispatcherConfig::default(),
        }
    }

    /// Create a dispatcher that reports `target` as the event target
    ///
    /// Used by objects that forward their public dispatch identity to an
    /// owner, e.g. a component dispatching on behalf of its node.
    pub fn delegating_to(target: TargetId) -> Self {
        Self {
            declared_target: target,
            ..Self::new()
        }
    }

    /// Replace the configuration
    pub fn with_config(mut self, config: DispatcherConfig) -> Self {
        self.config = config;
        self
    }

    pub fn id(&self) -> TargetId {
        self.id
    }

    pub fn declared_target(&self) -> TargetId {
        self.declared_target
    }

    pub fn config(&self) -> &DispatcherConfig {
        &self.config
    }

    /// Register a listener for `type_key`
    ///
    /// Higher priorities are notified first; equal priorities keep
    /// registration order. Registering a listener that is already bound for
    /// this type and phase does nothing, its receiver and priority stay as
    /// they were.
    pub fn register(
        &self,
        type_key: &str,
        listener: Listener,
        receiver: Option<Receiver>,
        use_capture: bool,
        priority: i32,
    ) {
        let phase = ListenerPhase::from_use_capture(use_capture);
        let binding = ListenerBinding::new(listener, receiver, priority);

        if self.registry.borrow_mut().insert(type_key, phase, binding) {
            log::trace!(
                "dispatcher {}: registered '{}' listener ({:?}, priority {})",
                self.id,
                type_key,
                phase,
                priority
            );
        } else {
            log::trace!(
                "dispatcher {}: '{}' listener already registered ({:?}), ignoring",
                self.id,
                type_key,
                phase
            );
        }
    }

    /// Register a target/bubble phase listener with no receiver at priority 0
    pub fn on(&self, type_key: &str, listener: Listener) {
        self.register(type_key, listener, None, false, 0);
    }

    /// Register a capture phase listener with no receiver at priority 0
    pub fn on_capture(&self, type_key: &str, listener: Listener) {
        self.register(type_key, listener, None, true, 0);
    }

    /// Remove a listener; unknown listeners are ignored
    pub fn unregister(&self, type_key: &str, listener: &Listener, use_capture: bool) {
        let phase = ListenerPhase::from_use_capture(use_capture);
        if self
            .registry
            .borrow_mut()
            .remove(type_key, phase, listener)
            .is_some()
        {
            log::trace!(
                "dispatcher {}: unregistered '{}' listener ({:?})",
                self.id,
                type_key,
                phase
            );
        }
    }

    /// Remove every listener for `type_key` in both phases, or every listener
    /// at all when `type_key` is `None`
    pub fn unregister_all(&self, type_key: Option<&str>) {
        let mut registry = self.registry.borrow_mut();
        let removed = match type_key {
            Some(type_key) => registry.remove_type(type_key),
            None => registry.clear(),
        };
        log::trace!(
            "dispatcher {}: removed {} listener(s) for {}",
            self.id,
            removed,
            type_key.unwrap_or("all types")
        );
    }

    /// Whether any listener is registered for `type_key` in either phase
    pub fn has_listeners(&self, type_key: &str) -> bool {
        self.registry.borrow().contains_type(type_key)
    }

    /// Whether `listener` is registered for `type_key` in the given phase
    pub fn has_listener(&self, type_key: &str, listener: &Listener, use_capture: bool) -> bool {
        self.registry.borrow().contains_listener(
            type_key,
            ListenerPhase::from_use_capture(use_capture),
            listener,
        )
    }

    /// Number of listeners registered for `type_key` in the given phase
    pub fn listener_count(&self, type_key: &str, use_capture: bool) -> usize {
        self.registry
            .borrow()
            .len(type_key, ListenerPhase::from_use_capture(use_capture))
    }

    /// Dispatch an event from this node
    ///
    /// Clears the event's stop/prevent flags, stamps the declared target as
    /// both target and current target, then notifies listeners for the
    /// event's current phase. Returns `Ok(false)` if a listener prevented the
    /// default action.
    pub fn dispatch(&self, event: &mut Event) -> Result<bool, DispatchError> {
        event.reset_flags();
        event.stamp_target(self.declared_target);
        self.notify(event)
    }

    /// Notify this node's listeners without resetting or restamping the event
    ///
    /// Listeners for the capture bucket run when the event is in the capture
    /// phase, the target/bubble bucket otherwise. Iteration stops early once
    /// a listener stops immediate propagation. A listener error aborts the
    /// remaining listeners and is returned as [`DispatchError::Listener`].
    pub fn notify(&self, event: &mut Event) -> Result<bool, DispatchError> {
        let phase = ListenerPhase::for_event_phase(event.phase());
        let type_key = event.type_key().to_string();

        let snapshot = {
            let registry = self.registry.borrow();
            let Some(bucket) = registry.bucket(&type_key, phase) else {
                return Ok(true);
            };
            match self.config.iteration {
                IterationMode::Snapshot => Some(bucket.to_vec()),
                IterationMode::Live => None,
            }
        };

        let mut index = 0;
        loop {
            // The registry borrow must end before the listener runs: listeners
            // may register or unregister on this dispatcher.
            let binding = match &snapshot {
                Some(bindings) => bindings.get(index).cloned(),
                None => self.registry.borrow().binding_at(&type_key, phase, index),
            };
            let Some(binding) = binding else {
                break;
            };
            index += 1;

            if self.config.trace_dispatch {
                log::debug!(
                    "dispatcher {}: '{}' -> listener {} ({:?}, priority {})",
                    self.id,
                    type_key,
                    index,
                    phase,
                    binding.priority()
                );
            }

            if let Err(source) = binding.invoke(event) {
                log::warn!(
                    "dispatcher {}: '{}' listener failed, skipping the rest: {:#}",
                    self.id,
                    type_key,
                    source
                );
                return Err(DispatchError::Listener {
                    type_key,
                    phase,
                    source,
                });
            }

            if event.is_immediate_propagation_stopped() {
                break;
            }
        }

        Ok(!event.is_default_prevented())
    }

    /// Dispatch the shared reusable event with the given description
    ///
    /// Saves an allocation per dispatch, at the price of reentrancy: while a
    /// `dispatch_with` is in flight on this thread, any nested `dispatch_with`
    /// on any dispatcher fails with [`DispatchError::SharedEventBusy`]
    /// without notifying anyone. Listeners that need to dispatch must build
    /// their own [`Event`] and call [`EventDispatcher::dispatch`].
    pub fn dispatch_with(
        &self,
        type_key: &str,
        bubbles: bool,
        payload: Option<Payload>,
    ) -> Result<bool, DispatchError> {
        let mut lease = SharedEventLease::acquire(type_key, bubbles, payload).inspect_err(|_| {
            log::warn!(
                "dispatcher {}: nested dispatch_with('{}') while the shared event is in flight",
                self.id,
                type_key
            );
        })?;
        self.dispatch(lease.event_mut())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventPhase;
    use std::cell::RefCell;
    use std::rc::Rc;

    type CallLog = Rc<RefCell<Vec<&'static str>>>;

    fn recording(log: &CallLog, name: &'static str) -> Listener {
        let log = log.clone();
        Listener::infallible(move |_| log.borrow_mut().push(name))
    }

    #[test]
    fn test_priority_ordering() {
        let dispatcher = EventDispatcher::new();
        let log = CallLog::default();

        for (name, priority) in [("p0-first", 0), ("p5", 5), ("p0-second", 0), ("p3", 3)] {
            dispatcher.register("x", recording(&log, name), None, false, priority);
        }

        assert!(dispatcher.dispatch(&mut Event::new("x", false)).unwrap());
        assert_eq!(*log.borrow(), vec!["p5", "p3", "p0-first", "p0-second"]);
    }

    #[test]
    fn test_duplicate_registration_is_ignored() {
        let dispatcher = EventDispatcher::new();
        let log = CallLog::default();
        let a = recording(&log, "a");
        let b = recording(&log, "b");

        dispatcher.register("x", a.clone(), None, false, 0);
        dispatcher.register("x", b, None, false, 5);
        dispatcher.register("x", a.clone(), None, false, 10);

        assert_eq!(dispatcher.listener_count("x", false), 2);
        dispatcher.dispatch(&mut Event::new("x", false)).unwrap();
        // `a` kept priority 0, so `b` still goes first
        assert_eq!(*log.borrow(), vec!["b", "a"]);
    }

    #[test]
    fn test_phase_isolation() {
        let dispatcher = EventDispatcher::new();
        let log = CallLog::default();
        dispatcher.on_capture("x", recording(&log, "capture"));
        dispatcher.on("x", recording(&log, "bubble"));

        for (phase, expected) in [
            (EventPhase::Capture, "capture"),
            (EventPhase::Target, "bubble"),
            (EventPhase::Bubble, "bubble"),
        ] {
            log.borrow_mut().clear();
            let mut event = Event::new("x", true);
            event.set_phase(phase);
            dispatcher.dispatch(&mut event).unwrap();
            assert_eq!(*log.borrow(), vec![expected], "phase {:?}", phase);
        }
    }

    #[test]
    fn test_immediate_stop() {
        let dispatcher = EventDispatcher::new();
        let log = CallLog::default();

        dispatcher.on("x", recording(&log, "first"));
        let inner = log.clone();
        dispatcher.on(
            "x",
            Listener::infallible(move |event| {
                inner.borrow_mut().push("second");
                event.prevent_default();
                event.stop_immediate_propagation();
            }),
        );
        dispatcher.on("x", recording(&log, "third"));

        assert!(!dispatcher.dispatch(&mut Event::new("x", false)).unwrap());
        assert_eq!(*log.borrow(), vec!["first", "second"]);
    }

    #[test]
    fn test_immediate_stop_without_prevent_default() {
        let dispatcher = EventDispatcher::new();
        let log = CallLog::default();

        dispatcher.on("x", recording(&log, "first"));
        let inner = log.clone();
        dispatcher.on(
            "x",
            Listener::infallible(move |event| {
                inner.borrow_mut().push("second");
                event.stop_immediate_propagation();
            }),
        );
        let inner = log.clone();
        dispatcher.on(
            "x",
            Listener::infallible(move |event| {
                inner.borrow_mut().push("third");
                event.prevent_default();
            }),
        );

        let mut event = Event::new("x", false);
        assert!(dispatcher.dispatch(&mut event).unwrap());
        assert_eq!(*log.borrow(), vec!["first", "second"]);
        assert!(!event.is_default_prevented());
    }

    #[test]
    fn test_live_insert_ahead_of_cursor_reruns_current() {
        let dispatcher = Rc::new(EventDispatcher::new());
        let log = CallLog::default();
        let urgent = recording(&log, "urgent");

        let weak = Rc::downgrade(&dispatcher);
        let inner = log.clone();
        dispatcher.on(
            "x",
            Listener::infallible(move |_| {
                inner.borrow_mut().push("adder");
                if let Some(dispatcher) = weak.upgrade() {
                    dispatcher.register("x", urgent.clone(), None, false, 5);
                }
            }),
        );

        dispatcher.dispatch(&mut Event::new("x", false)).unwrap();
        // "urgent" landed at index 0, pushing "adder" under the cursor again
        assert_eq!(*log.borrow(), vec!["adder", "adder"]);

        log.borrow_mut().clear();
        dispatcher.dispatch(&mut Event::new("x", false)).unwrap();
        assert_eq!(*log.borrow(), vec!["urgent", "adder"]);
    }

    #[test]
    fn test_no_listeners_returns_true() {
        let dispatcher = EventDispatcher::new();
        let mut event = Event::new("nothing", false);
        assert!(dispatcher.dispatch(&mut event).unwrap());
        assert_eq!(event.target(), Some(dispatcher.id()));
        assert_eq!(event.current_target(), Some(dispatcher.id()));
    }

    #[test]
    fn test_flags_reset_between_dispatches() {
        let dispatcher = EventDispatcher::new();
        let mut event = Event::new("x", false);
        event.prevent_default();
        event.stop_immediate_propagation();

        dispatcher.on("x", Listener::infallible(|_| {}));
        assert!(dispatcher.dispatch(&mut event).unwrap());
        assert!(dispatcher.dispatch(&mut event).unwrap());
        assert!(!event.is_propagation_stopped());
    }

    #[test]
    fn test_listener_sees_its_own_type() {
        let dispatcher = EventDispatcher::new();
        let log = CallLog::default();
        dispatcher.on("x", recording(&log, "x"));
        dispatcher.on("y", recording(&log, "y"));

        dispatcher.dispatch(&mut Event::new("x", false)).unwrap();
        assert_eq!(*log.borrow(), vec!["x"]);
    }

    #[test]
    fn test_unregister_removes_bucket() {
        let dispatcher = EventDispatcher::new();
        let listener = Listener::infallible(|_| {});

        dispatcher.on_capture("x", listener.clone());
        assert!(dispatcher.has_listeners("x"));
        assert!(dispatcher.has_listener("x", &listener, true));
        assert!(!dispatcher.has_listener("x", &listener, false));

        dispatcher.unregister("x", &listener, false);
        assert!(dispatcher.has_listeners("x"));

        dispatcher.unregister("x", &listener, true);
        assert!(!dispatcher.has_listeners("x"));
        assert!(dispatcher.registry.borrow().bucket("x", ListenerPhase::Capture).is_none());

        dispatcher.unregister("x", &listener, true);
    }

    #[test]
    fn test_unregister_all() {
        let dispatcher = EventDispatcher::new();
        dispatcher.on("x", Listener::infallible(|_| {}));
        dispatcher.on_capture("x", Listener::infallible(|_| {}));
        dispatcher.on("y", Listener::infallible(|_| {}));

        dispatcher.unregister_all(Some("x"));
        assert!(!dispatcher.has_listeners("x"));
        assert!(dispatcher.has_listeners("y"));

        dispatcher.unregister_all(None);
        assert!(!dispatcher.has_listeners("y"));
    }

    #[test]
    fn test_listener_error_aborts_iteration() {
        let dispatcher = EventDispatcher::new();
        let log = CallLog::default();

        dispatcher.on("x", recording(&log, "first"));
        dispatcher.on(
            "x",
            Listener::new(|_, _| Err(anyhow::anyhow!("listener exploded"))),
        );
        dispatcher.on("x", recording(&log, "third"));

        let err = dispatcher
            .dispatch(&mut Event::new("x", false))
            .unwrap_err();
        assert!(matches!(
            err,
            DispatchError::Listener { phase: ListenerPhase::Bubble, .. }
        ));
        assert_eq!(err.type_key(), "x");
        assert!(err.to_string().contains("listener exploded"));
        assert_eq!(*log.borrow(), vec!["first"]);

        // The registry is still usable after a fault
        assert_eq!(dispatcher.listener_count("x", false), 3);
    }

    #[test]
    fn test_delegated_target() {
        let owner = EventDispatcher::new();
        let component = EventDispatcher::delegating_to(owner.id());
        let seen = Rc::new(RefCell::new(None));

        let sink = seen.clone();
        component.on(
            "mounted",
            Listener::infallible(move |event| *sink.borrow_mut() = event.target()),
        );

        component.dispatch(&mut Event::new("mounted", false)).unwrap();
        assert_eq!(*seen.borrow(), Some(owner.id()));
        assert_ne!(component.id(), owner.id());
    }

    #[test]
    fn test_dispatch_with_payload() {
        let dispatcher = EventDispatcher::new();
        let seen = Rc::new(RefCell::new(Vec::new()));

        let sink = seen.clone();
        dispatcher.on(
            "score",
            Listener::infallible(move |event| {
                sink.borrow_mut()
                    .push((event.payload_as::<u32>().copied(), event.bubbles()));
            }),
        );

        assert!(dispatcher
            .dispatch_with("score", true, Some(Rc::new(7u32)))
            .unwrap());
        assert!(dispatcher.dispatch_with("score", false, None).unwrap());
        assert_eq!(*seen.borrow(), vec![(Some(7), true), (None, false)]);
    }

    #[test]
    fn test_nested_dispatch_with_fails_fast() {
        let dispatcher = Rc::new(EventDispatcher::new());
        let nested = Rc::new(RefCell::new(None));

        let inner_dispatcher = Rc::downgrade(&dispatcher);
        let inner_result = nested.clone();
        dispatcher.on(
            "outer",
            Listener::new(move |_, event| {
                if let Some(dispatcher) = inner_dispatcher.upgrade() {
                    let result = dispatcher.dispatch_with("inner", false, None);
                    *inner_result.borrow_mut() = Some(result.is_err());
                }
                assert_eq!(event.type_key(), "outer");
                Ok(())
            }),
        );

        assert!(dispatcher.dispatch_with("outer", false, None).unwrap());
        assert_eq!(*nested.borrow(), Some(true));

        // The shared event is back in its slot afterwards
        assert!(dispatcher.dispatch_with("outer", false, None).is_ok());
    }
}
