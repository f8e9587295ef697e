//! The single reusable event behind `EventDispatcher::dispatch_with`
//!
//! One event per thread is recycled for every convenience dispatch. It is
//! checked out of its slot for the duration of a dispatch, so a nested
//! `dispatch_with` finds the slot empty and fails instead of overwriting the
//! in-flight event.

use std::cell::RefCell;

use super::{DispatchError, Event, Payload};

thread_local! {
    static SHARED_EVENT: RefCell<Option<Event>> = RefCell::new(Some(Event::new("", false)));
}

/// Exclusive loan of the shared event, returned to its slot on drop
pub(crate) struct SharedEventLease {
    event: Event,
}

impl SharedEventLease {
    /// Check the shared event out, rewritten for a new dispatch
    pub(crate) fn acquire(
        type_key: &str,
        bubbles: bool,
        payload: Option<Payload>,
    ) -> Result<Self, DispatchError> {
        let event = SHARED_EVENT.with(|slot| slot.borrow_mut().take());

        match event {
            Some(mut event) => {
                event.reinit(type_key, bubbles, payload);
                Ok(Self { event })
            }
            None => Err(DispatchError::SharedEventBusy {
                type_key: type_key.to_string(),
            }),
        }
    }

    pub(crate) fn event_mut(&mut self) -> &mut Event {
        &mut self.event
    }
}

impl Drop for SharedEventLease {
    fn drop(&mut self) {
        let mut event = std::mem::replace(&mut self.event, Event::new("", false));
        // Release the payload now instead of at the next dispatch.
        drop(event.take_payload());
        // The slot may already be gone during thread teardown.
        let _ = SHARED_EVENT.try_with(|slot| *slot.borrow_mut() = Some(event));
    }
}

/// Whether the shared event is currently checked out on this thread
pub fn shared_event_in_use() -> bool {
    SHARED_EVENT.with(|slot| slot.borrow().is_none())
}
