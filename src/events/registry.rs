//! Per-phase listener storage
//!
//! Two maps from event type key to an ordered list of bindings: one for the
//! capture phase and one shared by the target and bubble phases. Lists are
//! ordered by descending priority, ties in insertion order, and a type key is
//! removed as soon as its last binding goes away.

use std::collections::HashMap;

use super::{EventPhase, Listener, ListenerBinding};

/// Type alias for one phase's storage
type BucketMap = HashMap<String, Vec<ListenerBinding>>;

/// Which of the two buckets a binding lives in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerPhase {
    /// Listeners registered with `use_capture`
    Capture,

    /// Listeners for the target and bubble phases
    Bubble,
}

impl ListenerPhase {
    pub fn from_use_capture(use_capture: bool) -> Self {
        if use_capture {
            Self::Capture
        } else {
            Self::Bubble
        }
    }

    /// Bucket consulted while an event is in `phase`
    pub fn for_event_phase(phase: EventPhase) -> Self {
        match phase {
            EventPhase::Capture => Self::Capture,
            EventPhase::Target | EventPhase::Bubble => Self::Bubble,
        }
    }

    fn index(self) -> usize {
        match self {
            Self::Capture => 0,
            Self::Bubble => 1,
        }
    }
}

/// Listener storage for a single dispatcher
#[derive(Debug, Default)]
pub struct PhaseRegistry {
    buckets: [BucketMap; 2],
}

impl PhaseRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn map(&self, phase: ListenerPhase) -> &BucketMap {
        &self.buckets[phase.index()]
    }

    fn map_mut(&mut self, phase: ListenerPhase) -> &mut BucketMap {
        &mut self.buckets[phase.index()]
    }

    /// Insert a binding, keeping priority order
    ///
    /// Returns `false` without touching the existing binding when the same
    /// listener is already bound for this type and phase.
    pub fn insert(
        &mut self,
        type_key: &str,
        phase: ListenerPhase,
        binding: ListenerBinding,
    ) -> bool {
        let map = self.map_mut(phase);

        if let Some(bucket) = map.get(type_key) {
            if bucket.iter().any(|b| b.listener.same_as(&binding.listener)) {
                return false;
            }
        }

        let bucket = map.entry(type_key.to_string()).or_default();
        let index = bucket
            .iter()
            .position(|b| b.priority < binding.priority)
            .unwrap_or(bucket.len());
        bucket.insert(index, binding);
        true
    }

    /// Remove a listener's binding, returning it if it was present
    pub fn remove(
        &mut self,
        type_key: &str,
        phase: ListenerPhase,
        listener: &Listener,
    ) -> Option<ListenerBinding> {
        let map = self.map_mut(phase);
        let bucket = map.get_mut(type_key)?;
        let index = bucket.iter().position(|b| b.listener.same_as(listener))?;
        let removed = bucket.remove(index);

        if bucket.is_empty() {
            map.remove(type_key);
        }

        Some(removed)
    }

    /// Drop every binding for `type_key` in both phases, returning how many went
    pub fn remove_type(&mut self, type_key: &str) -> usize {
        self.buckets
            .iter_mut()
            .filter_map(|map| map.remove(type_key))
            .map(|bucket| bucket.len())
            .sum()
    }

    /// Drop every binding, returning how many went
    pub fn clear(&mut self) -> usize {
        self.buckets
            .iter_mut()
            .flat_map(|map| map.drain())
            .map(|(_, bucket)| bucket.len())
            .sum()
    }

    /// Whether either phase has bindings for `type_key`
    pub fn contains_type(&self, type_key: &str) -> bool {
        self.buckets.iter().any(|map| map.contains_key(type_key))
    }

    pub fn contains_listener(
        &self,
        type_key: &str,
        phase: ListenerPhase,
        listener: &Listener,
    ) -> bool {
        self.bucket(type_key, phase)
            .is_some_and(|bucket| bucket.iter().any(|b| b.listener.same_as(listener)))
    }

    /// The ordered bindings for a type and phase, `None` when there are none
    pub fn bucket(&self, type_key: &str, phase: ListenerPhase) -> Option<&[ListenerBinding]> {
        self.map(phase).get(type_key).map(Vec::as_slice)
    }

    /// Clone of the binding currently stored at `index`
    pub fn binding_at(
        &self,
        type_key: &str,
        phase: ListenerPhase,
        index: usize,
    ) -> Option<ListenerBinding> {
        self.bucket(type_key, phase)?.get(index).cloned()
    }

    pub fn len(&self, type_key: &str, phase: ListenerPhase) -> usize {
        self.bucket(type_key, phase).map_or(0, <[_]>::len)
    }

    /// Whether no bindings are stored at all
    pub fn is_empty(&self) -> bool {
        self.buckets.iter().all(HashMap::is_empty)
    }
}
