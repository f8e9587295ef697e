//! Error types for event dispatch

use super::ListenerPhase;

/// Errors that can occur while dispatching an event
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// A listener returned an error; the remaining listeners were skipped
    #[error("listener for '{type_key}' ({phase:?} phase) failed: {source}")]
    Listener {
        type_key: String,
        phase: ListenerPhase,
        #[source]
        source: anyhow::Error,
    },

    /// `dispatch_with` was called while the shared event was already in flight
    #[error("shared event is already being dispatched, cannot reuse it for '{type_key}'")]
    SharedEventBusy { type_key: String },
}

impl DispatchError {
    /// Type key of the event that was being dispatched
    pub fn type_key(&self) -> &str {
        match self {
            Self::Listener { type_key, .. } | Self::SharedEventBusy { type_key } => type_key,
        }
    }
}
