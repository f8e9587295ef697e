// Event dispatch core of the Orbit UI Framework
pub mod config;
pub mod events;

/// Version of the Orbit event core
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub use config::{ConfigError, DispatcherConfig, IterationMode};
pub use events::DispatchError;

/// Re-export of common types for convenience
pub mod prelude {
    pub use crate::config::{DispatcherConfig, IterationMode};
    pub use crate::events::{
        DispatchError, Event, EventDispatcher, EventPhase, Listener, ListenerResult, Payload,
        Receiver, TargetId,
    };
}
