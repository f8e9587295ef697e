//! Dispatcher configuration

use serde::{Deserialize, Serialize};

/// How the notification loop walks a listener list that listeners may mutate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IterationMode {
    /// Re-read the live list by index after every listener, so registrations
    /// and removals made by a listener affect the rest of the same pass.
    ///
    /// Positions shift under the cursor: removing an earlier listener skips
    /// the next one, and inserting a listener ahead of the cursor (higher
    /// priority than the running one) skips the new listener and runs the
    /// current one again in the same pass.
    #[default]
    Live,

    /// Copy the list before the first listener runs; changes apply to the
    /// next dispatch only
    Snapshot,
}

/// Settings for an [`EventDispatcher`](crate::events::EventDispatcher)
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatcherConfig {
    /// Listener list iteration strategy
    pub iteration: IterationMode,

    /// Log every listener invocation at debug level
    pub trace_dispatch: bool,
}

/// Errors raised while loading a configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid dispatcher config: {0}")]
    Parse(#[from] serde_json::Error),
}

impl DispatcherConfig {
    /// Parse a configuration from JSON; missing fields take their defaults
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn with_iteration(mut self, iteration: IterationMode) -> Self {
        self.iteration = iteration;
        self
    }

    pub fn with_trace_dispatch(mut self, enabled: bool) -> Self {
        self.trace_dispatch = enabled;
        self
    }
}
