//! Controller configuration

use std::time::Duration;

/// Default time between reconciliation cycles
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(15);

/// Settings fixed at startup and handed to the controller
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ControllerConfig {
    /// Time to wait between reconciliation cycles
    pub interval: Duration,
    /// Address put on every ingress instead of resolving backends
    pub static_address: Option<String>,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_INTERVAL,
            static_address: None,
        }
    }
}

impl ControllerConfig {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            ..Default::default()
        }
    }

    /// Set the static override; blank strings mean no override
    pub fn with_static_address(mut self, address: Option<String>) -> Self {
        self.static_address = address
            .map(|a| a.trim().to_string())
            .filter(|a| !a.is_empty());
        self
    }
}
