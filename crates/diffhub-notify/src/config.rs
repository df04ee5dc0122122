use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Tuning for the notification fan-out.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotifyConfig {
    /// Outbound messages buffered per connection before delivery fails.
    pub connection_buffer: usize,
    /// Connections idle for longer than this are pruned.
    pub idle_timeout_secs: u64,
}

impl NotifyConfig {
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            connection_buffer: 64,
            idle_timeout_secs: 120,
        }
    }
}
