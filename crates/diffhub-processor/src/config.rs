use serde::{Deserialize, Serialize};

/// Worker pool and queue settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessorConfig {
    /// Number of worker tasks (at least one is started).
    pub workers: usize,
    /// Queue bound; `None` is unbounded. When bounded, `enqueue` waits for
    /// space instead of dropping.
    pub queue_capacity: Option<usize>,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            workers: 2,
            queue_capacity: None,
        }
    }
}
