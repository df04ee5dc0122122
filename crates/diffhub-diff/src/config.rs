use serde::{Deserialize, Serialize};

use diffhub_ignore::DEFAULT_IGNORE_FILE;

/// Line alignment algorithm used for modified files.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineAlgorithm {
    /// Myers' O(ND) shortest edit script.
    #[default]
    Myers,
    /// Patience diff; anchors on unique lines.
    Patience,
    /// Classic longest-common-subsequence table. Quadratic memory.
    Lcs,
}

impl From<LineAlgorithm> for similar::Algorithm {
    fn from(value: LineAlgorithm) -> Self {
        match value {
            LineAlgorithm::Myers => similar::Algorithm::Myers,
            LineAlgorithm::Patience => similar::Algorithm::Patience,
            LineAlgorithm::Lcs => similar::Algorithm::Lcs,
        }
    }
}

/// Tuning for [`crate::DiffGenerator`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiffConfig {
    /// Unchanged lines kept around each hunk.
    pub context_lines: usize,
    /// Per-directory ignore file name.
    pub ignore_file_name: String,
    pub algorithm: LineAlgorithm,
}

impl Default for DiffConfig {
    fn default() -> Self {
        Self {
            context_lines: 3,
            ignore_file_name: DEFAULT_IGNORE_FILE.to_string(),
            algorithm: LineAlgorithm::default(),
        }
    }
}
