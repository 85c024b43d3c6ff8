//! Classifier configuration from TOML (`[classifier]` section)

use serde::{Deserialize, Serialize};
use thinkstream_domain::{DEFAULT_CLOSE_MARKER, DEFAULT_HEURISTIC_THRESHOLD, DEFAULT_OPEN_MARKER};

/// Raw classifier configuration from TOML
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileClassifierConfig {
    /// Characters of unmarked output before the buffer is treated as an answer
    pub threshold: usize,
    pub open_marker: String,
    pub close_marker: String,
    /// "sticky" or "reevaluate"
    pub heuristic: String,
}

impl Default for FileClassifierConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_HEURISTIC_THRESHOLD,
            open_marker: DEFAULT_OPEN_MARKER.to_string(),
            close_marker: DEFAULT_CLOSE_MARKER.to_string(),
            heuristic: "sticky".to_string(),
        }
    }
}
