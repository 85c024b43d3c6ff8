//! Transport configuration from TOML (`[transport]` section)

use serde::{Deserialize, Serialize};

pub const DEFAULT_ENDPOINT: &str = "http://localhost:11434/api/generate";

/// Raw transport configuration from TOML
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileTransportConfig {
    /// Completion endpoint URL
    pub endpoint: String,
    /// Response body format ("raw" or "ndjson")
    pub format: String,
    pub connect_timeout_secs: u64,
    /// Maximum silence between body chunks; 0 disables the limit
    pub idle_timeout_secs: u64,
}

impl Default for FileTransportConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            format: "ndjson".to_string(),
            connect_timeout_secs: 10,
            idle_timeout_secs: 120,
        }
    }
}
