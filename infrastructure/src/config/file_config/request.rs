//! Request configuration from TOML (`[request]` section)

use serde::{Deserialize, Serialize};

pub const DEFAULT_MODEL: &str = "mistral";

/// Raw request configuration from TOML
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileRequestConfig {
    /// Model name placed in the request body
    pub model: String,
}

impl Default for FileRequestConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
        }
    }
}
