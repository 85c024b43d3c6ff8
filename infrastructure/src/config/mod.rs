//! Configuration loading for thinkstream
//!
//! This module handles file I/O and merging of configuration from multiple sources.
//! The priority order (highest to lowest):
//!
//! 1. Environment variables `THINKSTREAM_<SECTION>__<KEY>`
//! 2. `--config <path>` specified file
//! 3. Project root: `./thinkstream.toml` or `./.thinkstream.toml`
//! 4. Global: `$XDG_CONFIG_HOME/thinkstream/config.toml`
//! 5. Default values

mod error;
mod file_config;
mod loader;

pub use error::ConfigError;
pub use file_config::{
    DEFAULT_ENDPOINT, DEFAULT_MODEL, FileClassifierConfig, FileConfig, FileRequestConfig,
    FileTransportConfig, Settings,
};
pub use loader::ConfigLoader;
