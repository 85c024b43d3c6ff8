//! Infrastructure layer for thinkstream
//!
//! This crate contains adapters that implement the ports defined
//! in the application layer, plus configuration file loading.

pub mod config;
pub mod transport;

// Re-export commonly used types
pub use config::{ConfigError, ConfigLoader, FileConfig, Settings};
pub use transport::{FragmentFormat, HttpTransportOptions, HttpTransportReader};
