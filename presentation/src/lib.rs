//! Presentation layer for thinkstream
//!
//! This crate contains the CLI definition and the live and JSON
//! renderings of stream snapshots.

pub mod cli;
pub mod output;

// Re-export commonly used types
pub use cli::commands::{BodyFormat, Cli, OutputMode};
pub use output::console::{ConsoleObserver, LiveRenderer};
pub use output::json::format_json;
