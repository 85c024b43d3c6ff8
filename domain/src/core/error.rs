//! Domain error types

use thiserror::Error;

/// Errors raised while validating classification inputs.
///
/// Marker *absence* in a stream is never an error (the length heuristic
/// covers it); only malformed marker definitions are rejected.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClassificationError {
    #[error("Invalid markers: {0}")]
    InvalidMarkers(String),

    #[error("Invalid heuristic policy: {0}")]
    InvalidPolicy(String),
}
