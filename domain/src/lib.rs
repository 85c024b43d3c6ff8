//! Domain layer for thinkstream
//!
//! This crate contains the core classification logic, entities, and value
//! objects. It has no dependencies on infrastructure or presentation concerns.
//!
//! # Core Concepts
//!
//! A language model streams its output in arbitrary fragments. Some models
//! wrap their intermediate reasoning in a marker pair (`<think>…</think>`)
//! before the final answer. thinkstream splits the stream into two channels
//! while it is still arriving:
//!
//! - **Thinking trace**: text between the start and end marker
//! - **Final answer**: text after the end marker, or all output when no
//!   marker appears within the heuristic threshold
//!
//! The [`Classifier`] is pure; the [`Session`] entity owns the raw buffer and
//! applies the classifier to it after every fragment.

pub mod core;
pub mod session;
pub mod stream;

// Re-export commonly used types
pub use core::error::ClassificationError;
pub use session::entities::{Session, SessionId};
pub use stream::{
    classifier::{
        Classification, Classifier, ClassifierConfig, DEFAULT_HEURISTIC_THRESHOLD,
        HeuristicPolicy,
    },
    markers::{DEFAULT_CLOSE_MARKER, DEFAULT_OPEN_MARKER, ThinkMarkers},
    phase::StreamPhase,
    snapshot::StreamSnapshot,
};
