//! Reasoning-stream classification domain.
//!
//! - [`phase::StreamPhase`]: lifecycle of one streaming session
//! - [`markers::ThinkMarkers`]: literal delimiters of the thinking trace
//! - [`classifier::Classifier`]: pure incremental classifier over the buffer
//! - [`snapshot::StreamSnapshot`]: the observable state published to consumers

pub mod classifier;
pub mod markers;
pub mod phase;
pub mod snapshot;
