//! Application layer for thinkstream
//!
//! This crate contains the session controller use case and the port
//! definitions it drives. It depends only on the domain layer.

pub mod ports;
pub mod use_cases;

// Re-export commonly used types
pub use ports::{
    stream_observer::{NoObserver, StreamObserver},
    transport_reader::{FragmentStream, StreamRequest, TransportError, TransportReader},
};
pub use use_cases::session_controller::{ControllerError, SessionController};
