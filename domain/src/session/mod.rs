//! Streaming session domain.
//!
//! - [`entities::Session`]: one request/response cycle and its raw buffer
//! - [`entities::SessionId`]: opaque session handle

pub mod entities;
