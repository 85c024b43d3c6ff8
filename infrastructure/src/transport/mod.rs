//! HTTP transport reader
//!
//! Implements [`thinkstream_application::TransportReader`] on top of reqwest.

pub mod decoder;
pub mod framing;
pub mod http;

pub use decoder::Utf8Decoder;
pub use framing::{FragmentFormat, MAX_LINE_LENGTH};
pub use http::{
    DEFAULT_CONNECT_TIMEOUT, DEFAULT_IDLE_TIMEOUT, HttpTransportOptions, HttpTransportReader,
    fragments,
};
