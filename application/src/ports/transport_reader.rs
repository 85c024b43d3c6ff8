//! Transport Reader port
//!
//! Defines how the application layer obtains a live fragment stream from a
//! completion endpoint. Adapters live in the infrastructure layer.

use async_trait::async_trait;
use futures::stream::BoxStream;
use serde_json::{Map, Value};
use std::time::Duration;
use thiserror::Error;

/// Errors that end a fragment stream abnormally
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    #[error("Connection error: {0}")]
    Connect(String),

    #[error("HTTP error {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Stream interrupted: {0}")]
    Interrupted(String),

    #[error("Malformed response: {0}")]
    Malformed(String),

    #[error("Remote error: {0}")]
    Remote(String),

    #[error("Timed out after {0:?}")]
    Timeout(Duration),
}

impl TransportError {
    /// Whether a user-initiated retry has a reasonable chance of succeeding.
    ///
    /// Nothing in this crate retries automatically.
    pub fn is_retryable(&self) -> bool {
        match self {
            TransportError::Connect(_)
            | TransportError::Interrupted(_)
            | TransportError::Timeout(_) => true,
            TransportError::Status { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

/// Lazy, finite sequence of text fragments in arrival order.
///
/// Fragment boundaries are transport-determined. Dropping the stream releases
/// the underlying connection.
pub type FragmentStream = BoxStream<'static, Result<String, TransportError>>;

/// A streaming completion request.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamRequest {
    pub url: String,
    pub payload: Value,
}

impl StreamRequest {
    pub fn new(url: impl Into<String>, payload: Value) -> Self {
        Self {
            url: url.into(),
            payload,
        }
    }

    /// Request body: the payload with `"stream": true` merged in.
    ///
    /// A `null` payload becomes `{"stream": true}`; any other non-object
    /// payload is rejected.
    pub fn body(&self) -> Result<Value, TransportError> {
        let mut map = match &self.payload {
            Value::Object(map) => map.clone(),
            Value::Null => Map::new(),
            other => {
                return Err(TransportError::InvalidPayload(format!(
                    "expected a JSON object, got {}",
                    json_kind(other)
                )));
            }
        };
        map.insert("stream".to_string(), Value::Bool(true));
        Ok(Value::Object(map))
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Opens streaming requests against a completion endpoint
///
/// Implementations must hold the network resource only for the lifetime of
/// the returned stream, and must surface a non-success status or a dropped
/// connection as a [`TransportError`] rather than ending the stream early.
#[async_trait]
pub trait TransportReader: Send + Sync {
    /// Issue the request and return its fragment stream.
    async fn open(&self, request: &StreamRequest) -> Result<FragmentStream, TransportError>;
}
