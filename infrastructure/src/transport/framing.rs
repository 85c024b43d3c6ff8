//! Turning response body chunks into fragments.
//!
//! - [`FragmentFormat::Raw`]: the decoded text is the fragment.
//! - [`FragmentFormat::Ndjson`]: one JSON object per line, as produced by
//!   Ollama's `/api/generate` and `/api/chat` endpoints:
//!
//! ```text
//! {"response":"<think>","done":false}
//! {"response":"hm","done":false}
//! {"response":"","done":true}
//! ```

use super::decoder::Utf8Decoder;
use bytes::Buf;
use futures::{Stream, StreamExt, stream};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io;
use thinkstream_application::{FragmentStream, TransportError};
use tokio_util::codec::{FramedRead, LinesCodec, LinesCodecError};
use tokio_util::io::StreamReader;

/// Longest NDJSON line accepted, in bytes.
pub const MAX_LINE_LENGTH: usize = 1024 * 1024;

/// Maximum characters of an offending line quoted in errors.
const EXCERPT_LEN: usize = 120;

/// Wire format of a streaming response body
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FragmentFormat {
    /// Body is plain text.
    #[default]
    Raw,
    /// Body is newline-delimited JSON chunks.
    Ndjson,
}

impl FragmentFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            FragmentFormat::Raw => "raw",
            FragmentFormat::Ndjson => "ndjson",
        }
    }
}

impl fmt::Display for FragmentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for FragmentFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "raw" | "text" => Ok(FragmentFormat::Raw),
            "ndjson" | "jsonl" | "ollama" => Ok(FragmentFormat::Ndjson),
            _ => Err(format!("Invalid FragmentFormat: {}", s)),
        }
    }
}

/// Decode a plain-text body; empty decodes are skipped.
pub(crate) fn raw_fragments<S, B>(chunks: S) -> FragmentStream
where
    S: Stream<Item = Result<B, TransportError>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
{
    let state = (Box::pin(chunks), Utf8Decoder::new(), false);

    stream::unfold(state, |(mut chunks, mut decoder, finished)| async move {
        if finished {
            return None;
        }
        loop {
            match chunks.next().await {
                Some(Ok(bytes)) => {
                    let text = decoder.decode(bytes.as_ref());
                    if !text.is_empty() {
                        return Some((Ok(text), (chunks, decoder, false)));
                    }
                }
                Some(Err(e)) => return Some((Err(e), (chunks, decoder, true))),
                None => {
                    let tail = decoder.finish();
                    if tail.is_empty() {
                        return None;
                    }
                    return Some((Ok(tail), (chunks, decoder, true)));
                }
            }
        }
    })
    .boxed()
}

/// Split an NDJSON body into lines of at most `max_line_length` bytes and
/// extract the text of each chunk.
pub(crate) fn ndjson_fragments<S, B>(chunks: S, max_line_length: usize) -> FragmentStream
where
    S: Stream<Item = Result<B, TransportError>> + Send + 'static,
    B: Buf + Send + 'static,
{
    let body = Box::pin(chunks).map(|chunk| chunk.map_err(io::Error::other));
    let reader = StreamReader::new(body);
    let lines = Box::pin(FramedRead::new(
        reader,
        LinesCodec::new_with_max_length(max_line_length),
    ));

    stream::unfold((lines, false), move |(mut lines, finished)| async move {
        if finished {
            return None;
        }
        loop {
            let line = match lines.next().await {
                Some(Ok(line)) => line,
                Some(Err(e)) => {
                    return Some((Err(line_error(e, max_line_length)), (lines, true)));
                }
                None => return None,
            };

            match parse_line(&line) {
                Line::Skip => continue,
                Line::End => return None,
                Line::Text { text, done } => return Some((Ok(text), (lines, done))),
                Line::Failed(e) => return Some((Err(e), (lines, true))),
            }
        }
    })
    .boxed()
}

fn line_error(e: LinesCodecError, max_line_length: usize) -> TransportError {
    match e {
        LinesCodecError::MaxLineLengthExceeded => {
            TransportError::Malformed(format!("line exceeds {} bytes", max_line_length))
        }
        // Transport errors travel through the reader wrapped in io::Error.
        LinesCodecError::Io(e) => e
            .get_ref()
            .and_then(|inner| inner.downcast_ref::<TransportError>())
            .cloned()
            .unwrap_or_else(|| TransportError::Malformed(e.to_string())),
    }
}

#[derive(Debug, Deserialize)]
struct NdjsonChunk {
    #[serde(default)]
    response: Option<String>,
    #[serde(default)]
    message: Option<NdjsonMessage>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    done: bool,
}

#[derive(Debug, Deserialize)]
struct NdjsonMessage {
    #[serde(default)]
    content: Option<String>,
}

impl NdjsonChunk {
    fn into_text(self) -> Option<String> {
        self.response
            .or_else(|| self.message.and_then(|m| m.content))
            .filter(|text| !text.is_empty())
    }
}

#[derive(Debug, PartialEq)]
enum Line {
    /// Blank line or a chunk without text.
    Skip,
    /// `done` chunk without text.
    End,
    Text { text: String, done: bool },
    Failed(TransportError),
}

fn parse_line(line: &str) -> Line {
    let line = line.trim();
    if line.is_empty() {
        return Line::Skip;
    }

    let chunk: NdjsonChunk = match serde_json::from_str(line) {
        Ok(chunk) => chunk,
        Err(e) => {
            return Line::Failed(TransportError::Malformed(format!(
                "{}: {}",
                e,
                excerpt(line)
            )));
        }
    };

    if let Some(error) = chunk.error.clone() {
        return Line::Failed(TransportError::Remote(error));
    }

    let done = chunk.done;
    match chunk.into_text() {
        Some(text) => Line::Text { text, done },
        None if done => Line::End,
        None => Line::Skip,
    }
}

fn excerpt(line: &str) -> String {
    if line.chars().count() <= EXCERPT_LEN {
        line.to_string()
    } else {
        let cut: String = line.chars().take(EXCERPT_LEN).collect();
        format!("{}...", cut)
    }
}
