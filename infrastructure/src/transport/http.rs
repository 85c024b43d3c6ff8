//! HTTP implementation of the [`TransportReader`] port.
//!
//! Sends the request as a JSON POST and exposes the response body as a
//! fragment stream:
//!
//! ```text
//! bytes_stream() → idle guard ─┬─ raw:    Utf8Decoder             → FragmentStream
//!                              └─ ndjson: StreamReader + LinesCodec → FragmentStream
//! ```
//!
//! Dropping the returned stream drops the response, which closes the
//! connection.

use super::framing::{FragmentFormat, MAX_LINE_LENGTH, ndjson_fragments, raw_fragments};
use async_trait::async_trait;
use bytes::Buf;
use futures::stream::BoxStream;
use futures::{Stream, StreamExt, stream};
use std::time::Duration;
use thinkstream_application::{FragmentStream, StreamRequest, TransportError, TransportReader};
use tracing::{debug, info};

/// Default TCP connect timeout.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default maximum wait for the response headers and between two body chunks.
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(120);

/// Maximum characters of an error body quoted in [`TransportError::Status`].
const STATUS_BODY_EXCERPT: usize = 200;

/// Settings for [`HttpTransportReader`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpTransportOptions {
    pub format: FragmentFormat,
    pub connect_timeout: Duration,
    /// Limit on waiting for the response headers and for each body chunk;
    /// `None` waits indefinitely.
    pub idle_timeout: Option<Duration>,
}

impl Default for HttpTransportOptions {
    fn default() -> Self {
        Self {
            format: FragmentFormat::default(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            idle_timeout: Some(DEFAULT_IDLE_TIMEOUT),
        }
    }
}

impl HttpTransportOptions {
    pub fn with_format(mut self, format: FragmentFormat) -> Self {
        self.format = format;
        self
    }
}

/// Streams completions over HTTP with reqwest
pub struct HttpTransportReader {
    client: reqwest::Client,
    options: HttpTransportOptions,
}

impl HttpTransportReader {
    pub fn new(options: HttpTransportOptions) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .connect_timeout(options.connect_timeout)
            .build()
            .map_err(|e| TransportError::Connect(e.to_string()))?;

        info!(
            "HttpTransportReader initialized (format: {}, idle timeout: {:?})",
            options.format, options.idle_timeout
        );

        Ok(Self { client, options })
    }

    pub fn options(&self) -> &HttpTransportOptions {
        &self.options
    }
}

#[async_trait]
impl TransportReader for HttpTransportReader {
    async fn open(&self, request: &StreamRequest) -> Result<FragmentStream, TransportError> {
        let body = request.body()?;
        debug!("POST {} ({} format)", request.url, self.options.format);

        let send = self.client.post(&request.url).json(&body).send();
        let response = match self.options.idle_timeout {
            Some(limit) => tokio::time::timeout(limit, send)
                .await
                .map_err(|_| TransportError::Timeout(limit))?,
            None => send.await,
        }
        .map_err(send_error)?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = if text.trim().is_empty() {
                status.canonical_reason().unwrap_or("Unknown").to_string()
            } else {
                text.trim().chars().take(STATUS_BODY_EXCERPT).collect()
            };
            return Err(TransportError::Status {
                status: status.as_u16(),
                message,
            });
        }

        debug!("{} responded {}", request.url, status);

        let chunks = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(|e| TransportError::Interrupted(e.to_string())));

        Ok(fragments(chunks, self.options.format, self.options.idle_timeout))
    }
}

fn send_error(e: reqwest::Error) -> TransportError {
    if e.is_builder() {
        TransportError::InvalidPayload(e.to_string())
    } else if e.is_timeout() {
        TransportError::Connect(format!("timed out: {}", e))
    } else {
        TransportError::Connect(e.to_string())
    }
}

/// Decode a stream of body chunks into a [`FragmentStream`].
///
/// `idle_timeout` bounds the wait for each chunk; when it elapses the stream
/// yields [`TransportError::Timeout`] and ends.
pub fn fragments<S, B>(
    chunks: S,
    format: FragmentFormat,
    idle_timeout: Option<Duration>,
) -> FragmentStream
where
    S: Stream<Item = Result<B, TransportError>> + Send + 'static,
    B: AsRef<[u8]> + Buf + Send + 'static,
{
    let chunks = idle_guard(chunks, idle_timeout);
    match format {
        FragmentFormat::Raw => raw_fragments(chunks),
        FragmentFormat::Ndjson => ndjson_fragments(chunks, MAX_LINE_LENGTH),
    }
}

fn idle_guard<S, B>(
    chunks: S,
    idle_timeout: Option<Duration>,
) -> BoxStream<'static, Result<B, TransportError>>
where
    S: Stream<Item = Result<B, TransportError>> + Send + 'static,
    B: Send + 'static,
{
    let Some(limit) = idle_timeout else {
        return chunks.boxed();
    };

    stream::unfold((chunks.boxed(), false), move |(mut chunks, expired)| async move {
        if expired {
            return None;
        }
        match tokio::time::timeout(limit, chunks.next()).await {
            Ok(Some(item)) => Some((item, (chunks, false))),
            Ok(None) => None,
            Err(_) => Some((Err(TransportError::Timeout(limit)), (chunks, true))),
        }
    })
    .boxed()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    async fn collect(stream: FragmentStream) -> Vec<Result<String, TransportError>> {
        stream.collect().await
    }

    fn chunks(
        parts: &[&'static str],
    ) -> impl Stream<Item = Result<&'static [u8], TransportError>> {
        let parts: Vec<Result<&'static [u8], TransportError>> =
            parts.iter().map(|part| Ok(part.as_bytes())).collect();
        stream::iter(parts)
    }

    #[tokio::test]
    async fn raw_fragments_follow_chunks() {
        let out = collect(fragments(
            chunks(&["<thi", "nk>a", "</think>b"]),
            FragmentFormat::Raw,
            None,
        ))
        .await;
        assert_eq!(
            out,
            vec![
                Ok("<thi".to_string()),
                Ok("nk>a".to_string()),
                Ok("</think>b".to_string())
            ]
        );
    }

    #[tokio::test]
    async fn split_utf8_is_not_emitted_early() {
        let bytes: &'static [u8] = "é".as_bytes();
        let items: Vec<Result<&'static [u8], TransportError>> =
            vec![Ok(&bytes[..1]), Ok(&bytes[1..])];

        let out = collect(fragments(stream::iter(items), FragmentFormat::Raw, None)).await;
        assert_eq!(out, vec![Ok("é".to_string())]);
    }

    #[tokio::test]
    async fn chunk_error_ends_stream() {
        let items: Vec<Result<&'static [u8], TransportError>> = vec![
            Ok("<think>part".as_bytes()),
            Err(TransportError::Interrupted("reset".into())),
            Ok("never".as_bytes()),
        ];
        let out = collect(fragments(stream::iter(items), FragmentFormat::Raw, None)).await;
        assert_eq!(
            out,
            vec![
                Ok("<think>part".to_string()),
                Err(TransportError::Interrupted("reset".into()))
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn idle_timeout_fires() {
        let silent = chunks(&["x"]).chain(stream::pending());
        let out = collect(fragments(
            silent,
            FragmentFormat::Raw,
            Some(Duration::from_secs(5)),
        ))
        .await;
        assert_eq!(
            out,
            vec![
                Ok("x".to_string()),
                Err(TransportError::Timeout(Duration::from_secs(5)))
            ]
        );
    }

    // ==================== Local HTTP server ====================

    /// Read one HTTP request (headers + content-length body).
    async fn read_request(socket: &mut tokio::net::TcpStream) -> String {
        let mut raw = Vec::new();
        let mut buf = [0u8; 1024];
        loop {
            let n = socket.read(&mut buf).await.unwrap();
            if n == 0 {
                break;
            }
            raw.extend_from_slice(&buf[..n]);
            let text = String::from_utf8_lossy(&raw).to_string();
            if let Some(end) = text.find("\r\n\r\n") {
                let length = text[..end]
                    .lines()
                    .find_map(|line| {
                        let (name, value) = line.split_once(':')?;
                        name.eq_ignore_ascii_case("content-length")
                            .then(|| value.trim().parse::<usize>().ok())
                            .flatten()
                    })
                    .unwrap_or(0);
                if raw.len() >= end + 4 + length {
                    return text;
                }
            }
        }
        String::from_utf8_lossy(&raw).to_string()
    }

    /// Serve a single connection; `finish_chunked` controls whether the
    /// terminating zero-length chunk is sent.
    async fn serve(
        head: &'static str,
        body: Vec<String>,
        finish_chunked: bool,
    ) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/api/generate", listener.local_addr().unwrap());
        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let request = read_request(&mut socket).await;
            socket.write_all(head.as_bytes()).await.unwrap();
            for part in body {
                socket.write_all(part.as_bytes()).await.unwrap();
                socket.flush().await.unwrap();
            }
            if finish_chunked {
                socket.write_all(b"0\r\n\r\n").await.unwrap();
            }
            socket.shutdown().await.ok();
            request
        });
        (url, handle)
    }

    /// Encode `data` as one HTTP/1.1 chunk.
    fn chunk(data: &str) -> String {
        format!("{:x}\r\n{}\r\n", data.len(), data)
    }

    const CHUNKED_OK: &str = concat!(
        "HTTP/1.1 200 OK\r\n",
        "content-type: text/plain\r\n",
        "transfer-encoding: chunked\r\n",
        "connection: close\r\n\r\n",
    );

    fn reader(format: FragmentFormat) -> HttpTransportReader {
        HttpTransportReader::new(HttpTransportOptions::default().with_format(format)).unwrap()
    }

    #[tokio::test]
    async fn http_streams_body_and_sends_stream_flag() {
        let (url, server) = serve(
            CHUNKED_OK,
            vec![chunk("<think>"), chunk("reasoning"), chunk("</think>answer")],
            true,
        )
        .await;

        let request = StreamRequest::new(url, json!({"model": "mistral", "prompt": "hi"}));
        let stream = reader(FragmentFormat::Raw).open(&request).await.unwrap();
        let text: String = collect(stream)
            .await
            .into_iter()
            .map(|item| item.unwrap())
            .collect();
        assert_eq!(text, "<think>reasoning</think>answer");

        let sent = server.await.unwrap();
        assert!(sent.starts_with("POST /api/generate"));
        assert!(sent.to_lowercase().contains("content-type: application/json"));
        let body = &sent[sent.find("\r\n\r\n").unwrap() + 4..];
        let body: serde_json::Value = serde_json::from_str(body).unwrap();
        assert_eq!(body, json!({"model": "mistral", "prompt": "hi", "stream": true}));
    }

    #[tokio::test]
    async fn http_ndjson_body() {
        let line1 = "{\"response\":\"<think>x</think>\",\"done\":false}\n";
        let line2 = "{\"response\":\"y\",\"done\":true}\n";
        let (url, _server) = serve(CHUNKED_OK, vec![chunk(line1), chunk(line2)], true).await;

        let request = StreamRequest::new(url, json!({}));
        let stream = reader(FragmentFormat::Ndjson).open(&request).await.unwrap();
        let out = collect(stream).await;
        assert_eq!(out, vec![Ok("<think>x</think>".to_string()), Ok("y".to_string())]);
    }

    #[tokio::test]
    async fn http_error_status() {
        let (url, _server) = serve(
            concat!(
                "HTTP/1.1 500 Internal Server Error\r\n",
                "content-length: 4\r\nconnection: close\r\n\r\nboom",
            ),
            vec![],
            false,
        )
        .await;

        let request = StreamRequest::new(url, json!({}));
        let err = match reader(FragmentFormat::Raw).open(&request).await {
            Ok(_) => panic!("expected status error"),
            Err(e) => e,
        };
        assert_eq!(
            err,
            TransportError::Status {
                status: 500,
                message: "boom".to_string()
            }
        );
    }

    #[tokio::test]
    async fn http_error_status_without_body_uses_reason() {
        let (url, _server) = serve(
            "HTTP/1.1 404 Not Found\r\ncontent-length: 0\r\nconnection: close\r\n\r\n",
            vec![],
            false,
        )
        .await;

        let request = StreamRequest::new(url, json!({}));
        let err = match reader(FragmentFormat::Raw).open(&request).await {
            Ok(_) => panic!("expected status error"),
            Err(e) => e,
        };
        assert_eq!(
            err,
            TransportError::Status {
                status: 404,
                message: "Not Found".to_string()
            }
        );
    }

    #[tokio::test]
    async fn http_connection_drop_mid_body() {
        let (url, _server) = serve(CHUNKED_OK, vec![chunk("<think>a")], false).await;

        let request = StreamRequest::new(url, json!({}));
        let stream = reader(FragmentFormat::Raw).open(&request).await.unwrap();
        let out = collect(stream).await;

        assert_eq!(out.first(), Some(&Ok("<think>a".to_string())));
        assert!(matches!(out.last(), Some(Err(TransportError::Interrupted(_)))));
    }

    #[tokio::test(start_paused = true)]
    async fn idle_timeout_applies_to_ndjson_bodies() {
        let silent = chunks(&["{\"response\":\"x\"}\n"]).chain(stream::pending());
        let out = collect(fragments(
            silent,
            FragmentFormat::Ndjson,
            Some(Duration::from_secs(5)),
        ))
        .await;
        assert_eq!(
            out,
            vec![
                Ok("x".to_string()),
                Err(TransportError::Timeout(Duration::from_secs(5)))
            ]
        );
    }

    #[tokio::test]
    async fn ndjson_body_without_newline_is_rejected() {
        let block = bytes::Bytes::from(vec![b'a'; 64 * 1024]);
        let blocks = MAX_LINE_LENGTH / block.len() + 1;
        let endless = stream::iter(std::iter::repeat_n(Ok::<_, TransportError>(block), blocks));

        let out = collect(fragments(endless, FragmentFormat::Ndjson, None)).await;
        assert_eq!(out.len(), 1);
        assert!(matches!(&out[0], Err(TransportError::Malformed(m)) if m.contains("exceeds")));
    }

    #[tokio::test]
    async fn http_silent_server_times_out_waiting_for_headers() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/api/generate", listener.local_addr().unwrap());
        let _server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            read_request(&mut socket).await;
            // keep the connection open without answering
            tokio::time::sleep(Duration::from_secs(30)).await;
            drop(socket);
        });

        let limit = Duration::from_millis(200);
        let options = HttpTransportOptions {
            idle_timeout: Some(limit),
            ..HttpTransportOptions::default()
        };
        let request = StreamRequest::new(url, json!({}));
        let err = match HttpTransportReader::new(options).unwrap().open(&request).await {
            Ok(_) => panic!("expected timeout"),
            Err(e) => e,
        };
        assert_eq!(err, TransportError::Timeout(limit));
    }

    #[tokio::test]
    async fn http_connection_refused() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/", listener.local_addr().unwrap());
        drop(listener);

        let request = StreamRequest::new(url, json!({}));
        let err = match reader(FragmentFormat::Raw).open(&request).await {
            Ok(_) => panic!("expected connect error"),
            Err(e) => e,
        };
        assert!(matches!(err, TransportError::Connect(_)));
    }

    #[tokio::test]
    async fn invalid_payload_is_rejected_before_sending() {
        let request = StreamRequest::new("http://127.0.0.1:9/", json!("just a string"));
        let err = match reader(FragmentFormat::Raw).open(&request).await {
            Ok(_) => panic!("expected payload error"),
            Err(e) => e,
        };
        assert!(matches!(err, TransportError::InvalidPayload(_)));
    }
}
