//! Connection layer: open one streaming POST and expose its body as lines.
//!
//! The session never touches `reqwest` directly; it talks to an
//! [`EventTransport`], which lets tests script connections without a
//! socket.

use std::time::Duration;

use async_trait::async_trait;
use ra_domain::stream::BoxStream;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};

use crate::payload::RequestPayload;
use crate::sse::LineBuffer;
use crate::util::{from_reqwest, truncate_utf8};

/// Longest error body kept on a non-success status.
const MAX_ERROR_BODY: usize = 512;

/// How long to wait for the body of a non-success response.
const ERROR_BODY_TIMEOUT: Duration = Duration::from_secs(5);

/// A failure of one connection attempt.  Always eligible for retry.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("connect failed: {0}")]
    Connect(String),
    #[error("timed out: {0}")]
    Timeout(String),
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("stream read failed: {0}")]
    Io(String),
}

/// Body lines of an open connection, in arrival order.
pub type LineStream = BoxStream<'static, Result<String, TransportError>>;

/// An established streaming response.
pub struct Connection {
    pub status: u16,
    pub lines: LineStream,
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}

/// Opens streaming connections to a peer.
#[async_trait]
pub trait EventTransport: Send + Sync {
    /// POST `payload` to `url` and return the response body as lines.
    ///
    /// Must fail (not return a connection) on a non-success status.
    async fn open(&self, url: &str, payload: &RequestPayload) -> Result<Connection, TransportError>;
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// HTTP implementation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// [`EventTransport`] over `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Build a transport with its own client.
    ///
    /// Only the connect phase is bounded here.  The body is a long-lived
    /// stream, so a total request timeout would cut healthy calls short.
    /// The session bounds the wait for response headers and each line
    /// with its idle timeout.
    pub fn new(connect_timeout: Duration) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .build()
            .map_err(|e| TransportError::Connect(format!("building HTTP client: {e}")))?;
        Ok(Self { client })
    }

    /// Reuse an existing client (shared connection pool).
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl EventTransport for HttpTransport {
    async fn open(&self, url: &str, payload: &RequestPayload) -> Result<Connection, TransportError> {
        let body = serde_json::Value::Object(payload.body.clone()).to_string();

        let response = self
            .client
            .post(url)
            .headers(header_map(&payload.headers))
            .body(body)
            .send()
            .await
            .map_err(from_reqwest)?;

        let status = response.status();
        if !status.is_success() {
            let text = match tokio::time::timeout(ERROR_BODY_TIMEOUT, response.text()).await {
                Ok(Ok(text)) => text,
                Ok(Err(_)) => String::new(),
                Err(_) => "<error body timed out>".to_string(),
            };
            return Err(TransportError::Status {
                status: status.as_u16(),
                body: truncate_utf8(&text, MAX_ERROR_BODY).to_string(),
            });
        }

        Ok(Connection {
            status: status.as_u16(),
            lines: line_stream(response),
        })
    }
}

fn header_map(headers: &[(String, String)]) -> HeaderMap {
    let mut map = HeaderMap::new();
    for (name, value) in headers {
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(name), Ok(value)) => {
                map.insert(name, value);
            }
            _ => tracing::warn!(header = %name, "skipping header that is not valid HTTP"),
        }
    }
    map
}

/// Turn a streaming response body into a stream of lines.
///
/// A read error ends the stream after being yielded once.  A trailing line
/// without a newline is flushed when the body closes.
fn line_stream(response: reqwest::Response) -> LineStream {
    let stream = async_stream::stream! {
        let mut response = response;
        let mut buffer = LineBuffer::new();

        loop {
            match response.chunk().await {
                Ok(Some(bytes)) => match buffer.push(&bytes) {
                    Ok(lines) => {
                        for line in lines {
                            yield Ok(line);
                        }
                    }
                    Err(e) => {
                        yield Err(e);
                        break;
                    }
                },
                Ok(None) => {
                    if let Some(line) = buffer.finish() {
                        yield Ok(line);
                    }
                    break;
                }
                Err(e) => {
                    yield Err(from_reqwest(e));
                    break;
                }
            }
        }
    };

    Box::pin(stream)
}
