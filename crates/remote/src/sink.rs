//! Downstream delivery of forwarded sub-events.
//!
//! The router decides *what* to forward; an [`EventSink`] decides *where*
//! it goes (typically the server-push stream of whoever is waiting on this
//! hop's own trace).  Sinks must be callable from any task and must keep
//! the order in which one call delivers its events.

use async_trait::async_trait;
use ra_domain::call::CallContext;
use serde_json::Value;
use tokio::sync::mpsc;

/// Event name used when a forwarded event carries none.
pub const DEFAULT_EVENT: &str = "message";

/// Reconnect hint used when a forwarded event carries none.
pub const DEFAULT_RETRY_MS: u64 = 3_000;

/// Payload of a forwarded event.
#[derive(Debug, Clone, PartialEq)]
pub enum ForwardData {
    /// Parsed (and possibly rewritten) JSON object.
    Json(Value),
    /// Data that was not a JSON object, passed through untouched.
    Raw(String),
}

impl ForwardData {
    /// Text placed after `data:` on the wire.
    pub fn to_wire_string(&self) -> String {
        match self {
            ForwardData::Json(v) => v.to_string(),
            ForwardData::Raw(s) => s.clone(),
        }
    }
}

/// An event the router decided to pass up to the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct ForwardedEvent {
    pub id: Option<String>,
    pub event: Option<String>,
    pub retry_ms: Option<u64>,
    pub data: ForwardData,
}

impl ForwardedEvent {
    /// Resolve defaults into a message ready for re-emission.
    pub fn to_message(&self) -> SseMessage {
        SseMessage {
            id: self.id.clone(),
            event: self
                .event
                .clone()
                .unwrap_or_else(|| DEFAULT_EVENT.to_string()),
            retry_ms: self.retry_ms.unwrap_or(DEFAULT_RETRY_MS),
            data: self.data.to_wire_string(),
        }
    }
}

/// A server-push message with every default filled in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseMessage {
    pub id: Option<String>,
    pub event: String,
    pub retry_ms: u64,
    pub data: String,
}

impl SseMessage {
    /// Render as a blank-line-terminated event-stream frame.
    ///
    /// Multi-line data is split over several `data:` lines.
    pub fn to_frame(&self) -> String {
        let mut frame = String::new();
        if let Some(id) = &self.id {
            frame.push_str(&format!("id: {id}\n"));
        }
        frame.push_str(&format!("event: {}\n", self.event));
        frame.push_str(&format!("retry: {}\n", self.retry_ms));
        for line in self.data.split('\n') {
            frame.push_str(&format!("data: {line}\n"));
        }
        frame.push('\n');
        frame
    }
}

/// Errors a sink can report.  The session logs them and carries on.
#[derive(thiserror::Error, Debug, Clone)]
pub enum SinkError {
    #[error("sink closed")]
    Closed,
    #[error("{0}")]
    Other(String),
}

/// Destination for forwarded events.
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn deliver(&self, event: ForwardedEvent, ctx: &CallContext) -> Result<(), SinkError>;
}

/// One delivered message, tagged with the call it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub trace_id: String,
    pub node_id: String,
    pub group_id: Option<String>,
    pub message: SseMessage,
}

/// Sink backed by a bounded tokio channel.
///
/// `deliver` awaits channel capacity, so a slow consumer applies
/// back-pressure to the stream instead of reordering or dropping.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::Sender<Delivery>,
}

impl ChannelSink {
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<Delivery>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, rx)
    }
}

#[async_trait]
impl EventSink for ChannelSink {
    async fn deliver(&self, event: ForwardedEvent, ctx: &CallContext) -> Result<(), SinkError> {
        let delivery = Delivery {
            trace_id: ctx.trace_id().to_string(),
            node_id: ctx.node_id().to_string(),
            group_id: ctx.group_id().map(str::to_string),
            message: event.to_message(),
        };
        self.tx.send(delivery).await.map_err(|_| SinkError::Closed)
    }
}

/// Sink that discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

#[async_trait]
impl EventSink for NullSink {
    async fn deliver(&self, _event: ForwardedEvent, _ctx: &CallContext) -> Result<(), SinkError> {
        Ok(())
    }
}
