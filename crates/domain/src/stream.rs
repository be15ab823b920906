use serde::{Deserialize, Serialize};
use std::pin::Pin;

/// A boxed async stream, used for streaming response bodies.
pub type BoxStream<'a, T> = Pin<Box<dyn futures_core::Stream<Item = T> + Send + 'a>>;

/// One complete server-push event, as parsed off the wire.
///
/// Produced when the parser sees the blank line that terminates an event
/// block.  Every field is optional: a block consisting only of `data:` is
/// a perfectly valid event with the default type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamEvent {
    /// Value of the last `id:` line in the block.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Value of the last `event:` line in the block.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event: Option<String>,
    /// Value of the last `data:` line in the block.  Usually JSON.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
    /// Reconnect delay suggested by the peer via `retry:`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_hint_ms: Option<u64>,
}

impl StreamEvent {
    /// Event name that tells the client to end the call successfully.
    pub const CLOSE: &'static str = "close";

    /// Whether this is the peer's graceful-close signal.
    pub fn is_close(&self) -> bool {
        self.event.as_deref() == Some(Self::CLOSE)
    }
}
