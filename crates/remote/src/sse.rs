//! Server-push event stream parsing.
//!
//! Two layers, both owned by a single connection attempt and thrown away on
//! reconnect:
//! - [`LineBuffer`] -- turns raw body chunks into complete text lines
//! - [`SseParser`] -- folds lines into [`StreamEvent`]s on blank-line boundaries

use ra_domain::stream::StreamEvent;

use crate::transport::TransportError;

/// Longest line accepted before the connection is treated as broken.
pub const MAX_LINE_BYTES: usize = 1024 * 1024;

/// Accumulates body chunks and hands out complete lines.
///
/// Works on bytes so that a multi-byte UTF-8 character split across two
/// chunks is decoded only once the whole line has arrived.  Returned lines
/// have their line ending (and any other trailing whitespace) removed.
#[derive(Debug, Default)]
pub struct LineBuffer {
    buf: Vec<u8>,
    /// Prefix of `buf` already known to hold no newline.
    scanned: usize,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk and drain every line it completes.
    ///
    /// Fails once the pending partial line grows past [`MAX_LINE_BYTES`].
    pub fn push(&mut self, chunk: &[u8]) -> Result<Vec<String>, TransportError> {
        self.buf.extend_from_slice(chunk);

        let mut lines = Vec::new();
        let mut start = 0;
        while let Some(offset) = self.buf[self.scanned..].iter().position(|&b| b == b'\n') {
            let end = self.scanned + offset;
            lines.push(decode_line(&self.buf[start..end]));
            start = end + 1;
            self.scanned = start;
        }
        self.buf.drain(..start);
        self.scanned = self.buf.len();

        if self.buf.len() > MAX_LINE_BYTES {
            return Err(TransportError::Io(format!(
                "line longer than {MAX_LINE_BYTES} bytes"
            )));
        }
        Ok(lines)
    }

    /// Flush a trailing line that was never newline-terminated.
    pub fn finish(&mut self) -> Option<String> {
        if self.buf.is_empty() {
            return None;
        }
        self.scanned = 0;
        let raw = std::mem::take(&mut self.buf);
        Some(decode_line(&raw))
    }
}

fn decode_line(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw).trim_end().to_string()
}

/// Incremental parser for the `id:` / `event:` / `data:` / `retry:` grammar.
///
/// Fields accumulate across consecutive lines and are emitted together when
/// a blank line arrives.  A repeated prefix overwrites the previous value;
/// in particular several `data:` lines in one block do **not** concatenate,
/// the last one wins.  Unknown lines (comments included) are ignored.
#[derive(Debug, Default)]
pub struct SseParser {
    id: Option<String>,
    event: Option<String>,
    data: Option<String>,
    retry: Option<u64>,
    last_retry_hint: Option<u64>,
}

impl SseParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one line; returns an event when the line terminates a block.
    pub fn push_line(&mut self, line: &str) -> Option<StreamEvent> {
        let line = line.trim();

        if line.is_empty() {
            return Some(self.take_event());
        }

        if let Some(rest) = line.strip_prefix("id:") {
            self.id = Some(rest.trim().to_string());
        } else if let Some(rest) = line.strip_prefix("event:") {
            self.event = Some(rest.trim().to_string());
        } else if let Some(rest) = line.strip_prefix("data:") {
            self.data = Some(rest.trim().to_string());
        } else if let Some(rest) = line.strip_prefix("retry:") {
            self.retry = rest.trim().parse::<u64>().ok();
            if self.retry.is_some() {
                self.last_retry_hint = self.retry;
            }
        }

        None
    }

    /// Most recent valid `retry:` value seen on this connection, whether or
    /// not its block has been terminated yet.
    pub fn last_retry_hint(&self) -> Option<u64> {
        self.last_retry_hint
    }

    fn take_event(&mut self) -> StreamEvent {
        StreamEvent {
            id: self.id.take(),
            event: self.event.take(),
            data: self.data.take(),
            retry_hint_ms: self.retry.take(),
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
