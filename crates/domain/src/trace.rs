use serde::Serialize;

/// Structured trace events emitted across the relay agent crates.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event")]
pub enum TraceEvent {
    OrganizationFetched {
        peer: String,
        duration_ms: u64,
    },
    RemoteCallStarted {
        peer: String,
        trace_id: String,
        node_id: String,
        share_call_stack: bool,
    },
    StreamConnected {
        peer: String,
        trace_id: String,
        attempt: u32,
        status: u16,
    },
    RetryScheduled {
        peer: String,
        trace_id: String,
        attempt: u32,
        max_retries: u32,
        delay_ms: u64,
        server_hint: bool,
        error: String,
    },
    RemoteCallFinished {
        peer: String,
        trace_id: String,
        outcome: String,
        attempts: u32,
        events_forwarded: u32,
        duration_ms: u64,
    },
}

impl TraceEvent {
    pub fn emit(&self) {
        let json = serde_json::to_string(self).unwrap_or_default();
        tracing::info!(trace_event = %json, "ra_event");
    }
}
