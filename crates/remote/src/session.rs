//! Stream session driver: one logical call, possibly several connections.
//!
//! ```text
//! Connecting ──ok──▶ Streaming ──close / end of body──▶ Completed
//!     │                  │
//!     └──error──┬────────┘ read error / idle timeout
//!               ▼
//!           Retrying ──budget left, after delay──▶ Connecting
//!               │
//!               └──budget exhausted──▶ Failed
//!
//! any state ──cancel──▶ Cancelled
//! ```
//!
//! Each connection gets a fresh [`SseParser`]; the [`EventRouter`] (and the
//! answer it holds) lives for the whole call.  Forwarded events are
//! delivered inline, in routing order, before the next line is read.

use std::time::Duration;

use futures_util::StreamExt;
use ra_domain::call::CallContext;
use ra_domain::trace::TraceEvent;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::backoff::{RetryDecision, RetryPolicy, RetrySession};
use crate::payload::RequestPayload;
use crate::router::{EventRouter, RouterAction};
use crate::sink::{EventSink, ForwardedEvent};
use crate::sse::SseParser;
use crate::transport::{EventTransport, TransportError};
use crate::types::{CallOutcome, RemoteError};

/// Driver state, mostly for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Connecting,
    Streaming,
    Retrying,
    Completed,
    Failed,
    Cancelled,
}

impl SessionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::Connecting => "connecting",
            SessionState::Streaming => "streaming",
            SessionState::Retrying => "retrying",
            SessionState::Completed => "completed",
            SessionState::Failed => "failed",
            SessionState::Cancelled => "cancelled",
        }
    }
}

/// One in-flight call against one peer.
pub struct StreamSession<'a> {
    transport: &'a dyn EventTransport,
    url: String,
    payload: &'a RequestPayload,
    ctx: &'a CallContext,
    peer: String,
    policy: RetryPolicy,
    idle_timeout: Option<Duration>,
}

/// Mutable per-call bookkeeping shared across connections.
struct CallState<'c> {
    router: EventRouter<'c>,
    state: SessionState,
    connections: u32,
    forwarded: u32,
}

impl CallState<'_> {
    fn enter(&mut self, state: SessionState) {
        tracing::debug!(from = self.state.as_str(), to = state.as_str(), "session state");
        self.state = state;
    }
}

impl<'a> StreamSession<'a> {
    pub fn new(
        transport: &'a dyn EventTransport,
        url: impl Into<String>,
        payload: &'a RequestPayload,
        ctx: &'a CallContext,
    ) -> Self {
        Self {
            transport,
            url: url.into(),
            payload,
            ctx,
            peer: String::new(),
            policy: RetryPolicy::default(),
            idle_timeout: None,
        }
    }

    /// Peer name used in logs.
    pub fn peer(mut self, name: impl Into<String>) -> Self {
        self.peer = name.into();
        self
    }

    pub fn retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Longest silence tolerated while waiting for the response and between
    /// two lines; `None` waits forever.
    pub fn idle_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.idle_timeout = timeout;
        self
    }

    /// Drive the call to a terminal state.
    pub async fn run(
        self,
        sink: &dyn EventSink,
        cancel: &CancellationToken,
    ) -> Result<CallOutcome, RemoteError> {
        let started = Instant::now();
        let mut retry = RetrySession::new(self.policy.clone());
        let mut call = CallState {
            router: EventRouter::new(self.ctx),
            state: SessionState::Connecting,
            connections: 0,
            forwarded: 0,
        };

        let result = loop {
            call.connections += 1;
            call.enter(SessionState::Connecting);
            let mut parser = SseParser::new();

            let attempt = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                r = self.stream_once(&mut parser, &mut call, sink) => Some(r),
            };

            let error = match attempt {
                None => break Ok(CallOutcome::Cancelled),
                Some(Ok(answer)) => break Ok(CallOutcome::Completed(answer)),
                Some(Err(e)) => e,
            };

            call.enter(SessionState::Retrying);
            let hint = parser.last_retry_hint();
            let delay = match retry.next_delay(hint) {
                RetryDecision::Retry(delay) => delay,
                RetryDecision::Terminal => {
                    tracing::error!(
                        peer = %self.peer,
                        trace_id = %self.ctx.trace_id(),
                        attempts = call.connections,
                        error = %error,
                        "retry budget exhausted"
                    );
                    break Err(RemoteError::RetriesExhausted {
                        retries: self.policy.max_retries,
                        attempts: call.connections,
                        last_error: error,
                    });
                }
            };

            TraceEvent::RetryScheduled {
                peer: self.peer.clone(),
                trace_id: self.ctx.trace_id().to_string(),
                attempt: retry.attempt(),
                max_retries: self.policy.max_retries,
                delay_ms: delay.as_millis() as u64,
                server_hint: hint.is_some(),
                error: error.to_string(),
            }
            .emit();
            tracing::warn!(
                peer = %self.peer,
                trace_id = %self.ctx.trace_id(),
                attempt = retry.attempt(),
                delay_ms = delay.as_millis() as u64,
                error = %error,
                "stream dropped, reconnecting"
            );

            let cancelled = tokio::select! {
                biased;
                _ = cancel.cancelled() => true,
                _ = tokio::time::sleep(delay) => false,
            };
            if cancelled {
                break Ok(CallOutcome::Cancelled);
            }
        };

        call.enter(match &result {
            Ok(CallOutcome::Completed(_)) => SessionState::Completed,
            Ok(CallOutcome::Cancelled) => SessionState::Cancelled,
            Err(_) => SessionState::Failed,
        });
        if call.state == SessionState::Cancelled {
            tracing::info!(peer = %self.peer, trace_id = %self.ctx.trace_id(), "call cancelled");
        }

        TraceEvent::RemoteCallFinished {
            peer: self.peer.clone(),
            trace_id: self.ctx.trace_id().to_string(),
            outcome: call.state.as_str().to_string(),
            attempts: call.connections,
            events_forwarded: call.forwarded,
            duration_ms: started.elapsed().as_millis() as u64,
        }
        .emit();

        result
    }

    /// One connection: open, read until close / end of body / error.
    ///
    /// `Ok` carries the final answer; `Err` means this connection failed and
    /// the caller should consult the retry policy.
    async fn stream_once(
        &self,
        parser: &mut SseParser,
        call: &mut CallState<'_>,
        sink: &dyn EventSink,
    ) -> Result<String, TransportError> {
        let open = self.transport.open(&self.url, self.payload);
        let connection = match self.idle_timeout {
            Some(limit) => tokio::time::timeout(limit, open)
                .await
                .map_err(|_| silent_for(limit))??,
            None => open.await?,
        };
        call.enter(SessionState::Streaming);

        TraceEvent::StreamConnected {
            peer: self.peer.clone(),
            trace_id: self.ctx.trace_id().to_string(),
            attempt: call.connections,
            status: connection.status,
        }
        .emit();

        let mut lines = connection.lines;
        loop {
            let next = match self.idle_timeout {
                Some(limit) => tokio::time::timeout(limit, lines.next())
                    .await
                    .map_err(|_| silent_for(limit))?,
                None => lines.next().await,
            };

            let Some(line) = next else {
                tracing::debug!(
                    peer = %self.peer,
                    trace_id = %self.ctx.trace_id(),
                    "stream ended without close event"
                );
                return Ok(call.router.answer().to_string());
            };

            let Some(event) = parser.push_line(&line?) else {
                continue;
            };

            match call.router.route(event) {
                RouterAction::Continue => {}
                RouterAction::Forward(event) => {
                    if self.deliver(event, sink).await {
                        call.forwarded += 1;
                    }
                }
                RouterAction::Complete(answer) => return Ok(answer),
            }
        }
    }

    /// Hand one event to the sink.  Returns whether the sink accepted it.
    async fn deliver(&self, event: ForwardedEvent, sink: &dyn EventSink) -> bool {
        if !self.ctx.send_events() {
            return false;
        }
        match sink.deliver(event, self.ctx).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(
                    peer = %self.peer,
                    trace_id = %self.ctx.trace_id(),
                    error = %e,
                    "failed to deliver forwarded event"
                );
                false
            }
        }
    }
}

fn silent_for(limit: Duration) -> TransportError {
    TransportError::Timeout(format!("no data from peer for {} ms", limit.as_millis()))
}
