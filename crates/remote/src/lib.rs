//! `ra-remote`: streaming client for calling agents hosted on remote peers.
//!
//! A call is a single `POST <peer>/sse/chat` whose response is a long-lived
//! server-push event stream.  The client rebuilds the final answer from
//! cumulative `answer` events, passes nested sub-events (`tool_call`,
//! `observation`, ...) on to the caller's own stream, and reconnects with
//! exponential back-off when the stream drops.
//!
//! # Pipeline
//!
//! ```text
//! CallContext + args ─▶ payload ─▶ EventTransport::open ─▶ lines
//!                                                           │
//!       EventSink ◀── Forward ── EventRouter ◀── SseParser ◀┘
//!                                    │
//!                                 Complete ─▶ CallOutcome
//! ```
//!
//! [`RemoteAgent`] ties the pieces together for one configured peer.

pub mod agent;
pub mod backoff;
pub mod discovery;
pub mod payload;
pub mod router;
pub mod session;
pub mod sink;
pub mod sse;
pub mod transport;
pub mod types;
pub mod util;

// ── Re-exports ──────────────────────────────────────────────────────

pub use agent::{RemoteAgent, RemoteAgentBuilder};
pub use backoff::{RetryDecision, RetryPolicy, RetrySession};
pub use payload::{build_payload, BuildError, RequestPayload};
pub use router::{EventRouter, PayloadKind, RouterAction};
pub use session::{SessionState, StreamSession};
pub use sink::{ChannelSink, Delivery, EventSink, ForwardData, ForwardedEvent, NullSink, SinkError, SseMessage};
pub use sse::{LineBuffer, SseParser};
pub use transport::{Connection, EventTransport, HttpTransport, LineStream, TransportError};
pub use types::{CallOutcome, RemoteError};
