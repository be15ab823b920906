//! [`RemoteAgent`]: a peer agent reachable over the event-stream endpoint.

use std::sync::Arc;
use std::time::Duration;

use ra_domain::call::CallContext;
use ra_domain::config::{PeerConfig, RetryConfig};
use ra_domain::error::{Error, Result};
use ra_domain::trace::TraceEvent;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::backoff::RetryPolicy;
use crate::discovery::fetch_organization;
use crate::payload::{build_payload, EVENT_STREAM_PATH};
use crate::session::StreamSession;
use crate::sink::EventSink;
use crate::transport::{EventTransport, HttpTransport};
use crate::types::{CallOutcome, RemoteError};
use crate::util::build_url;

/// One configured peer, ready to be called.
///
/// Cheap to share behind an `Arc`; every [`call`](Self::call) owns its own
/// retry state, parser and answer, so concurrent calls never interact.
pub struct RemoteAgent {
    peer: PeerConfig,
    policy: RetryPolicy,
    transport: Arc<dyn EventTransport>,
    http: reqwest::Client,
    organization: Option<Value>,
}

impl std::fmt::Debug for RemoteAgent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteAgent")
            .field("peer", &self.peer.name)
            .field("server_url", &self.peer.server_url)
            .field("policy", &self.policy)
            .field("initialized", &self.organization.is_some())
            .finish()
    }
}

impl RemoteAgent {
    pub fn builder(peer: PeerConfig) -> RemoteAgentBuilder {
        RemoteAgentBuilder::new(peer)
    }

    pub fn name(&self) -> &str {
        &self.peer.name
    }

    pub fn peer(&self) -> &PeerConfig {
        &self.peer
    }

    /// Fetch and cache the peer's organization descriptor.
    pub async fn init(&mut self) -> std::result::Result<&Value, RemoteError> {
        let org = fetch_organization(&self.http, &self.peer.name, &self.peer.server_url).await?;
        tracing::info!(peer = %self.peer.name, "organization descriptor loaded");
        let org: &Value = self.organization.insert(org);
        Ok(org)
    }

    /// Descriptor cached by [`init`](Self::init), if it has run.
    pub fn organization(&self) -> Option<&Value> {
        self.organization.as_ref()
    }

    /// Invoke the peer and stream its events until a terminal state.
    ///
    /// Forwarded sub-events go to `sink` (unless the context disables
    /// them).  Request construction errors are returned before any network
    /// activity.
    pub async fn call(
        &self,
        ctx: &CallContext,
        arguments: Value,
        sink: &dyn EventSink,
        cancel: &CancellationToken,
    ) -> std::result::Result<CallOutcome, RemoteError> {
        let ctx = ctx.with_share_call_stack(self.peer.share_call_stack);
        let payload = build_payload(&ctx, arguments)?;

        TraceEvent::RemoteCallStarted {
            peer: self.peer.name.clone(),
            trace_id: ctx.trace_id().to_string(),
            node_id: ctx.node_id().to_string(),
            share_call_stack: ctx.share_call_stack(),
        }
        .emit();

        let idle = (self.peer.idle_timeout_ms > 0)
            .then(|| Duration::from_millis(self.peer.idle_timeout_ms));

        StreamSession::new(
            self.transport.as_ref(),
            build_url(&self.peer.server_url, EVENT_STREAM_PATH),
            &payload,
            &ctx,
        )
        .peer(self.peer.name.as_str())
        .retry_policy(self.policy.clone())
        .idle_timeout(idle)
        .run(sink, cancel)
        .await
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Builder
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Fluent builder for [`RemoteAgent`].
///
/// ```rust,no_run
/// # use ra_domain::config::PeerConfig;
/// # use ra_remote::RemoteAgent;
/// let agent = RemoteAgent::builder(PeerConfig::new("math", "http://127.0.0.1:8081"))
///     .build()
///     .unwrap();
/// assert_eq!(agent.name(), "math");
/// ```
pub struct RemoteAgentBuilder {
    peer: PeerConfig,
    policy: RetryPolicy,
    transport: Option<Arc<dyn EventTransport>>,
    http: Option<reqwest::Client>,
}

impl RemoteAgentBuilder {
    pub fn new(peer: PeerConfig) -> Self {
        Self {
            peer,
            policy: RetryPolicy::default(),
            transport: None,
            http: None,
        }
    }

    /// Reconnect policy from the `[retry]` config table.
    pub fn retry(mut self, cfg: &RetryConfig) -> Self {
        self.policy = RetryPolicy::from(cfg);
        self
    }

    pub fn retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Replace the HTTP transport (tests, proxies).
    pub fn transport(mut self, transport: Arc<dyn EventTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Share an existing `reqwest` client (and its connection pool).
    pub fn http_client(mut self, client: reqwest::Client) -> Self {
        self.http = Some(client);
        self
    }

    pub fn build(self) -> Result<RemoteAgent> {
        if self.peer.name.trim().is_empty() {
            return Err(Error::Config("peer name must not be empty".into()));
        }

        let http = match self.http {
            Some(client) => client,
            None => reqwest::Client::builder()
                .connect_timeout(Duration::from_millis(self.peer.connect_timeout_ms))
                .build()
                .map_err(|e| Error::Http(e.to_string()))?,
        };
        let transport: Arc<dyn EventTransport> = match self.transport {
            Some(transport) => transport,
            None => Arc::new(HttpTransport::with_client(http.clone())),
        };

        Ok(RemoteAgent {
            peer: self.peer,
            policy: self.policy,
            transport,
            http,
            organization: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_applies_retry_config() {
        let cfg = RetryConfig {
            max_retries: 5,
            base_delay_ms: 10,
            multiplier: 1.5,
            cap_ms: 100,
        };
        let agent = RemoteAgent::builder(PeerConfig::new("p", "http://localhost:1"))
            .retry(&cfg)
            .build()
            .unwrap();
        assert_eq!(agent.policy.max_retries, 5);
        assert_eq!(agent.policy.cap, Duration::from_millis(100));
        assert!(agent.organization().is_none());
    }

    #[test]
    fn empty_peer_name_rejected() {
        let err = RemoteAgent::builder(PeerConfig::new(" ", "http://localhost:1"))
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("peer name"));
    }
}
