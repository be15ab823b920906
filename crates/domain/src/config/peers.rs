use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Remote peers
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// One remote agent-hosting peer reachable over the event-stream endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeerConfig {
    /// Local name used to select the peer (`relay-agent call <name> ...`).
    pub name: String,
    /// Base URL; `/sse/chat` and `/get_organization` are joined onto it.
    pub server_url: String,
    /// Disclose the caller's full call stack to this peer.  When `false`
    /// the peer only ever sees a synthetic `"user"` caller.
    #[serde(default = "d_true")]
    pub share_call_stack: bool,
    #[serde(default = "d_10000")]
    pub connect_timeout_ms: u64,
    /// Maximum silence between two lines of the event stream before the
    /// connection is treated as dropped.  `0` disables the check.
    #[serde(default = "d_300000")]
    pub idle_timeout_ms: u64,
}

impl PeerConfig {
    pub fn new(name: impl Into<String>, server_url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            server_url: server_url.into(),
            share_call_stack: true,
            connect_timeout_ms: d_10000(),
            idle_timeout_ms: d_300000(),
        }
    }
}

// ── serde default helpers ───────────────────────────────────────────

fn d_true() -> bool {
    true
}
fn d_10000() -> u64 {
    10_000
}
fn d_300000() -> u64 {
    300_000
}
