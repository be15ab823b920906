//! `relay-agent call`: one streamed invocation, frames to stdout.

use std::io::Write;

use async_trait::async_trait;
use ra_domain::call::{CallContext, Category};
use ra_domain::config::Config;
use ra_remote::{CallOutcome, EventSink, ForwardedEvent, RemoteAgent, SinkError};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::build_arguments;

/// Options for a single call, straight from the command line.
#[derive(Debug, Clone)]
pub struct CallRequest {
    pub peer: String,
    pub query: String,
    pub args: Vec<String>,
    pub trace_id: Option<String>,
    pub caller: Option<String>,
    pub no_share_stack: bool,
}

/// Writes every forwarded event to stdout as an event-stream frame.
pub struct StdoutSink;

#[async_trait]
impl EventSink for StdoutSink {
    async fn deliver(&self, event: ForwardedEvent, _ctx: &CallContext) -> Result<(), SinkError> {
        let frame = event.to_message().to_frame();
        let mut out = std::io::stdout().lock();
        out.write_all(frame.as_bytes())
            .and_then(|_| out.flush())
            .map_err(|e| SinkError::Other(e.to_string()))
    }
}

/// Build the context for a call issued directly from the terminal.
///
/// The stack is `user`, then the optional named caller, then the peer,
/// each with a fresh node id.
pub fn cli_context(req: &CallRequest) -> anyhow::Result<CallContext> {
    let trace_id = req
        .trace_id
        .clone()
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    let mut builder = CallContext::builder(trace_id).frame(Category::User.as_str(), node_id());
    if let Some(caller) = &req.caller {
        builder = builder
            .frame(caller.as_str(), node_id())
            .caller_category(Category::Agent);
    } else {
        builder = builder.caller_category(Category::User);
    }
    builder
        .frame(req.peer.as_str(), node_id())
        .callee_category(Category::Agent)
        .build()
        .map_err(|e| anyhow::anyhow!("building call context: {e}"))
}

fn node_id() -> String {
    Uuid::new_v4().to_string()
}

pub async fn run(config: &Config, req: CallRequest, cancel: CancellationToken) -> anyhow::Result<()> {
    let mut peer = config
        .peer(&req.peer)
        .cloned()
        .ok_or_else(|| anyhow::anyhow!("unknown peer {:?} (see `relay-agent peers`)", req.peer))?;
    if req.no_share_stack {
        peer.share_call_stack = false;
    }

    let agent = RemoteAgent::builder(peer).retry(&config.retry).build()?;
    let ctx = cli_context(&req)?;
    let arguments = build_arguments(&req.query, &req.args)?;

    tracing::info!(peer = %req.peer, trace_id = %ctx.trace_id(), "calling remote agent");

    match agent.call(&ctx, arguments, &StdoutSink, &cancel).await? {
        CallOutcome::Completed(answer) => {
            println!("{answer}");
            Ok(())
        }
        CallOutcome::Cancelled => anyhow::bail!("call cancelled"),
    }
}
