//! Per-event routing: answer accumulation, forwarding and stack rewriting.
//!
//! Every event parsed off the remote stream lands here exactly once.  The
//! router keeps the running answer for this hop and decides, per event,
//! whether it goes up to the caller's own stream.  Sub-events that touch
//! the end user directly are never passed up; nested call stacks are
//! re-rooted on this hop's ancestry when the peer was not told about it.

use ra_domain::call::{CallContext, Category};
use ra_domain::stream::StreamEvent;
use serde_json::{Map, Value};

use crate::sink::{ForwardData, ForwardedEvent};

/// Payload classification, resolved once per event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadKind {
    /// Cumulative answer text for this hop.
    Answer,
    ToolCall,
    Observation,
    /// A JSON object with any other (or no) `type`.
    Other,
    /// Data that is not a JSON object.
    Unparseable,
}

impl PayloadKind {
    fn of(payload: Option<&Map<String, Value>>) -> Self {
        let Some(map) = payload else {
            return PayloadKind::Unparseable;
        };
        match map.get("type").and_then(Value::as_str) {
            Some("answer") => PayloadKind::Answer,
            Some("tool_call") => PayloadKind::ToolCall,
            Some("observation") => PayloadKind::Observation,
            _ => PayloadKind::Other,
        }
    }
}

/// What the session should do after an event has been routed.
#[derive(Debug, Clone, PartialEq)]
pub enum RouterAction {
    /// Nothing to deliver; keep reading.
    Continue,
    /// Deliver this event downstream, then keep reading.
    Forward(ForwardedEvent),
    /// The peer closed the call; this is the final answer.
    Complete(String),
}

/// Routing state for one call.
#[derive(Debug)]
pub struct EventRouter<'a> {
    ctx: &'a CallContext,
    answer: String,
}

impl<'a> EventRouter<'a> {
    pub fn new(ctx: &'a CallContext) -> Self {
        Self {
            ctx,
            answer: String::new(),
        }
    }

    /// Answer accumulated so far.
    pub fn answer(&self) -> &str {
        &self.answer
    }

    pub fn route(&mut self, event: StreamEvent) -> RouterAction {
        if event.is_close() {
            tracing::info!(
                trace_id = %self.ctx.trace_id(),
                node_id = %self.ctx.node_id(),
                reason = event.data.as_deref().unwrap_or(""),
                "peer requested stream close"
            );
            return RouterAction::Complete(self.answer.clone());
        }

        let StreamEvent {
            id,
            event,
            data,
            retry_hint_ms,
        } = event;

        let mut payload = match data.as_deref().map(serde_json::from_str::<Value>) {
            Some(Ok(Value::Object(map))) => Some(map),
            _ => None,
        };

        let forward = |data: ForwardData| {
            RouterAction::Forward(ForwardedEvent {
                id,
                event,
                retry_ms: retry_hint_ms,
                data,
            })
        };

        match PayloadKind::of(payload.as_ref()) {
            PayloadKind::Unparseable => forward(ForwardData::Raw(data.unwrap_or_default())),
            PayloadKind::Answer => {
                if let Some(map) = payload.as_mut() {
                    self.answer = answer_text(map.remove("content"));
                }
                RouterAction::Continue
            }
            kind @ (PayloadKind::ToolCall | PayloadKind::Observation) => {
                let Some(mut map) = payload else {
                    return RouterAction::Continue;
                };
                if let Some(Value::Object(content)) = map.get_mut("content") {
                    if touches_user(content) {
                        tracing::debug!(
                            trace_id = %self.ctx.trace_id(),
                            kind = ?kind,
                            "dropping user-edge sub-event"
                        );
                        return RouterAction::Continue;
                    }
                    if !self.ctx.share_call_stack() {
                        self.reroot_call_stack(content);
                    }
                }
                forward(ForwardData::Json(Value::Object(map)))
            }
            PayloadKind::Other => forward(ForwardData::Json(Value::Object(
                payload.unwrap_or_default(),
            ))),
        }
    }

    /// Replace the two synthetic leading entries the peer put on the nested
    /// stack (`user`, itself) with this hop's real ancestry.
    fn reroot_call_stack(&self, content: &mut Map<String, Value>) {
        let Some(Value::Array(nested)) = content.get_mut("call_stack") else {
            return;
        };
        let tail: Vec<Value> = nested.drain(..).skip(2).collect();
        nested.extend(
            self.ctx
                .call_stack()
                .iter()
                .cloned()
                .map(Value::String),
        );
        nested.extend(tail);
    }
}

fn touches_user(content: &Map<String, Value>) -> bool {
    let user = Category::User.as_str();
    ["caller_category", "callee_category"]
        .iter()
        .any(|key| content.get(*key).and_then(Value::as_str) == Some(user))
}

fn answer_text(content: Option<Value>) -> String {
    match content {
        Some(Value::String(s)) => s,
        None | Some(Value::Null) => String::new(),
        Some(other) => other.to_string(),
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
