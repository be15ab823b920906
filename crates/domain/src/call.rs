//! Per-hop invocation context.
//!
//! A [`CallContext`] describes one outbound call to a remote peer: where in
//! the agent call hierarchy it sits, which trace it belongs to, and which
//! caller-side headers and shared data travel with it.  It is built once
//! via [`CallContextBuilder`] and never mutated afterwards.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

/// Who sits at one end of a call edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// The end user (or an orchestration entry point acting for them).
    User,
    #[default]
    Agent,
    Tool,
    Llm,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::User => "user",
            Category::Agent => "agent",
            Category::Tool => "tool",
            Category::Llm => "llm",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors raised while assembling a [`CallContext`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ContextError {
    #[error("call stack must not be empty")]
    EmptyStack,
    #[error("call stack has {call_stack} entries but node id stack has {node_id_stack}")]
    StackLengthMismatch {
        call_stack: usize,
        node_id_stack: usize,
    },
}

/// Describes one outbound invocation.
///
/// Invariant: `call_stack().len() == node_id_stack().len()` and both are
/// non-empty.  The last entry of each stack is this hop itself.
#[derive(Debug, Clone, PartialEq)]
pub struct CallContext {
    trace_id: String,
    node_id: String,
    group_id: Option<String>,
    caller: String,
    callee: String,
    caller_category: Category,
    callee_category: Category,
    call_stack: Vec<String>,
    node_id_stack: Vec<String>,
    shared_headers: BTreeMap<String, String>,
    shared_data: Map<String, Value>,
    share_call_stack: bool,
    send_events: bool,
}

impl CallContext {
    /// Start a builder for a call belonging to `trace_id`.
    pub fn builder(trace_id: impl Into<String>) -> CallContextBuilder {
        CallContextBuilder::new(trace_id)
    }

    pub fn trace_id(&self) -> &str {
        &self.trace_id
    }

    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    pub fn group_id(&self) -> Option<&str> {
        self.group_id.as_deref()
    }

    pub fn caller(&self) -> &str {
        &self.caller
    }

    pub fn callee(&self) -> &str {
        &self.callee
    }

    pub fn caller_category(&self) -> Category {
        self.caller_category
    }

    pub fn callee_category(&self) -> Category {
        self.callee_category
    }

    /// Agent names from the outermost caller down to this hop.
    pub fn call_stack(&self) -> &[String] {
        &self.call_stack
    }

    /// Node ids, index-aligned with [`call_stack`](Self::call_stack).
    pub fn node_id_stack(&self) -> &[String] {
        &self.node_id_stack
    }

    /// Headers captured from the originating HTTP request (unfiltered).
    pub fn shared_headers(&self) -> &BTreeMap<String, String> {
        &self.shared_headers
    }

    pub fn shared_data(&self) -> &Map<String, Value> {
        &self.shared_data
    }

    /// Whether the full ancestry is disclosed to the remote peer.
    pub fn share_call_stack(&self) -> bool {
        self.share_call_stack
    }

    /// Whether forwarded sub-events should reach the downstream sink.
    pub fn send_events(&self) -> bool {
        self.send_events
    }

    /// Copy of this context with the stack-sharing policy replaced.
    ///
    /// The policy is a property of the remote peer, so the agent that owns
    /// the peer stamps it onto the context it was handed.
    pub fn with_share_call_stack(&self, share: bool) -> Self {
        Self {
            share_call_stack: share,
            ..self.clone()
        }
    }
}

/// Fluent builder for [`CallContext`].
///
/// ```
/// # use ra_domain::call::{CallContext, Category};
/// let ctx = CallContext::builder("trace-1")
///     .frame("user", "n0")
///     .frame("master_agent", "n1")
///     .frame("remote_math", "n2")
///     .caller_category(Category::Agent)
///     .build()
///     .unwrap();
/// assert_eq!(ctx.caller(), "master_agent");
/// assert_eq!(ctx.callee(), "remote_math");
/// assert_eq!(ctx.node_id(), "n2");
/// ```
#[derive(Debug, Clone)]
pub struct CallContextBuilder {
    trace_id: String,
    node_id: Option<String>,
    group_id: Option<String>,
    caller: Option<String>,
    callee: Option<String>,
    caller_category: Category,
    callee_category: Category,
    call_stack: Vec<String>,
    node_id_stack: Vec<String>,
    shared_headers: BTreeMap<String, String>,
    shared_data: Map<String, Value>,
    share_call_stack: bool,
    send_events: bool,
}

impl CallContextBuilder {
    pub fn new(trace_id: impl Into<String>) -> Self {
        Self {
            trace_id: trace_id.into(),
            node_id: None,
            group_id: None,
            caller: None,
            callee: None,
            caller_category: Category::Agent,
            callee_category: Category::Agent,
            call_stack: Vec::new(),
            node_id_stack: Vec::new(),
            shared_headers: BTreeMap::new(),
            shared_data: Map::new(),
            share_call_stack: true,
            send_events: true,
        }
    }

    // ── Call hierarchy ───────────────────────────────────────────────

    /// Append one level to both stacks.
    pub fn frame(mut self, agent: impl Into<String>, node_id: impl Into<String>) -> Self {
        self.call_stack.push(agent.into());
        self.node_id_stack.push(node_id.into());
        self
    }

    /// Replace both stacks wholesale (e.g. when they arrive deserialized).
    /// Length agreement is checked in [`build`](Self::build).
    pub fn stacks(mut self, call_stack: Vec<String>, node_id_stack: Vec<String>) -> Self {
        self.call_stack = call_stack;
        self.node_id_stack = node_id_stack;
        self
    }

    /// Override the node id (defaults to the last node id on the stack).
    pub fn node_id(mut self, id: impl Into<String>) -> Self {
        self.node_id = Some(id.into());
        self
    }

    pub fn group_id(mut self, id: impl Into<String>) -> Self {
        self.group_id = Some(id.into());
        self
    }

    /// Override the caller name (defaults to the second-to-last stack entry,
    /// or `"user"` when this hop is the first one).
    pub fn caller(mut self, name: impl Into<String>) -> Self {
        self.caller = Some(name.into());
        self
    }

    /// Override the callee name (defaults to the last stack entry).
    pub fn callee(mut self, name: impl Into<String>) -> Self {
        self.callee = Some(name.into());
        self
    }

    pub fn caller_category(mut self, category: Category) -> Self {
        self.caller_category = category;
        self
    }

    pub fn callee_category(mut self, category: Category) -> Self {
        self.callee_category = category;
        self
    }

    // ── Shared state ─────────────────────────────────────────────────

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.shared_headers.insert(name.into(), value.into());
        self
    }

    pub fn headers<I, K, V>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.shared_headers
            .extend(headers.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    pub fn shared_data(mut self, data: Map<String, Value>) -> Self {
        self.shared_data = data;
        self
    }

    // ── Policy ───────────────────────────────────────────────────────

    pub fn share_call_stack(mut self, share: bool) -> Self {
        self.share_call_stack = share;
        self
    }

    pub fn send_events(mut self, send: bool) -> Self {
        self.send_events = send;
        self
    }

    /// Build the [`CallContext`].
    pub fn build(self) -> Result<CallContext, ContextError> {
        if self.call_stack.len() != self.node_id_stack.len() {
            return Err(ContextError::StackLengthMismatch {
                call_stack: self.call_stack.len(),
                node_id_stack: self.node_id_stack.len(),
            });
        }
        let (Some(last_agent), Some(last_node)) =
            (self.call_stack.last(), self.node_id_stack.last())
        else {
            return Err(ContextError::EmptyStack);
        };

        let callee = self.callee.unwrap_or_else(|| last_agent.clone());
        let node_id = self.node_id.unwrap_or_else(|| last_node.clone());
        let caller = self.caller.unwrap_or_else(|| {
            let n = self.call_stack.len();
            if n >= 2 {
                self.call_stack[n - 2].clone()
            } else {
                Category::User.as_str().to_string()
            }
        });

        Ok(CallContext {
            trace_id: self.trace_id,
            node_id,
            group_id: self.group_id,
            caller,
            callee,
            caller_category: self.caller_category,
            callee_category: self.callee_category,
            call_stack: self.call_stack,
            node_id_stack: self.node_id_stack,
            shared_headers: self.shared_headers,
            shared_data: self.shared_data,
            share_call_stack: self.share_call_stack,
            send_events: self.send_events,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_derives_endpoints_from_stack() {
        let ctx = CallContext::builder("t1")
            .frame("user", "n0")
            .frame("planner", "n1")
            .frame("remote", "n2")
            .build()
            .unwrap();
        assert_eq!(ctx.caller(), "planner");
        assert_eq!(ctx.callee(), "remote");
        assert_eq!(ctx.node_id(), "n2");
        assert!(ctx.share_call_stack());
        assert!(ctx.send_events());
    }

    #[test]
    fn single_frame_caller_is_user() {
        let ctx = CallContext::builder("t1").frame("remote", "n1").build().unwrap();
        assert_eq!(ctx.caller(), "user");
    }

    #[test]
    fn empty_stack_rejected() {
        let err = CallContext::builder("t1").build().unwrap_err();
        assert_eq!(err, ContextError::EmptyStack);
    }

    #[test]
    fn mismatched_stacks_rejected() {
        let err = CallContext::builder("t1")
            .stacks(vec!["a".into(), "b".into()], vec!["n1".into()])
            .build()
            .unwrap_err();
        assert_eq!(
            err,
            ContextError::StackLengthMismatch {
                call_stack: 2,
                node_id_stack: 1
            }
        );
    }

    #[test]
    fn with_share_call_stack_leaves_original_untouched() {
        let ctx = CallContext::builder("t1").frame("a", "n1").build().unwrap();
        let private = ctx.with_share_call_stack(false);
        assert!(ctx.share_call_stack());
        assert!(!private.share_call_stack());
        assert_eq!(private.call_stack(), ctx.call_stack());
    }

    #[test]
    fn category_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Category::User).unwrap(), r#""user""#);
        let c: Category = serde_json::from_str(r#""llm""#).unwrap();
        assert_eq!(c, Category::Llm);
    }
}
