//! Outbound request construction for `POST <peer>/sse/chat`.
//!
//! Turns a [`CallContext`] plus the caller's arguments into the JSON body
//! and header set sent to the remote peer, applying the stack-sharing
//! policy and stripping everything that must not cross the wire.

use ra_domain::call::{CallContext, Category};
use serde_json::{Map, Value};

/// Endpoint path on the remote peer.
pub const EVENT_STREAM_PATH: &str = "/sse/chat";

/// Key inside `shared_data` holding the originating request's headers.
/// Internal bookkeeping only; removed from the outbound body.
pub const SHARED_HEADERS_KEY: &str = "_headers";

/// Caller-side headers that are transport-specific and never forwarded.
/// Compared case-insensitively.
pub const EXCLUDED_HEADERS: &[&str] = &[
    "host",
    "connection",
    "sec-ch-ua",
    "sec-ch-ua-mobile",
    "sec-ch-ua-platform",
    "user-agent",
    "referer",
    "accept-encoding",
    "accept-language",
    "cache-control",
    "sec-fetch-site",
    "sec-fetch-mode",
    "sec-fetch-dest",
    "accept",
    "content-length",
];

const ACCEPT_EVENT_STREAM: (&str, &str) = ("Accept", "text/event-stream");
const CONTENT_TYPE_JSON: (&str, &str) = ("Content-Type", "application/json");

/// Errors that make a call impossible to attempt.  Never retried.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum BuildError {
    #[error("trace id must not be empty")]
    MissingTraceId,
    #[error("arguments must be a JSON object, got {0}")]
    ArgumentsNotObject(&'static str),
}

/// A fully assembled outbound request.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestPayload {
    /// Flat JSON body.
    pub body: Map<String, Value>,
    /// Headers in the order they should be sent.
    pub headers: Vec<(String, String)>,
}

impl RequestPayload {
    /// Value of the first header named `name` (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Whether a caller header may be forwarded to the remote peer.
pub fn is_forwardable_header(name: &str) -> bool {
    !EXCLUDED_HEADERS
        .iter()
        .any(|excluded| excluded.eq_ignore_ascii_case(name))
}

/// Build the outbound payload for one call.
///
/// `arguments` must be a JSON object (or `null`, meaning no arguments);
/// its keys are merged into the top level of the body.
pub fn build_payload(ctx: &CallContext, arguments: Value) -> Result<RequestPayload, BuildError> {
    if ctx.trace_id().is_empty() {
        return Err(BuildError::MissingTraceId);
    }
    let arguments = match arguments {
        Value::Object(map) => map,
        Value::Null => Map::new(),
        other => return Err(BuildError::ArgumentsNotObject(json_kind(&other))),
    };

    Ok(RequestPayload {
        body: build_body(ctx, arguments),
        headers: build_headers(ctx),
    })
}

fn build_body(ctx: &CallContext, arguments: Map<String, Value>) -> Map<String, Value> {
    let mut body = Map::new();
    body.insert("current_trace_id".into(), ctx.trace_id().into());
    body.insert("node_id".into(), ctx.node_id().into());
    if let Some(group_id) = ctx.group_id() {
        body.insert("group_id".into(), group_id.into());
    }
    body.insert("caller".into(), ctx.caller().into());
    body.insert("callee".into(), ctx.callee().into());
    body.insert("callee_category".into(), ctx.callee_category().as_str().into());
    body.insert("shared_data".into(), Value::Object(ctx.shared_data().clone()));

    // Arguments travel flattened; they may shadow the context fields above
    // but not the policy fields below.
    body.extend(arguments);

    // This hop always presents itself to the peer as an orchestration caller.
    body.insert("caller_category".into(), Category::User.as_str().into());

    if ctx.share_call_stack() {
        body.insert("call_stack".into(), drop_last(ctx.call_stack()));
        body.insert("node_id_stack".into(), drop_last(ctx.node_id_stack()));
    } else {
        body.remove("call_stack");
        body.remove("node_id_stack");
        body.insert("caller".into(), Category::User.as_str().into());
    }

    if let Some(Value::Object(shared)) = body.get_mut("shared_data") {
        shared.remove(SHARED_HEADERS_KEY);
    }

    body
}

/// The callee re-derives its own stack entry, so the last one is dropped.
fn drop_last(stack: &[String]) -> Value {
    let keep = stack.len().saturating_sub(1);
    Value::Array(stack[..keep].iter().cloned().map(Value::String).collect())
}

fn build_headers(ctx: &CallContext) -> Vec<(String, String)> {
    let mut headers: Vec<(String, String)> = Vec::new();

    // Explicit shared headers first, then anything only present in the
    // `_headers` bag of shared data.
    let bag = ctx
        .shared_data()
        .get(SHARED_HEADERS_KEY)
        .and_then(Value::as_object)
        .into_iter()
        .flatten()
        .filter_map(|(k, v)| v.as_str().map(|v| (k.clone(), v.to_string())));
    let explicit = ctx
        .shared_headers()
        .iter()
        .map(|(k, v)| (k.clone(), v.clone()));

    for (name, value) in explicit.chain(bag) {
        if !is_forwardable_header(&name) {
            continue;
        }
        if headers.iter().any(|(k, _)| k.eq_ignore_ascii_case(&name)) {
            continue;
        }
        headers.push((name, value));
    }

    for (name, value) in [ACCEPT_EVENT_STREAM, CONTENT_TYPE_JSON] {
        headers.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
        headers.push((name.to_string(), value.to_string()));
    }

    headers
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ctx(share: bool) -> CallContext {
        CallContext::builder("trace-1")
            .frame("A", "n1")
            .frame("B", "n2")
            .frame("C", "n3")
            .group_id("g-1")
            .share_call_stack(share)
            .build()
            .unwrap()
    }

    #[test]
    fn shared_stack_drops_last_entry() {
        let p = build_payload(&ctx(true), json!({})).unwrap();
        assert_eq!(p.body["call_stack"], json!(["A", "B"]));
        assert_eq!(p.body["node_id_stack"], json!(["n1", "n2"]));
        assert_eq!(p.body["caller"], "B");
    }

    #[test]
    fn private_stack_omits_stacks_and_masks_caller() {
        let p = build_payload(&ctx(false), json!({})).unwrap();
        assert!(!p.body.contains_key("call_stack"));
        assert!(!p.body.contains_key("node_id_stack"));
        assert_eq!(p.body["caller"], "user");
    }

    #[test]
    fn caller_category_always_user() {
        let c = CallContext::builder("t")
            .frame("a", "n")
            .caller_category(Category::Agent)
            .build()
            .unwrap();
        let p = build_payload(&c, json!({"caller_category": "agent"})).unwrap();
        assert_eq!(p.body["caller_category"], "user");
    }

    #[test]
    fn arguments_are_flattened() {
        let p = build_payload(&ctx(true), json!({"query": "2+2?", "temperature": 0})).unwrap();
        assert_eq!(p.body["query"], "2+2?");
        assert_eq!(p.body["temperature"], 0);
        assert!(!p.body.contains_key("arguments"));
        assert_eq!(p.body["current_trace_id"], "trace-1");
        assert_eq!(p.body["node_id"], "n3");
        assert_eq!(p.body["group_id"], "g-1");
    }

    #[test]
    fn arguments_cannot_smuggle_stacks_past_private_policy() {
        let p = build_payload(&ctx(false), json!({"call_stack": ["X"], "caller": "mallory"})).unwrap();
        assert!(!p.body.contains_key("call_stack"));
        assert_eq!(p.body["caller"], "user");
    }

    #[test]
    fn null_arguments_mean_none() {
        assert!(build_payload(&ctx(true), Value::Null).is_ok());
    }

    #[test]
    fn non_object_arguments_rejected() {
        let err = build_payload(&ctx(true), json!(["q"])).unwrap_err();
        assert_eq!(err, BuildError::ArgumentsNotObject("an array"));
        assert_eq!(err.to_string(), "arguments must be a JSON object, got an array");
    }

    #[test]
    fn empty_trace_id_rejected() {
        let c = CallContext::builder("").frame("a", "n").build().unwrap();
        assert_eq!(build_payload(&c, json!({})).unwrap_err(), BuildError::MissingTraceId);
    }

    #[test]
    fn internal_headers_bag_stripped_from_shared_data() {
        let mut shared = Map::new();
        shared.insert("_headers".into(), json!({"x-tenant": "acme"}));
        shared.insert("session".into(), json!("s-9"));
        let c = CallContext::builder("t")
            .frame("a", "n")
            .shared_data(shared)
            .build()
            .unwrap();
        let p = build_payload(&c, json!({})).unwrap();
        assert_eq!(p.body["shared_data"], json!({"session": "s-9"}));
        // ...but its forwardable entries still become headers.
        assert_eq!(p.header("x-tenant"), Some("acme"));
    }

    #[test]
    fn deny_listed_headers_filtered_case_insensitively() {
        let c = CallContext::builder("t")
            .frame("a", "n")
            .header("Host", "internal:8080")
            .header("User-Agent", "curl")
            .header("Content-Length", "12")
            .header("CACHE-CONTROL", "no-cache")
            .header("Authorization", "Bearer abc")
            .header("X-Request-Id", "r-1")
            .build()
            .unwrap();
        let p = build_payload(&c, json!({})).unwrap();
        let names: Vec<_> = p.headers.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(names, vec!["Authorization", "X-Request-Id", "Accept", "Content-Type"]);
    }

    #[test]
    fn stream_headers_forced_on_top() {
        let c = CallContext::builder("t")
            .frame("a", "n")
            .header("accept", "text/html")
            .header("content-type", "text/plain")
            .build()
            .unwrap();
        let p = build_payload(&c, json!({})).unwrap();
        assert_eq!(p.header("Accept"), Some("text/event-stream"));
        assert_eq!(p.header("Content-Type"), Some("application/json"));
        assert_eq!(p.headers.len(), 2);
    }

    #[test]
    fn forwardable_header_check() {
        assert!(!is_forwardable_header("Sec-Fetch-Mode"));
        assert!(is_forwardable_header("x-trace"));
    }
}
