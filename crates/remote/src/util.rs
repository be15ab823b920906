//! Shared helpers for the HTTP side of the client.

use crate::transport::TransportError;

/// Convert a [`reqwest::Error`] into a [`TransportError`].
///
/// Timeouts map to [`TransportError::Timeout`], failures to establish the
/// connection to [`TransportError::Connect`], everything else (including
/// mid-body read failures) to [`TransportError::Io`].
pub(crate) fn from_reqwest(e: reqwest::Error) -> TransportError {
    if e.is_timeout() {
        TransportError::Timeout(e.to_string())
    } else if e.is_connect() {
        TransportError::Connect(e.to_string())
    } else {
        TransportError::Io(e.to_string())
    }
}

/// Join a peer base URL and an endpoint path with exactly one `/`.
pub fn build_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// Cut `s` to at most `max` bytes on a char boundary.
pub(crate) fn truncate_utf8(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_url_single_slash() {
        assert_eq!(build_url("http://h:1", "/sse/chat"), "http://h:1/sse/chat");
        assert_eq!(build_url("http://h:1/", "/sse/chat"), "http://h:1/sse/chat");
        assert_eq!(build_url("http://h:1//", "sse/chat"), "http://h:1/sse/chat");
    }

    #[test]
    fn build_url_keeps_base_path() {
        assert_eq!(
            build_url("https://gw.example.com/agents/math", "get_organization"),
            "https://gw.example.com/agents/math/get_organization"
        );
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate_utf8("héllo", 2), "h");
        assert_eq!(truncate_utf8("short", 64), "short");
    }
}
