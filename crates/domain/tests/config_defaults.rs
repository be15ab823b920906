use ra_domain::config::{Config, ConfigSeverity, LogFormat, RetryConfig};
use ra_domain::error::Error;

#[test]
fn default_retry_policy_matches_documented_constants() {
    let config = Config::default();
    assert_eq!(config.retry.max_retries, 3);
    assert_eq!(config.retry.base_delay_ms, 1_000);
    assert_eq!(config.retry.multiplier, 2.0);
    assert_eq!(config.retry.cap_ms, 30_000);
}

#[test]
fn empty_document_parses_to_defaults() {
    let config = Config::from_toml_str("").unwrap();
    assert_eq!(config.retry, RetryConfig::default());
    assert_eq!(config.logging.format, LogFormat::Pretty);
    assert_eq!(config.logging.filter, "info");
    assert!(config.peers.is_empty());
}

#[test]
fn peer_defaults_fill_in() {
    let toml_str = r#"
[[peers]]
name = "math_agent"
server_url = "http://127.0.0.1:8081"
"#;
    let config = Config::from_toml_str(toml_str).unwrap();
    let peer = config.peer("math_agent").unwrap();
    assert!(peer.share_call_stack);
    assert_eq!(peer.connect_timeout_ms, 10_000);
    assert_eq!(peer.idle_timeout_ms, 300_000);
    assert!(config.peer("missing").is_none());
}

#[test]
fn explicit_values_override_defaults() {
    let toml_str = r#"
[retry]
max_retries = 5
cap_ms = 5000

[logging]
format = "json"

[[peers]]
name = "private"
server_url = "https://peer.example.com/"
share_call_stack = false
idle_timeout_ms = 0
"#;
    let config = Config::from_toml_str(toml_str).unwrap();
    assert_eq!(config.retry.max_retries, 5);
    assert_eq!(config.retry.cap_ms, 5_000);
    assert_eq!(config.retry.base_delay_ms, 1_000);
    assert_eq!(config.logging.format, LogFormat::Json);
    let peer = config.peer("private").unwrap();
    assert!(!peer.share_call_stack);
    assert_eq!(peer.idle_timeout_ms, 0);
}

#[test]
fn malformed_document_is_an_error() {
    let err = Config::from_toml_str("[retry]\nmax_retries = \"three\"").unwrap_err();
    assert!(matches!(err, Error::Toml(_)));
    assert!(err.to_string().starts_with("TOML"));
}

#[test]
fn validate_flags_bad_peers() {
    let toml_str = r#"
[[peers]]
name = "a"
server_url = "ftp://nope"

[[peers]]
name = "a"
server_url = "http://ok"
"#;
    let config = Config::from_toml_str(toml_str).unwrap();
    let issues = config.validate();
    let errors: Vec<_> = issues
        .iter()
        .filter(|i| i.severity == ConfigSeverity::Error)
        .map(|i| i.field.as_str())
        .collect();
    assert_eq!(errors, vec!["peers[0].server_url", "peers[1].name"]);
}

#[test]
fn validate_warns_when_no_peers() {
    let issues = Config::default().validate();
    assert_eq!(issues.len(), 1);
    assert_eq!(issues[0].severity, ConfigSeverity::Warning);
    assert_eq!(issues[0].to_string(), "[WARN] peers: no remote peers configured");
}

#[test]
fn validate_rejects_shrinking_backoff() {
    let mut config = Config::default();
    config.retry.multiplier = 0.5;
    config.retry.cap_ms = 10;
    let fields: Vec<_> = config.validate().into_iter().map(|i| i.field).collect();
    assert!(fields.contains(&"retry.multiplier".to_string()));
    assert!(fields.contains(&"retry.cap_ms".to_string()));
}
