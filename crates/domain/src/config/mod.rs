mod logging;
mod peers;
mod retry;

pub use logging::*;
pub use peers::*;
pub use retry::*;

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

use crate::error::Result;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Top-level config
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub peers: Vec<PeerConfig>,
}

impl Config {
    /// Parse a TOML document, filling in defaults for every missing field.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        Ok(toml::from_str(raw)?)
    }

    /// Look up a peer by its configured name.
    pub fn peer(&self, name: &str) -> Option<&PeerConfig> {
        self.peers.iter().find(|p| p.name == name)
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Config validation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Severity level for a configuration issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSeverity {
    Error,
    Warning,
}

/// A single configuration validation issue.
#[derive(Debug, Clone)]
pub struct ConfigError {
    pub severity: ConfigSeverity,
    pub field: String,
    pub message: String,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.severity {
            ConfigSeverity::Error => "ERROR",
            ConfigSeverity::Warning => "WARN",
        };
        write!(f, "[{tag}] {}: {}", self.field, self.message)
    }
}

impl Config {
    /// Validate the configuration and return a list of issues.
    ///
    /// Returns an empty vec when everything looks good.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();

        if self.retry.multiplier < 1.0 {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "retry.multiplier".into(),
                message: "multiplier must be at least 1.0".into(),
            });
        }

        if self.retry.cap_ms < self.retry.base_delay_ms {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "retry.cap_ms".into(),
                message: format!(
                    "cap ({} ms) is below the base delay ({} ms)",
                    self.retry.cap_ms, self.retry.base_delay_ms
                ),
            });
        }

        if self.peers.is_empty() {
            errors.push(ConfigError {
                severity: ConfigSeverity::Warning,
                field: "peers".into(),
                message: "no remote peers configured".into(),
            });
        }

        let mut seen = HashSet::new();
        for (i, peer) in self.peers.iter().enumerate() {
            if peer.name.is_empty() {
                errors.push(ConfigError {
                    severity: ConfigSeverity::Error,
                    field: format!("peers[{i}].name"),
                    message: "peer name must not be empty".into(),
                });
            } else if !seen.insert(peer.name.as_str()) {
                errors.push(ConfigError {
                    severity: ConfigSeverity::Error,
                    field: format!("peers[{i}].name"),
                    message: format!("duplicate peer name \"{}\"", peer.name),
                });
            }

            if !(peer.server_url.starts_with("http://")
                || peer.server_url.starts_with("https://"))
            {
                errors.push(ConfigError {
                    severity: ConfigSeverity::Error,
                    field: format!("peers[{i}].server_url"),
                    message: "server_url must be an http:// or https:// URL".into(),
                });
            }

            if peer.connect_timeout_ms == 0 {
                errors.push(ConfigError {
                    severity: ConfigSeverity::Warning,
                    field: format!("peers[{i}].connect_timeout_ms"),
                    message: "zero connect timeout; connections will fail immediately".into(),
                });
            }
        }

        errors
    }
}
