pub mod call;
pub mod config;
pub mod discover;

use clap::{Parser, Subcommand};
use ra_domain::config::Config;
use serde_json::{Map, Value};

/// Default config file, relative to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "relay-agent.toml";

/// relay-agent: call agents hosted on remote peers over event streams.
#[derive(Debug, Parser)]
#[command(name = "relay-agent", version, about)]
pub struct Cli {
    /// Path to the TOML config file.
    #[arg(long, global = true, env = "RELAY_AGENT_CONFIG", default_value = DEFAULT_CONFIG_PATH)]
    pub config: String,
    /// Emit logs as JSON regardless of `[logging] format`.
    #[arg(long, global = true)]
    pub json_logs: bool,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Invoke a remote agent and stream its events to stdout.
    Call {
        /// Peer name from the config file.
        peer: String,
        /// Query text, sent as the `query` argument.
        query: String,
        /// Extra argument as `key=value`; values that parse as JSON are sent
        /// as JSON, anything else as a string.  Repeatable.
        #[arg(long = "arg", value_name = "KEY=VALUE")]
        args: Vec<String>,
        /// Trace id (defaults to a fresh UUID).
        #[arg(long)]
        trace_id: Option<String>,
        /// Name of the calling agent placed between `user` and the peer on
        /// the call stack.
        #[arg(long)]
        caller: Option<String>,
        /// Hide the call stack from the peer even if the config shares it.
        #[arg(long)]
        no_share_stack: bool,
    },
    /// Fetch and print a peer's organization descriptor.
    Discover {
        /// Peer name from the config file.
        peer: String,
    },
    /// List configured peers.
    Peers,
    /// Configuration utilities.
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Parse the config file and report any errors.
    Validate,
    /// Dump the resolved configuration (with defaults) as TOML.
    Show,
}

// ── Config loading helper ─────────────────────────────────────────────

/// Load the configuration at `config_path`.
///
/// A missing file yields the defaults (and no peers); a file that exists
/// but does not parse is an error.
pub fn load_config(config_path: &str) -> anyhow::Result<Config> {
    if !std::path::Path::new(config_path).exists() {
        return Ok(Config::default());
    }
    let raw = std::fs::read_to_string(config_path)
        .map_err(|e| anyhow::anyhow!("reading {config_path}: {e}"))?;
    Config::from_toml_str(&raw).map_err(|e| anyhow::anyhow!("parsing {config_path}: {e}"))
}

// ── Argument helpers ──────────────────────────────────────────────────

/// Parse one `--arg key=value` pair.
pub fn parse_arg(raw: &str) -> anyhow::Result<(String, Value)> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| anyhow::anyhow!("argument {raw:?} is not key=value"))?;
    let key = key.trim();
    if key.is_empty() {
        anyhow::bail!("argument {raw:?} has an empty key");
    }
    let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
    Ok((key.to_string(), value))
}

/// Assemble the call arguments: `query` plus every `--arg`.
pub fn build_arguments(query: &str, args: &[String]) -> anyhow::Result<Value> {
    let mut map = Map::new();
    map.insert("query".into(), Value::String(query.to_string()));
    for raw in args {
        let (key, value) = parse_arg(raw)?;
        map.insert(key, value);
    }
    Ok(Value::Object(map))
}
