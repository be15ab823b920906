use std::fmt::Write as _;

use ra_domain::config::{Config, ConfigSeverity};

/// Check the config and print what was found.
///
/// Warnings are reported but still count as usable; returns `false` only
/// when a peer could not be called as configured.
pub fn validate(config: &Config, config_path: &str) -> bool {
    let (report, usable) = validation_report(config, config_path);
    print!("{report}");
    usable
}

fn validation_report(config: &Config, config_path: &str) -> (String, bool) {
    let issues = config.validate();
    let errors = issues
        .iter()
        .filter(|issue| issue.severity == ConfigSeverity::Error)
        .count();
    let warnings = issues.len() - errors;

    let mut report = String::new();
    for issue in &issues {
        let _ = writeln!(report, "  {issue}");
    }
    let _ = match (errors, warnings) {
        (0, 0) => writeln!(report, "{config_path}: {} peer(s), no issues", config.peers.len()),
        (0, w) => writeln!(report, "{config_path}: usable, {w} warning(s)"),
        (e, w) => writeln!(report, "{config_path}: {e} error(s), {w} warning(s); not usable"),
    };
    (report, errors == 0)
}

/// Dump the resolved config (with all defaults filled in) as TOML.
pub fn show(config: &Config) -> anyhow::Result<()> {
    let output = toml::to_string_pretty(config)
        .map_err(|e| anyhow::anyhow!("serializing config: {e}"))?;
    print!("{output}");
    Ok(())
}

/// Print one line per configured peer.
pub fn list_peers(config: &Config) {
    if config.peers.is_empty() {
        println!("no peers configured");
        return;
    }
    for peer in &config.peers {
        println!(
            "{:<20} {:<40} share_call_stack={}",
            peer.name, peer.server_url, peer.share_call_stack
        );
    }
}
