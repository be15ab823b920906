use ra_domain::config::Config;
use ra_remote::RemoteAgent;

/// `relay-agent discover <peer>`: print the organization descriptor.
pub async fn run(config: &Config, peer: &str) -> anyhow::Result<()> {
    let peer_cfg = config
        .peer(peer)
        .cloned()
        .ok_or_else(|| anyhow::anyhow!("unknown peer {peer:?} (see `relay-agent peers`)"))?;

    let mut agent = RemoteAgent::builder(peer_cfg).build()?;
    let org = agent.init().await?;
    println!("{}", serde_json::to_string_pretty(org)?);
    Ok(())
}
