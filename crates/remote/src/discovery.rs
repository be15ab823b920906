//! One-shot organization lookup on a peer.

use std::time::{Duration, Instant};

use ra_domain::trace::TraceEvent;
use reqwest::Client;
use serde_json::Value;

use crate::types::RemoteError;
use crate::util::{build_url, truncate_utf8};

/// Descriptor endpoint on the remote peer.
pub const ORGANIZATION_PATH: &str = "/get_organization";

const DISCOVERY_TIMEOUT: Duration = Duration::from_secs(30);

/// `GET <server_url>/get_organization` and return `data.organization`.
///
/// Not retried: a peer that cannot describe itself at startup is reported
/// to the caller as-is.
pub async fn fetch_organization(
    http: &Client,
    peer: &str,
    server_url: &str,
) -> Result<Value, RemoteError> {
    let url = build_url(server_url, ORGANIZATION_PATH);
    let start = Instant::now();

    let resp = http
        .get(&url)
        .timeout(DISCOVERY_TIMEOUT)
        .send()
        .await
        .map_err(|e| RemoteError::Discovery(format!("GET {url}: {e}")))?;

    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(RemoteError::Discovery(format!(
            "GET {url} returned {}: {}",
            status.as_u16(),
            truncate_utf8(&body, 256)
        )));
    }

    let body: Value = resp
        .json()
        .await
        .map_err(|e| RemoteError::Discovery(format!("decoding {url}: {e}")))?;

    TraceEvent::OrganizationFetched {
        peer: peer.to_string(),
        duration_ms: start.elapsed().as_millis() as u64,
    }
    .emit();

    extract_organization(body)
        .ok_or_else(|| RemoteError::Discovery(format!("{url}: response has no data.organization")))
}

fn extract_organization(mut body: Value) -> Option<Value> {
    let org = body.get_mut("data")?.get_mut("organization")?.take();
    (!org.is_null()).then_some(org)
}
