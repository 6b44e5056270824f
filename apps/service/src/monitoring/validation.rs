use anyhow::{Result, anyhow};
use url::Url;

/// Validate a monitor's target URL before it is scheduled.
///
/// Only http/https targets make sense for a JSON health check; anything else
/// is a configuration mistake surfaced at load time instead of as endless
/// fetch failures.
pub fn validate_monitor_url(target: &str) -> Result<()> {
    let url = Url::parse(target).map_err(|e| anyhow!("invalid URL: {e}"))?;

    match url.scheme() {
        "http" | "https" => {}
        other => return Err(anyhow!("unsupported scheme for JSON health check: {other}")),
    }

    if url.host_str().is_none() {
        return Err(anyhow!("URL has no host: {target}"));
    }

    Ok(())
}
