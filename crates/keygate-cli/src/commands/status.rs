//! Status command - probe a running gateway.

use std::time::Duration;

use anyhow::Result;

use super::endpoint;
use crate::ui;

/// Probe `/status` and report the result.
///
/// # Errors
///
/// Never fails on an unreachable gateway; that is reported as a warning.
pub async fn run_status(url: Option<String>) -> Result<()> {
    ui::header("Gateway Status");

    let target = endpoint(url.as_deref(), "/status");
    ui::kv("Endpoint", &target);

    match reqwest::Client::new()
        .get(&target)
        .timeout(Duration::from_secs(2))
        .send()
        .await
    {
        Ok(resp) if resp.status().is_success() => {
            let body = resp.text().await.unwrap_or_default();
            ui::success(&format!("Gateway is up ({})", body.trim()));
        }
        Ok(resp) => {
            ui::warning(&format!("Gateway answered {}", resp.status()));
        }
        Err(e) => {
            tracing::debug!(error = %e, "status probe failed");
            ui::warning("Gateway is not reachable");
            ui::info("Start with: keygate serve");
        }
    }

    Ok(())
}
