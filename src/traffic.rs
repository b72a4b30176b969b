//! Remediation seam for the remote traffic module.
//!
//! When the continuity monitor falls far enough behind, the poll cycle can
//! ask for the traffic automation service to be restarted. The SSH plumbing
//! that actually does so lives behind [`TrafficControl`]; success and
//! attempted-but-failed must stay distinguishable, so the contract returns
//! `Ok(true)` / `Ok(false)` rather than folding failure into `Err`.

use anyhow::Result;
use async_trait::async_trait;
use tracing::warn;

#[async_trait]
pub trait TrafficControl: Send + Sync {
    /// Restart the remote traffic module. `Ok(true)` means the restart
    /// completed; `Ok(false)` means it was attempted and failed; `Err` means
    /// it could not be attempted at all.
    async fn restart_remote_service(&self) -> Result<bool>;
}

/// Placeholder used when no remediation endpoint is configured.
pub struct DisabledTrafficControl;

#[async_trait]
impl TrafficControl for DisabledTrafficControl {
    async fn restart_remote_service(&self) -> Result<bool> {
        warn!("traffic module restart requested but no remediation endpoint is configured");
        Ok(false)
    }
}
