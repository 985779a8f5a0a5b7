// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Startup gate on the ConfigDeployment CRD being served

use crate::constants::crd::{GROUP, KIND, POLL_INTERVAL_SECS, POLL_MAX_INTERVAL_SECS, VERSION};
use crate::error::Result;
use kube::{discovery::Discovery, Client};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Block until the API server serves `ConfigDeployment` in `GROUP/VERSION`.
/// Discovery failures are retried like a missing CRD.
pub async fn wait_for_config_deployment_crd(client: &Client) -> Result<()> {
    let mut delay = Duration::from_secs(POLL_INTERVAL_SECS);
    let mut attempt: u32 = 1;

    loop {
        match config_deployment_served(client).await {
            Ok(true) => {
                info!(attempt, "{}.{}/{} is served", KIND, GROUP, VERSION);
                return Ok(());
            }
            Ok(false) => debug!(attempt, ?delay, "{} not installed yet", KIND),
            Err(e) => warn!(attempt, ?delay, "Discovery of {} failed: {}", GROUP, e),
        }

        tokio::time::sleep(delay).await;
        delay = next_poll_interval(delay);
        attempt = attempt.saturating_add(1);
    }
}

fn next_poll_interval(delay: Duration) -> Duration {
    delay
        .saturating_mul(2)
        .min(Duration::from_secs(POLL_MAX_INTERVAL_SECS))
}

async fn config_deployment_served(client: &Client) -> Result<bool> {
    let discovery = Discovery::new(client.clone()).filter(&[GROUP]).run().await?;

    let served = match discovery.get(GROUP) {
        Some(group) => group
            .versioned_resources(VERSION)
            .iter()
            .any(|(resource, _)| resource.kind == KIND),
        None => false,
    };
    Ok(served)
}
