// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use anyhow::{Context, Result};
use kube::runtime::watcher;
use kube::Client;
use tracing::{info, warn};

use config_rollout::config::Config;
use config_rollout::index::DependencyIndex;
use config_rollout::kubernetes::wait_for_config_deployment_crd;
use config_rollout::reconcilers::ConfigDeploymentReconciler;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    info!("Starting config-rollout operator");

    let config = Config::from_env()?;
    info!(
        "Configuration loaded: watch_namespace={}, concurrency={}",
        config.watch_namespace.as_deref().unwrap_or("<all>"),
        config.concurrency
    );

    let client = Client::try_default()
        .await
        .context("Unable to create Kubernetes client")?;
    info!("Connected to Kubernetes cluster");

    info!("Waiting for ConfigDeployment CRD to become available...");
    wait_for_config_deployment_crd(&client).await?;

    let index = DependencyIndex::new();
    let reconciler = ConfigDeploymentReconciler::new(client.clone(), config, index.clone());
    let index_api = reconciler.api();

    info!("Starting dependency index and controller...");

    // The index task runs until its watch ends, the controller until shutdown
    tokio::select! {
        res = index.run(index_api, watcher::Config::default()) => {
            warn!("Dependency index stopped unexpectedly");
            res?;
        }
        res = reconciler.run() => {
            res?;
        }
    }

    info!("Operator stopped");
    Ok(())
}
