// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! ConfigDeployment controller - watches ConfigDeployments, the Deployments they
//! own and the ConfigMaps they reference, and runs a rollout pass per change.

use crate::config::Config;
use crate::error::{OperatorError, Result};
use crate::index::DependencyIndex;
use crate::kubernetes::KubeStore;
use crate::rollout::{ErrorBackoff, ReconcileOutcome, Reconciler};
use crate::types::ConfigDeployment;
use crate::watch::ConfigMapTrigger;
use futures::StreamExt;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::ConfigMap;
use k8s_openapi::NamespaceResourceScope;
use kube::{
    runtime::{
        controller::{self, Action},
        reflector::ObjectRef,
        Controller,
    },
    Api, Client, Resource,
};
use kube_runtime::watcher::Config as WatcherConfig;
use kube_runtime::{watcher, WatchStreamExt};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

pub struct ConfigDeploymentReconciler {
    client: Client,
    config: Config,
    index: DependencyIndex,
    shutdown: Arc<AtomicBool>,
}

struct Context {
    reconciler: Reconciler<KubeStore>,
    backoff: ErrorBackoff,
    resync_interval: Duration,
}

impl ConfigDeploymentReconciler {
    pub fn new(client: Client, config: Config, index: DependencyIndex) -> Self {
        Self {
            client,
            config,
            index,
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Api for `K` scoped to the configured watch namespace
    pub fn api<K>(&self) -> Api<K>
    where
        K: Resource<Scope = NamespaceResourceScope>,
        K::DynamicType: Default,
    {
        match &self.config.watch_namespace {
            Some(ns) => Api::namespaced(self.client.clone(), ns),
            None => Api::all(self.client.clone()),
        }
    }

    pub async fn run(self) -> anyhow::Result<()> {
        let config_deployments: Api<ConfigDeployment> = self.api();
        let deployments: Api<Deployment> = self.api();
        let config_maps: Api<ConfigMap> = self.api();

        let trigger = ConfigMapTrigger::new(self.index.clone());
        let config_map_changes =
            trigger.admitted(watcher(config_maps, WatcherConfig::default()).default_backoff());
        tokio::spawn(raise_on_signal(self.shutdown.clone()));

        let context = Arc::new(Context {
            reconciler: Reconciler::with_shutdown(KubeStore::new(self.client.clone()), self.shutdown.clone()),
            backoff: ErrorBackoff::default(),
            resync_interval: self.config.resync_interval,
        });

        info!(
            "Starting ConfigDeployment controller (concurrency={}, resync={:?})",
            self.config.concurrency, self.config.resync_interval
        );

        Controller::new(config_deployments, WatcherConfig::default())
            .owns(deployments, WatcherConfig::default())
            .watches_stream(config_map_changes, move |cm| trigger.map(cm))
            .with_config(controller::Config::default().concurrency(self.config.concurrency))
            .shutdown_on_signal()
            .run(reconcile, error_policy, context)
            .for_each(|res| async move {
                match res {
                    Ok((obj, _)) => debug!("Reconciled ConfigDeployment: {}", obj.name),
                    Err(e) => warn!("Reconciliation error: {:?}", e),
                }
            })
            .await;

        info!("ConfigDeployment controller stopped");
        Ok(())
    }
}

/// Raise the shutdown flag on SIGINT/SIGTERM so in-flight passes stop early
async fn raise_on_signal(shutdown: Arc<AtomicBool>) {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = sigterm.recv() => {}
                }
            }
            Err(e) => {
                warn!("Unable to listen for SIGTERM: {}", e);
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }

    info!("Shutdown signal received");
    shutdown.store(true, Ordering::SeqCst);
}

async fn reconcile(obj: Arc<ConfigDeployment>, ctx: Arc<Context>) -> Result<Action> {
    let key = obj.key()?;

    let outcome = ctx.reconciler.reconcile(&key).await?;
    ctx.backoff.reset(&key);

    match outcome {
        ReconcileOutcome::Deleted => Ok(Action::await_change()),
        ReconcileOutcome::NoOp => {
            debug!("All deployments of {} are up to date", key.name);
            Ok(Action::requeue(ctx.resync_interval))
        }
        ReconcileOutcome::Updated(count) => {
            info!("Rolled {} deployments for ConfigDeployment {}", count, key.name);
            Ok(Action::requeue(ctx.resync_interval))
        }
    }
}

fn error_policy(obj: Arc<ConfigDeployment>, error: &OperatorError, ctx: Arc<Context>) -> Action {
    let key = ObjectRef::from_obj(obj.as_ref());
    let delay = ctx.backoff.record_failure(&key);
    error!(
        "Reconciliation of ConfigDeployment {}/{} failed: {}, retrying in {:?}",
        key.namespace.as_deref().unwrap_or_default(),
        key.name,
        error,
        delay
    );
    Action::requeue(delay)
}
