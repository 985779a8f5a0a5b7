// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! One reconcile pass for a ConfigDeployment.

use crate::constants::reconcile::MAX_CONFLICT_RETRIES;
use crate::error::{OperatorError, Result};
use crate::kubernetes::ObjectStore;
use crate::rollout::workloads::{select_dependent_workloads, uses_config_map};
use crate::types::config_map::version_token;
use crate::types::deployment::{applied_version, set_applied_version};
use crate::types::ConfigDeployment;
use k8s_openapi::api::apps::v1::Deployment;
use kube::runtime::reflector::ObjectRef;
use kube::ResourceExt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Result of a successful pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// The ConfigDeployment no longer exists
    Deleted,
    /// Every dependent Deployment already runs the current version
    NoOp,
    /// This many Deployments were rolled to the current version
    Updated(usize),
}

/// Rolls the Deployments depending on a ConfigDeployment's ConfigMap
/// whenever the ConfigMap's version moves on.
pub struct Reconciler<S> {
    store: S,
    shutdown: Arc<AtomicBool>,
}

impl<S: ObjectStore> Reconciler<S> {
    pub fn new(store: S) -> Self {
        Self::with_shutdown(store, Arc::new(AtomicBool::new(false)))
    }

    /// Reconciler that abandons passes once `shutdown` is raised
    pub fn with_shutdown(store: S, shutdown: Arc<AtomicBool>) -> Self {
        Self { store, shutdown }
    }

    #[instrument(skip(self, key), fields(namespace = ?key.namespace, name = %key.name))]
    pub async fn reconcile(&self, key: &ObjectRef<ConfigDeployment>) -> Result<ReconcileOutcome> {
        let namespace = key
            .namespace
            .as_deref()
            .ok_or_else(|| OperatorError::MissingObjectKey(format!("namespace on {}", key.name)))?;

        let Some(config_deployment) = self.store.get_config_deployment(namespace, &key.name).await?
        else {
            debug!("ConfigDeployment no longer exists, nothing to do");
            return Ok(ReconcileOutcome::Deleted);
        };

        let Some(config_map_name) = config_deployment.config_map_ref() else {
            info!("ConfigDeployment does not reference a ConfigMap, nothing to roll");
            return Ok(ReconcileOutcome::NoOp);
        };

        let config_map = self
            .store
            .get_config_map(namespace, config_map_name)
            .await?
            .ok_or_else(|| OperatorError::UnresolvedDependency {
                namespace: namespace.to_string(),
                name: config_map_name.to_string(),
            })?;

        let version = version_token(&config_map).ok_or_else(|| OperatorError::MissingVersion {
            namespace: namespace.to_string(),
            name: config_map_name.to_string(),
        })?;

        let deployments = self.store.list_deployments(namespace).await?;
        let dependents = select_dependent_workloads(deployments, namespace, config_map_name);
        debug!(
            "Found {} deployments using ConfigMap {}",
            dependents.len(),
            config_map_name
        );

        let mut updated = 0;
        for deployment in dependents {
            if applied_version(&deployment) == Some(version) {
                info!(
                    "Deployment {} already using ConfigMap version {}",
                    deployment.name_any(),
                    version
                );
                continue;
            }

            if self.shutdown.load(Ordering::SeqCst) {
                info!("Shutdown requested, abandoning pass after {} updates", updated);
                return Err(OperatorError::Cancelled);
            }

            if self.roll_deployment(deployment, config_map_name, version).await? {
                updated += 1;
            }
        }

        if updated == 0 {
            Ok(ReconcileOutcome::NoOp)
        } else {
            Ok(ReconcileOutcome::Updated(updated))
        }
    }

    /// Write `version` into the pod template, re-reading the Deployment when
    /// the write loses an optimistic concurrency race. Returns whether this
    /// call changed the Deployment.
    async fn roll_deployment(
        &self,
        mut deployment: Deployment,
        config_map: &str,
        version: &str,
    ) -> Result<bool> {
        let name = deployment.name_any();
        let namespace = deployment.namespace().unwrap_or_default();
        let mut attempt = 1;

        loop {
            info!(
                "ConfigMap {} changed, updating deployment {}/{} to version {}",
                config_map, namespace, name, version
            );
            set_applied_version(&mut deployment, version);

            match self.store.replace_deployment(&deployment).await {
                Ok(_) => {
                    info!(
                        "Updated deployment {}/{} with ConfigMap version {}",
                        namespace, name, version
                    );
                    return Ok(true);
                }
                Err(e) if e.is_conflict() && attempt < MAX_CONFLICT_RETRIES => {
                    debug!(
                        "Deployment {}/{} changed while updating (attempt {}), re-reading",
                        namespace, name, attempt
                    );
                    attempt += 1;

                    match self.store.get_deployment(&namespace, &name).await? {
                        Some(fresh) if uses_config_map(&fresh, config_map) => {
                            if applied_version(&fresh) == Some(version) {
                                debug!("Deployment {}/{} already picked up version {}", namespace, name, version);
                                return Ok(false);
                            }
                            deployment = fresh;
                        }
                        _ => {
                            info!(
                                "Deployment {}/{} no longer uses ConfigMap {}, skipping",
                                namespace, name, config_map
                            );
                            return Ok(false);
                        }
                    }
                }
                Err(e) if e.is_conflict() => {
                    return Err(OperatorError::Conflict { namespace, name });
                }
                Err(e) => return Err(e),
            }
        }
    }
}
