// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use crate::types::deployment::config_map_used;
use k8s_openapi::api::apps::v1::Deployment;
use kube::ResourceExt;

/// Whether a Deployment declares it consumes the ConfigMap `config_map`
pub fn uses_config_map(deployment: &Deployment, config_map: &str) -> bool {
    config_map_used(deployment) == Some(config_map)
}

/// Deployments in `namespace` consuming `config_map`.
///
/// Plain linear filter over the namespace's Deployments.
pub fn select_dependent_workloads(
    deployments: Vec<Deployment>,
    namespace: &str,
    config_map: &str,
) -> Vec<Deployment> {
    deployments
        .into_iter()
        .filter(|d| d.namespace().as_deref() == Some(namespace))
        .filter(|d| uses_config_map(d, config_map))
        .collect()
}
