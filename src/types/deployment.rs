// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Accessors for the `configMapUsed` / `configMapVersion` annotation protocol on Deployments.

use crate::constants::annotations;
use k8s_openapi::api::apps::v1::Deployment;
use std::collections::BTreeMap;

/// The ConfigMap name a Deployment declares it consumes
pub fn config_map_used(deployment: &Deployment) -> Option<&str> {
    deployment
        .metadata
        .annotations
        .as_ref()
        .and_then(|a| a.get(annotations::CONFIG_MAP_USED))
        .map(|s| s.as_str())
}

/// The ConfigMap version last written to the pod template
pub fn applied_version(deployment: &Deployment) -> Option<&str> {
    deployment
        .spec
        .as_ref()
        .and_then(|s| s.template.metadata.as_ref())
        .and_then(|m| m.annotations.as_ref())
        .and_then(|a| a.get(annotations::CONFIG_MAP_VERSION))
        .map(|s| s.as_str())
}

/// Write the ConfigMap version into the pod template, creating the annotation map if needed.
/// Changing the pod template is what makes the Deployment controller roll the pods.
pub fn set_applied_version(deployment: &mut Deployment, version: &str) {
    let spec = deployment.spec.get_or_insert_with(Default::default);
    let metadata = spec.template.metadata.get_or_insert_with(Default::default);
    metadata
        .annotations
        .get_or_insert_with(BTreeMap::new)
        .insert(annotations::CONFIG_MAP_VERSION.to_string(), version.to_string());
}
