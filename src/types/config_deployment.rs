// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use crate::error::{OperatorError, Result};
use kube::runtime::reflector::ObjectRef;
use kube::{CustomResource, ResourceExt};
use serde::{Deserialize, Serialize};

/// Declares that the Deployments annotated with `configMapUsed: <configMap>`
/// must be rolled whenever that ConfigMap changes.
#[derive(CustomResource, Serialize, Deserialize, Clone, Debug, Default, schemars::JsonSchema)]
#[kube(
    group = "apps.tutorial.kubebuilder.io",
    version = "v1",
    kind = "ConfigDeployment"
)]
#[kube(namespaced)]
#[kube(shortname = "cfgdeploy")]
#[serde(rename_all = "camelCase")]
pub struct ConfigDeploymentSpec {
    /// Name of the ConfigMap, in the same namespace, the Deployments consume
    #[serde(default)]
    pub config_map: String,
}

impl ConfigDeployment {
    /// The referenced ConfigMap name, `None` when no dependency is declared
    pub fn config_map_ref(&self) -> Option<&str> {
        let name = self.spec.config_map.as_str();
        (!name.is_empty()).then_some(name)
    }

    /// Namespace and name, both required for a namespaced resource
    pub fn key(&self) -> Result<ObjectRef<ConfigDeployment>> {
        let namespace = self
            .namespace()
            .ok_or_else(|| OperatorError::MissingObjectKey(format!("namespace on {}", self.name_any())))?;
        let name = self
            .metadata
            .name
            .clone()
            .ok_or_else(|| OperatorError::MissingObjectKey("name on ConfigDeployment".to_string()))?;
        Ok(ObjectRef::new(&name).within(&namespace))
    }
}
