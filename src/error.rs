// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use thiserror::Error;

#[derive(Error, Debug)]
pub enum OperatorError {
    #[error("Kubernetes API error: {0}")]
    KubeError(#[from] kube::Error),

    #[error("ConfigMap {namespace}/{name} referenced by ConfigDeployment not found")]
    UnresolvedDependency { namespace: String, name: String },

    #[error("Deployment {namespace}/{name} kept changing underneath us, giving up for now")]
    Conflict { namespace: String, name: String },

    #[error("ConfigMap {namespace}/{name} has no resourceVersion")]
    MissingVersion { namespace: String, name: String },

    #[error("Object is missing {0}")]
    MissingObjectKey(String),

    #[error("Dependency index query failed: {0}")]
    IndexQuery(String),

    #[error("Reconciliation cancelled by shutdown")]
    Cancelled,
}

impl OperatorError {
    /// Whether the store rejected a write because the object changed since it was read
    pub fn is_conflict(&self) -> bool {
        matches!(self, OperatorError::Conflict { .. })
    }
}

pub type Result<T> = std::result::Result<T, OperatorError>;
