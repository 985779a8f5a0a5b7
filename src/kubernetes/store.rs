// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Object store access used by the reconciler

use crate::constants::OPERATOR_NAME;
use crate::error::{OperatorError, Result};
use crate::types::ConfigDeployment;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::ConfigMap;
use kube::{
    api::{ListParams, PostParams},
    Api, Client, ResourceExt,
};
use std::future::Future;
use tracing::{debug, instrument};

/// The get/list/update operations a reconcile pass needs from the cluster.
///
/// Lookups return `Ok(None)` for objects that do not exist. `replace_deployment`
/// carries the `resourceVersion` of the object it was given and reports a lost
/// race as [`OperatorError::Conflict`].
pub trait ObjectStore: Send + Sync + 'static {
    fn get_config_deployment(
        &self,
        namespace: &str,
        name: &str,
    ) -> impl Future<Output = Result<Option<ConfigDeployment>>> + Send;

    fn get_config_map(
        &self,
        namespace: &str,
        name: &str,
    ) -> impl Future<Output = Result<Option<ConfigMap>>> + Send;

    fn list_deployments(&self, namespace: &str) -> impl Future<Output = Result<Vec<Deployment>>> + Send;

    fn get_deployment(
        &self,
        namespace: &str,
        name: &str,
    ) -> impl Future<Output = Result<Option<Deployment>>> + Send;

    fn replace_deployment(&self, deployment: &Deployment) -> impl Future<Output = Result<Deployment>> + Send;
}

/// [`ObjectStore`] backed by the Kubernetes API
#[derive(Clone)]
pub struct KubeStore {
    client: Client,
}

impl KubeStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

impl ObjectStore for KubeStore {
    async fn get_config_deployment(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<ConfigDeployment>> {
        let api: Api<ConfigDeployment> = Api::namespaced(self.client.clone(), namespace);
        Ok(api.get_opt(name).await?)
    }

    async fn get_config_map(&self, namespace: &str, name: &str) -> Result<Option<ConfigMap>> {
        let api: Api<ConfigMap> = Api::namespaced(self.client.clone(), namespace);
        Ok(api.get_opt(name).await?)
    }

    #[instrument(skip(self))]
    async fn list_deployments(&self, namespace: &str) -> Result<Vec<Deployment>> {
        let api: Api<Deployment> = Api::namespaced(self.client.clone(), namespace);
        let list = api.list(&ListParams::default()).await?;
        debug!("Listed {} deployments in {}", list.items.len(), namespace);
        Ok(list.items)
    }

    async fn get_deployment(&self, namespace: &str, name: &str) -> Result<Option<Deployment>> {
        let api: Api<Deployment> = Api::namespaced(self.client.clone(), namespace);
        Ok(api.get_opt(name).await?)
    }

    async fn replace_deployment(&self, deployment: &Deployment) -> Result<Deployment> {
        let name = deployment.name_any();
        let namespace = deployment
            .namespace()
            .ok_or_else(|| OperatorError::MissingObjectKey(format!("namespace on Deployment {}", name)))?;
        let api: Api<Deployment> = Api::namespaced(self.client.clone(), &namespace);
        let pp = PostParams {
            field_manager: Some(OPERATOR_NAME.to_string()),
            ..Default::default()
        };

        match api.replace(&name, &pp, deployment).await {
            Ok(updated) => Ok(updated),
            Err(kube::Error::Api(err)) if err.code == 409 => {
                debug!("Conflict replacing deployment {}/{}: {}", namespace, name, err.message);
                Err(OperatorError::Conflict { namespace, name })
            }
            Err(e) => Err(e.into()),
        }
    }
}
