// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use crate::index::DependencyIndex;
use crate::types::ConfigDeployment;
use crate::watch::filter::VersionChangedFilter;
use futures::{future, Stream, StreamExt};
use k8s_openapi::api::core::v1::ConfigMap;
use kube::runtime::reflector::ObjectRef;
use kube::ResourceExt;
use kube_runtime::watcher;
use std::sync::Arc;
use tracing::{debug, warn};

/// One reconcile request per ConfigDeployment referencing `config_map`.
///
/// A failed index query yields no requests; the periodic resync and
/// ConfigDeployment events still converge the dependents.
pub fn find_dependents(
    index: &DependencyIndex,
    config_map: &ConfigMap,
) -> Vec<ObjectRef<ConfigDeployment>> {
    let name = config_map.name_any();
    let Some(namespace) = config_map.namespace() else {
        return Vec::new();
    };

    match index.lookup(&namespace, &name) {
        Ok(dependents) => {
            if !dependents.is_empty() {
                debug!(
                    "ConfigMap {}/{} changed, enqueueing {} ConfigDeployments",
                    namespace,
                    name,
                    dependents.len()
                );
            }
            dependents
        }
        Err(e) => {
            warn!(
                "Unable to resolve ConfigDeployments for ConfigMap {}/{}: {}",
                namespace, name, e
            );
            Vec::new()
        }
    }
}

/// ConfigMap trigger for the controller: the version-changed filter runs on
/// the watch events, the index fan-out on the ConfigMaps that got through
#[derive(Clone)]
pub struct ConfigMapTrigger {
    index: DependencyIndex,
    filter: Arc<VersionChangedFilter>,
}

impl ConfigMapTrigger {
    pub fn new(index: DependencyIndex) -> Self {
        Self {
            index,
            filter: Arc::new(VersionChangedFilter::new()),
        }
    }

    /// ConfigMap watch events reduced to the ConfigMaps whose version changed
    pub fn admitted<S>(
        &self,
        events: S,
    ) -> impl Stream<Item = Result<ConfigMap, watcher::Error>> + Send + 'static
    where
        S: Stream<Item = Result<watcher::Event<ConfigMap>, watcher::Error>> + Send + 'static,
    {
        let filter = self.filter.clone();
        events.filter_map(move |event| {
            let admitted = match event {
                Ok(event) => filter.admit(event).map(Ok),
                Err(e) => Some(Err(e)),
            };
            future::ready(admitted)
        })
    }

    pub fn map(&self, config_map: ConfigMap) -> Vec<ObjectRef<ConfigDeployment>> {
        find_dependents(&self.index, &config_map)
    }
}
