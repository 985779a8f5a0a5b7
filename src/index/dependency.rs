// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use crate::error::{OperatorError, Result};
use crate::types::ConfigDeployment;
use futures::StreamExt;
use kube::runtime::reflector::ObjectRef;
use kube::runtime::{watcher, WatchStreamExt};
use kube::{Api, ResourceExt};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock, RwLockWriteGuard};
use tracing::{debug, info, warn};

/// Index entry: a ConfigMap name within a namespace
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IndexKey {
    pub namespace: String,
    pub config_map: String,
}

/// Extract the indexed field of a ConfigDeployment. Objects without a
/// ConfigMap reference are left out of the index.
pub fn index_key(config_deployment: &ConfigDeployment) -> Option<&str> {
    config_deployment.config_map_ref()
}

#[derive(Default)]
struct IndexMaps {
    dependents: HashMap<IndexKey, HashSet<ObjectRef<ConfigDeployment>>>,
    keys: HashMap<ObjectRef<ConfigDeployment>, IndexKey>,
}

impl IndexMaps {
    fn upsert(&mut self, config_deployment: &ConfigDeployment) {
        let Some(namespace) = config_deployment.namespace() else {
            debug!(
                "Ignoring ConfigDeployment {} without namespace",
                config_deployment.name_any()
            );
            return;
        };
        let obj_ref = ObjectRef::from_obj(config_deployment);

        let new_key = index_key(config_deployment).map(|config_map| IndexKey {
            namespace,
            config_map: config_map.to_string(),
        });

        if self.keys.get(&obj_ref) == new_key.as_ref() {
            return;
        }
        self.remove(&obj_ref);

        if let Some(key) = new_key {
            self.dependents
                .entry(key.clone())
                .or_default()
                .insert(obj_ref.clone());
            self.keys.insert(obj_ref, key);
        }
    }

    fn remove(&mut self, obj_ref: &ObjectRef<ConfigDeployment>) {
        let Some(old_key) = self.keys.remove(obj_ref) else {
            return;
        };
        if let Some(set) = self.dependents.get_mut(&old_key) {
            set.remove(obj_ref);
            if set.is_empty() {
                self.dependents.remove(&old_key);
            }
        }
    }
}

#[derive(Default)]
struct IndexState {
    live: IndexMaps,
    /// Maps being rebuilt from a (re-)list; swapped in on `InitDone`
    rebuilding: Option<IndexMaps>,
    /// Set once the first full list has been applied
    synced: bool,
}

/// Secondary index over ConfigDeployments keyed by `spec.configMap`.
///
/// Maintained incrementally from watch events and shared between the
/// watch task and the ConfigMap mapper. Cloning yields a handle to the
/// same index.
#[derive(Clone, Default)]
pub struct DependencyIndex {
    state: Arc<RwLock<IndexState>>,
}

impl DependencyIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep the index up to date by watching ConfigDeployments until the stream ends
    pub async fn run(self, api: Api<ConfigDeployment>, config: watcher::Config) -> anyhow::Result<()> {
        info!("Starting ConfigDeployment dependency index");
        let mut events = std::pin::pin!(watcher(api, config).default_backoff());

        while let Some(event) = events.next().await {
            match event {
                Ok(event) => self.apply_watcher_event(&event),
                Err(e) => warn!("ConfigDeployment watch error, index may be stale: {}", e),
            }
        }

        warn!("ConfigDeployment watch stream ended");
        Ok(())
    }

    pub fn apply_watcher_event(&self, event: &watcher::Event<ConfigDeployment>) {
        let mut state = self.write();

        match event {
            watcher::Event::Apply(obj) => state.live.upsert(obj),
            watcher::Event::Delete(obj) => state.live.remove(&ObjectRef::from_obj(obj)),
            watcher::Event::Init => state.rebuilding = Some(IndexMaps::default()),
            watcher::Event::InitApply(obj) => {
                state.rebuilding.get_or_insert_with(IndexMaps::default).upsert(obj);
            }
            watcher::Event::InitDone => {
                let rebuilt = state.rebuilding.take().unwrap_or_default();
                debug!("Dependency index rebuilt with {} entries", rebuilt.keys.len());
                state.live = rebuilt;
                state.synced = true;
                drop(state);
                self.state.clear_poison();
            }
        }
    }

    /// All ConfigDeployments in `namespace` referencing the ConfigMap `config_map`
    pub fn lookup(&self, namespace: &str, config_map: &str) -> Result<Vec<ObjectRef<ConfigDeployment>>> {
        let state = self
            .state
            .read()
            .map_err(|_| OperatorError::IndexQuery("index lock poisoned".to_string()))?;

        if !state.synced {
            return Err(OperatorError::IndexQuery(
                "ConfigDeployments not listed yet".to_string(),
            ));
        }

        let key = IndexKey {
            namespace: namespace.to_string(),
            config_map: config_map.to_string(),
        };
        let mut dependents: Vec<_> = state
            .live
            .dependents
            .get(&key)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default();
        dependents.sort_by(|a, b| (&a.namespace, &a.name).cmp(&(&b.namespace, &b.name)));

        Ok(dependents)
    }

    fn write(&self) -> RwLockWriteGuard<'_, IndexState> {
        // A poisoned index keeps failing lookups until the next full re-list replaces it
        self.state.write().unwrap_or_else(|poisoned| {
            warn!("Dependency index lock poisoned, applying event anyway");
            poisoned.into_inner()
        })
    }
}
