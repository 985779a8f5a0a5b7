// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use k8s_openapi::api::core::v1::ConfigMap;
use kube::runtime::reflector::ObjectRef;
use kube::ResourceExt;
use kube_runtime::watcher;
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};
use tracing::trace;

#[derive(Default)]
struct Seen {
    versions: HashMap<ObjectRef<ConfigMap>, String>,
    /// ConfigMaps listed since the last `Init`, while a re-list is running
    relisted: Option<HashSet<ObjectRef<ConfigMap>>>,
}

/// Lets ConfigMap watch events through only when the version token moved.
///
/// A ConfigMap seen for the first time passes, as does a deletion, which
/// also drops its entry. A re-list replays every object: unchanged ones are
/// filtered out, and entries for objects missing from the re-list are dropped
/// once it completes.
#[derive(Default)]
pub struct VersionChangedFilter {
    seen: Mutex<Seen>,
}

impl VersionChangedFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// The ConfigMap carried by `event` if it should trigger dependents
    pub fn admit(&self, event: watcher::Event<ConfigMap>) -> Option<ConfigMap> {
        match event {
            watcher::Event::Apply(cm) => self.observe(&cm).then_some(cm),
            watcher::Event::InitApply(cm) => {
                if let Some(relisted) = self.lock().relisted.as_mut() {
                    relisted.insert(ObjectRef::from_obj(&cm));
                }
                self.observe(&cm).then_some(cm)
            }
            watcher::Event::Delete(cm) => {
                self.forget(&cm);
                Some(cm)
            }
            watcher::Event::Init => {
                self.lock().relisted = Some(HashSet::new());
                None
            }
            watcher::Event::InitDone => {
                let mut seen = self.lock();
                if let Some(relisted) = seen.relisted.take() {
                    seen.versions.retain(|obj_ref, _| relisted.contains(obj_ref));
                }
                None
            }
        }
    }

    /// Record the version of `config_map`, true when it differs from the last one seen
    pub fn observe(&self, config_map: &ConfigMap) -> bool {
        let Some(version) = config_map.resource_version() else {
            return true;
        };

        match self.lock().versions.insert(ObjectRef::from_obj(config_map), version.clone()) {
            Some(previous) if previous == version => {
                trace!("ConfigMap {} unchanged at version {}", config_map.name_any(), version);
                false
            }
            _ => true,
        }
    }

    pub fn forget(&self, config_map: &ConfigMap) {
        self.lock().versions.remove(&ObjectRef::from_obj(config_map));
    }

    /// Number of ConfigMaps whose version is remembered
    pub fn tracked(&self) -> usize {
        self.lock().versions.len()
    }

    fn lock(&self) -> MutexGuard<'_, Seen> {
        self.seen.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
