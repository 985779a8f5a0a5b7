// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Test utilities: a mocked Kubernetes API, an in-memory object store and object builders.

use crate::constants::annotations;
use crate::error::{OperatorError, Result};
use crate::kubernetes::ObjectStore;
use crate::types::{ConfigDeployment, ConfigDeploymentSpec};
use http::{Request, Response};
use k8s_openapi::api::apps::v1::{Deployment, DeploymentSpec};
use k8s_openapi::api::core::v1::{ConfigMap, PodTemplateSpec};
use kube::api::ObjectMeta;
use kube::client::Body;
use kube::{Client, ResourceExt};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use tower::Service;

/// A mock HTTP service that returns predefined responses based on request paths.
#[derive(Clone)]
pub struct MockService {
    responses: Arc<Mutex<HashMap<(String, String), (u16, String)>>>,
    requests: Arc<Mutex<Vec<(String, String)>>>,
}

impl MockService {
    pub fn new() -> Self {
        Self {
            responses: Arc::new(Mutex::new(HashMap::new())),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Add a response for GET requests matching the exact path
    pub fn on_get(self, path: &str, status: u16, body: &str) -> Self {
        self.on("GET", path, status, body)
    }

    /// Add a response for PUT requests matching the exact path
    pub fn on_put(self, path: &str, status: u16, body: &str) -> Self {
        self.on("PUT", path, status, body)
    }

    fn on(self, method: &str, path: &str, status: u16, body: &str) -> Self {
        self.responses
            .lock()
            .unwrap()
            .insert((method.to_string(), path.to_string()), (status, body.to_string()));
        self
    }

    /// Method and path of every request received, in order, excluding GETs
    pub fn requests(&self) -> Vec<(String, String)> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|(method, _)| method != "GET")
            .cloned()
            .collect()
    }

    /// Build a kube Client from this mock service
    pub fn into_client(self) -> Client {
        Client::new(self, "default")
    }

    fn find_response(&self, method: &str, path: &str) -> Option<(u16, String)> {
        let responses = self.responses.lock().unwrap();

        if let Some(resp) = responses.get(&(method.to_string(), path.to_string())) {
            return Some(resp.clone());
        }

        for ((m, p), resp) in responses.iter() {
            if m == method && path.starts_with(p) {
                return Some(resp.clone());
            }
        }

        None
    }
}

impl Default for MockService {
    fn default() -> Self {
        Self::new()
    }
}

impl Service<Request<Body>> for MockService {
    type Response = Response<Body>;
    type Error = tower::BoxError;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = std::result::Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<std::result::Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let method = req.method().to_string();
        let path = req.uri().path().to_string();

        self.requests
            .lock()
            .unwrap()
            .push((method.clone(), path.clone()));
        let response = self.find_response(&method, &path);

        Box::pin(async move {
            let (status, body) = response.unwrap_or_else(|| (404, not_found_json("object", &path)));
            Ok(Response::builder()
                .status(status)
                .header("content-type", "application/json")
                .body(Body::from(body.into_bytes()))
                .unwrap())
        })
    }
}

/// Create a 404 not found response
pub fn not_found_json(resource: &str, name: &str) -> String {
    serde_json::json!({
        "kind": "Status",
        "apiVersion": "v1",
        "status": "Failure",
        "message": format!("{} \"{}\" not found", resource, name),
        "reason": "NotFound",
        "code": 404
    })
    .to_string()
}

/// Create a Deployment JSON document as served by the API
pub fn deployment_json(
    namespace: &str,
    name: &str,
    config_map_used: Option<&str>,
    applied_version: Option<&str>,
) -> String {
    serde_json::to_string(&make_deployment(namespace, name, config_map_used, applied_version))
        .unwrap()
}

pub fn make_config_deployment(namespace: &str, name: &str, config_map: &str) -> ConfigDeployment {
    ConfigDeployment {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            ..Default::default()
        },
        spec: ConfigDeploymentSpec {
            config_map: config_map.to_string(),
        },
    }
}

/// ConfigMap whose resourceVersion is `version`; an empty version leaves it unset
pub fn make_config_map(namespace: &str, name: &str, version: &str) -> ConfigMap {
    ConfigMap {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            resource_version: (!version.is_empty()).then(|| version.to_string()),
            ..Default::default()
        },
        data: Some(BTreeMap::from([(
            "config.txt".to_string(),
            "{}".to_string(),
        )])),
        ..Default::default()
    }
}

pub fn make_deployment(
    namespace: &str,
    name: &str,
    config_map_used: Option<&str>,
    applied_version: Option<&str>,
) -> Deployment {
    Deployment {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            resource_version: Some("1".to_string()),
            annotations: config_map_used.map(|cm| {
                BTreeMap::from([(annotations::CONFIG_MAP_USED.to_string(), cm.to_string())])
            }),
            ..Default::default()
        },
        spec: Some(DeploymentSpec {
            template: PodTemplateSpec {
                metadata: Some(ObjectMeta {
                    annotations: applied_version.map(|v| {
                        BTreeMap::from([(
                            annotations::CONFIG_MAP_VERSION.to_string(),
                            v.to_string(),
                        )])
                    }),
                    ..Default::default()
                }),
                spec: None,
            },
            ..Default::default()
        }),
        status: None,
    }
}

type Key = (String, String);

fn key_of<K: ResourceExt>(obj: &K) -> Key {
    (obj.namespace().unwrap_or_default(), obj.name_any())
}

fn bump_resource_version(deployment: &mut Deployment) {
    let current: u64 = deployment
        .metadata
        .resource_version
        .as_deref()
        .and_then(|v| v.parse().ok())
        .unwrap_or(0);
    deployment.metadata.resource_version = Some((current + 1).to_string());
}

#[derive(Default)]
struct FakeState {
    config_deployments: HashMap<Key, ConfigDeployment>,
    config_maps: HashMap<Key, ConfigMap>,
    deployments: BTreeMap<Key, Deployment>,
    replaced: Vec<String>,
    pending_conflicts: usize,
    drop_back_reference_on_conflict: Option<Key>,
    fail_lists: bool,
    raise_after_replace: Option<Arc<AtomicBool>>,
}

/// In-memory [`ObjectStore`] with resourceVersion checks on replace.
/// Clones share the same state.
#[derive(Clone, Default)]
pub struct FakeStore {
    state: Arc<Mutex<FakeState>>,
}

impl FakeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config_deployment(self, obj: ConfigDeployment) -> Self {
        self.state
            .lock()
            .unwrap()
            .config_deployments
            .insert(key_of(&obj), obj);
        self
    }

    pub fn with_config_map(self, obj: ConfigMap) -> Self {
        self.state.lock().unwrap().config_maps.insert(key_of(&obj), obj);
        self
    }

    pub fn with_deployment(self, obj: Deployment) -> Self {
        self.state.lock().unwrap().deployments.insert(key_of(&obj), obj);
        self
    }

    pub fn set_config_map_version(&self, namespace: &str, name: &str, version: &str) {
        let mut state = self.state.lock().unwrap();
        let cm = state
            .config_maps
            .get_mut(&(namespace.to_string(), name.to_string()))
            .unwrap();
        cm.metadata.resource_version = Some(version.to_string());
    }

    /// Reject the next `count` replaces as if another writer got there first
    pub fn inject_conflicts(&self, count: usize) {
        self.state.lock().unwrap().pending_conflicts = count;
    }

    /// The simulated concurrent writer also removes the `configMapUsed` annotation
    pub fn on_conflict_remove_back_reference(&self, namespace: &str, name: &str) {
        self.state.lock().unwrap().drop_back_reference_on_conflict =
            Some((namespace.to_string(), name.to_string()));
    }

    /// Set `flag` once a replace has gone through, as a shutdown arriving mid-pass would
    pub fn raise_after_replace(&self, flag: Arc<AtomicBool>) {
        self.state.lock().unwrap().raise_after_replace = Some(flag);
    }

    pub fn fail_lists(&self) {
        self.state.lock().unwrap().fail_lists = true;
    }

    /// `namespace/name` of every replace call, including rejected ones
    pub fn replaced(&self) -> Vec<String> {
        self.state.lock().unwrap().replaced.clone()
    }

    pub fn deployment(&self, namespace: &str, name: &str) -> Option<Deployment> {
        self.state
            .lock()
            .unwrap()
            .deployments
            .get(&(namespace.to_string(), name.to_string()))
            .cloned()
    }
}

impl ObjectStore for FakeStore {
    async fn get_config_deployment(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<ConfigDeployment>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .config_deployments
            .get(&(namespace.to_string(), name.to_string()))
            .cloned())
    }

    async fn get_config_map(&self, namespace: &str, name: &str) -> Result<Option<ConfigMap>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .config_maps
            .get(&(namespace.to_string(), name.to_string()))
            .cloned())
    }

    async fn list_deployments(&self, namespace: &str) -> Result<Vec<Deployment>> {
        let state = self.state.lock().unwrap();
        if state.fail_lists {
            return Err(OperatorError::KubeError(kube::Error::Api(kube::error::ErrorResponse {
                status: "Failure".to_string(),
                message: "etcdserver: request timed out".to_string(),
                reason: "InternalError".to_string(),
                code: 500,
            })));
        }
        Ok(state
            .deployments
            .iter()
            .filter(|((ns, _), _)| ns == namespace)
            .map(|(_, d)| d.clone())
            .collect())
    }

    async fn get_deployment(&self, namespace: &str, name: &str) -> Result<Option<Deployment>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .deployments
            .get(&(namespace.to_string(), name.to_string()))
            .cloned())
    }

    async fn replace_deployment(&self, deployment: &Deployment) -> Result<Deployment> {
        let mut guard = self.state.lock().unwrap();
        let state = &mut *guard;
        let key = key_of(deployment);
        state.replaced.push(format!("{}/{}", key.0, key.1));

        let conflict = || OperatorError::Conflict {
            namespace: key.0.clone(),
            name: key.1.clone(),
        };

        let stored = state.deployments.get_mut(&key).ok_or_else(conflict)?;

        if state.pending_conflicts > 0 {
            state.pending_conflicts -= 1;
            bump_resource_version(stored);
            if state.drop_back_reference_on_conflict.as_ref() == Some(&key) {
                if let Some(a) = stored.metadata.annotations.as_mut() {
                    a.remove(annotations::CONFIG_MAP_USED);
                }
            }
            return Err(conflict());
        }

        if stored.metadata.resource_version != deployment.metadata.resource_version {
            return Err(conflict());
        }

        let mut updated = deployment.clone();
        bump_resource_version(&mut updated);
        *stored = updated.clone();
        if let Some(flag) = &state.raise_after_replace {
            flag.store(true, Ordering::SeqCst);
        }
        Ok(updated)
    }
}
