// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Test utilities: a mock HTTP service for `kube::Client`, an in-memory
//! object store and recording fakes for the reconcilers' collaborators.

use crate::ceph::exec::CommandExecutor;
use crate::ceph::version::{CephVersion, VersionProbe};
use crate::dependents::{DependentList, DependentsLister};
use crate::error::{OperatorError, Result};
use crate::events::EventSink;
use crate::store::{ObjectStore, StoreFactory};
use crate::types::{CephCluster, CephFilesystem};
use crate::workloads::WorkloadRestarter;
use async_trait::async_trait;
use http::{Request, Response};
use k8s_openapi::api::core::v1::ObjectReference;
use kube::client::Body;
use kube::core::ErrorResponse;
use kube::runtime::events::EventType;
use kube::{Client, Resource, ResourceExt};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::marker::PhantomData;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use tokio_util::sync::CancellationToken;
use tower::Service;

/// A mock HTTP service that returns predefined responses based on request paths.
#[derive(Clone)]
pub struct MockService {
    responses: Arc<Mutex<HashMap<(String, String), (u16, String)>>>,
}

impl MockService {
    pub fn new() -> Self {
        Self {
            responses: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    fn on(self, method: &str, path: &str, status: u16, body: &str) -> Self {
        self.responses
            .lock()
            .unwrap()
            .insert((method.to_string(), path.to_string()), (status, body.to_string()));
        self
    }

    /// Add a response for GET requests matching the exact path
    pub fn on_get(self, path: &str, status: u16, body: &str) -> Self {
        self.on("GET", path, status, body)
    }

    /// Add a response for PATCH requests matching the exact path
    pub fn on_patch(self, path: &str, status: u16, body: &str) -> Self {
        self.on("PATCH", path, status, body)
    }

    /// Build a kube Client from this mock service
    pub fn into_client(self) -> Client {
        Client::new(self, "default")
    }

    fn find_response(&self, method: &str, path: &str) -> Option<(u16, String)> {
        let responses = self.responses.lock().unwrap();

        // Try exact match first
        if let Some(resp) = responses.get(&(method.to_string(), path.to_string())) {
            return Some(resp.clone());
        }

        // Try prefix match for paths like /apis/csi.ceph.io/v1/namespaces/foo
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

pub fn api_error(code: u16) -> kube::Error {
    let reason = match code {
        404 => "NotFound",
        409 => "Conflict",
        403 => "Forbidden",
        _ => "InternalError",
    };
    kube::Error::Api(ErrorResponse {
        status: "Failure".to_string(),
        message: format!("injected {}", reason),
        reason: reason.to_string(),
        code,
    })
}

#[derive(Default)]
struct MemoryState {
    objects: BTreeMap<String, Value>,
    version: u64,
    writes: usize,
    fail_gets: Option<u16>,
    fail_creates: Option<u16>,
    fail_updates: Option<u16>,
}

impl MemoryState {
    fn next_version(&mut self) -> String {
        self.version += 1;
        self.version.to_string()
    }
}

/// In-memory [`ObjectStore`] keyed by object name.
///
/// Behaves like the API server where the reconcilers depend on it: create
/// assigns uid and resourceVersion, update enforces the resourceVersion and
/// leaves status alone, and writes that change nothing keep the version.
pub struct MemoryStore<K> {
    state: Arc<Mutex<MemoryState>>,
    _kind: PhantomData<fn() -> K>,
}

impl<K> Clone for MemoryStore<K> {
    fn clone(&self) -> Self {
        Self {
            state: self.state.clone(),
            _kind: PhantomData,
        }
    }
}

impl<K> Default for MemoryStore<K> {
    fn default() -> Self {
        Self {
            state: Arc::default(),
            _kind: PhantomData,
        }
    }
}

impl<K> MemoryStore<K>
where
    K: Resource + Serialize + DeserializeOwned,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an object without counting it as a write
    pub fn with(self, obj: K) -> Self {
        self.put(obj);
        self
    }

    /// Overwrite an object as an outside actor would, status included
    pub fn put(&self, mut obj: K) {
        let mut state = self.state.lock().unwrap();
        let meta = obj.meta_mut();
        if meta.resource_version.is_none() {
            meta.resource_version = Some(state.next_version());
        }
        let name = obj.name_any();
        state.objects.insert(name, serde_json::to_value(&obj).unwrap());
    }

    pub fn object(&self, name: &str) -> Option<K> {
        let state = self.state.lock().unwrap();
        state
            .objects
            .get(name)
            .map(|v| serde_json::from_value(v.clone()).unwrap())
    }

    /// Creates plus updates that changed the stored object
    pub fn writes(&self) -> usize {
        self.state.lock().unwrap().writes
    }

    pub fn fail_gets_with(&self, code: u16) {
        self.state.lock().unwrap().fail_gets = Some(code);
    }

    pub fn fail_creates_with(&self, code: u16) {
        self.state.lock().unwrap().fail_creates = Some(code);
    }

    pub fn fail_updates_with(&self, code: u16) {
        self.state.lock().unwrap().fail_updates = Some(code);
    }
}

fn resource_version(value: &Value) -> Option<&str> {
    value["metadata"]["resourceVersion"].as_str()
}

#[async_trait]
impl<K> ObjectStore<K> for MemoryStore<K>
where
    K: Resource + Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
{
    async fn get(&self, name: &str) -> std::result::Result<Option<K>, kube::Error> {
        if let Some(code) = self.state.lock().unwrap().fail_gets {
            return Err(api_error(code));
        }
        Ok(self.object(name))
    }

    async fn list(&self) -> std::result::Result<Vec<K>, kube::Error> {
        let state = self.state.lock().unwrap();
        if let Some(code) = state.fail_gets {
            return Err(api_error(code));
        }
        Ok(state
            .objects
            .values()
            .map(|v| serde_json::from_value(v.clone()).unwrap())
            .collect())
    }

    async fn create(&self, obj: &K) -> std::result::Result<K, kube::Error> {
        let mut state = self.state.lock().unwrap();
        if let Some(code) = state.fail_creates {
            return Err(api_error(code));
        }
        let name = obj.name_any();
        if state.objects.contains_key(&name) {
            return Err(api_error(409));
        }

        let mut created = obj.clone();
        let version = state.next_version();
        let meta = created.meta_mut();
        meta.uid = Some(format!("uid-{}", name));
        meta.resource_version = Some(version);
        state.objects.insert(name, serde_json::to_value(&created).unwrap());
        state.writes += 1;
        Ok(created)
    }

    async fn update(&self, obj: &K) -> std::result::Result<K, kube::Error> {
        let mut state = self.state.lock().unwrap();
        if let Some(code) = state.fail_updates {
            return Err(api_error(code));
        }
        let name = obj.name_any();
        let Some(stored) = state.objects.get(&name).cloned() else {
            return Err(api_error(404));
        };
        let mut incoming = serde_json::to_value(obj).unwrap();
        if resource_version(&incoming).is_some() && resource_version(&incoming) != resource_version(&stored) {
            return Err(api_error(409));
        }

        // Status only changes through the status subresource
        match stored.get("status") {
            Some(status) => incoming["status"] = status.clone(),
            None => {
                if let Some(map) = incoming.as_object_mut() {
                    map.remove("status");
                }
            }
        }
        incoming["metadata"]["resourceVersion"] = stored["metadata"]["resourceVersion"].clone();
        if incoming != stored {
            incoming["metadata"]["resourceVersion"] = Value::String(state.next_version());
            state.writes += 1;
        }
        state.objects.insert(name, incoming.clone());
        Ok(serde_json::from_value(incoming).unwrap())
    }

    async fn update_status(&self, obj: &K) -> std::result::Result<K, kube::Error> {
        let mut state = self.state.lock().unwrap();
        if let Some(code) = state.fail_updates {
            return Err(api_error(code));
        }
        let name = obj.name_any();
        let Some(mut stored) = state.objects.get(&name).cloned() else {
            return Err(api_error(404));
        };
        let before = stored.clone();
        let status = serde_json::to_value(obj).unwrap().get("status").cloned();
        match (status, stored.as_object_mut()) {
            (Some(status), Some(map)) => {
                map.insert("status".to_string(), status);
            }
            (None, Some(map)) => {
                map.remove("status");
            }
            _ => {}
        }
        if stored != before {
            stored["metadata"]["resourceVersion"] = Value::String(state.next_version());
            state.writes += 1;
        }
        state.objects.insert(name, stored.clone());
        Ok(serde_json::from_value(stored).unwrap())
    }
}

/// Every namespace shares the same backing objects
impl<K> StoreFactory<K> for MemoryStore<K>
where
    K: Resource + Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
{
    fn in_namespace(&self, _namespace: &str) -> Arc<dyn ObjectStore<K>> {
        Arc::new(self.clone())
    }
}

type Scripted = std::result::Result<String, String>;

/// [`CommandExecutor`] answering from a script of argument prefixes.
/// The first matching prefix wins; unscripted commands fail.
#[derive(Default)]
pub struct MockExecutor {
    script: Vec<(Vec<String>, Scripted)>,
    calls: Mutex<Vec<Vec<String>>>,
}

impl MockExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    fn script(mut self, prefix: &[&str], response: Scripted) -> Self {
        self.script
            .push((prefix.iter().map(|s| s.to_string()).collect(), response));
        self
    }

    pub fn on(self, prefix: &[&str], output: &str) -> Self {
        self.script(prefix, Ok(output.to_string()))
    }

    pub fn fail_on(self, prefix: &[&str], message: &str) -> Self {
        self.script(prefix, Err(message.to_string()))
    }

    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl CommandExecutor for MockExecutor {
    async fn execute(&self, _cluster_namespace: &str, args: &[String]) -> Result<String> {
        self.calls.lock().unwrap().push(args.to_vec());
        let scripted = self
            .script
            .iter()
            .find(|(prefix, _)| args.starts_with(prefix))
            .map(|(_, response)| response.clone());
        match scripted {
            Some(Ok(output)) => Ok(output),
            Some(Err(message)) => Err(OperatorError::command_failed(args, message)),
            None => Err(OperatorError::command_failed(args, "no scripted response")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RecordedEvent {
    pub object: String,
    pub warning: bool,
    pub reason: String,
    pub message: String,
}

#[derive(Default)]
pub struct RecordingEventSink {
    events: Mutex<Vec<RecordedEvent>>,
}

impl RecordingEventSink {
    pub fn events(&self) -> Vec<RecordedEvent> {
        self.events.lock().unwrap().clone()
    }
}

#[async_trait]
impl EventSink for RecordingEventSink {
    async fn emit(&self, reference: &ObjectReference, type_: EventType, reason: &str, message: String) {
        self.events.lock().unwrap().push(RecordedEvent {
            object: reference.name.clone().unwrap_or_default(),
            warning: matches!(type_, EventType::Warning),
            reason: reason.to_string(),
            message,
        });
    }
}

#[derive(Default)]
pub struct RecordingRestarter {
    restarted: Mutex<Vec<String>>,
    failing: Mutex<Option<String>>,
}

impl RecordingRestarter {
    /// Restarted workloads as "namespace/name"
    pub fn restarted(&self) -> Vec<String> {
        self.restarted.lock().unwrap().clone()
    }

    /// Make restarts of `name` fail until [`RecordingRestarter::recover`]
    pub fn fail_for(&self, name: &str) {
        *self.failing.lock().unwrap() = Some(name.to_string());
    }

    pub fn recover(&self) {
        *self.failing.lock().unwrap() = None;
    }
}

#[async_trait]
impl WorkloadRestarter for RecordingRestarter {
    async fn restart(&self, namespace: &str, name: &str) -> Result<()> {
        if self.failing.lock().unwrap().as_deref() == Some(name) {
            return Err(OperatorError::UpdateFailed {
                kind: "Deployment".to_string(),
                name: name.to_string(),
                source: api_error(500),
            });
        }
        self.restarted
            .lock()
            .unwrap()
            .push(format!("{}/{}", namespace, name));
        Ok(())
    }
}

/// [`VersionProbe`] reporting fixed versions that tests can change between passes
pub struct StaticVersionProbe {
    versions: Mutex<(CephVersion, CephVersion)>,
}

impl StaticVersionProbe {
    pub fn new(running: CephVersion, desired: CephVersion) -> Self {
        Self {
            versions: Mutex::new((running, desired)),
        }
    }

    pub fn set(&self, running: CephVersion, desired: CephVersion) {
        *self.versions.lock().unwrap() = (running, desired);
    }
}

#[async_trait]
impl VersionProbe for StaticVersionProbe {
    async fn current_and_desired(
        &self,
        _cluster: &CephCluster,
        _cancel: &CancellationToken,
    ) -> Result<(CephVersion, CephVersion)> {
        Ok(*self.versions.lock().unwrap())
    }
}

/// [`DependentsLister`] returning a fixed list until cleared
pub struct StaticDependents {
    list: Mutex<DependentList>,
}

impl StaticDependents {
    pub fn new(entries: &[(&str, &str)]) -> Self {
        let mut list = DependentList::new();
        for (kind, name) in entries {
            list.add(kind, name);
        }
        Self {
            list: Mutex::new(list),
        }
    }

    pub fn clear(&self) {
        *self.list.lock().unwrap() = DependentList::new();
    }
}

#[async_trait]
impl DependentsLister for StaticDependents {
    async fn dependents(&self, _fs: &CephFilesystem, _cancel: &CancellationToken) -> Result<DependentList> {
        Ok(self.list.lock().unwrap().clone())
    }
}
