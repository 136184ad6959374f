// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Access to the remote object store behind a small trait, so reconcile
//! passes can be exercised against an in-memory store.

use crate::constants::OPERATOR_NAME;
use crate::types::Driver;
use async_trait::async_trait;
use k8s_openapi::api::core::v1::ConfigMap;
use k8s_openapi::NamespaceResourceScope;
use kube::{
    api::{ListParams, Patch, PatchParams, PostParams},
    Api, Client, Resource, ResourceExt,
};
use serde::{de::DeserializeOwned, Serialize};
use std::collections::BTreeMap;
use std::fmt::Debug;
use std::sync::Arc;

/// Get/create/update access to objects of one kind in one scope.
///
/// `get` maps a 404 to `Ok(None)`; every other failure is an error.
#[async_trait]
pub trait ObjectStore<K: Send + Sync>: Send + Sync {
    async fn get(&self, name: &str) -> Result<Option<K>, kube::Error>;
    async fn list(&self) -> Result<Vec<K>, kube::Error>;
    async fn create(&self, obj: &K) -> Result<K, kube::Error>;
    /// Full replace, guarded by the object's resourceVersion
    async fn update(&self, obj: &K) -> Result<K, kube::Error>;
    /// Write the status subresource
    async fn update_status(&self, obj: &K) -> Result<K, kube::Error>;
}

/// Objects whose desired-state payload can be swapped independently of
/// identity and server-managed metadata.
pub trait HasSpec {
    type Spec: Clone;

    fn spec(&self) -> &Self::Spec;
    fn set_spec(&mut self, spec: Self::Spec);
}

impl HasSpec for Driver {
    type Spec = crate::types::DriverSpec;

    fn spec(&self) -> &Self::Spec {
        &self.spec
    }

    fn set_spec(&mut self, spec: Self::Spec) {
        self.spec = spec;
    }
}

impl HasSpec for ConfigMap {
    type Spec = Option<BTreeMap<String, String>>;

    fn spec(&self) -> &Self::Spec {
        &self.data
    }

    fn set_spec(&mut self, spec: Self::Spec) {
        self.data = spec;
    }
}

/// Hands out an [`ObjectStore`] for one namespace
pub trait StoreFactory<K: Send + Sync>: Send + Sync {
    fn in_namespace(&self, namespace: &str) -> Arc<dyn ObjectStore<K>>;
}

/// [`StoreFactory`] building namespaced [`KubeStore`]s from a shared client
pub struct KubeStoreFactory {
    client: Client,
}

impl KubeStoreFactory {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

impl<K> StoreFactory<K> for KubeStoreFactory
where
    K: Resource<Scope = NamespaceResourceScope>
        + Clone
        + Debug
        + Serialize
        + DeserializeOwned
        + Send
        + Sync
        + 'static,
    K::DynamicType: Default,
{
    fn in_namespace(&self, namespace: &str) -> Arc<dyn ObjectStore<K>> {
        Arc::new(KubeStore::new(Api::namespaced(self.client.clone(), namespace)))
    }
}

/// [`ObjectStore`] backed by a kube [`Api`]
pub struct KubeStore<K> {
    api: Api<K>,
}

impl<K> KubeStore<K> {
    pub fn new(api: Api<K>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl<K> ObjectStore<K> for KubeStore<K>
where
    K: Resource + Clone + Debug + Serialize + DeserializeOwned + Send + Sync + 'static,
    K::DynamicType: Default,
{
    async fn get(&self, name: &str) -> Result<Option<K>, kube::Error> {
        self.api.get_opt(name).await
    }

    async fn list(&self) -> Result<Vec<K>, kube::Error> {
        Ok(self.api.list(&ListParams::default()).await?.items)
    }

    async fn create(&self, obj: &K) -> Result<K, kube::Error> {
        self.api.create(&PostParams::default(), obj).await
    }

    async fn update(&self, obj: &K) -> Result<K, kube::Error> {
        self.api
            .replace(&obj.name_any(), &PostParams::default(), obj)
            .await
    }

    async fn update_status(&self, obj: &K) -> Result<K, kube::Error> {
        let dt = K::DynamicType::default();
        let status = serde_json::to_value(obj)
            .map_err(kube::Error::SerdeError)?
            .get("status")
            .cloned()
            .unwrap_or_default();
        let patch = serde_json::json!({
            "apiVersion": K::api_version(&dt),
            "kind": K::kind(&dt),
            "status": status,
        });
        let pp = PatchParams::apply(OPERATOR_NAME).force();
        self.api
            .patch_status(&obj.name_any(), &pp, &Patch::Apply(&patch))
            .await
    }
}
