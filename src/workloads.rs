// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Restarting daemon workloads so they pick up new key material.

use crate::constants::annotations::RESTARTED_AT;
use crate::error::Result;
use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use k8s_openapi::api::apps::v1::Deployment;
use kube::api::{Patch, PatchParams};
use kube::{Api, Client};
use tracing::{debug, info, instrument};

#[async_trait]
pub trait WorkloadRestarter: Send + Sync {
    async fn restart(&self, namespace: &str, name: &str) -> Result<()>;
}

/// Triggers a rolling restart by stamping the pod template, the same way
/// `kubectl rollout restart` does.
pub struct DeploymentRestarter {
    client: Client,
}

impl DeploymentRestarter {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

pub(crate) fn restart_patch(timestamp: &str) -> serde_json::Value {
    serde_json::json!({
        "spec": {
            "template": {
                "metadata": {
                    "annotations": { RESTARTED_AT: timestamp }
                }
            }
        }
    })
}

#[async_trait]
impl WorkloadRestarter for DeploymentRestarter {
    #[instrument(skip(self))]
    async fn restart(&self, namespace: &str, name: &str) -> Result<()> {
        let api: Api<Deployment> = Api::namespaced(self.client.clone(), namespace);
        let now = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);
        let patch = restart_patch(&now);

        match api
            .patch(name, &PatchParams::default(), &Patch::Merge(&patch))
            .await
        {
            Ok(_) => {
                info!("Restarted deployment {}/{}", namespace, name);
                Ok(())
            }
            Err(kube::Error::Api(e)) if e.code == 404 => {
                // Not deployed yet; it starts with the current key
                debug!("Deployment {}/{} not found, nothing to restart", namespace, name);
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}
