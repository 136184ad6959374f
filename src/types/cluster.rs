// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use kube::CustomResource;
use serde::{Deserialize, Serialize};

#[derive(CustomResource, Serialize, Deserialize, Clone, Debug, Default, schemars::JsonSchema)]
#[kube(group = "ceph.rook.io", version = "v1", kind = "CephCluster")]
#[kube(namespaced)]
#[kube(status = "CephClusterStatus")]
#[serde(rename_all = "camelCase")]
pub struct CephClusterSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ceph_version: Option<CephVersionSpec>,
    #[serde(default)]
    pub security: SecuritySpec,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CephVersionSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SecuritySpec {
    #[serde(default)]
    pub cephx: ClusterCephxConfig,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClusterCephxConfig {
    /// Rotation settings for daemon keys
    #[serde(default)]
    pub daemon: CephxConfig,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CephxConfig {
    #[serde(default)]
    pub key_rotation_policy: KeyRotationPolicy,
    /// Desired key generation, only honoured with the `KeyGeneration` policy
    #[serde(default)]
    pub key_generation: u32,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq, schemars::JsonSchema)]
pub enum KeyRotationPolicy {
    #[default]
    #[serde(rename = "")]
    Unset,
    Disabled,
    KeyGeneration,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CephClusterStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ceph: Option<CephHealth>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<ClusterVersion>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CephHealth {
    #[serde(default)]
    pub health: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClusterVersion {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    /// Version the cluster is being moved to, e.g. "20.2.0-0"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

impl CephCluster {
    /// Check if the cluster reports the Ready phase
    pub fn is_ready(&self) -> bool {
        self.status
            .as_ref()
            .and_then(|s| s.phase.as_deref())
            .is_some_and(|p| p == "Ready")
    }

    /// The daemon key rotation settings from the cluster spec
    pub fn daemon_cephx(&self) -> &CephxConfig {
        &self.spec.security.cephx.daemon
    }

    /// The desired version recorded in status, if the cluster reported one
    pub fn desired_version(&self) -> Option<&str> {
        self.status
            .as_ref()
            .and_then(|s| s.version.as_ref())
            .and_then(|v| v.version.as_deref())
    }
}
