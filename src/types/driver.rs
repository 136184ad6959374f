// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! The csi-operator `Driver` resource, limited to the fields this operator sets.

use k8s_openapi::api::apps::v1::DaemonSetUpdateStrategy;
use k8s_openapi::api::core::v1::{Affinity, LocalObjectReference, ResourceRequirements, Toleration};
use kube::CustomResource;
use serde::{Deserialize, Serialize};

#[derive(CustomResource, Serialize, Deserialize, Clone, Debug, Default, PartialEq, schemars::JsonSchema)]
#[kube(group = "csi.ceph.io", version = "v1", kind = "Driver")]
#[kube(namespaced)]
#[kube(derive = "PartialEq")]
#[serde(rename_all = "camelCase")]
pub struct DriverSpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log: Option<LogSpec>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_set: Option<LocalObjectReference>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cluster_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enable_metadata: Option<bool>,
    #[serde(rename = "generateOMapInfo", skip_serializing_if = "Option::is_none")]
    pub generate_omap_info: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fs_group_policy: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node_plugin: Option<NodePluginSpec>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub controller_plugin: Option<ControllerPluginSpec>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub liveness: Option<LivenessSpec>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deploy_csi_addons: Option<bool>,
    #[serde(rename = "cephFsClientType", skip_serializing_if = "Option::is_none")]
    pub cephfs_client_type: Option<CephFsClientType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snapshot_policy: Option<SnapshotPolicy>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct LogSpec {
    pub verbosity: i32,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct LivenessSpec {
    pub metrics_port: i32,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, schemars::JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum CephFsClientType {
    Kernel,
    #[serde(rename = "autodetect")]
    AutoDetect,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, schemars::JsonSchema)]
pub enum SnapshotPolicy {
    #[serde(rename = "none")]
    None,
    #[serde(rename = "volumeGroupSnapshot")]
    VolumeGroupSnapshot,
}

/// Scheduling fields shared by the node and controller plugins
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PodCommonSpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority_class_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub affinity: Option<Affinity>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tolerations: Option<Vec<Toleration>>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct NodePluginSpec {
    #[serde(flatten)]
    pub pod_common: PodCommonSpec,
    #[serde(default)]
    pub resources: NodePluginResourcesSpec,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kubelet_dir_path: Option<String>,
    #[serde(rename = "enableSeLinuxHostMount", skip_serializing_if = "Option::is_none")]
    pub enable_selinux_host_mount: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub update_strategy: Option<DaemonSetUpdateStrategy>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topology: Option<TopologySpec>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ControllerPluginSpec {
    #[serde(flatten)]
    pub pod_common: PodCommonSpec,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replicas: Option<i32>,
    #[serde(default)]
    pub resources: ControllerPluginResourcesSpec,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TopologySpec {
    pub domain_labels: Vec<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ControllerPluginResourcesSpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provisioner: Option<ResourceRequirements>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resizer: Option<ResourceRequirements>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snapshotter: Option<ResourceRequirements>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attacher: Option<ResourceRequirements>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plugin: Option<ResourceRequirements>,
    #[serde(rename = "omapGenerator", skip_serializing_if = "Option::is_none")]
    pub omap_generator: Option<ResourceRequirements>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub liveness: Option<ResourceRequirements>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub addons: Option<ResourceRequirements>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct NodePluginResourcesSpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registrar: Option<ResourceRequirements>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plugin: Option<ResourceRequirements>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub liveness: Option<ResourceRequirements>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub addons: Option<ResourceRequirements>,
}
