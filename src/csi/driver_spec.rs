// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Translation of operator settings into csi-operator `Driver` resources.
//!
//! Building is pure: the same inputs always give the same object, which is
//! what makes overwriting the spec on every pass safe.

use crate::config::{allocation_keys, CsiParams, PluginUpdateStrategy};
use crate::constants::drivers;
use crate::csi::resources::{controller_plugin_resources, node_plugin_resources, ContainerResource};
use crate::types::driver::{
    CephFsClientType, ControllerPluginSpec, Driver, DriverSpec, LivenessSpec, LogSpec,
    NodePluginSpec, PodCommonSpec, SnapshotPolicy, TopologySpec,
};
use k8s_openapi::api::apps::v1::DaemonSetUpdateStrategy;
use k8s_openapi::api::core::v1::LocalObjectReference;
use kube::api::ObjectMeta;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverVariant {
    Rbd,
    CephFs,
    Nfs,
}

impl DriverVariant {
    pub const ALL: [DriverVariant; 3] = [DriverVariant::Rbd, DriverVariant::CephFs, DriverVariant::Nfs];

    /// Name shared by the `Driver` resource and the `CSIDriver` it manages
    pub fn driver_name(&self, operator_namespace: &str) -> String {
        let suffix = match self {
            DriverVariant::Rbd => drivers::RBD_SUFFIX,
            DriverVariant::CephFs => drivers::CEPHFS_SUFFIX,
            DriverVariant::Nfs => drivers::NFS_SUFFIX,
        };
        format!("{}.{}", operator_namespace, suffix)
    }

    pub fn is_enabled(&self, params: &CsiParams) -> bool {
        match self {
            DriverVariant::Rbd => params.enable_rbd,
            DriverVariant::CephFs => params.enable_cephfs,
            DriverVariant::Nfs => params.enable_nfs,
        }
    }

    fn controller_allocation_key(&self) -> &'static str {
        match self {
            DriverVariant::Rbd => allocation_keys::RBD_PROVISIONER,
            DriverVariant::CephFs => allocation_keys::CEPHFS_PROVISIONER,
            DriverVariant::Nfs => allocation_keys::NFS_PROVISIONER,
        }
    }

    fn node_allocation_key(&self) -> &'static str {
        match self {
            DriverVariant::Rbd => allocation_keys::RBD_PLUGIN,
            DriverVariant::CephFs => allocation_keys::CEPHFS_PLUGIN,
            DriverVariant::Nfs => allocation_keys::NFS_PLUGIN,
        }
    }

    fn liveness_port(&self, params: &CsiParams) -> Option<i32> {
        match self {
            DriverVariant::Rbd => Some(params.rbd_liveness_metrics_port),
            DriverVariant::CephFs => Some(params.cephfs_liveness_metrics_port),
            DriverVariant::Nfs => None,
        }
    }
}

impl fmt::Display for DriverVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DriverVariant::Rbd => write!(f, "RBD"),
            DriverVariant::CephFs => write!(f, "CephFS"),
            DriverVariant::Nfs => write!(f, "NFS"),
        }
    }
}

/// Everything a driver resource is derived from
#[derive(Debug, Clone, Copy)]
pub struct DriverInputs<'a> {
    pub cluster_name: &'a str,
    pub operator_namespace: &'a str,
    pub image_set_name: &'a str,
    pub params: &'a CsiParams,
}

pub fn build_driver(variant: DriverVariant, inputs: &DriverInputs<'_>) -> Driver {
    Driver {
        metadata: ObjectMeta {
            name: Some(variant.driver_name(inputs.operator_namespace)),
            namespace: Some(inputs.operator_namespace.to_string()),
            ..Default::default()
        },
        spec: build_driver_spec(variant, inputs),
    }
}

pub fn build_driver_spec(variant: DriverVariant, inputs: &DriverInputs<'_>) -> DriverSpec {
    let params = inputs.params;

    let cephfs_client_type = if params.force_cephfs_kernel_client {
        CephFsClientType::Kernel
    } else {
        CephFsClientType::AutoDetect
    };

    let snapshot_policy = (variant == DriverVariant::CephFs).then_some(
        if params.enable_volume_group_snapshot {
            SnapshotPolicy::VolumeGroupSnapshot
        } else {
            SnapshotPolicy::None
        },
    );

    DriverSpec {
        log: Some(LogSpec {
            verbosity: params.log_level,
        }),
        image_set: Some(LocalObjectReference {
            name: inputs.image_set_name.to_string(),
        }),
        cluster_name: Some(inputs.cluster_name.to_string()),
        enable_metadata: Some(params.enable_metadata),
        generate_omap_info: Some(params.enable_omap_generator),
        fs_group_policy: Some("File".to_string()),
        node_plugin: Some(NodePluginSpec {
            pod_common: PodCommonSpec {
                priority_class_name: non_empty(&params.plugin_priority_class_name),
                affinity: params.plugin_placement.affinity(),
                tolerations: params.plugin_placement.tolerations(),
            },
            resources: node_plugin_resources(allocation_rows(params, variant.node_allocation_key())),
            kubelet_dir_path: Some(params.kubelet_dir_path.clone()),
            enable_selinux_host_mount: Some(params.enable_plugin_selinux_host_mount),
            update_strategy: Some(update_strategy(params.plugin_update_strategy)),
            topology: topology(&params.domain_labels),
        }),
        controller_plugin: Some(ControllerPluginSpec {
            pod_common: PodCommonSpec {
                priority_class_name: non_empty(&params.provisioner_priority_class_name),
                affinity: params.provisioner_placement.affinity(),
                tolerations: params.provisioner_placement.tolerations(),
            },
            replicas: Some(params.provisioner_replicas),
            resources: controller_plugin_resources(allocation_rows(
                params,
                variant.controller_allocation_key(),
            )),
        }),
        liveness: variant
            .liveness_port(params)
            .map(|metrics_port| LivenessSpec { metrics_port }),
        deploy_csi_addons: Some(params.enable_csi_addons),
        cephfs_client_type: Some(cephfs_client_type),
        snapshot_policy,
    }
}

fn allocation_rows<'a>(params: &'a CsiParams, key: &str) -> &'a [ContainerResource] {
    params
        .allocations
        .get(key)
        .map(Vec::as_slice)
        .unwrap_or_default()
}

fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}

fn update_strategy(strategy: PluginUpdateStrategy) -> DaemonSetUpdateStrategy {
    let type_ = match strategy {
        PluginUpdateStrategy::RollingUpdate => "RollingUpdate",
        PluginUpdateStrategy::OnDelete => "OnDelete",
    };
    DaemonSetUpdateStrategy {
        type_: Some(type_.to_string()),
        rolling_update: None,
    }
}

/// Labels are taken verbatim from the comma separated list; an unset list
/// means no topology constraint at all
fn topology(domain_labels: &str) -> Option<TopologySpec> {
    (!domain_labels.is_empty()).then(|| TopologySpec {
        domain_labels: domain_labels.split(',').map(String::from).collect(),
    })
}
