// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use crate::csi::placement::Placement;
use crate::csi::resources::{parse_allocation_rows, AllocationTable};
use anyhow::{Context, Result};
use std::env;
use std::str::FromStr;

/// Allocation table keys, one per plugin kind and driver
pub mod allocation_keys {
    pub const RBD_PROVISIONER: &str = "CSI_RBD_PROVISIONER_RESOURCE";
    pub const RBD_PLUGIN: &str = "CSI_RBD_PLUGIN_RESOURCE";
    pub const CEPHFS_PROVISIONER: &str = "CSI_CEPHFS_PROVISIONER_RESOURCE";
    pub const CEPHFS_PLUGIN: &str = "CSI_CEPHFS_PLUGIN_RESOURCE";
    pub const NFS_PROVISIONER: &str = "CSI_NFS_PROVISIONER_RESOURCE";
    pub const NFS_PLUGIN: &str = "CSI_NFS_PLUGIN_RESOURCE";

    pub const ALL: [&str; 6] = [
        RBD_PROVISIONER,
        RBD_PLUGIN,
        CEPHFS_PROVISIONER,
        CEPHFS_PLUGIN,
        NFS_PROVISIONER,
        NFS_PLUGIN,
    ];
}

/// Placement environment keys
pub mod placement_keys {
    pub const PLUGIN_NODE_AFFINITY: &str = "CSI_PLUGIN_NODE_AFFINITY";
    pub const PLUGIN_TOLERATIONS: &str = "CSI_PLUGIN_TOLERATIONS";
    pub const PROVISIONER_NODE_AFFINITY: &str = "CSI_PROVISIONER_NODE_AFFINITY";
    pub const PROVISIONER_TOLERATIONS: &str = "CSI_PROVISIONER_TOLERATIONS";
}

/// Node plugin DaemonSet update strategy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PluginUpdateStrategy {
    #[default]
    RollingUpdate,
    OnDelete,
}

impl PluginUpdateStrategy {
    /// Anything but "OnDelete" means rolling updates
    pub fn parse(value: &str) -> Self {
        if value == "OnDelete" {
            PluginUpdateStrategy::OnDelete
        } else {
            PluginUpdateStrategy::RollingUpdate
        }
    }
}

/// Container image overrides published through the image-set ConfigMap
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageOverrides {
    pub plugin: Option<String>,
    pub registrar: Option<String>,
    pub provisioner: Option<String>,
    pub attacher: Option<String>,
    pub resizer: Option<String>,
    pub snapshotter: Option<String>,
    pub addons: Option<String>,
}

/// Settings that shape the CSI driver resources
#[derive(Debug, Clone)]
pub struct CsiParams {
    pub enable_rbd: bool,
    pub enable_cephfs: bool,
    pub enable_nfs: bool,
    pub log_level: i32,
    pub enable_metadata: bool,
    pub enable_omap_generator: bool,
    pub enable_csi_addons: bool,
    /// When false the CephFS client type is auto-detected
    pub force_cephfs_kernel_client: bool,
    pub kubelet_dir_path: String,
    pub enable_plugin_selinux_host_mount: bool,
    pub plugin_priority_class_name: String,
    pub provisioner_priority_class_name: String,
    pub provisioner_replicas: i32,
    /// Comma separated node labels used as topology domains
    pub domain_labels: String,
    pub plugin_update_strategy: PluginUpdateStrategy,
    pub enable_volume_group_snapshot: bool,
    pub rbd_liveness_metrics_port: i32,
    pub cephfs_liveness_metrics_port: i32,
    pub images: ImageOverrides,
    pub allocations: AllocationTable,
    pub plugin_placement: Placement,
    pub provisioner_placement: Placement,
}

/// Operator configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// Namespace the operator and its CSI driver resources live in
    pub operator_namespace: String,
    /// Path to the ceph CLI
    pub ceph_binary: String,
    /// Directory holding per-cluster ceph config and admin keyrings
    pub ceph_config_dir: String,
    pub csi: CsiParams,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let operator_namespace = lookup("OPERATOR_NAMESPACE")
            .context("OPERATOR_NAMESPACE environment variable not set")?;

        let mut allocations = AllocationTable::new();
        for key in allocation_keys::ALL {
            if let Some(raw) = lookup(key).filter(|v| !v.trim().is_empty()) {
                let rows = parse_allocation_rows(&raw)
                    .with_context(|| format!("failed to parse {}", key))?;
                allocations.insert(key.to_string(), rows);
            }
        }

        let plugin_placement = Placement::parse(
            lookup(placement_keys::PLUGIN_NODE_AFFINITY).as_deref(),
            lookup(placement_keys::PLUGIN_TOLERATIONS).as_deref(),
        )
        .context("failed to parse CSI plugin placement")?;
        let provisioner_placement = Placement::parse(
            lookup(placement_keys::PROVISIONER_NODE_AFFINITY).as_deref(),
            lookup(placement_keys::PROVISIONER_TOLERATIONS).as_deref(),
        )
        .context("failed to parse CSI provisioner placement")?;

        let string_or = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let csi = CsiParams {
            enable_rbd: parse_or(&lookup, "ROOK_CSI_ENABLE_RBD", true)?,
            enable_cephfs: parse_or(&lookup, "ROOK_CSI_ENABLE_CEPHFS", true)?,
            enable_nfs: parse_or(&lookup, "ROOK_CSI_ENABLE_NFS", false)?,
            log_level: parse_or(&lookup, "CSI_LOG_LEVEL", 0)?,
            enable_metadata: parse_or(&lookup, "CSI_ENABLE_METADATA", false)?,
            enable_omap_generator: parse_or(&lookup, "CSI_ENABLE_OMAP_GENERATOR", false)?,
            enable_csi_addons: parse_or(&lookup, "CSI_ENABLE_CSIADDONS", false)?,
            force_cephfs_kernel_client: parse_or(&lookup, "CSI_FORCE_CEPHFS_KERNEL_CLIENT", true)?,
            kubelet_dir_path: string_or("ROOK_CSI_KUBELET_DIR_PATH", "/var/lib/kubelet"),
            enable_plugin_selinux_host_mount: parse_or(
                &lookup,
                "CSI_PLUGIN_ENABLE_SELINUX_HOST_MOUNT",
                false,
            )?,
            plugin_priority_class_name: string_or("CSI_PLUGIN_PRIORITY_CLASSNAME", ""),
            provisioner_priority_class_name: string_or("CSI_PROVISIONER_PRIORITY_CLASSNAME", ""),
            provisioner_replicas: parse_or(&lookup, "CSI_PROVISIONER_REPLICAS", 2)?,
            domain_labels: string_or("CSI_TOPOLOGY_DOMAIN_LABELS", ""),
            plugin_update_strategy: PluginUpdateStrategy::parse(&string_or(
                "CSI_RBD_PLUGIN_UPDATE_STRATEGY",
                "RollingUpdate",
            )),
            enable_volume_group_snapshot: parse_or(
                &lookup,
                "CSI_ENABLE_VOLUME_GROUP_SNAPSHOT",
                false,
            )?,
            rbd_liveness_metrics_port: parse_or(&lookup, "CSI_RBD_LIVENESS_METRICS_PORT", 9080)?,
            cephfs_liveness_metrics_port: parse_or(
                &lookup,
                "CSI_CEPHFS_LIVENESS_METRICS_PORT",
                9081,
            )?,
            images: ImageOverrides {
                plugin: lookup("ROOK_CSI_CEPH_IMAGE"),
                registrar: lookup("ROOK_CSI_REGISTRAR_IMAGE"),
                provisioner: lookup("ROOK_CSI_PROVISIONER_IMAGE"),
                attacher: lookup("ROOK_CSI_ATTACHER_IMAGE"),
                resizer: lookup("ROOK_CSI_RESIZER_IMAGE"),
                snapshotter: lookup("ROOK_CSI_SNAPSHOTTER_IMAGE"),
                addons: lookup("ROOK_CSIADDONS_IMAGE"),
            },
            allocations,
            plugin_placement,
            provisioner_placement,
        };

        Ok(Config {
            ceph_binary: string_or("ROOK_CEPH_BINARY", "ceph"),
            ceph_config_dir: string_or("ROOK_CEPH_CONFIG_DIR", "/var/lib/rook"),
            operator_namespace,
            csi,
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .with_context(|| format!("invalid value {:?} for {}", raw, key)),
        _ => Ok(default),
    }
}
