// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use crate::constants::FILESYSTEM_FINALIZER;
use kube::{CustomResource, ResourceExt};
use serde::{Deserialize, Serialize};

#[derive(CustomResource, Serialize, Deserialize, Clone, Debug, Default, schemars::JsonSchema)]
#[kube(group = "ceph.rook.io", version = "v1", kind = "CephFilesystem")]
#[kube(namespaced)]
#[kube(status = "CephFilesystemStatus")]
#[serde(rename_all = "camelCase")]
pub struct FilesystemSpec {
    #[serde(default)]
    pub metadata_server: MetadataServerSpec,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct MetadataServerSpec {
    #[serde(default)]
    pub active_count: u32,
    #[serde(default)]
    pub active_standby: bool,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CephFilesystemStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase: Option<String>,
    /// Absent until the operator first tracks daemon keys
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cephx: Option<LocalCephxStatus>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct LocalCephxStatus {
    #[serde(default)]
    pub daemon: CephxStatus,
}

/// Persisted form of a daemon key's generation. All-empty means unknown.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CephxStatus {
    #[serde(default, skip_serializing_if = "is_zero")]
    pub key_generation: u32,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub key_ceph_version: String,
}

fn is_zero(v: &u32) -> bool {
    *v == 0
}

impl CephFilesystem {
    pub fn is_deleting(&self) -> bool {
        self.metadata.deletion_timestamp.is_some()
    }

    pub fn has_finalizer(&self) -> bool {
        self.finalizers().iter().any(|f| f == FILESYSTEM_FINALIZER)
    }

    /// Daemon ids for the metadata servers: "a", "b", ... one per active
    /// rank, doubled when standby-replay daemons are requested.
    pub fn mds_daemon_ids(&self) -> Vec<String> {
        let mds = &self.spec.metadata_server;
        let count = if mds.active_standby {
            mds.active_count * 2
        } else {
            mds.active_count
        };
        (0..count).map(daemon_letter).collect()
    }

    /// The cephx status block for the MDS daemons, if tracked
    pub fn daemon_cephx_status(&self) -> Option<&CephxStatus> {
        self.status
            .as_ref()
            .and_then(|s| s.cephx.as_ref())
            .map(|c| &c.daemon)
    }
}

/// Spreadsheet-style letters: 0 -> "a", 25 -> "z", 26 -> "aa"
fn daemon_letter(mut index: u32) -> String {
    let mut out = Vec::new();
    loop {
        out.push(b'a' + (index % 26) as u8);
        if index < 26 {
            break;
        }
        index = index / 26 - 1;
    }
    out.reverse();
    String::from_utf8_lossy(&out).into_owned()
}

#[derive(CustomResource, Serialize, Deserialize, Clone, Debug, Default, schemars::JsonSchema)]
#[kube(
    group = "ceph.rook.io",
    version = "v1",
    kind = "CephFilesystemSubVolumeGroup"
)]
#[kube(namespaced)]
#[serde(rename_all = "camelCase")]
pub struct SubVolumeGroupSpec {
    pub filesystem_name: String,
}
