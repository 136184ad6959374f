// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! CRD availability checking utilities

use crate::constants::crd::{POLL_INTERVAL_SECS, POLL_MAX_INTERVAL_SECS};
use crate::error::Result;
use kube::{discovery::Discovery, Client};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, warn};

/// A CRD the operator cannot start without
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequiredCrd {
    pub group: &'static str,
    pub version: &'static str,
    pub kind: &'static str,
}

pub const REQUIRED_CRDS: &[RequiredCrd] = &[
    RequiredCrd {
        group: "ceph.rook.io",
        version: "v1",
        kind: "CephCluster",
    },
    RequiredCrd {
        group: "ceph.rook.io",
        version: "v1",
        kind: "CephFilesystem",
    },
    RequiredCrd {
        group: "ceph.rook.io",
        version: "v1",
        kind: "CephFilesystemSubVolumeGroup",
    },
    RequiredCrd {
        group: "csi.ceph.io",
        version: "v1",
        kind: "Driver",
    },
];

/// Wait for every CRD in `required` to become available in the cluster.
/// This uses exponential backoff starting at POLL_INTERVAL_SECS seconds.
pub async fn wait_for_crds(client: &Client, required: &[RequiredCrd]) -> Result<()> {
    let mut interval = POLL_INTERVAL_SECS;

    loop {
        match missing_crds(client, required).await {
            Ok(missing) if missing.is_empty() => {
                info!("All required CRDs are available");
                return Ok(());
            }
            Ok(missing) => {
                let names: Vec<String> = missing
                    .iter()
                    .map(|c| format!("{}.{}/{}", c.kind, c.group, c.version))
                    .collect();
                info!(
                    "CRDs {} not yet available, waiting {} seconds...",
                    names.join(", "),
                    interval
                );
            }
            Err(e) => {
                warn!(
                    "Error checking for CRDs: {}, retrying in {} seconds...",
                    e, interval
                );
            }
        }

        sleep(Duration::from_secs(interval)).await;

        // Exponential backoff with max cap
        interval = (interval * 2).min(POLL_MAX_INTERVAL_SECS);
    }
}

/// The subset of `required` that discovery does not report
async fn missing_crds(client: &Client, required: &[RequiredCrd]) -> Result<Vec<RequiredCrd>> {
    let mut groups: Vec<&str> = required.iter().map(|c| c.group).collect();
    groups.sort_unstable();
    groups.dedup();
    let discovery = Discovery::new(client.clone()).filter(&groups).run().await?;

    let available = |crd: &RequiredCrd| {
        discovery.groups().any(|group| {
            group.name() == crd.group
                && group
                    .recommended_resources()
                    .iter()
                    .any(|(ar, _)| ar.kind == crd.kind && ar.version == crd.version)
        })
    };

    Ok(required.iter().filter(|c| !available(c)).copied().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::MockService;

    fn api_groups_json() -> String {
        serde_json::json!({
            "kind": "APIGroupList",
            "apiVersion": "v1",
            "groups": [{
                "name": "ceph.rook.io",
                "versions": [{"groupVersion": "ceph.rook.io/v1", "version": "v1"}],
                "preferredVersion": {"groupVersion": "ceph.rook.io/v1", "version": "v1"}
            }]
        })
        .to_string()
    }

    fn resources_json() -> String {
        serde_json::json!({
            "kind": "APIResourceList",
            "apiVersion": "v1",
            "groupVersion": "ceph.rook.io/v1",
            "resources": [{
                "name": "cephclusters",
                "singularName": "cephcluster",
                "namespaced": true,
                "kind": "CephCluster",
                "verbs": ["get", "list", "watch"]
            }]
        })
        .to_string()
    }

    #[tokio::test]
    async fn test_missing_crds_reports_absent_kinds() {
        let client = MockService::new()
            .on_get("/apis", 200, &api_groups_json())
            .on_get("/apis/ceph.rook.io/v1", 200, &resources_json())
            .on_get(
                "/api",
                200,
                r#"{"kind":"APIVersions","versions":["v1"],"serverAddressByClientCIDRs":[]}"#,
            )
            .into_client();

        let missing = missing_crds(&client, &REQUIRED_CRDS[..2]).await.unwrap();

        assert_eq!(missing, vec![REQUIRED_CRDS[1]]);
    }
}
