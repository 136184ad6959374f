// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Ceph release versions and the cluster version probe.

use crate::ceph::exec::CommandExecutor;
use crate::cancel::guarded;
use crate::error::{OperatorError, Result};
use crate::types::CephCluster;
use async_trait::async_trait;
use kube::ResourceExt;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CephVersion {
    pub major: u32,
    pub minor: u32,
    pub extra: u32,
    pub build: u32,
}

/// First release able to rotate daemon keys in place
pub const KEY_ROTATION_MINIMUM: CephVersion = CephVersion::new(20, 2, 0);

impl CephVersion {
    pub const fn new(major: u32, minor: u32, extra: u32) -> Self {
        Self {
            major,
            minor,
            extra,
            build: 0,
        }
    }

    /// Parse "19.2.1", "20.2.0-0" or a full "ceph version 19.2.1 (...) squid (stable)"
    pub fn parse(raw: &str) -> Result<Self> {
        let invalid = || OperatorError::InvalidVersion(raw.to_string());
        let trimmed = raw.trim();
        let token = match trimmed.strip_prefix("ceph version ") {
            Some(rest) => rest.split_whitespace().next().ok_or_else(invalid)?,
            None => trimmed,
        };

        let (release, build) = match token.split_once('-') {
            Some((release, build)) => (release, Some(build)),
            None => (token, None),
        };
        let parts: Vec<u32> = release
            .split('.')
            .map(|p| p.parse().map_err(|_| invalid()))
            .collect::<Result<_>>()?;
        let [major, minor, extra] = parts[..] else {
            return Err(invalid());
        };
        let build = match build {
            // Distro builds carry suffixes like "0.el9"; only the leading number counts
            Some(b) => b
                .split(|c: char| !c.is_ascii_digit())
                .next()
                .unwrap_or_default()
                .parse()
                .unwrap_or(0),
            None => 0,
        };

        Ok(Self {
            major,
            minor,
            extra,
            build,
        })
    }

    pub fn is_at_least(&self, other: &CephVersion) -> bool {
        (self.major, self.minor, self.extra) >= (other.major, other.minor, other.extra)
    }
}

impl fmt::Display for CephVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}-{}", self.major, self.minor, self.extra, self.build)
    }
}

/// Key rotation needs both the running and the target release to support it
pub fn supports_key_rotation(running: &CephVersion, desired: &CephVersion) -> bool {
    running.is_at_least(&KEY_ROTATION_MINIMUM) && desired.is_at_least(&KEY_ROTATION_MINIMUM)
}

/// Lowest release reported by `ceph versions`. Uses the "overall" section
/// when present, otherwise every daemon section.
pub fn lowest_running_version(output: &str) -> Result<CephVersion> {
    let sections: BTreeMap<String, BTreeMap<String, u64>> = serde_json::from_str(output)
        .map_err(|e| OperatorError::command_failed(&["versions".to_string()], format!("unparsable output: {}", e)))?;

    let descriptions: Vec<&String> = match sections.get("overall") {
        Some(overall) => overall.keys().collect(),
        None => sections.values().flat_map(|s| s.keys()).collect(),
    };

    descriptions
        .into_iter()
        .map(|d| CephVersion::parse(d))
        .collect::<Result<Vec<_>>>()?
        .into_iter()
        .min()
        .ok_or_else(|| OperatorError::InvalidVersion("no daemons reported a version".to_string()))
}

/// Reports the running and the desired Ceph release of a cluster
#[async_trait]
pub trait VersionProbe: Send + Sync {
    async fn current_and_desired(
        &self,
        cluster: &CephCluster,
        cancel: &CancellationToken,
    ) -> Result<(CephVersion, CephVersion)>;
}

/// [`VersionProbe`] asking the cluster via `ceph versions`; the desired
/// release comes from the cluster status and falls back to the running one.
pub struct CephVersionProbe {
    executor: Arc<dyn CommandExecutor>,
}

impl CephVersionProbe {
    pub fn new(executor: Arc<dyn CommandExecutor>) -> Self {
        Self { executor }
    }
}

#[async_trait]
impl VersionProbe for CephVersionProbe {
    async fn current_and_desired(
        &self,
        cluster: &CephCluster,
        cancel: &CancellationToken,
    ) -> Result<(CephVersion, CephVersion)> {
        let namespace = cluster.namespace().unwrap_or_default();
        let output = guarded(
            cancel,
            self.executor.execute(&namespace, &["versions".to_string()]),
        )
        .await?;
        let running = lowest_running_version(&output)?;
        let desired = match cluster.desired_version() {
            Some(v) => CephVersion::parse(v)?,
            None => running,
        };
        debug!("Cluster {} runs {} and targets {}", namespace, running, desired);
        Ok((running, desired))
    }
}
