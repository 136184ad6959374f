// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Running ceph CLI commands against a cluster.

use crate::error::{OperatorError, Result};
use async_trait::async_trait;
use std::path::PathBuf;
use tokio::process::Command;
use tracing::{debug, instrument};

/// Executes a ceph command for the cluster in `cluster_namespace` and returns
/// its JSON output.
#[async_trait]
pub trait CommandExecutor: Send + Sync {
    async fn execute(&self, cluster_namespace: &str, args: &[String]) -> Result<String>;
}

/// [`CommandExecutor`] shelling out to the ceph binary with the admin keyring
/// the operator keeps per cluster.
pub struct CephCli {
    binary: String,
    config_dir: PathBuf,
}

impl CephCli {
    pub fn new(binary: impl Into<String>, config_dir: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            config_dir: config_dir.into(),
        }
    }

    fn connection_args(&self, cluster_namespace: &str) -> Vec<String> {
        let dir = self.config_dir.join(cluster_namespace);
        vec![
            "--format".to_string(),
            "json".to_string(),
            format!("--cluster={}", cluster_namespace),
            format!(
                "--conf={}",
                dir.join(format!("{}.config", cluster_namespace)).display()
            ),
            "--name=client.admin".to_string(),
            format!("--keyring={}", dir.join("client.admin.keyring").display()),
        ]
    }
}

#[async_trait]
impl CommandExecutor for CephCli {
    #[instrument(skip(self))]
    async fn execute(&self, cluster_namespace: &str, args: &[String]) -> Result<String> {
        let output = Command::new(&self.binary)
            .args(args)
            .args(self.connection_args(cluster_namespace))
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| OperatorError::command_failed(args, format!("failed to start: {}", e)))?;

        if !output.status.success() {
            return Err(OperatorError::command_failed(
                args,
                format!(
                    "{}: {}",
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            ));
        }

        debug!("ceph {} succeeded", args.join(" "));
        String::from_utf8(output.stdout)
            .map_err(|e| OperatorError::command_failed(args, format!("non-utf8 output: {}", e)))
    }
}
