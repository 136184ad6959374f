// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use anyhow::{Context, Result};
use kube::Client;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use ceph_operator::config::Config;
use ceph_operator::kubernetes::crd::REQUIRED_CRDS;
use ceph_operator::kubernetes::wait_for_crds;
use ceph_operator::reconcilers::{CsiDriverReconciler, FilesystemReconciler};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Starting Ceph operator");

    // Load configuration
    let config = Config::from_env()?;
    info!(
        "Configuration loaded: operator_namespace={}",
        config.operator_namespace
    );

    // Create Kubernetes client
    let client = Client::try_default()
        .await
        .context("failed to create Kubernetes client")?;
    info!("Connected to Kubernetes cluster");

    info!("Waiting for Ceph CRDs to become available...");
    wait_for_crds(&client, REQUIRED_CRDS).await?;

    let cancel = CancellationToken::new();
    let shutdown = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Shutdown requested, cancelling in-flight passes");
        }
        shutdown.cancel();
    });

    let filesystem_reconciler = FilesystemReconciler::from_client(client.clone(), &config, cancel.clone());
    let csi_reconciler = CsiDriverReconciler::from_client(client.clone(), config, cancel);

    info!("Starting reconcilers...");

    tokio::try_join!(
        filesystem_reconciler.run(client.clone()),
        csi_reconciler.run(client)
    )?;

    warn!("All reconcilers stopped");
    Ok(())
}
