// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! CSI driver reconciler - watches CephClusters and keeps the csi-operator
//! `Driver` resources and their image set in line with operator settings.

use crate::config::Config;
use crate::constants::{requeue, IMAGE_SET_CONFIGMAP};
use crate::csi::{build_driver, build_image_set, DriverInputs, DriverVariant};
use crate::error::{OperatorError, Result};
use crate::reconcile::{transfer_ownership, upsert};
use crate::reconcilers::PassOutcome;
use crate::store::{KubeStore, ObjectStore};
use crate::types::{CephCluster, Driver};
use futures::StreamExt;
use k8s_openapi::api::core::v1::ConfigMap;
use k8s_openapi::api::storage::v1::CSIDriver;
use kube::{
    runtime::{controller::Action, Controller},
    Api, Client, ResourceExt,
};
use kube_runtime::watcher::Config as WatcherConfig;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

pub struct CsiDriverReconciler {
    config: Config,
    image_sets: Arc<dyn ObjectStore<ConfigMap>>,
    drivers: Arc<dyn ObjectStore<Driver>>,
    csi_drivers: Arc<dyn ObjectStore<CSIDriver>>,
    cancel: CancellationToken,
}

impl CsiDriverReconciler {
    pub fn new(
        config: Config,
        image_sets: Arc<dyn ObjectStore<ConfigMap>>,
        drivers: Arc<dyn ObjectStore<Driver>>,
        csi_drivers: Arc<dyn ObjectStore<CSIDriver>>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            config,
            image_sets,
            drivers,
            csi_drivers,
            cancel,
        }
    }

    pub fn from_client(client: Client, config: Config, cancel: CancellationToken) -> Self {
        let namespace = config.operator_namespace.clone();
        Self::new(
            config,
            Arc::new(KubeStore::new(Api::namespaced(client.clone(), &namespace))),
            Arc::new(KubeStore::new(Api::namespaced(client.clone(), &namespace))),
            Arc::new(KubeStore::new(Api::all(client))),
            cancel,
        )
    }

    pub async fn run(self, client: Client) -> anyhow::Result<()> {
        let clusters: Api<CephCluster> = Api::all(client);
        let shutdown = self.cancel.clone().cancelled_owned();
        let context = Arc::new(self);

        Controller::new(clusters, WatcherConfig::default())
            .graceful_shutdown_on(shutdown)
            .run(reconcile, error_policy, context)
            .for_each(|res| async move {
                match res {
                    Ok(o) => debug!("Reconciled cluster: {:?}", o),
                    Err(e) => warn!("Reconciliation error: {:?}", e),
                }
            })
            .await;

        Ok(())
    }

    #[instrument(skip_all, fields(cluster = %cluster.name_any()))]
    pub async fn reconcile_pass(&self, cluster: &CephCluster, cancel: &CancellationToken) -> Result<PassOutcome> {
        if !cluster.is_ready() {
            debug!("CephCluster {} is not ready, skipping CSI drivers", cluster.name_any());
            return Ok(PassOutcome::Requeue(Duration::from_secs(requeue::WAIT_FOR_CLUSTER_SECS)));
        }

        let namespace = &self.config.operator_namespace;
        upsert(
            self.image_sets.as_ref(),
            &build_image_set(namespace, &self.config.csi.images),
            cancel,
        )
        .await?;

        let cluster_name = cluster.name_any();
        let inputs = DriverInputs {
            cluster_name: &cluster_name,
            operator_namespace: namespace,
            image_set_name: IMAGE_SET_CONFIGMAP,
            params: &self.config.csi,
        };
        for variant in DriverVariant::ALL {
            if variant.is_enabled(&self.config.csi) {
                self.reconcile_variant(variant, &inputs, cancel).await?;
            }
        }

        info!("CSI drivers reconciled for cluster {}", cluster.name_any());
        Ok(PassOutcome::Done)
    }

    #[instrument(skip(self, inputs, cancel))]
    async fn reconcile_variant(
        &self,
        variant: DriverVariant,
        inputs: &DriverInputs<'_>,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let name = variant.driver_name(inputs.operator_namespace);
        // CSIDrivers from an older deployment are handed over to the csi-operator
        transfer_ownership(self.csi_drivers.as_ref(), &name, inputs.operator_namespace, cancel)
            .await
            .inspect_err(|e| error!("Failed to transfer {} CSIDriver ownership: {}", variant, e))?;
        upsert(self.drivers.as_ref(), &build_driver(variant, inputs), cancel)
            .await
            .inspect_err(|e| error!("Failed to reconcile {} driver: {}", variant, e))?;
        Ok(())
    }
}

async fn reconcile(cluster: Arc<CephCluster>, ctx: Arc<CsiDriverReconciler>) -> Result<Action> {
    let cancel = ctx.cancel.child_token();
    let pass = ctx.reconcile_pass(&cluster, &cancel);
    match tokio::time::timeout(Duration::from_secs(requeue::PASS_TIMEOUT_SECS), pass).await {
        Ok(outcome) => Ok(outcome?.into_action()),
        Err(_) => {
            cancel.cancel();
            Err(OperatorError::Cancelled)
        }
    }
}

fn error_policy(
    _cluster: Arc<CephCluster>,
    error: &OperatorError,
    _ctx: Arc<CsiDriverReconciler>,
) -> Action {
    error!("Reconciliation error: {}", error);
    Action::requeue(Duration::from_secs(requeue::ERROR_SECS))
}
