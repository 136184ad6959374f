// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Filesystem reconciler - keeps MDS daemon keys current and guards deletion
//! of CephFilesystems that still have dependents.

use crate::cancel::guarded;
use crate::ceph::auth::MDS_CAPS;
use crate::ceph::{CephCli, CephVersionProbe, CommandExecutor, VersionProbe};
use crate::cephx::keyring::keyring_secret_name;
use crate::cephx::{apply_plan, plan, CredentialState, DaemonKey, KeyAction, KeyContext, RotationPolicy};
use crate::config::Config;
use crate::constants::{requeue, FILESYSTEM_FINALIZER};
use crate::dependents::{deletion_allowed, DependentsLister, SubVolumeGroupLister};
use crate::error::{OperatorError, Result};
use crate::events::{reasons, EventSink, KubeEventSink};
use crate::reconcilers::PassOutcome;
use crate::store::{KubeStoreFactory, ObjectStore, StoreFactory};
use crate::types::filesystem::LocalCephxStatus;
use crate::types::{CephCluster, CephFilesystem};
use crate::workloads::{DeploymentRestarter, WorkloadRestarter};
use futures::StreamExt;
use k8s_openapi::api::core::v1::Secret;
use kube::runtime::events::EventType;
use kube::{
    runtime::{controller::Action, reflector::ObjectRef, watcher, Controller},
    Api, Client, Resource, ResourceExt,
};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

/// Everything the filesystem reconciler talks to
#[derive(Clone)]
pub struct FilesystemCollaborators {
    pub filesystems: Arc<dyn StoreFactory<CephFilesystem>>,
    pub clusters: Arc<dyn StoreFactory<CephCluster>>,
    pub secrets: Arc<dyn StoreFactory<Secret>>,
    pub executor: Arc<dyn CommandExecutor>,
    pub versions: Arc<dyn VersionProbe>,
    pub dependents: Arc<dyn DependentsLister>,
    pub events: Arc<dyn EventSink>,
    pub restarter: Arc<dyn WorkloadRestarter>,
}

pub struct FilesystemReconciler {
    deps: FilesystemCollaborators,
    cancel: CancellationToken,
}

impl FilesystemReconciler {
    pub fn new(deps: FilesystemCollaborators, cancel: CancellationToken) -> Self {
        Self { deps, cancel }
    }

    /// Wire up the production collaborators
    pub fn from_client(client: Client, config: &Config, cancel: CancellationToken) -> Self {
        let stores = Arc::new(KubeStoreFactory::new(client.clone()));
        let executor: Arc<dyn CommandExecutor> =
            Arc::new(CephCli::new(&config.ceph_binary, &config.ceph_config_dir));
        let deps = FilesystemCollaborators {
            filesystems: stores.clone(),
            clusters: stores.clone(),
            secrets: stores.clone(),
            executor: executor.clone(),
            versions: Arc::new(CephVersionProbe::new(executor)),
            dependents: Arc::new(SubVolumeGroupLister::new(stores)),
            events: Arc::new(KubeEventSink::new(client.clone())),
            restarter: Arc::new(DeploymentRestarter::new(client.clone())),
        };
        Self::new(deps, cancel)
    }

    pub async fn run(self, client: Client) -> anyhow::Result<()> {
        let filesystems: Api<CephFilesystem> = Api::all(client.clone());
        let clusters: Api<CephCluster> = Api::all(client);
        let shutdown = self.cancel.clone().cancelled_owned();
        let context = Arc::new(self);

        let controller = Controller::new(filesystems, watcher::Config::default());
        let cache = controller.store();
        controller
            // Key rotation settings live on the cluster
            .watches(clusters, watcher::Config::default(), move |cluster: CephCluster| {
                let namespace = cluster.namespace();
                cache
                    .state()
                    .into_iter()
                    .filter(|fs| fs.namespace() == namespace)
                    .map(|fs| ObjectRef::from_obj(fs.as_ref()))
                    .collect::<Vec<_>>()
            })
            .graceful_shutdown_on(shutdown)
            .run(reconcile, error_policy, context)
            .for_each(|res| async move {
                match res {
                    Ok(o) => debug!("Reconciled filesystem: {:?}", o),
                    Err(e) => warn!("Reconciliation error: {:?}", e),
                }
            })
            .await;

        Ok(())
    }

    /// One pass over a filesystem. Must not run concurrently for the same
    /// filesystem; the controller guarantees that.
    #[instrument(skip_all, fields(namespace = ?fs.namespace(), name = %fs.name_any()))]
    pub async fn reconcile_pass(&self, fs: &CephFilesystem, cancel: &CancellationToken) -> Result<PassOutcome> {
        let namespace = fs.namespace().unwrap_or_default();
        let store = self.deps.filesystems.in_namespace(&namespace);

        if fs.is_deleting() && !fs.has_finalizer() {
            return Ok(PassOutcome::Done);
        }

        let Some(cluster) = self.find_cluster(&namespace, cancel).await? else {
            if fs.is_deleting() {
                info!("No CephCluster in {}, releasing filesystem", namespace);
                self.remove_finalizer(store.as_ref(), fs, cancel).await?;
                return Ok(PassOutcome::Done);
            }
            info!("No CephCluster in {} yet, waiting", namespace);
            return Ok(PassOutcome::Requeue(Duration::from_secs(requeue::WAIT_FOR_CLUSTER_SECS)));
        };

        if fs.is_deleting() {
            if !deletion_allowed(self.deps.dependents.as_ref(), self.deps.events.as_ref(), fs, cancel).await? {
                return Ok(PassOutcome::Blocked);
            }
            self.remove_finalizer(store.as_ref(), fs, cancel).await?;
            return Ok(PassOutcome::Done);
        }

        if !cluster.is_ready() {
            info!("CephCluster {} is not ready, waiting", cluster.name_any());
            return Ok(PassOutcome::Requeue(Duration::from_secs(requeue::WAIT_FOR_CLUSTER_SECS)));
        }

        let fs = self.ensure_finalizer(store.as_ref(), fs, cancel).await?;

        let (running, desired) = self.deps.versions.current_and_desired(&cluster, cancel).await?;
        let policy = RotationPolicy::derive(&running, &desired, cluster.daemon_cephx());
        let state = CredentialState::from_status(fs.daemon_cephx_status());
        let planned = plan(&state, &policy, &running);
        let rotated_to = match planned.action {
            KeyAction::Rotate { target } => Some(target),
            KeyAction::Ensure => None,
        };

        let secrets = self.deps.secrets.in_namespace(&namespace);
        let ctx = KeyContext {
            executor: self.deps.executor.as_ref(),
            secrets: secrets.as_ref(),
            restarter: self.deps.restarter.as_ref(),
            namespace: &namespace,
            owner: fs.controller_owner_ref(&()),
        };
        let next = apply_plan(&ctx, planned, &mds_daemons(&fs), cancel).await?;

        if let Some(target) = rotated_to {
            self.deps
                .events
                .emit(
                    &fs.object_ref(&()),
                    EventType::Normal,
                    reasons::KEY_ROTATED,
                    format!("Rotated MDS keys to generation {}", target),
                )
                .await;
        }

        self.persist_status(store.as_ref(), &fs, &next, cancel).await?;
        Ok(PassOutcome::Done)
    }

    async fn find_cluster(&self, namespace: &str, cancel: &CancellationToken) -> Result<Option<CephCluster>> {
        let store = self.deps.clusters.in_namespace(namespace);
        let clusters = guarded(cancel, async {
            store.list().await.map_err(|source| OperatorError::FetchFailed {
                kind: CephCluster::kind(&()).to_string(),
                name: format!("{}/*", namespace),
                source,
            })
        })
        .await?;
        Ok(clusters.into_iter().next())
    }

    async fn ensure_finalizer(
        &self,
        store: &dyn ObjectStore<CephFilesystem>,
        fs: &CephFilesystem,
        cancel: &CancellationToken,
    ) -> Result<CephFilesystem> {
        if fs.has_finalizer() {
            return Ok(fs.clone());
        }
        let mut updated = fs.clone();
        updated.finalizers_mut().push(FILESYSTEM_FINALIZER.to_string());
        let stored = self.write(store, &updated, cancel).await?;
        info!("Added finalizer to filesystem {}", fs.name_any());
        Ok(stored)
    }

    async fn remove_finalizer(
        &self,
        store: &dyn ObjectStore<CephFilesystem>,
        fs: &CephFilesystem,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let mut updated = fs.clone();
        updated.finalizers_mut().retain(|f| f != FILESYSTEM_FINALIZER);
        self.write(store, &updated, cancel).await?;
        info!("Removed finalizer from filesystem {}", fs.name_any());
        Ok(())
    }

    async fn write(
        &self,
        store: &dyn ObjectStore<CephFilesystem>,
        fs: &CephFilesystem,
        cancel: &CancellationToken,
    ) -> Result<CephFilesystem> {
        guarded(cancel, async {
            store.update(fs).await.map_err(|source| OperatorError::UpdateFailed {
                kind: CephFilesystem::kind(&()).to_string(),
                name: fs.name_any(),
                source,
            })
        })
        .await
    }

    async fn persist_status(
        &self,
        store: &dyn ObjectStore<CephFilesystem>,
        fs: &CephFilesystem,
        state: &CredentialState,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let mut status = fs.status.clone().unwrap_or_default();
        status.phase = Some("Ready".to_string());
        status.cephx = state.to_status().map(|daemon| LocalCephxStatus { daemon });

        if fs.status.as_ref() == Some(&status) {
            debug!("Filesystem status unchanged");
            return Ok(());
        }

        let mut updated = fs.clone();
        updated.status = Some(status);
        guarded(cancel, async {
            store
                .update_status(&updated)
                .await
                .map_err(|source| OperatorError::UpdateFailed {
                    kind: CephFilesystem::kind(&()).to_string(),
                    name: fs.name_any(),
                    source,
                })
        })
        .await?;
        Ok(())
    }
}

/// Keys for every metadata server of the filesystem
pub fn mds_daemons(fs: &CephFilesystem) -> Vec<DaemonKey> {
    let name = fs.name_any();
    fs.mds_daemon_ids()
        .into_iter()
        .map(|id| DaemonKey {
            entity: format!("mds.{}-{}", name, id),
            caps: MDS_CAPS,
            keyring_secret: keyring_secret_name(&name, &id),
            workload: format!("rook-ceph-mds-{}-{}", name, id),
        })
        .collect()
}

async fn reconcile(fs: Arc<CephFilesystem>, ctx: Arc<FilesystemReconciler>) -> Result<Action> {
    let cancel = ctx.cancel.child_token();
    let pass = ctx.reconcile_pass(&fs, &cancel);
    match tokio::time::timeout(Duration::from_secs(requeue::PASS_TIMEOUT_SECS), pass).await {
        Ok(outcome) => Ok(outcome?.into_action()),
        Err(_) => {
            cancel.cancel();
            Err(OperatorError::Cancelled)
        }
    }
}

fn error_policy(
    _fs: Arc<CephFilesystem>,
    error: &OperatorError,
    _ctx: Arc<FilesystemReconciler>,
) -> Action {
    error!("Reconciliation error: {}", error);
    Action::requeue(Duration::from_secs(requeue::ERROR_SECS))
}
