// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Daemon key tracking and rotation.
//!
//! The tracked state lives in the owning resource's status. Each pass plans a
//! single action for all daemons of the resource: either make sure their keys
//! exist, or rotate them. Rotation is side-effecting on every call, so it is
//! only planned when the configured generation is ahead of the tracked one.

use crate::cancel::guarded;
use crate::ceph::auth::{get_or_create_key, rotate_key};
use crate::ceph::exec::CommandExecutor;
use crate::ceph::version::{supports_key_rotation, CephVersion};
use crate::cephx::keyring::{
    annotated_generation, fetch_keyring_secret, mark_rolled_out, render_keyring, store_keyring,
};
use crate::constants::annotations;
use crate::error::Result;
use crate::store::ObjectStore;
use crate::types::{CephxConfig, CephxStatus, KeyRotationPolicy};
use crate::workloads::WorkloadRestarter;
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialState {
    /// Never tracked: no status block at all
    NoKey,
    /// Status block present but cleared
    Unknown,
    Known { generation: u32, version: String },
}

impl CredentialState {
    pub fn from_status(status: Option<&CephxStatus>) -> Self {
        match status {
            None => CredentialState::NoKey,
            Some(s) if s.key_generation == 0 && s.key_ceph_version.is_empty() => {
                CredentialState::Unknown
            }
            Some(s) => CredentialState::Known {
                generation: s.key_generation,
                version: s.key_ceph_version.clone(),
            },
        }
    }

    pub fn to_status(&self) -> Option<CephxStatus> {
        match self {
            CredentialState::NoKey => None,
            CredentialState::Unknown => Some(CephxStatus::default()),
            CredentialState::Known {
                generation,
                version,
            } => Some(CephxStatus {
                key_generation: *generation,
                key_ceph_version: version.clone(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RotationPolicy {
    /// Both the running and the desired release can rotate keys
    pub enabled: bool,
    pub mode: KeyRotationPolicy,
    pub target_generation: u32,
}

impl RotationPolicy {
    pub fn derive(running: &CephVersion, desired: &CephVersion, config: &CephxConfig) -> Self {
        Self {
            enabled: supports_key_rotation(running, desired),
            mode: config.key_rotation_policy,
            target_generation: config.key_generation,
        }
    }

    /// Generation the operator asks for, when rotation may happen at all
    fn requested_generation(&self) -> Option<u32> {
        let wants = self.enabled
            && self.mode == KeyRotationPolicy::KeyGeneration
            && self.target_generation > 0;
        wants.then_some(self.target_generation)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    /// Get-or-create; never changes an existing key
    Ensure,
    Rotate { target: u32 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plan {
    pub action: KeyAction,
    pub next: CredentialState,
}

/// Decide what to do with the daemon keys this pass and the state that
/// results when it succeeds.
pub fn plan(state: &CredentialState, policy: &RotationPolicy, running: &CephVersion) -> Plan {
    let requested = policy.requested_generation();
    let ensure = |next: CredentialState| Plan {
        action: KeyAction::Ensure,
        next,
    };

    match state {
        CredentialState::NoKey => {
            // A fresh key already satisfies whatever generation is requested
            let generation = requested.unwrap_or(0).max(1);
            ensure(CredentialState::Known {
                generation,
                version: running.to_string(),
            })
        }
        CredentialState::Unknown => match requested {
            Some(target) => Plan {
                action: KeyAction::Rotate { target },
                next: CredentialState::Known {
                    generation: target,
                    version: running.to_string(),
                },
            },
            None => ensure(CredentialState::Unknown),
        },
        CredentialState::Known { generation, .. } => match requested {
            Some(target) if target > *generation => Plan {
                action: KeyAction::Rotate { target },
                next: CredentialState::Known {
                    generation: target,
                    version: running.to_string(),
                },
            },
            _ => ensure(state.clone()),
        },
    }
}

/// One daemon whose key is managed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DaemonKey {
    /// Ceph auth entity, e.g. "mds.my-fs-a"
    pub entity: String,
    pub caps: &'static [&'static str],
    pub keyring_secret: String,
    /// Deployment restarted after a rotation
    pub workload: String,
}

/// Collaborators the key operations run against
pub struct KeyContext<'a> {
    pub executor: &'a dyn CommandExecutor,
    pub secrets: &'a dyn ObjectStore<Secret>,
    pub restarter: &'a dyn WorkloadRestarter,
    pub namespace: &'a str,
    pub owner: Option<OwnerReference>,
}

/// Carry out the planned action for every daemon and return the state to
/// persist. On error the caller keeps the previous state.
///
/// Rotation progress is recorded per daemon on its keyring secret, so a pass
/// retried after a partial failure neither rotates nor restarts a daemon that
/// already reached the target generation.
#[instrument(skip_all, fields(namespace = %ctx.namespace, action = ?planned.action))]
pub async fn apply_plan(
    ctx: &KeyContext<'_>,
    planned: Plan,
    daemons: &[DaemonKey],
    cancel: &CancellationToken,
) -> Result<CredentialState> {
    for daemon in daemons {
        match planned.action {
            KeyAction::Ensure => {
                let key =
                    get_or_create_key(ctx.executor, ctx.namespace, &daemon.entity, daemon.caps, cancel)
                        .await?;
                store_keyring(
                    ctx.secrets,
                    ctx.namespace,
                    &daemon.keyring_secret,
                    &render_keyring(&daemon.entity, &key),
                    None,
                    ctx.owner.clone(),
                    cancel,
                )
                .await?;
            }
            KeyAction::Rotate { target } => rotate_daemon(ctx, daemon, target, cancel).await?,
        }
    }

    debug!("Daemon keys reconciled, state {:?}", planned.next);
    Ok(planned.next)
}

async fn rotate_daemon(
    ctx: &KeyContext<'_>,
    daemon: &DaemonKey,
    target: u32,
    cancel: &CancellationToken,
) -> Result<()> {
    let existing = fetch_keyring_secret(ctx.secrets, &daemon.keyring_secret, cancel).await?;
    let recorded = |annotation: &str| {
        existing
            .as_ref()
            .and_then(|s| annotated_generation(s, annotation))
    };

    if recorded(annotations::KEY_GENERATION) == Some(target) {
        debug!("{} already holds generation {}", daemon.entity, target);
    } else {
        info!("Rotating key for {} to generation {}", daemon.entity, target);
        let key = rotate_key(ctx.executor, ctx.namespace, &daemon.entity, cancel).await?;
        store_keyring(
            ctx.secrets,
            ctx.namespace,
            &daemon.keyring_secret,
            &render_keyring(&daemon.entity, &key),
            Some(target),
            ctx.owner.clone(),
            cancel,
        )
        .await?;
    }

    if recorded(annotations::KEY_ROLLED_OUT) != Some(target) {
        guarded(cancel, ctx.restarter.restart(ctx.namespace, &daemon.workload)).await?;
        mark_rolled_out(ctx.secrets, &daemon.keyring_secret, target, cancel).await?;
    }
    Ok(())
}
