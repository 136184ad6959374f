// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Objects that still reference a resource and hold back its deletion.

use crate::cancel::guarded;
use crate::error::{OperatorError, Result};
use crate::events::{reasons, EventSink};
use crate::store::StoreFactory;
use crate::types::{CephFilesystem, CephFilesystemSubVolumeGroup};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::ObjectReference;
use kube::runtime::events::EventType;
use kube::{Resource, ResourceExt};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument};

/// Dependents grouped by kind, in the order they were found
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependentList {
    entries: Vec<(String, Vec<String>)>,
}

impl DependentList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, kind: &str, name: &str) {
        match self.entries.iter_mut().find(|(k, _)| k == kind) {
            Some((_, names)) => names.push(name.to_string()),
            None => self.entries.push((kind.to_string(), vec![name.to_string()])),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Every (kind, name) pair in discovery order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .flat_map(|(kind, names)| names.iter().map(move |n| (kind.as_str(), n.as_str())))
    }

    pub fn len(&self) -> usize {
        self.entries.iter().map(|(_, names)| names.len()).sum()
    }
}

#[async_trait]
pub trait DependentsLister: Send + Sync {
    async fn dependents(&self, fs: &CephFilesystem, cancel: &CancellationToken) -> Result<DependentList>;
}

/// Reports the subvolume groups created on a filesystem
pub struct SubVolumeGroupLister {
    groups: Arc<dyn StoreFactory<CephFilesystemSubVolumeGroup>>,
}

impl SubVolumeGroupLister {
    pub fn new(groups: Arc<dyn StoreFactory<CephFilesystemSubVolumeGroup>>) -> Self {
        Self { groups }
    }
}

#[async_trait]
impl DependentsLister for SubVolumeGroupLister {
    async fn dependents(&self, fs: &CephFilesystem, cancel: &CancellationToken) -> Result<DependentList> {
        let namespace = fs.namespace().unwrap_or_default();
        let store = self.groups.in_namespace(&namespace);
        let groups = guarded(cancel, async {
            store.list().await.map_err(|source| OperatorError::FetchFailed {
                kind: CephFilesystemSubVolumeGroup::kind(&()).to_string(),
                name: format!("{}/*", namespace),
                source,
            })
        })
        .await?;

        let mut list = DependentList::new();
        for group in groups.iter().filter(|g| g.spec.filesystem_name == fs.name_any()) {
            list.add(&CephFilesystemSubVolumeGroup::kind(&()), &group.name_any());
        }
        Ok(list)
    }
}

/// Check whether `fs` may be finalized. Emits one warning event per
/// dependent and returns false while any remain.
#[instrument(skip_all, fields(filesystem = %fs.name_any()))]
pub async fn deletion_allowed(
    lister: &dyn DependentsLister,
    events: &dyn EventSink,
    fs: &CephFilesystem,
    cancel: &CancellationToken,
) -> Result<bool> {
    let dependents = lister.dependents(fs, cancel).await?;
    if dependents.is_empty() {
        return Ok(true);
    }

    info!("Deletion of {} blocked by {} dependents", fs.name_any(), dependents.len());
    let reference: ObjectReference = fs.object_ref(&());
    for (kind, name) in dependents.iter() {
        events
            .emit(
                &reference,
                EventType::Warning,
                reasons::DELETION_BLOCKED,
                format!(
                    "CephFilesystem {:?} cannot be deleted while {} {:?} exists",
                    fs.name_any(),
                    kind,
                    name
                ),
            )
            .await;
    }
    Ok(false)
}
