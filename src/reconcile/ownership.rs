// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Hand a pre-existing shared resource over to another owner by annotation.

use crate::cancel::guarded;
use crate::constants::annotations;
use crate::error::{OperatorError, Result};
use crate::store::ObjectStore;
use kube::{Resource, ResourceExt};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

/// The annotation payload. Field order is the wire order.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct OwnerKey<'a> {
    pub namespace: &'a str,
    pub name: &'a str,
}

impl OwnerKey<'_> {
    pub fn encode(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|source| OperatorError::SerializationFailed {
            name: self.name.to_string(),
            source,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OwnershipOutcome {
    /// The resource does not exist (yet); nothing to hand over
    NotInstalled,
    /// The annotation already carries the expected owner
    Unchanged,
    Transferred,
}

/// Point the owner-ref annotation of `name` at `owner_namespace`.
///
/// Fetch errors other than NotFound are propagated.
#[instrument(skip(store, cancel))]
pub async fn transfer_ownership<K, S>(
    store: &S,
    name: &str,
    owner_namespace: &str,
    cancel: &CancellationToken,
) -> Result<OwnershipOutcome>
where
    K: Resource<DynamicType = ()> + Clone + Send + Sync,
    S: ObjectStore<K> + ?Sized,
{
    let kind = K::kind(&()).to_string();
    let fetched = guarded(cancel, async {
        store
            .get(name)
            .await
            .map_err(|source| OperatorError::FetchFailed {
                kind: kind.clone(),
                name: name.to_string(),
                source,
            })
    })
    .await?;

    let Some(mut resource) = fetched else {
        debug!("{} {} not found; skipping ownership transfer", kind, name);
        return Ok(OwnershipOutcome::NotInstalled);
    };

    let resource_name = resource.name_any();
    let value = OwnerKey {
        namespace: owner_namespace,
        name: &resource_name,
    }
    .encode()?;

    if resource
        .annotations()
        .get(annotations::CSI_OWNER_REF)
        .is_some_and(|current| *current == value)
    {
        debug!("{} {} already carries owner annotation", kind, name);
        return Ok(OwnershipOutcome::Unchanged);
    }

    resource
        .annotations_mut()
        .insert(annotations::CSI_OWNER_REF.to_string(), value);

    guarded(cancel, async {
        store
            .update(&resource)
            .await
            .map_err(|source| OperatorError::UpdateFailed {
                kind: kind.clone(),
                name: name.to_string(),
                source,
            })
    })
    .await?;

    info!("Transferred ownership of {} {} to {}", kind, name, owner_namespace);
    Ok(OwnershipOutcome::Transferred)
}
