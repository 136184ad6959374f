// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Fetch-or-create-or-update for declaratively specified child resources.
//!
//! Every pass overwrites the whole spec payload; there is no diffing. Manual
//! edits to a child's spec are reverted on the next pass.

use crate::cancel::guarded;
use crate::error::{OperatorError, Result};
use crate::store::{HasSpec, ObjectStore};
use kube::{Resource, ResourceExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Created,
    Updated,
}

/// Copy everything from the fetched object, then overwrite only the spec.
///
/// Identity, resourceVersion, labels, annotations, finalizers and status all
/// come from `fetched`.
pub fn merge_spec<K: HasSpec>(mut fetched: K, desired: &K) -> K {
    fetched.set_spec(desired.spec().clone());
    fetched
}

/// Make the stored object named like `desired` carry `desired`'s spec.
#[instrument(skip_all, fields(kind = %K::kind(&()), name = %desired.name_any()))]
pub async fn upsert<K, S>(store: &S, desired: &K, cancel: &CancellationToken) -> Result<UpsertOutcome>
where
    K: Resource<DynamicType = ()> + HasSpec + Clone + Send + Sync,
    S: ObjectStore<K> + ?Sized,
{
    let kind = K::kind(&()).to_string();
    let name = desired.name_any();

    let existing = guarded(cancel, async {
        store
            .get(&name)
            .await
            .map_err(|source| OperatorError::FetchFailed {
                kind: kind.clone(),
                name: name.clone(),
                source,
            })
    })
    .await?;

    let Some(current) = existing else {
        debug!("{} {} not found, creating", kind, name);
        guarded(cancel, async {
            store
                .create(desired)
                .await
                .map_err(|source| OperatorError::CreateFailed {
                    kind: kind.clone(),
                    name: name.clone(),
                    source,
                })
        })
        .await?;
        info!("Successfully created {} {}", kind, name);
        return Ok(UpsertOutcome::Created);
    };

    let merged = merge_spec(current, desired);
    guarded(cancel, async {
        store
            .update(&merged)
            .await
            .map_err(|source| OperatorError::UpdateFailed {
                kind: kind.clone(),
                name: name.clone(),
                source,
            })
    })
    .await?;
    info!("Successfully updated {} {}", kind, name);
    Ok(UpsertOutcome::Updated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::MemoryStore;
    use crate::types::{Driver, DriverSpec};
    use kube::api::ObjectMeta;
    use std::collections::BTreeMap;

    fn make_driver(cluster: &str) -> Driver {
        Driver {
            metadata: ObjectMeta {
                name: Some("rook-ceph.rbd.csi.ceph.com".to_string()),
                namespace: Some("rook-ceph".to_string()),
                ..Default::default()
            },
            spec: DriverSpec {
                cluster_name: Some(cluster.to_string()),
                ..Default::default()
            },
        }
    }

    #[tokio::test]
    async fn test_upsert_creates_when_absent() {
        let store = MemoryStore::<Driver>::new();
        let desired = make_driver("rook-ceph");

        let outcome = upsert(&store, &desired, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(outcome, UpsertOutcome::Created);
        let stored = store.object("rook-ceph.rbd.csi.ceph.com").unwrap();
        assert_eq!(stored.spec, desired.spec);
    }

    #[tokio::test]
    async fn test_upsert_overwrites_spec_and_keeps_metadata() {
        let mut existing = make_driver("old-cluster");
        existing.metadata.labels = Some(BTreeMap::from([(
            "owner".to_string(),
            "someone-else".to_string(),
        )]));
        existing.spec.enable_metadata = Some(true);
        let store = MemoryStore::new().with(existing);
        let before = store.object("rook-ceph.rbd.csi.ceph.com").unwrap();

        let desired = make_driver("rook-ceph");
        let outcome = upsert(&store, &desired, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(outcome, UpsertOutcome::Updated);
        let stored = store.object("rook-ceph.rbd.csi.ceph.com").unwrap();
        assert_eq!(stored.spec, desired.spec);
        assert_eq!(stored.metadata.uid, before.metadata.uid);
        assert_eq!(stored.metadata.labels, before.metadata.labels);
        assert_ne!(stored.metadata.resource_version, before.metadata.resource_version);
    }

    #[tokio::test]
    async fn test_upsert_twice_is_idempotent() {
        let store = MemoryStore::<Driver>::new();
        let desired = make_driver("rook-ceph");
        let cancel = CancellationToken::new();

        upsert(&store, &desired, &cancel).await.unwrap();
        let first = store.object("rook-ceph.rbd.csi.ceph.com").unwrap();
        let outcome = upsert(&store, &desired, &cancel).await.unwrap();
        let second = store.object("rook-ceph.rbd.csi.ceph.com").unwrap();

        assert_eq!(outcome, UpsertOutcome::Updated);
        assert_eq!(
            serde_json::to_value(&first).unwrap(),
            serde_json::to_value(&second).unwrap()
        );
        assert_eq!(store.writes(), 1);
    }

    #[tokio::test]
    async fn test_upsert_fetch_error_is_fetch_failed() {
        let store = MemoryStore::<Driver>::new();
        store.fail_gets_with(500);

        let err = upsert(&store, &make_driver("rook-ceph"), &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, OperatorError::FetchFailed { .. }));
        assert!(store.object("rook-ceph.rbd.csi.ceph.com").is_none());
    }

    #[tokio::test]
    async fn test_upsert_create_error_is_create_failed() {
        let store = MemoryStore::<Driver>::new();
        store.fail_creates_with(403);

        let err = upsert(&store, &make_driver("rook-ceph"), &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, OperatorError::CreateFailed { .. }));
    }

    #[tokio::test]
    async fn test_upsert_update_error_is_update_failed() {
        let store = MemoryStore::new().with(make_driver("old-cluster"));
        store.fail_updates_with(409);

        let err = upsert(&store, &make_driver("rook-ceph"), &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, OperatorError::UpdateFailed { .. }));
        let stored = store.object("rook-ceph.rbd.csi.ceph.com").unwrap();
        assert_eq!(stored.spec.cluster_name.as_deref(), Some("old-cluster"));
    }

    #[tokio::test]
    async fn test_upsert_cancelled_before_fetch() {
        let store = MemoryStore::<Driver>::new();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = upsert(&store, &make_driver("rook-ceph"), &cancel)
            .await
            .unwrap_err();

        assert!(matches!(err, OperatorError::Cancelled));
        assert!(store.object("rook-ceph.rbd.csi.ceph.com").is_none());
    }

    #[test]
    fn test_merge_spec_keeps_fetched_identity() {
        let mut fetched = make_driver("old");
        fetched.metadata.resource_version = Some("42".to_string());
        fetched.metadata.finalizers = Some(vec!["keep".to_string()]);

        let merged = merge_spec(fetched, &make_driver("new"));

        assert_eq!(merged.metadata.resource_version.as_deref(), Some("42"));
        assert_eq!(merged.metadata.finalizers, Some(vec!["keep".to_string()]));
        assert_eq!(merged.spec.cluster_name.as_deref(), Some("new"));
    }
}
