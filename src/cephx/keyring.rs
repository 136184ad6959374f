// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Keyring secrets mounted by the metadata server daemons.

use crate::cancel::guarded;
use crate::constants::annotations;
use crate::error::{OperatorError, Result};
use crate::store::ObjectStore;
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use k8s_openapi::ByteString;
use kube::api::ObjectMeta;
use kube::ResourceExt;
use std::collections::BTreeMap;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

pub const KEYRING_FIELD: &str = "keyring";

pub fn keyring_secret_name(filesystem: &str, daemon_id: &str) -> String {
    format!("rook-ceph-mds-{}-{}-keyring", filesystem, daemon_id)
}

pub fn render_keyring(entity: &str, key: &str) -> String {
    format!("[{}]\n\tkey = {}\n", entity, key)
}

/// Current keyring content of a secret, if any
pub fn stored_keyring(secret: &Secret) -> Option<&[u8]> {
    secret
        .data
        .as_ref()
        .and_then(|d| d.get(KEYRING_FIELD))
        .map(|b| b.0.as_slice())
}

/// Key generation recorded on a secret under `annotation`
pub fn annotated_generation(secret: &Secret, annotation: &str) -> Option<u32> {
    secret.annotations().get(annotation).and_then(|v| v.parse().ok())
}

pub async fn fetch_keyring_secret(
    store: &dyn ObjectStore<Secret>,
    name: &str,
    cancel: &CancellationToken,
) -> Result<Option<Secret>> {
    guarded(cancel, async {
        store.get(name).await.map_err(|source| OperatorError::FetchFailed {
            kind: "Secret".to_string(),
            name: name.to_string(),
            source,
        })
    })
    .await
}

async fn update_secret(
    store: &dyn ObjectStore<Secret>,
    secret: &Secret,
    cancel: &CancellationToken,
) -> Result<()> {
    guarded(cancel, async {
        store
            .update(secret)
            .await
            .map_err(|source| OperatorError::UpdateFailed {
                kind: "Secret".to_string(),
                name: secret.name_any(),
                source,
            })
    })
    .await?;
    Ok(())
}

/// Make the secret's keyring field hold `keyring`, stamped with the key
/// generation when one is given.
///
/// Creates the secret when missing. An existing secret only has the keyring
/// field and generation annotation replaced and is not written at all when
/// both already match.
#[instrument(skip(store, keyring, owner, cancel))]
pub async fn store_keyring(
    store: &dyn ObjectStore<Secret>,
    namespace: &str,
    name: &str,
    keyring: &str,
    generation: Option<u32>,
    owner: Option<OwnerReference>,
    cancel: &CancellationToken,
) -> Result<()> {
    let Some(mut secret) = fetch_keyring_secret(store, name, cancel).await? else {
        let secret = Secret {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                namespace: Some(namespace.to_string()),
                annotations: generation
                    .map(|g| BTreeMap::from([(annotations::KEY_GENERATION.to_string(), g.to_string())])),
                owner_references: owner.map(|o| vec![o]),
                ..Default::default()
            },
            data: Some(BTreeMap::from([(
                KEYRING_FIELD.to_string(),
                ByteString(keyring.as_bytes().to_vec()),
            )])),
            ..Default::default()
        };
        guarded(cancel, async {
            store
                .create(&secret)
                .await
                .map_err(|source| OperatorError::CreateFailed {
                    kind: "Secret".to_string(),
                    name: name.to_string(),
                    source,
                })
        })
        .await?;
        info!("Created keyring secret {}/{}", namespace, name);
        return Ok(());
    };

    let stamped = generation
        .map_or(true, |g| annotated_generation(&secret, annotations::KEY_GENERATION) == Some(g));
    if stored_keyring(&secret) == Some(keyring.as_bytes()) && stamped {
        debug!("Keyring secret {}/{} is current", namespace, name);
        return Ok(());
    }

    secret
        .data
        .get_or_insert_with(BTreeMap::new)
        .insert(KEYRING_FIELD.to_string(), ByteString(keyring.as_bytes().to_vec()));
    if let Some(g) = generation {
        secret
            .annotations_mut()
            .insert(annotations::KEY_GENERATION.to_string(), g.to_string());
    }
    update_secret(store, &secret, cancel).await?;
    info!("Updated keyring secret {}/{}", namespace, name);
    Ok(())
}

/// Record that the daemon mounting the secret runs with `generation`
pub async fn mark_rolled_out(
    store: &dyn ObjectStore<Secret>,
    name: &str,
    generation: u32,
    cancel: &CancellationToken,
) -> Result<()> {
    let Some(mut secret) = fetch_keyring_secret(store, name, cancel).await? else {
        warn!("Keyring secret {} vanished before its rollout was recorded", name);
        return Ok(());
    };
    if annotated_generation(&secret, annotations::KEY_ROLLED_OUT) == Some(generation) {
        return Ok(());
    }
    secret
        .annotations_mut()
        .insert(annotations::KEY_ROLLED_OUT.to_string(), generation.to_string());
    update_secret(store, &secret, cancel).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::MemoryStore;

    #[test]
    fn test_names_and_rendering() {
        assert_eq!(keyring_secret_name("my-fs", "a"), "rook-ceph-mds-my-fs-a-keyring");
        assert_eq!(
            render_keyring("mds.my-fs-a", "AQBk=="),
            "[mds.my-fs-a]\n\tkey = AQBk==\n"
        );
    }

    #[tokio::test]
    async fn test_creates_missing_secret() {
        let store = MemoryStore::<Secret>::new();

        store_keyring(&store, "rook-ceph", "kr", "[x]\n\tkey = A\n", None, None, &CancellationToken::new())
            .await
            .unwrap();

        let secret = store.object("kr").unwrap();
        assert_eq!(stored_keyring(&secret), Some("[x]\n\tkey = A\n".as_bytes()));
        assert_eq!(store.writes(), 1);
    }

    #[tokio::test]
    async fn test_replaces_only_keyring_field() {
        let existing = Secret {
            metadata: ObjectMeta {
                name: Some("kr".to_string()),
                namespace: Some("rook-ceph".to_string()),
                ..Default::default()
            },
            data: Some(BTreeMap::from([
                (KEYRING_FIELD.to_string(), ByteString(b"old".to_vec())),
                ("other".to_string(), ByteString(b"keep".to_vec())),
            ])),
            ..Default::default()
        };
        let store = MemoryStore::new().with(existing);

        store_keyring(&store, "rook-ceph", "kr", "new", None, None, &CancellationToken::new())
            .await
            .unwrap();

        let data = store.object("kr").unwrap().data.unwrap();
        assert_eq!(data[KEYRING_FIELD].0, b"new");
        assert_eq!(data["other"].0, b"keep");
    }

    #[tokio::test]
    async fn test_matching_keyring_is_not_written() {
        let store = MemoryStore::<Secret>::new();
        let cancel = CancellationToken::new();
        store_keyring(&store, "rook-ceph", "kr", "same", None, None, &cancel)
            .await
            .unwrap();

        store_keyring(&store, "rook-ceph", "kr", "same", None, None, &cancel)
            .await
            .unwrap();

        assert_eq!(store.writes(), 1);
    }

    #[tokio::test]
    async fn test_generation_stamp_is_written_with_keyring() {
        let store = MemoryStore::<Secret>::new();
        let cancel = CancellationToken::new();
        store_keyring(&store, "rook-ceph", "kr", "old", None, None, &cancel)
            .await
            .unwrap();
        assert_eq!(
            annotated_generation(&store.object("kr").unwrap(), annotations::KEY_GENERATION),
            None
        );

        store_keyring(&store, "rook-ceph", "kr", "new", Some(2), None, &cancel)
            .await
            .unwrap();
        let secret = store.object("kr").unwrap();
        assert_eq!(stored_keyring(&secret), Some("new".as_bytes()));
        assert_eq!(annotated_generation(&secret, annotations::KEY_GENERATION), Some(2));

        // Unstamped writes keep the recorded generation
        let writes = store.writes();
        store_keyring(&store, "rook-ceph", "kr", "new", None, None, &cancel)
            .await
            .unwrap();
        assert_eq!(store.writes(), writes);
        assert_eq!(
            annotated_generation(&store.object("kr").unwrap(), annotations::KEY_GENERATION),
            Some(2)
        );
    }

    #[tokio::test]
    async fn test_mark_rolled_out_writes_once() {
        let store = MemoryStore::<Secret>::new();
        let cancel = CancellationToken::new();
        store_keyring(&store, "rook-ceph", "kr", "new", Some(3), None, &cancel)
            .await
            .unwrap();

        mark_rolled_out(&store, "kr", 3, &cancel).await.unwrap();
        mark_rolled_out(&store, "kr", 3, &cancel).await.unwrap();

        let secret = store.object("kr").unwrap();
        assert_eq!(annotated_generation(&secret, annotations::KEY_ROLLED_OUT), Some(3));
        assert_eq!(stored_keyring(&secret), Some("new".as_bytes()));
        assert_eq!(store.writes(), 2);
    }

    #[tokio::test]
    async fn test_mark_rolled_out_without_secret_is_noop() {
        let store = MemoryStore::<Secret>::new();

        mark_rolled_out(&store, "missing", 1, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(store.writes(), 0);
    }
}
