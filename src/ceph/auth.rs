// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! `ceph auth` key operations.

use crate::cancel::guarded;
use crate::ceph::exec::CommandExecutor;
use crate::error::{OperatorError, Result};
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument};

/// Capabilities granted to metadata server daemons
pub const MDS_CAPS: &[&str] = &["mon", "allow profile mds", "osd", "allow *", "mds", "allow"];

#[derive(Deserialize)]
struct KeyEntry {
    key: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum KeyOutput {
    Single(KeyEntry),
    Many(Vec<KeyEntry>),
}

fn parse_key(args: &[String], output: &str) -> Result<String> {
    let parsed: KeyOutput = serde_json::from_str(output)
        .map_err(|e| OperatorError::command_failed(args, format!("unparsable key output: {}", e)))?;
    let key = match parsed {
        KeyOutput::Single(entry) => Some(entry.key),
        KeyOutput::Many(entries) => entries.into_iter().next().map(|e| e.key),
    };
    match key {
        Some(k) if !k.is_empty() => Ok(k),
        _ => Err(OperatorError::command_failed(args, "no key in output")),
    }
}

/// Return the entity's key, creating it with `caps` when it does not exist.
/// Never changes an existing key.
#[instrument(skip(executor, caps, cancel))]
pub async fn get_or_create_key(
    executor: &dyn CommandExecutor,
    cluster_namespace: &str,
    entity: &str,
    caps: &[&str],
    cancel: &CancellationToken,
) -> Result<String> {
    let mut args = vec![
        "auth".to_string(),
        "get-or-create-key".to_string(),
        entity.to_string(),
    ];
    args.extend(caps.iter().map(|c| c.to_string()));

    let output = guarded(cancel, executor.execute(cluster_namespace, &args)).await?;
    parse_key(&args, &output)
}

/// Replace the entity's key with a freshly generated one and return it
#[instrument(skip(executor, cancel))]
pub async fn rotate_key(
    executor: &dyn CommandExecutor,
    cluster_namespace: &str,
    entity: &str,
    cancel: &CancellationToken,
) -> Result<String> {
    let args = vec!["auth".to_string(), "rotate".to_string(), entity.to_string()];
    let output = guarded(cancel, executor.execute(cluster_namespace, &args)).await?;
    let key = parse_key(&args, &output)?;
    info!("Rotated key for {}", entity);
    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::MockExecutor;

    #[tokio::test]
    async fn test_get_or_create_passes_caps() {
        let executor = MockExecutor::new().on(
            &["auth", "get-or-create-key", "mds.my-fs-a"],
            r#"{"key":"AQBold=="}"#,
        );

        let key = get_or_create_key(
            &executor,
            "rook-ceph",
            "mds.my-fs-a",
            MDS_CAPS,
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        assert_eq!(key, "AQBold==");
        let calls = executor.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(&calls[0][3..], &["mon", "allow profile mds", "osd", "allow *", "mds", "allow"]);
    }

    #[tokio::test]
    async fn test_rotate_accepts_list_output() {
        let executor = MockExecutor::new().on(
            &["auth", "rotate", "mds.my-fs-a"],
            r#"[{"entity":"mds.my-fs-a","key":"AQBnew==","caps":{}}]"#,
        );

        let key = rotate_key(&executor, "rook-ceph", "mds.my-fs-a", &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(key, "AQBnew==");
    }

    #[tokio::test]
    async fn test_empty_output_is_error() {
        let executor = MockExecutor::new().on(&["auth", "rotate"], "[]");

        let err = rotate_key(&executor, "rook-ceph", "mds.my-fs-a", &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, OperatorError::ExternalCommandFailed { .. }));
    }

    #[tokio::test]
    async fn test_cancelled_before_command() {
        let executor = MockExecutor::new().on(&["auth"], r#"{"key":"x"}"#);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = get_or_create_key(&executor, "rook-ceph", "mds.a", MDS_CAPS, &cancel)
            .await
            .unwrap_err();

        assert!(matches!(err, OperatorError::Cancelled));
        assert!(executor.calls().is_empty());
    }
}
