// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use thiserror::Error;

#[derive(Error, Debug)]
pub enum OperatorError {
    #[error("Kubernetes API error: {0}")]
    KubeError(#[from] kube::Error),

    #[error("Failed to get {kind} {name:?}: {source}")]
    FetchFailed {
        kind: String,
        name: String,
        #[source]
        source: kube::Error,
    },

    #[error("Failed to create {kind} {name:?}: {source}")]
    CreateFailed {
        kind: String,
        name: String,
        #[source]
        source: kube::Error,
    },

    #[error("Failed to update {kind} {name:?}: {source}")]
    UpdateFailed {
        kind: String,
        name: String,
        #[source]
        source: kube::Error,
    },

    #[error("Failed to serialize owner key for {name:?}: {source}")]
    SerializationFailed {
        name: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Ceph command {command:?} failed: {message}")]
    ExternalCommandFailed { command: String, message: String },

    #[error("Invalid ceph version: {0}")]
    InvalidVersion(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Reconcile pass cancelled")]
    Cancelled,
}

impl OperatorError {
    pub(crate) fn command_failed(args: &[String], message: impl Into<String>) -> Self {
        OperatorError::ExternalCommandFailed {
            command: args.join(" "),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, OperatorError>;
