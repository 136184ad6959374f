// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Human-visible Kubernetes Events.
//!
//! Publishing is fire-and-forget: a failed event is logged and never fails a
//! reconcile pass.

use crate::constants::OPERATOR_NAME;
use async_trait::async_trait;
use k8s_openapi::api::core::v1::ObjectReference;
use kube::runtime::events::{Event, EventType, Recorder, Reporter};
use kube::Client;
use tracing::warn;

pub mod reasons {
    /// Deletion held back because other objects still reference the resource
    pub const DELETION_BLOCKED: &str = "DeletionBlocked";
    pub const KEY_ROTATED: &str = "KeyRotated";
}

#[async_trait]
pub trait EventSink: Send + Sync {
    async fn emit(&self, reference: &ObjectReference, type_: EventType, reason: &str, message: String);
}

/// [`EventSink`] backed by the kube-runtime event [`Recorder`]
pub struct KubeEventSink {
    recorder: Recorder,
}

impl KubeEventSink {
    pub fn new(client: Client) -> Self {
        let reporter = Reporter {
            controller: OPERATOR_NAME.to_string(),
            instance: std::env::var("POD_NAME").ok(),
        };
        Self {
            recorder: Recorder::new(client, reporter),
        }
    }
}

#[async_trait]
impl EventSink for KubeEventSink {
    async fn emit(&self, reference: &ObjectReference, type_: EventType, reason: &str, message: String) {
        let event = Event {
            type_,
            reason: reason.to_string(),
            note: Some(message),
            action: "Reconcile".to_string(),
            secondary: None,
        };
        if let Err(e) = self.recorder.publish(&event, reference).await {
            warn!(reason, error = %e, "Failed to publish event");
        }
    }
}
