// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Kubernetes reconcilers that react to watch events.

pub mod csi;
pub mod filesystem;

pub use csi::CsiDriverReconciler;
pub use filesystem::FilesystemReconciler;

use crate::constants::requeue;
use kube::runtime::controller::Action;
use std::time::Duration;

/// Result of a single pass, mapped onto a controller [`Action`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassOutcome {
    Done,
    Requeue(Duration),
    /// Deletion held back by dependents; retried later
    Blocked,
}

impl PassOutcome {
    pub fn into_action(self) -> Action {
        match self {
            PassOutcome::Done => Action::await_change(),
            PassOutcome::Requeue(after) => Action::requeue(after),
            PassOutcome::Blocked => Action::requeue(Duration::from_secs(requeue::DEPENDENTS_SECS)),
        }
    }
}
