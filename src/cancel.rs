// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Cancellation of in-flight external calls.

use crate::error::{OperatorError, Result};
use std::future::Future;
use tokio_util::sync::CancellationToken;

/// Run a single external call, aborting it when `cancel` fires.
///
/// The call is dropped mid-flight on cancellation. Every external call is a
/// single request, so nothing partial is left behind.
pub async fn guarded<F, T>(cancel: &CancellationToken, call: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    if cancel.is_cancelled() {
        return Err(OperatorError::Cancelled);
    }
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(OperatorError::Cancelled),
        res = call => res,
    }
}
