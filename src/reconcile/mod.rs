// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Generic reconciliation primitives shared by the controllers.

pub mod ownership;
pub mod upsert;

pub use ownership::{transfer_ownership, OwnershipOutcome};
pub use upsert::{upsert, UpsertOutcome};
