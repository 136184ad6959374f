// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

pub mod keyring;
pub mod rotation;

pub use rotation::{apply_plan, plan, CredentialState, DaemonKey, KeyAction, KeyContext, RotationPolicy};
