// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Talking to a Ceph cluster through its CLI.

pub mod auth;
pub mod exec;
pub mod version;

pub use exec::{CephCli, CommandExecutor};
pub use version::{CephVersion, CephVersionProbe, VersionProbe};
