// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Custom resources read and written by the operator.

pub mod cluster;
pub mod driver;
pub mod filesystem;

pub use cluster::{CephCluster, CephxConfig, KeyRotationPolicy};
pub use driver::{Driver, DriverSpec};
pub use filesystem::{CephFilesystem, CephFilesystemSubVolumeGroup, CephxStatus};
