// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
pub mod cancel;
pub mod ceph;
pub mod cephx;
pub mod config;
pub mod constants;
pub mod csi;
pub mod dependents;
pub mod error;
pub mod events;
pub mod kubernetes;
pub mod reconcile;
pub mod reconcilers;
pub mod store;
pub mod types;
pub mod workloads;

#[cfg(test)]
pub mod test_utils;
