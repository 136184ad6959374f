// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Desired state for the csi-operator: the image set and one `Driver` per
//! enabled CSI variant.

pub mod driver_spec;
pub mod image_set;
pub mod placement;
pub mod resources;

pub use driver_spec::{build_driver, DriverInputs, DriverVariant};
pub use image_set::build_image_set;
