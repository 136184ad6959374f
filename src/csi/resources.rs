// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Mapping of per-container allocation rows onto the driver's resource fields.
//!
//! Rows are matched by substring against an ordered table; the first entry
//! whose needle occurs in the row name wins. A row matching nothing is
//! dropped without error, as is a row with empty requirements.

use crate::types::driver::{ControllerPluginResourcesSpec, NodePluginResourcesSpec};
use k8s_openapi::api::core::v1::ResourceRequirements;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// One row of an allocation table
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct ContainerResource {
    pub name: String,
    #[serde(default)]
    pub resource: ResourceRequirements,
}

/// Allocation rows keyed by configuration key
pub type AllocationTable = BTreeMap<String, Vec<ContainerResource>>;

/// Parse the YAML list form used in the operator settings
pub fn parse_allocation_rows(raw: &str) -> Result<Vec<ContainerResource>, serde_yaml::Error> {
    serde_yaml::from_str(raw)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerSlot {
    Provisioner,
    Resizer,
    Snapshotter,
    Attacher,
    Plugin,
    OMapGenerator,
    Liveness,
    Addons,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeSlot {
    Registrar,
    Plugin,
    Liveness,
    Addons,
}

/// Priority order for controller plugin containers. "resizer" and the other
/// sidecars precede "plugin" so that e.g. "csi-rbdplugin-resizer" never lands
/// in the plugin slot.
pub const CONTROLLER_DISPATCH: [(&str, ControllerSlot); 8] = [
    ("provisioner", ControllerSlot::Provisioner),
    ("resizer", ControllerSlot::Resizer),
    ("snapshotter", ControllerSlot::Snapshotter),
    ("attacher", ControllerSlot::Attacher),
    ("plugin", ControllerSlot::Plugin),
    ("omap-generator", ControllerSlot::OMapGenerator),
    ("liveness", ControllerSlot::Liveness),
    ("addons", ControllerSlot::Addons),
];

/// Priority order for node plugin containers
pub const NODE_DISPATCH: [(&str, NodeSlot); 4] = [
    ("registrar", NodeSlot::Registrar),
    ("plugin", NodeSlot::Plugin),
    ("liveness", NodeSlot::Liveness),
    ("addons", NodeSlot::Addons),
];

/// First slot in `table` whose needle occurs in `name`
pub fn match_slot<S: Copy>(name: &str, table: &[(&str, S)]) -> Option<S> {
    table
        .iter()
        .find(|(needle, _)| name.contains(needle))
        .map(|(_, slot)| *slot)
}

impl ControllerPluginResourcesSpec {
    fn slot_mut(&mut self, slot: ControllerSlot) -> &mut Option<ResourceRequirements> {
        match slot {
            ControllerSlot::Provisioner => &mut self.provisioner,
            ControllerSlot::Resizer => &mut self.resizer,
            ControllerSlot::Snapshotter => &mut self.snapshotter,
            ControllerSlot::Attacher => &mut self.attacher,
            ControllerSlot::Plugin => &mut self.plugin,
            ControllerSlot::OMapGenerator => &mut self.omap_generator,
            ControllerSlot::Liveness => &mut self.liveness,
            ControllerSlot::Addons => &mut self.addons,
        }
    }
}

impl NodePluginResourcesSpec {
    fn slot_mut(&mut self, slot: NodeSlot) -> &mut Option<ResourceRequirements> {
        match slot {
            NodeSlot::Registrar => &mut self.registrar,
            NodeSlot::Plugin => &mut self.plugin,
            NodeSlot::Liveness => &mut self.liveness,
            NodeSlot::Addons => &mut self.addons,
        }
    }
}

/// Requests and limits only; anything else on the row is not carried over
fn requests_and_limits(resource: &ResourceRequirements) -> ResourceRequirements {
    ResourceRequirements {
        limits: resource.limits.clone(),
        requests: resource.requests.clone(),
        ..Default::default()
    }
}

fn usable_rows(rows: &[ContainerResource]) -> impl Iterator<Item = &ContainerResource> {
    rows.iter()
        .filter(|r| r.resource != ResourceRequirements::default())
}

pub fn controller_plugin_resources(rows: &[ContainerResource]) -> ControllerPluginResourcesSpec {
    let mut spec = ControllerPluginResourcesSpec::default();
    for row in usable_rows(rows) {
        match match_slot(&row.name, &CONTROLLER_DISPATCH) {
            Some(slot) => *spec.slot_mut(slot) = Some(requests_and_limits(&row.resource)),
            None => debug!("No controller plugin field for container {:?}, ignoring", row.name),
        }
    }
    spec
}

pub fn node_plugin_resources(rows: &[ContainerResource]) -> NodePluginResourcesSpec {
    let mut spec = NodePluginResourcesSpec::default();
    for row in usable_rows(rows) {
        match match_slot(&row.name, &NODE_DISPATCH) {
            Some(slot) => *spec.slot_mut(slot) = Some(requests_and_limits(&row.resource)),
            None => debug!("No node plugin field for container {:?}, ignoring", row.name),
        }
    }
    spec
}
