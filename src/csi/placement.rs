// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Node affinity and tolerations for the CSI pods.

use crate::error::{OperatorError, Result};
use k8s_openapi::api::core::v1::{
    Affinity, NodeAffinity, NodeSelector, NodeSelectorRequirement, NodeSelectorTerm, Toleration,
};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Placement {
    pub node_affinity: Option<NodeAffinity>,
    pub tolerations: Vec<Toleration>,
}

impl Placement {
    /// Build placement from the raw affinity and toleration settings
    pub fn parse(node_affinity: Option<&str>, tolerations: Option<&str>) -> Result<Self> {
        Ok(Placement {
            node_affinity: node_affinity.and_then(parse_node_affinity),
            tolerations: match tolerations {
                Some(raw) if !raw.trim().is_empty() => serde_yaml::from_str(raw).map_err(|e| {
                    OperatorError::InvalidConfig(format!("invalid tolerations: {}", e))
                })?,
                _ => Vec::new(),
            },
        })
    }

    pub fn affinity(&self) -> Option<Affinity> {
        self.node_affinity.as_ref().map(|na| Affinity {
            node_affinity: Some(na.clone()),
            ..Default::default()
        })
    }

    pub fn tolerations(&self) -> Option<Vec<Toleration>> {
        (!self.tolerations.is_empty()).then(|| self.tolerations.clone())
    }
}

/// Parse `key1=v1,v2; key2` into a required node affinity. A key with
/// values becomes an `In` requirement, a bare key an `Exists` one.
pub fn parse_node_affinity(raw: &str) -> Option<NodeAffinity> {
    let match_expressions: Vec<NodeSelectorRequirement> = raw
        .split(';')
        .map(str::trim)
        .filter(|term| !term.is_empty())
        .map(|term| match term.split_once('=') {
            Some((key, values)) => NodeSelectorRequirement {
                key: key.trim().to_string(),
                operator: "In".to_string(),
                values: Some(
                    values
                        .split(',')
                        .map(str::trim)
                        .filter(|v| !v.is_empty())
                        .map(String::from)
                        .collect(),
                ),
            },
            None => NodeSelectorRequirement {
                key: term.to_string(),
                operator: "Exists".to_string(),
                values: None,
            },
        })
        .collect();

    if match_expressions.is_empty() {
        return None;
    }

    Some(NodeAffinity {
        required_during_scheduling_ignored_during_execution: Some(NodeSelector {
            node_selector_terms: vec![NodeSelectorTerm {
                match_expressions: Some(match_expressions),
                match_fields: None,
            }],
        }),
        ..Default::default()
    })
}
