// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! The ConfigMap the csi-operator reads container image overrides from.

use crate::config::ImageOverrides;
use crate::constants::IMAGE_SET_CONFIGMAP;
use k8s_openapi::api::core::v1::ConfigMap;
use kube::api::ObjectMeta;
use std::collections::BTreeMap;

pub fn build_image_set(namespace: &str, images: &ImageOverrides) -> ConfigMap {
    let entries = [
        ("plugin", &images.plugin),
        ("registrar", &images.registrar),
        ("provisioner", &images.provisioner),
        ("attacher", &images.attacher),
        ("resizer", &images.resizer),
        ("snapshotter", &images.snapshotter),
        ("addons", &images.addons),
    ];
    let data: BTreeMap<String, String> = entries
        .into_iter()
        .filter_map(|(key, image)| image.as_ref().map(|i| (key.to_string(), i.clone())))
        .collect();

    ConfigMap {
        metadata: ObjectMeta {
            name: Some(IMAGE_SET_CONFIGMAP.to_string()),
            namespace: Some(namespace.to_string()),
            ..Default::default()
        },
        data: Some(data),
        ..Default::default()
    }
}
