// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use k8s_openapi::api::core::v1::ConfigMap;

/// The version token of a ConfigMap. Opaque, only ever compared for equality.
pub fn version_token(config_map: &ConfigMap) -> Option<&str> {
    config_map
        .metadata
        .resource_version
        .as_deref()
        .filter(|v| !v.is_empty())
}
