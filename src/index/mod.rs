// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Reverse index from a ConfigMap to the ConfigDeployments that reference it.

pub mod dependency;

pub use dependency::{index_key, DependencyIndex, IndexKey};
