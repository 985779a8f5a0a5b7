// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Translation of ConfigMap watch events into ConfigDeployment reconcile requests.

pub mod filter;
pub mod translator;

pub use filter::VersionChangedFilter;
pub use translator::{find_dependents, ConfigMapTrigger};
