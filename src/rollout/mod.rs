// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Rolling Deployments forward to the current version of their ConfigMap.

pub mod backoff;
pub mod reconciler;
pub mod workloads;

pub use backoff::ErrorBackoff;
pub use reconciler::{ReconcileOutcome, Reconciler};
pub use workloads::{select_dependent_workloads, uses_config_map};
