// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Resource types and typed accessors for the annotation protocol.

pub mod config_deployment;
pub mod config_map;
pub mod deployment;

pub use config_deployment::{ConfigDeployment, ConfigDeploymentSpec};
