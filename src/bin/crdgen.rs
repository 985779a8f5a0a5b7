// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Print the ConfigDeployment CRD for `kubectl apply -f -`.

use config_rollout::types::ConfigDeployment;
use kube::CustomResourceExt;

fn main() -> anyhow::Result<()> {
    print!("{}", serde_yaml::to_string(&ConfigDeployment::crd())?);
    Ok(())
}
