// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

/// Kubernetes annotation keys shared with the Deployment owners
pub mod annotations {
    /// Deployment metadata annotation naming the ConfigMap it consumes
    pub const CONFIG_MAP_USED: &str = "configMapUsed";
    /// Pod template annotation holding the last applied ConfigMap version
    pub const CONFIG_MAP_VERSION: &str = "configMapVersion";
}

/// The operator name used as field manager and in logs
pub const OPERATOR_NAME: &str = "config-rollout";

/// ConfigDeployment CRD coordinates and polling configuration
pub mod crd {
    pub const GROUP: &str = "apps.tutorial.kubebuilder.io";
    pub const VERSION: &str = "v1";
    pub const KIND: &str = "ConfigDeployment";
    /// Initial polling interval in seconds when waiting for CRD
    pub const POLL_INTERVAL_SECS: u64 = 10;
    /// Maximum polling interval in seconds (exponential backoff cap)
    pub const POLL_MAX_INTERVAL_SECS: u64 = 60;
}

/// Requeue behaviour of the ConfigDeployment controller
pub mod reconcile {
    /// First requeue delay after a failed pass
    pub const ERROR_BACKOFF_BASE_SECS: u64 = 5;
    /// Upper bound for the failed pass requeue delay
    pub const ERROR_BACKOFF_MAX_SECS: u64 = 300;
    /// Update attempts per Deployment before a pass gives up on conflicts
    pub const MAX_CONFLICT_RETRIES: usize = 3;
    pub const DEFAULT_CONCURRENCY: u16 = 4;
    pub const DEFAULT_RESYNC_INTERVAL_SECS: u64 = 300;
}
