// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use crate::constants::reconcile::{DEFAULT_CONCURRENCY, DEFAULT_RESYNC_INTERVAL_SECS};
use anyhow::{Context, Result};
use std::env;
use std::time::Duration;

/// Operator configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// Restrict all watches to this namespace; all namespaces when unset
    pub watch_namespace: Option<String>,
    /// Maximum number of ConfigDeployments reconciled in parallel
    pub concurrency: u16,
    pub resync_interval: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            watch_namespace: None,
            concurrency: DEFAULT_CONCURRENCY,
            resync_interval: Duration::from_secs(DEFAULT_RESYNC_INTERVAL_SECS),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let watch_namespace = lookup("WATCH_NAMESPACE").filter(|ns| !ns.trim().is_empty());

        let concurrency = match lookup("RECONCILE_CONCURRENCY") {
            Some(value) => value
                .trim()
                .parse::<u16>()
                .with_context(|| format!("RECONCILE_CONCURRENCY is not a valid number: {}", value))?,
            None => DEFAULT_CONCURRENCY,
        };

        let resync_secs = match lookup("RESYNC_INTERVAL_SECS") {
            Some(value) => value
                .trim()
                .parse::<u64>()
                .with_context(|| format!("RESYNC_INTERVAL_SECS is not a valid number: {}", value))?,
            None => DEFAULT_RESYNC_INTERVAL_SECS,
        };

        Ok(Config {
            watch_namespace,
            concurrency,
            resync_interval: Duration::from_secs(resync_secs),
        })
    }
}
