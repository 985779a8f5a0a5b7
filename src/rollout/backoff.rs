// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use crate::constants::reconcile::{ERROR_BACKOFF_BASE_SECS, ERROR_BACKOFF_MAX_SECS};
use crate::types::ConfigDeployment;
use kube::runtime::reflector::ObjectRef;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

struct Failures {
    count: u32,
    last: Instant,
}

/// Per-ConfigDeployment exponential requeue delay after failed passes.
///
/// An object still failing is retried within `max`, so entries idle for
/// twice that long belong to deleted objects and are dropped.
pub struct ErrorBackoff {
    failures: Mutex<HashMap<ObjectRef<ConfigDeployment>, Failures>>,
    base: Duration,
    max: Duration,
}

impl Default for ErrorBackoff {
    fn default() -> Self {
        Self::new(
            Duration::from_secs(ERROR_BACKOFF_BASE_SECS),
            Duration::from_secs(ERROR_BACKOFF_MAX_SECS),
        )
    }
}

impl ErrorBackoff {
    pub fn new(base: Duration, max: Duration) -> Self {
        Self {
            failures: Mutex::new(HashMap::new()),
            base,
            max,
        }
    }

    /// Count a failure and return how long to wait before the next attempt
    pub fn record_failure(&self, key: &ObjectRef<ConfigDeployment>) -> Duration {
        let now = Instant::now();
        let idle = self.max.saturating_mul(2);
        let mut failures = self.failures.lock().unwrap_or_else(|p| p.into_inner());
        failures.retain(|_, f| now.saturating_duration_since(f.last) <= idle);

        let entry = failures
            .entry(key.clone())
            .or_insert(Failures { count: 0, last: now });
        entry.count = entry.count.saturating_add(1);
        entry.last = now;

        let factor = 2u32.saturating_pow(entry.count - 1);
        self.base.saturating_mul(factor).min(self.max)
    }

    pub fn reset(&self, key: &ObjectRef<ConfigDeployment>) {
        let mut failures = self.failures.lock().unwrap_or_else(|p| p.into_inner());
        failures.remove(key);
    }

    /// Number of objects with recorded failures
    pub fn tracked(&self) -> usize {
        self.failures.lock().unwrap_or_else(|p| p.into_inner()).len()
    }
}
