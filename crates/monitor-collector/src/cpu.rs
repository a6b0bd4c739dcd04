// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! CPU usage sampler
//!
//! Usage is the busy share of the jiffies that elapsed between two samples of
//! the aggregate `/proc/stat` line. The first sample is measured against boot.

use std::path::PathBuf;

use monitor_core::Updatable;
use prometheus::{Gauge, Registry};
use tracing::debug;

use crate::error::CollectorError;
use crate::proc::constants::PROC_STAT_PATH;
use crate::proc::{read_cpu_times_from_path, CpuTimes};
use crate::register_gauge;

const CPU_USAGE_METRIC: &str = "cpu_usage_percentage";

#[derive(Debug, Clone)]
pub struct CpuSampler {
    path: PathBuf,
    usage: Gauge,
    previous: CpuTimes,
}

impl CpuSampler {
    pub fn new(registry: &Registry) -> Result<Self, CollectorError> {
        Ok(Self {
            path: PathBuf::from(PROC_STAT_PATH),
            usage: register_gauge(registry, CPU_USAGE_METRIC, "CPU usage in percent")?,
            previous: CpuTimes::default(),
        })
    }

    #[must_use]
    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = path.into();
        self
    }

    pub fn usage(&self) -> &Gauge {
        &self.usage
    }
}

impl Updatable for CpuSampler {
    fn update(&mut self) {
        match read_cpu_times_from_path(&self.path) {
            Ok(current) => {
                if let Some(usage) = current.usage_since(&self.previous) {
                    debug!("CPU usage: {usage:.2}%");
                    self.usage.set(usage);
                }
                self.previous = current;
            }
            Err(e) => debug!("Skipping CPU sample: {e}"),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::test_utils::path_from_root;

    #[test]
    fn test_usage_between_samples() {
        let registry = Registry::new();
        let mut sampler = CpuSampler::new(&registry)
            .unwrap()
            .with_path(path_from_root("./tests/proc/stat"));

        sampler.update();
        let since_boot = 2530.0 / 20380.0 * 100.0;
        assert!((sampler.usage().get() - since_boot).abs() < 1e-9);

        let mut sampler = sampler.with_path(path_from_root("./tests/proc/stat_later"));
        sampler.update();
        // 150 busy jiffies out of 500.
        assert!((sampler.usage().get() - 30.0).abs() < 1e-9);
    }

    #[test]
    fn test_failed_sample_keeps_last_value() {
        let registry = Registry::new();
        let mut sampler = CpuSampler::new(&registry)
            .unwrap()
            .with_path(path_from_root("./tests/proc/stat"));
        sampler.update();
        let last = sampler.usage().get();

        let mut sampler = sampler.with_path(path_from_root("./tests/proc/stat_malformed"));
        sampler.update();
        assert!((sampler.usage().get() - last).abs() < f64::EPSILON);
    }
}
