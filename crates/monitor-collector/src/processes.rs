// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::path::PathBuf;

use monitor_core::Updatable;
use prometheus::{Gauge, Registry};
use tracing::debug;

use crate::error::CollectorError;
use crate::proc::constants::{PROCS_RUNNING_KEY, PROC_STAT_PATH};
use crate::proc::read_stat_counter_from_path;
use crate::register_gauge;

/// Runnable processes, from `procs_running`
#[derive(Debug, Clone)]
pub struct ProcessSampler {
    path: PathBuf,
    running: Gauge,
}

impl ProcessSampler {
    pub fn new(registry: &Registry) -> Result<Self, CollectorError> {
        Ok(Self {
            path: PathBuf::from(PROC_STAT_PATH),
            running: register_gauge(registry, "running_processes", "Processes in runnable state")?,
        })
    }

    #[must_use]
    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = path.into();
        self
    }

    pub fn running(&self) -> &Gauge {
        &self.running
    }
}

impl Updatable for ProcessSampler {
    fn update(&mut self) {
        match read_stat_counter_from_path(&self.path, PROCS_RUNNING_KEY) {
            Ok(running) => self.running.set(running as f64),
            Err(e) => debug!("Skipping process sample: {e}"),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::test_utils::path_from_root;

    #[test]
    fn test_update_tracks_latest_value() {
        let registry = Registry::new();
        let mut sampler = ProcessSampler::new(&registry)
            .unwrap()
            .with_path(path_from_root("./tests/proc/stat"));
        sampler.update();
        assert_eq!(sampler.running().get(), 3.0);

        let mut sampler = sampler.with_path(path_from_root("./tests/proc/stat_later"));
        sampler.update();
        assert_eq!(sampler.running().get(), 5.0);
    }
}
