// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::path::PathBuf;

use monitor_core::Updatable;
use prometheus::{Gauge, Registry};
use tracing::debug;

use crate::error::CollectorError;
use crate::proc::constants::{CONTEXT_SWITCHES_KEY, PROC_STAT_PATH};
use crate::proc::read_stat_counter_from_path;
use crate::register_gauge;

/// Context switches since boot, from `ctxt`
#[derive(Debug, Clone)]
pub struct ContextSwitchSampler {
    path: PathBuf,
    switches: Gauge,
}

impl ContextSwitchSampler {
    pub fn new(registry: &Registry) -> Result<Self, CollectorError> {
        Ok(Self {
            path: PathBuf::from(PROC_STAT_PATH),
            switches: register_gauge(
                registry,
                "context_switches_total",
                "Context switches since boot",
            )?,
        })
    }

    #[must_use]
    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = path.into();
        self
    }

    pub fn switches(&self) -> &Gauge {
        &self.switches
    }
}

impl Updatable for ContextSwitchSampler {
    fn update(&mut self) {
        match read_stat_counter_from_path(&self.path, CONTEXT_SWITCHES_KEY) {
            Ok(switches) => self.switches.set(switches as f64),
            Err(e) => debug!("Skipping context switch sample: {e}"),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::test_utils::path_from_root;

    #[test]
    fn test_update_reads_ctxt() {
        let registry = Registry::new();
        let mut sampler = ContextSwitchSampler::new(&registry)
            .unwrap()
            .with_path(path_from_root("./tests/proc/stat"));

        sampler.update();

        assert_eq!(sampler.switches().get(), 987654.0);
    }
}
