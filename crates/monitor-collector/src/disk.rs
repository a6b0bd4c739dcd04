// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::path::PathBuf;

use monitor_core::Updatable;
use prometheus::{Gauge, Registry};
use tracing::debug;

use crate::error::CollectorError;
use crate::proc::constants::PROC_DISKSTATS_PATH;
use crate::proc::read_disk_totals_from_path;
use crate::register_gauge;

/// Completed reads and writes across physical block devices
#[derive(Debug, Clone)]
pub struct DiskSampler {
    path: PathBuf,
    reads: Gauge,
    writes: Gauge,
}

impl DiskSampler {
    pub fn new(registry: &Registry) -> Result<Self, CollectorError> {
        Ok(Self {
            path: PathBuf::from(PROC_DISKSTATS_PATH),
            reads: register_gauge(
                registry,
                "disk_reads_completed_total",
                "Reads completed across block devices",
            )?,
            writes: register_gauge(
                registry,
                "disk_writes_completed_total",
                "Writes completed across block devices",
            )?,
        })
    }

    #[must_use]
    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = path.into();
        self
    }

    pub fn reads(&self) -> &Gauge {
        &self.reads
    }

    pub fn writes(&self) -> &Gauge {
        &self.writes
    }
}

impl Updatable for DiskSampler {
    fn update(&mut self) {
        match read_disk_totals_from_path(&self.path) {
            Ok(totals) => {
                self.reads.set(totals.reads_completed as f64);
                self.writes.set(totals.writes_completed as f64);
            }
            Err(e) => debug!("Skipping disk sample: {e}"),
        }
    }
}
