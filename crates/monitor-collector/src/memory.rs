// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::path::PathBuf;

use monitor_core::Updatable;
use prometheus::{Gauge, Registry};
use tracing::debug;

use crate::error::CollectorError;
use crate::proc::constants::PROC_MEMINFO_PATH;
use crate::proc::read_meminfo_from_path;
use crate::register_gauge;

/// Memory usage from `MemTotal` and `MemAvailable`
#[derive(Debug, Clone)]
pub struct MemorySampler {
    path: PathBuf,
    usage: Gauge,
    total: Gauge,
    available: Gauge,
}

impl MemorySampler {
    pub fn new(registry: &Registry) -> Result<Self, CollectorError> {
        Ok(Self {
            path: PathBuf::from(PROC_MEMINFO_PATH),
            usage: register_gauge(
                registry,
                "memory_usage_percentage",
                "Share of memory not available, in percent",
            )?,
            total: register_gauge(registry, "memory_total_bytes", "Total memory in bytes")?,
            available: register_gauge(
                registry,
                "memory_available_bytes",
                "Available memory in bytes",
            )?,
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

    pub fn total(&self) -> &Gauge {
        &self.total
    }

    pub fn available(&self) -> &Gauge {
        &self.available
    }
}

impl Updatable for MemorySampler {
    fn update(&mut self) {
        match read_meminfo_from_path(&self.path) {
            Ok(info) => {
                self.usage.set(info.usage_percentage());
                self.total.set(info.total_bytes as f64);
                self.available.set(info.available_bytes as f64);
            }
            Err(e) => debug!("Skipping memory sample: {e}"),
        }
    }
}
