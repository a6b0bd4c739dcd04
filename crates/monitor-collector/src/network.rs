// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::path::PathBuf;

use monitor_core::Updatable;
use prometheus::{Gauge, Registry};
use tracing::debug;

use crate::error::CollectorError;
use crate::proc::constants::PROC_NET_DEV_PATH;
use crate::proc::read_network_totals_from_path;
use crate::register_gauge;

/// Received and transmitted bytes across non-loopback interfaces
#[derive(Debug, Clone)]
pub struct NetworkSampler {
    path: PathBuf,
    received: Gauge,
    transmitted: Gauge,
}

impl NetworkSampler {
    pub fn new(registry: &Registry) -> Result<Self, CollectorError> {
        Ok(Self {
            path: PathBuf::from(PROC_NET_DEV_PATH),
            received: register_gauge(
                registry,
                "network_receive_bytes_total",
                "Bytes received across interfaces",
            )?,
            transmitted: register_gauge(
                registry,
                "network_transmit_bytes_total",
                "Bytes transmitted across interfaces",
            )?,
        })
    }

    #[must_use]
    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = path.into();
        self
    }

    pub fn received(&self) -> &Gauge {
        &self.received
    }

    pub fn transmitted(&self) -> &Gauge {
        &self.transmitted
    }
}

impl Updatable for NetworkSampler {
    fn update(&mut self) {
        match read_network_totals_from_path(&self.path) {
            Ok(totals) => {
                self.received.set(totals.rx_bytes as f64);
                self.transmitted.set(totals.tx_bytes as f64);
            }
            Err(e) => debug!("Skipping network sample: {e}"),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::test_utils::path_from_root;

    #[test]
    fn test_update_skips_loopback() {
        let registry = Registry::new();
        let mut sampler = NetworkSampler::new(&registry)
            .unwrap()
            .with_path(path_from_root("./tests/proc/net/dev"));

        sampler.update();

        assert_eq!(sampler.received().get(), 2300.0);
        assert_eq!(sampler.transmitted().get(), 3240.0);
    }
}
