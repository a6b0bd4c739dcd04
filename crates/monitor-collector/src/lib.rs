// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! System metric samplers for the metrics monitor.
//!
//! Each sampler reads one area of `/proc` and writes the result into
//! Prometheus gauges. Gauges are atomic, so the update loop can write them
//! while the exposition thread gathers the same registry.

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]

pub mod context_switches;
pub mod cpu;
pub mod disk;
pub mod error;
pub mod memory;
pub mod network;
pub mod proc;
pub mod processes;

use monitor_core::{MetricRegistry, Updatable};
use prometheus::{Gauge, Registry};

pub use context_switches::ContextSwitchSampler;
pub use cpu::CpuSampler;
pub use disk::DiskSampler;
pub use error::CollectorError;
pub use memory::MemorySampler;
pub use network::NetworkSampler;
pub use processes::ProcessSampler;

/// Every metric the monitor knows how to sample.
#[derive(Debug, Clone)]
pub enum SystemMetric {
    Cpu(CpuSampler),
    Memory(MemorySampler),
    Disk(DiskSampler),
    Network(NetworkSampler),
    Processes(ProcessSampler),
    ContextSwitches(ContextSwitchSampler),
}

impl Updatable for SystemMetric {
    fn update(&mut self) {
        match self {
            Self::Cpu(sampler) => sampler.update(),
            Self::Memory(sampler) => sampler.update(),
            Self::Disk(sampler) => sampler.update(),
            Self::Network(sampler) => sampler.update(),
            Self::Processes(sampler) => sampler.update(),
            Self::ContextSwitches(sampler) => sampler.update(),
        }
    }
}

/// Registers the gauges of every sampler in `registry` and returns the
/// metric registry the agent resolves selections against.
pub fn system_registry(registry: &Registry) -> Result<MetricRegistry<SystemMetric>, CollectorError> {
    Ok(MetricRegistry::builder()
        .register("cpu", SystemMetric::Cpu(CpuSampler::new(registry)?))
        .register("memory", SystemMetric::Memory(MemorySampler::new(registry)?))
        .register("disk", SystemMetric::Disk(DiskSampler::new(registry)?))
        .register("network", SystemMetric::Network(NetworkSampler::new(registry)?))
        .register(
            "processes",
            SystemMetric::Processes(ProcessSampler::new(registry)?),
        )
        .register(
            "context_switches",
            SystemMetric::ContextSwitches(ContextSwitchSampler::new(registry)?),
        )
        .build())
}

pub(crate) fn register_gauge(
    registry: &Registry,
    name: &str,
    help: &str,
) -> Result<Gauge, CollectorError> {
    let gauge = Gauge::new(name, help)?;
    registry.register(Box::new(gauge.clone()))?;
    Ok(gauge)
}

#[cfg(test)]
pub(crate) mod test_utils {
    use std::path::PathBuf;

    pub fn path_from_root(file: &str) -> PathBuf {
        let mut safe_path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
        safe_path.push(file);
        safe_path
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::test_utils::path_from_root;
    use monitor_core::{resolve, SelectionRequest, StatusReporter, UpdateScheduler};
    use prometheus::{Encoder, TextEncoder};
    use std::time::Duration;

    fn render(registry: &Registry) -> String {
        let mut buffer = Vec::new();
        TextEncoder::new()
            .encode(&registry.gather(), &mut buffer)
            .unwrap();
        String::from_utf8(buffer).unwrap()
    }

    #[test]
    fn test_system_registry_order() {
        let registry = system_registry(&Registry::new()).unwrap();
        assert_eq!(
            registry.names().collect::<Vec<_>>(),
            [
                "cpu",
                "memory",
                "disk",
                "network",
                "processes",
                "context_switches"
            ]
        );
    }

    #[test]
    fn test_gauges_are_registered() {
        let prometheus = Registry::new();
        system_registry(&prometheus).unwrap();

        let names: Vec<String> = prometheus
            .gather()
            .iter()
            .map(|family| family.get_name().to_string())
            .collect();
        assert_eq!(names.len(), 10);
        assert!(names.contains(&"cpu_usage_percentage".to_string()));
        assert!(names.contains(&"context_switches_total".to_string()));
    }

    #[test]
    fn test_registering_twice_fails() {
        let prometheus = Registry::new();
        system_registry(&prometheus).unwrap();

        let err = system_registry(&prometheus).unwrap_err();
        assert!(matches!(err, CollectorError::Registration(_)));
    }

    #[test]
    fn test_resolved_copies_share_gauges() {
        let prometheus = Registry::new();
        let memory = MemorySampler::new(&prometheus)
            .unwrap()
            .with_path(path_from_root("./tests/proc/meminfo"));
        let registry = MetricRegistry::builder()
            .register("memory", SystemMetric::Memory(memory))
            .build();
        let dir = tempfile::tempdir().unwrap();
        let status = StatusReporter::new(dir.path().join("status"));

        let selection = resolve(&SelectionRequest::parse("memory"), &registry).unwrap();
        let mut scheduler =
            UpdateScheduler::start(selection, Duration::from_secs(1), &status).unwrap();
        assert_eq!(scheduler.run_iteration(), 1);

        let text = render(&prometheus);
        assert!(text.contains("# TYPE memory_total_bytes gauge"));
        assert!(text.contains("memory_usage_percentage 75"));
    }
}
