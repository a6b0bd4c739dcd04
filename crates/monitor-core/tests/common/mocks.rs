// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Mock metrics for integration tests

use monitor_core::{MetricRegistry, Updatable};
use std::sync::{Arc, Mutex};

pub type CallLog = Arc<Mutex<Vec<&'static str>>>;

/// Metric that records every update in a shared log
#[derive(Debug, Clone)]
pub struct RecordingMetric {
    name: &'static str,
    calls: CallLog,
}

impl Updatable for RecordingMetric {
    fn update(&mut self) {
        self.calls
            .lock()
            .expect("call log poisoned")
            .push(self.name);
    }
}

/// Registry with `cpu`, `memory` and `disk`, all writing to one log
pub fn recording_registry() -> (MetricRegistry<RecordingMetric>, CallLog) {
    let calls: CallLog = Arc::new(Mutex::new(Vec::new()));
    let registry = ["cpu", "memory", "disk"]
        .into_iter()
        .fold(MetricRegistry::builder(), |builder, name| {
            builder.register(
                name,
                RecordingMetric {
                    name,
                    calls: Arc::clone(&calls),
                },
            )
        })
        .build();
    (registry, calls)
}
