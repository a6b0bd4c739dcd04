// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Helper functions for integration tests

use monitor_core::MonitorConfig;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

/// Config pointing the FIFO and the status marker into `dir`
pub fn test_config(dir: &Path) -> MonitorConfig {
    MonitorConfig {
        fifo_path: dir.join("monitor_fifo"),
        status_path: dir.join("monitor_status"),
        log_level: "error".to_string(),
        ..Default::default()
    }
}

/// Writes `payload` to the FIFO at `path` once the agent has created it.
///
/// The open blocks until the agent opens the read side; dropping the writer
/// closes the session.
pub fn send_payload(path: PathBuf, payload: &'static str) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        assert!(
            wait_for(Duration::from_secs(5), || path.exists()),
            "control channel was never created"
        );
        let mut writer = OpenOptions::new()
            .write(true)
            .open(&path)
            .expect("Failed to open control channel for writing");
        writer
            .write_all(payload.as_bytes())
            .expect("Failed to write control payload");
    })
}

/// Polls `condition` every 10ms until it holds or `limit` elapses
pub fn wait_for(limit: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let start = Instant::now();
    while start.elapsed() < limit {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(10));
    }
    condition()
}
