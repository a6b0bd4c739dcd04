// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Launches the Grafana and Prometheus servers installed under `$HOME`.
//!
//! The servers are started detached with null stdio and are never waited on.
//! A companion that fails to start is logged and skipped.

use std::env;
use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};

use tracing::{error, info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Companion {
    name: &'static str,
    program: PathBuf,
    args: Vec<OsString>,
}

impl Companion {
    pub fn name(&self) -> &str {
        self.name
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn args(&self) -> &[OsString] {
        &self.args
    }

    fn spawn(&self) -> io::Result<Child> {
        Command::new(self.program())
            .args(self.args())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
    }
}

/// Grafana then Prometheus, both laid out under `home`.
pub fn companions(home: &Path) -> Vec<Companion> {
    let grafana = home.join("grafana");
    let prometheus = home.join("prometheus");

    let mut config_flag = OsString::from("--config.file=");
    config_flag.push(prometheus.join("prometheus.yml"));

    vec![
        Companion {
            name: "grafana",
            program: grafana.join("bin").join("grafana"),
            args: vec![
                "server".into(),
                "--config".into(),
                grafana.join("conf").join("defaults.ini").into(),
                "--homepath".into(),
                grafana.clone().into(),
            ],
        },
        Companion {
            name: "prometheus",
            program: prometheus.join("prometheus"),
            args: vec![config_flag],
        },
    ]
}

/// Starts every companion found under `$HOME` and returns how many started.
pub fn launch_companions() -> usize {
    let Some(home) = env::var_os("HOME") else {
        warn!("HOME is not set, not launching companion servers");
        return 0;
    };

    let mut launched = 0;
    for companion in companions(Path::new(&home)) {
        match companion.spawn() {
            Ok(child) => {
                info!("Launched {} (pid {})", companion.name(), child.id());
                launched += 1;
            }
            Err(e) => error!(
                "Failed to launch {} from {}: {e}",
                companion.name(),
                companion.program().display()
            ),
        }
    }
    launched
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn args(companion: &Companion) -> Vec<&str> {
        companion
            .args()
            .iter()
            .map(|arg| arg.to_str().unwrap())
            .collect()
    }

    #[test]
    fn test_companion_commands() {
        let companions = companions(Path::new("/home/monitor"));
        assert_eq!(companions.len(), 2);

        let grafana = &companions[0];
        assert_eq!(grafana.name(), "grafana");
        assert_eq!(
            grafana.program(),
            Path::new("/home/monitor/grafana/bin/grafana")
        );
        assert_eq!(
            args(grafana),
            [
                "server",
                "--config",
                "/home/monitor/grafana/conf/defaults.ini",
                "--homepath",
                "/home/monitor/grafana",
            ]
        );

        let prometheus = &companions[1];
        assert_eq!(
            prometheus.program(),
            Path::new("/home/monitor/prometheus/prometheus")
        );
        assert_eq!(
            args(prometheus),
            ["--config.file=/home/monitor/prometheus/prometheus.yml"]
        );
    }

    #[test]
    fn test_missing_program_fails_to_spawn() {
        let companions = companions(Path::new("/nonexistent/monitor-home"));
        assert!(companions.iter().all(|companion| companion.spawn().is_err()));
    }
}
