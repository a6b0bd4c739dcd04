// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use crate::error::MonitorError;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_FIFO_PATH: &str = "/tmp/monitor_fifo";
pub const DEFAULT_STATUS_PATH: &str = "/tmp/monitor_status";
pub const DEFAULT_UPDATE_INTERVAL_SECS: u64 = 1;
pub const DEFAULT_METRICS_HOST: &str = "0.0.0.0";
pub const DEFAULT_METRICS_PORT: u16 = 8000;
pub const DEFAULT_LOG_LEVEL: &str = "info";

pub const VALID_LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Configuration for the metrics monitor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorConfig {
    /// Path of the control FIFO the selection payload is written to
    pub fifo_path: PathBuf,
    /// Path of the overwritten status marker
    pub status_path: PathBuf,
    /// Seconds between two passes of the update loop
    pub update_interval_secs: u64,
    /// Host the exposition endpoint binds to
    pub metrics_host: String,
    /// Port the exposition endpoint binds to
    pub metrics_port: u16,
    /// Log level (e.g., trace, debug, info, warn, error)
    pub log_level: String,
    /// Accept a new control session after one that did not start monitoring
    pub repeat_sessions: bool,
    /// Spawn the Prometheus and Grafana servers at startup
    pub launch_companions: bool,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            fifo_path: PathBuf::from(DEFAULT_FIFO_PATH),
            status_path: PathBuf::from(DEFAULT_STATUS_PATH),
            update_interval_secs: DEFAULT_UPDATE_INTERVAL_SECS,
            metrics_host: DEFAULT_METRICS_HOST.to_string(),
            metrics_port: DEFAULT_METRICS_PORT,
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            repeat_sessions: false,
            launch_companions: false,
        }
    }
}

impl MonitorConfig {
    /// Create configuration from environment variables
    pub fn from_env() -> Result<Self, MonitorError> {
        let defaults = Self::default();

        let fifo_path = env::var("MONITOR_FIFO_PATH")
            .map(PathBuf::from)
            .unwrap_or(defaults.fifo_path);
        let status_path = env::var("MONITOR_STATUS_PATH")
            .map(PathBuf::from)
            .unwrap_or(defaults.status_path);
        let update_interval_secs = match env::var("MONITOR_UPDATE_INTERVAL_SECS") {
            Ok(val) => val.trim().parse::<u64>().map_err(|e| {
                MonitorError::InvalidConfig(format!(
                    "MONITOR_UPDATE_INTERVAL_SECS must be a positive integer, got '{val}': {e}"
                ))
            })?,
            Err(_) => defaults.update_interval_secs,
        };
        let metrics_host = env::var("MONITOR_METRICS_HOST").unwrap_or(defaults.metrics_host);
        let metrics_port = match env::var("MONITOR_METRICS_PORT") {
            Ok(val) => val.trim().parse::<u16>().map_err(|e| {
                MonitorError::InvalidConfig(format!(
                    "MONITOR_METRICS_PORT must be a port number, got '{val}': {e}"
                ))
            })?,
            Err(_) => defaults.metrics_port,
        };
        let log_level = env::var("MONITOR_LOG_LEVEL")
            .map(|val| val.to_lowercase())
            .unwrap_or(defaults.log_level);
        let repeat_sessions = env::var("MONITOR_REPEAT_SESSIONS")
            .map(|val| parse_bool(&val))
            .unwrap_or(defaults.repeat_sessions);
        let launch_companions = env::var("MONITOR_LAUNCH_COMPANIONS")
            .map(|val| parse_bool(&val))
            .unwrap_or(defaults.launch_companions);

        let config = Self {
            fifo_path,
            status_path,
            update_interval_secs,
            metrics_host,
            metrics_port,
            log_level,
            repeat_sessions,
            launch_companions,
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), MonitorError> {
        if self.update_interval_secs == 0 {
            return Err(MonitorError::InvalidConfig(
                "Update interval must be at least one second".to_string(),
            ));
        }

        if self.metrics_port == 0 {
            return Err(MonitorError::InvalidConfig(
                "Metrics port must be greater than 0".to_string(),
            ));
        }

        if self.metrics_host.trim().is_empty() {
            return Err(MonitorError::InvalidConfig(
                "MONITOR_METRICS_HOST cannot be empty".to_string(),
            ));
        }

        if self.fifo_path.as_os_str().is_empty() || self.status_path.as_os_str().is_empty() {
            return Err(MonitorError::InvalidConfig(
                "FIFO and status paths cannot be empty".to_string(),
            ));
        }

        if self.fifo_path == self.status_path {
            return Err(MonitorError::InvalidConfig(format!(
                "FIFO and status marker must not share the path {}",
                self.fifo_path.display()
            )));
        }

        if !VALID_LOG_LEVELS.contains(&self.log_level.as_str()) {
            return Err(MonitorError::InvalidConfig(format!(
                "Invalid log level '{}'. Must be one of: trace, debug, info, warn, error",
                self.log_level
            )));
        }

        Ok(())
    }

    pub fn update_interval(&self) -> Duration {
        Duration::from_secs(self.update_interval_secs)
    }

    /// `host:port` of the exposition endpoint
    pub fn metrics_addr(&self) -> String {
        format!("{}:{}", self.metrics_host, self.metrics_port)
    }
}

fn parse_bool(val: &str) -> bool {
    matches!(val.trim().to_lowercase().as_str(), "true" | "1" | "yes")
}
