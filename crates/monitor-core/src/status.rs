// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Single-line status marker.
//!
//! The marker is a plain file that always holds exactly one line: the most
//! recent lifecycle transition or fatal condition of the agent. Every report
//! truncates the file, so readers never see history.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, error};

/// Lifecycle stage or last fatal condition of the agent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgentStatus {
    Starting,
    MonitoringStarted,
    UnknownMetric(String),
    ControlChannelFailed(String),
    ExpositionFailed(String),
    SessionEnded(String),
}

impl fmt::Display for AgentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Starting => write!(f, "Starting monitoring from FIFO"),
            Self::MonitoringStarted => write!(f, "Metrics monitoring started"),
            Self::UnknownMetric(name) => {
                write!(f, "Error: No update function found for metric '{name}'")
            }
            Self::ControlChannelFailed(reason) => {
                write!(f, "Error: control channel unavailable: {reason}")
            }
            Self::ExpositionFailed(reason) => {
                write!(f, "Error creating HTTP server thread: {reason}")
            }
            Self::SessionEnded(reason) => write!(f, "Session ended: {reason}"),
        }
    }
}

/// Writes [`AgentStatus`] lines to the status marker.
#[derive(Debug, Clone)]
pub struct StatusReporter {
    path: PathBuf,
}

impl StatusReporter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Overwrites the marker with `status`.
    ///
    /// A failed write is logged and otherwise ignored; losing a status line
    /// never stops the agent.
    pub fn report(&self, status: &AgentStatus) {
        let line = format!("{status}\n");
        match fs::write(&self.path, line) {
            Ok(()) => debug!("Status updated: {status}"),
            Err(e) => error!(
                "Failed to write status to {}: {e}",
                self.path.display()
            ),
        }
    }

    /// Current line of the marker, without the trailing newline.
    pub fn read(&self) -> io::Result<String> {
        let contents = fs::read_to_string(&self.path)?;
        Ok(contents.trim_end_matches('\n').to_string())
    }
}
