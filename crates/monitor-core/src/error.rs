// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::io;
use std::path::PathBuf;

/// Errors that can occur while selecting and polling metrics
#[derive(Debug, thiserror::Error)]
pub enum MonitorError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to create control channel {}: {source}", path.display())]
    ControlChannelCreate {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to open control channel {}: {source}", path.display())]
    ControlChannelOpen {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to start exposition server: {0}")]
    ExpositionStart(String),

    #[error("No update function found for metric '{0}'")]
    UnknownMetric(String),

    #[error("Update slot {index} ('{name}') is not resolved")]
    Unresolved { index: usize, name: String },

    #[error("Runtime error: {0}")]
    Runtime(String),
}

impl MonitorError {
    /// Whether the error should stop the agent before any monitoring happens.
    pub fn is_startup_fatal(&self) -> bool {
        matches!(
            self,
            Self::InvalidConfig(_)
                | Self::ControlChannelCreate { .. }
                | Self::ControlChannelOpen { .. }
                | Self::ExpositionStart(_)
        )
    }
}
