// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::io;
use std::path::PathBuf;

/// Errors raised while registering or sampling system metrics
#[derive(Debug, thiserror::Error)]
pub enum CollectorError {
    #[error("Failed to register gauge: {0}")]
    Registration(#[from] prometheus::Error),

    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to parse {}: {reason}", path.display())]
    Parse { path: PathBuf, reason: String },
}

impl CollectorError {
    pub(crate) fn parse(path: &std::path::Path, reason: impl Into<String>) -> Self {
        Self::Parse {
            path: path.to_path_buf(),
            reason: reason.into(),
        }
    }
}
