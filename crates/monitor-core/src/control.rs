// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Control channel that carries the metric selection.
//!
//! The channel is a named pipe at a well-known path. A session creates the
//! pipe (reusing an existing one), blocks until a writer connects, reads one
//! bounded payload until the writer closes, and removes the pipe again, so a
//! later session always starts from a fresh channel.
//!
//! Payload format is a comma-separated list of metric names:
//!
//! ```text
//! cpu, memory ,disk
//! ```
//!
//! The single token `1` is a command rather than a selection: it asks the
//! agent to list the metrics it knows.

use crate::error::MonitorError;
use nix::errno::Errno;
use nix::fcntl::OFlag;
use nix::sys::stat::Mode;
use nix::unistd::mkfifo;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Read};
use std::os::unix::fs::{FileTypeExt, OpenOptionsExt};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, trace};

/// Size of the read buffer of one session. One byte is kept free, so a
/// payload is at most `BUFFER_SIZE - 1` bytes long.
pub const BUFFER_SIZE: usize = 256;

/// Token that requests the list of known metrics.
pub const LIST_COMMAND: &str = "1";

const FIFO_MODE: u32 = 0o666;

const RELEASE_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Ordered metric names parsed from one control payload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionRequest {
    names: Vec<String>,
}

impl SelectionRequest {
    /// Splits `payload` on commas, trims every token and drops the empty ones.
    pub fn parse(payload: &str) -> Self {
        let names = payload
            .trim()
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .collect();
        Self { names }
    }

    /// Whether the payload asked for the list of known metrics instead of a
    /// selection. Only the leading token is inspected.
    pub fn is_list_command(&self) -> bool {
        self.names.first().is_some_and(|name| name == LIST_COMMAND)
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for SelectionRequest {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            names: iter.into_iter().map(Into::into).collect(),
        }
    }
}

/// What one session delivered.
#[derive(Debug)]
pub enum SessionPayload {
    /// A writer sent a non-empty payload.
    Received(String),
    /// The writer closed the channel without sending anything.
    Empty,
    /// Reading failed after the channel was opened.
    ReadFailed(io::Error),
    /// The session was cancelled before a payload arrived.
    Cancelled,
}

#[derive(Debug, Clone)]
pub struct ControlChannel {
    path: PathBuf,
    max_payload: usize,
}

impl ControlChannel {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            max_payload: BUFFER_SIZE - 1,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Runs one session: create, open, read, remove.
    ///
    /// Creating or opening the pipe is an error; anything that goes wrong
    /// after that is reported through [`SessionPayload`]. The blocking part
    /// runs on the blocking thread pool. When `cancel` fires, the pending
    /// reader is released and awaited, so the pipe is gone once this returns.
    pub async fn open_session(
        &self,
        cancel: &CancellationToken,
    ) -> Result<SessionPayload, MonitorError> {
        let path = self.path.clone();
        let max_payload = self.max_payload;
        let session_cancel = cancel.clone();
        let mut task =
            tokio::task::spawn_blocking(move || read_session(&path, max_payload, &session_cancel));

        tokio::select! {
            res = &mut task => res
                .map_err(|e| MonitorError::Runtime(format!("control channel task failed: {e}")))?,
            _ = cancel.cancelled() => {
                self.release(task).await;
                Ok(SessionPayload::Cancelled)
            }
        }
    }

    /// Wakes the session task until it finishes, then makes sure the pipe
    /// is removed.
    ///
    /// The task may still be about to block in `open`, so a single wake-up
    /// is not enough.
    async fn release(&self, mut task: JoinHandle<Result<SessionPayload, MonitorError>>) {
        loop {
            wake_reader(&self.path);
            tokio::select! {
                res = &mut task => {
                    if let Err(e) = res {
                        error!("Control channel task failed while cancelling: {e}");
                    }
                    break;
                }
                _ = sleep(RELEASE_POLL_INTERVAL) => {}
            }
        }
        drop(FifoGuard { path: &self.path });
    }
}

/// Connects and drops a non-blocking writer, so a reader blocked in `open`
/// returns and sees end of file. Fails harmlessly when nobody is reading.
fn wake_reader(path: &Path) {
    match OpenOptions::new()
        .write(true)
        .custom_flags(OFlag::O_NONBLOCK.bits())
        .open(path)
    {
        Ok(_writer) => debug!("Released pending reader on {}", path.display()),
        Err(e) => trace!("No pending reader on {}: {e}", path.display()),
    }
}

/// Removes the pipe when the session ends, whatever the outcome.
struct FifoGuard<'a> {
    path: &'a Path,
}

impl Drop for FifoGuard<'_> {
    fn drop(&mut self) {
        match fs::remove_file(self.path) {
            Ok(()) => debug!("Removed control channel {}", self.path.display()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => error!(
                "Failed to remove control channel {}: {e}",
                self.path.display()
            ),
        }
    }
}

fn create_fifo(path: &Path) -> Result<(), MonitorError> {
    match mkfifo(path, Mode::from_bits_truncate(FIFO_MODE)) {
        Ok(()) => {
            debug!("Created control channel {}", path.display());
            Ok(())
        }
        Err(Errno::EEXIST) => {
            let is_fifo = fs::metadata(path)
                .map(|meta| meta.file_type().is_fifo())
                .unwrap_or(false);
            if is_fifo {
                debug!("Reusing control channel {}", path.display());
                Ok(())
            } else {
                Err(MonitorError::ControlChannelCreate {
                    path: path.to_path_buf(),
                    source: io::Error::new(
                        io::ErrorKind::AlreadyExists,
                        "path exists and is not a named pipe",
                    ),
                })
            }
        }
        Err(errno) => Err(MonitorError::ControlChannelCreate {
            path: path.to_path_buf(),
            source: io::Error::from(errno),
        }),
    }
}

fn read_session(
    path: &Path,
    max_payload: usize,
    cancel: &CancellationToken,
) -> Result<SessionPayload, MonitorError> {
    if cancel.is_cancelled() {
        return Ok(SessionPayload::Cancelled);
    }
    create_fifo(path)?;
    let _guard = FifoGuard { path };
    if cancel.is_cancelled() {
        return Ok(SessionPayload::Cancelled);
    }

    debug!("Waiting for a writer on {}", path.display());
    let file = File::open(path).map_err(|source| MonitorError::ControlChannelOpen {
        path: path.to_path_buf(),
        source,
    })?;

    let mut buf = Vec::with_capacity(max_payload);
    match file.take(max_payload as u64).read_to_end(&mut buf) {
        Ok(0) => Ok(SessionPayload::Empty),
        Ok(amt) => {
            let payload = String::from_utf8_lossy(&buf[..amt]).into_owned();
            trace!("Received {amt} bytes on control channel: {payload}");
            Ok(SessionPayload::Received(payload))
        }
        Err(e) => Ok(SessionPayload::ReadFailed(e)),
    }
}
