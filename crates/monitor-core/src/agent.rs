// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Session orchestration: control channel, resolver, scheduler.
//!
//! A session reads one payload from the control channel and either lists the
//! known metrics, ends quietly, fails on an unknown metric, or hands the
//! resolved selection to the update loop. By default the agent serves a
//! single session; with `repeat_sessions` it keeps accepting sessions until
//! one of them starts monitoring.

use crate::config::MonitorConfig;
use crate::control::{ControlChannel, SelectionRequest, SessionPayload};
use crate::error::MonitorError;
use crate::registry::{MetricRegistry, Updatable};
use crate::resolver::resolve;
use crate::scheduler::{SchedulerState, UpdateScheduler};
use crate::status::{AgentStatus, StatusReporter};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// How a control session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOutcome {
    /// Nothing to monitor: empty payload, failed read or empty selection.
    Ended,
    /// The known metrics were listed.
    Listed,
    /// The update loop ran and was cancelled.
    Monitored { iterations: u64 },
    /// Cancelled while waiting on the control channel.
    Cancelled,
}

pub struct Agent<M> {
    config: MonitorConfig,
    registry: MetricRegistry<M>,
    channel: ControlChannel,
    status: StatusReporter,
    state: SchedulerState,
}

impl<M: Updatable + Clone> Agent<M> {
    pub fn new(config: MonitorConfig, registry: MetricRegistry<M>) -> Self {
        let channel = ControlChannel::new(config.fifo_path.clone());
        let status = StatusReporter::new(config.status_path.clone());
        Self {
            config,
            registry,
            channel,
            status,
            state: SchedulerState::Idle,
        }
    }

    pub fn status(&self) -> &StatusReporter {
        &self.status
    }

    pub fn registry(&self) -> &MetricRegistry<M> {
        &self.registry
    }

    pub fn scheduler_state(&self) -> SchedulerState {
        self.state
    }

    pub fn list_known_metrics(&self) {
        info!("Available metrics:");
        for name in self.registry.names() {
            info!("  - {name}");
        }
    }

    /// Serves control sessions until one starts monitoring, a fatal error
    /// occurs, or (without `repeat_sessions`) after the first session.
    pub async fn run(&mut self, cancel: CancellationToken) -> Result<SessionOutcome, MonitorError> {
        self.status.report(&AgentStatus::Starting);

        loop {
            let outcome = self.run_session(&cancel).await?;
            let again = self.config.repeat_sessions
                && matches!(outcome, SessionOutcome::Ended | SessionOutcome::Listed)
                && !cancel.is_cancelled();
            if !again {
                return Ok(outcome);
            }
            debug!("Waiting for the next control session");
        }
    }

    /// Reads one payload and acts on it.
    pub async fn run_session(
        &mut self,
        cancel: &CancellationToken,
    ) -> Result<SessionOutcome, MonitorError> {
        let text = match self.channel.open_session(cancel).await {
            Ok(SessionPayload::Received(text)) => text,
            Ok(SessionPayload::Cancelled) => {
                debug!("Control session cancelled before a payload arrived");
                return Ok(SessionOutcome::Cancelled);
            }
            Ok(SessionPayload::Empty) => {
                warn!("Control channel closed without a payload");
                self.status
                    .report(&AgentStatus::SessionEnded("no payload received".to_string()));
                return Ok(SessionOutcome::Ended);
            }
            Ok(SessionPayload::ReadFailed(e)) => {
                error!("Failed to read control channel: {e}");
                self.status
                    .report(&AgentStatus::SessionEnded(format!("read failed: {e}")));
                return Ok(SessionOutcome::Ended);
            }
            Err(e) => {
                error!("{e}");
                self.status
                    .report(&AgentStatus::ControlChannelFailed(e.to_string()));
                return Err(e);
            }
        };

        let request = SelectionRequest::parse(&text);
        if request.is_list_command() {
            self.list_known_metrics();
            return Ok(SessionOutcome::Listed);
        }
        if request.is_empty() {
            warn!("Control payload did not name any metric");
            self.status
                .report(&AgentStatus::SessionEnded("no metrics selected".to_string()));
            return Ok(SessionOutcome::Ended);
        }

        let selection = resolve(&request, &self.registry).inspect_err(|e| {
            if let MonitorError::UnknownMetric(name) = e {
                self.status
                    .report(&AgentStatus::UnknownMetric(name.clone()));
            }
        })?;

        let scheduler =
            UpdateScheduler::start(selection, self.config.update_interval(), &self.status)?;
        self.state = scheduler.state();

        let iterations = scheduler.run(cancel.clone()).await;
        Ok(SessionOutcome::Monitored { iterations })
    }
}
