// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Fixed-interval update loop.
//!
//! The scheduler is idle until it is handed a fully resolved selection. From
//! then on it runs every metric once, in selection order, sleeps for the
//! configured interval and starts over. It never goes back to idle; the loop
//! only ends when its cancellation token fires.

use std::time::Duration;

use crate::error::MonitorError;
use crate::registry::Updatable;
use crate::resolver::ResolvedSelection;
use crate::status::{AgentStatus, StatusReporter};
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Running,
}

#[derive(Debug)]
pub struct UpdateScheduler<M> {
    interval: Duration,
    state: SchedulerState,
    selection: ResolvedSelection<M>,
    iterations: u64,
}

impl<M: Updatable> UpdateScheduler<M> {
    /// Moves from idle to running with `selection`.
    ///
    /// A selection with an unresolved slot is refused and the scheduler never
    /// starts. On success the status marker reports that monitoring started.
    pub fn start(
        selection: ResolvedSelection<M>,
        interval: Duration,
        status: &StatusReporter,
    ) -> Result<Self, MonitorError> {
        if let Some((index, name)) = selection.first_unresolved() {
            return Err(MonitorError::Unresolved {
                index,
                name: name.to_string(),
            });
        }

        status.report(&AgentStatus::MonitoringStarted);
        info!(
            "Metrics monitoring started: {} metric(s) every {:?}",
            selection.len(),
            interval
        );

        Ok(Self {
            interval,
            state: SchedulerState::Running,
            selection,
            iterations: 0,
        })
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    pub fn iterations(&self) -> u64 {
        self.iterations
    }

    pub fn selection(&self) -> &ResolvedSelection<M> {
        &self.selection
    }

    /// Updates every metric once, sequentially and in selection order.
    ///
    /// Returns how many metrics were updated. An empty slot is logged and
    /// skipped without stopping the pass.
    pub fn run_iteration(&mut self) -> usize {
        let mut updated = 0;
        for (index, slot) in self.selection.slots_mut().iter_mut().enumerate() {
            let name = slot.name().to_string();
            match slot.metric_mut() {
                Some(metric) => {
                    trace!("Updating metric '{name}'");
                    metric.update();
                    updated += 1;
                }
                None => {
                    error!("Error: update slot {index} ('{name}') is empty, skipping");
                }
            }
        }
        self.iterations += 1;
        updated
    }

    /// Runs the update loop until `cancel` fires.
    ///
    /// Returns the number of completed passes.
    pub async fn run(mut self, cancel: CancellationToken) -> u64 {
        loop {
            if cancel.is_cancelled() {
                break;
            }
            self.run_iteration();

            tokio::select! {
                _ = sleep(self.interval) => {}
                _ = cancel.cancelled() => break,
            }
        }

        debug!(
            "Update loop cancelled after {} iteration(s)",
            self.iterations
        );
        self.iterations
    }
}
