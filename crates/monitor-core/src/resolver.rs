// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use crate::control::SelectionRequest;
use crate::error::MonitorError;
use crate::registry::MetricRegistry;
use tracing::{error, info};

/// One position of a resolved selection.
#[derive(Debug, Clone)]
pub struct ResolvedSlot<M> {
    name: String,
    metric: Option<M>,
}

impl<M> ResolvedSlot<M> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_resolved(&self) -> bool {
        self.metric.is_some()
    }

    pub(crate) fn metric_mut(&mut self) -> Option<&mut M> {
        self.metric.as_mut()
    }
}

/// Metrics picked for a session, positionally matching the request.
#[derive(Debug, Clone)]
pub struct ResolvedSelection<M> {
    slots: Vec<ResolvedSlot<M>>,
}

impl<M> ResolvedSelection<M> {
    /// Builds a selection from raw slots. Only meant for callers that need
    /// to exercise empty slots; [`resolve`] never produces one.
    #[doc(hidden)]
    pub fn from_slots(slots: impl IntoIterator<Item = (String, Option<M>)>) -> Self {
        Self {
            slots: slots
                .into_iter()
                .map(|(name, metric)| ResolvedSlot { name, metric })
                .collect(),
        }
    }

    pub fn slots(&self) -> &[ResolvedSlot<M>] {
        &self.slots
    }

    pub(crate) fn slots_mut(&mut self) -> &mut [ResolvedSlot<M>] {
        &mut self.slots
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.slots.iter().map(ResolvedSlot::name)
    }

    /// First slot that holds no metric, if any.
    pub fn first_unresolved(&self) -> Option<(usize, &str)> {
        self.slots
            .iter()
            .enumerate()
            .find(|(_, slot)| !slot.is_resolved())
            .map(|(index, slot)| (index, slot.name()))
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

/// Matches every requested name against `registry`.
///
/// Each slot receives its own copy of the registered metric, so the registry
/// stays untouched. The first unknown name fails the whole selection.
pub fn resolve<M: Clone>(
    request: &SelectionRequest,
    registry: &MetricRegistry<M>,
) -> Result<ResolvedSelection<M>, MonitorError> {
    let mut slots = Vec::with_capacity(request.len());

    for name in request.names() {
        info!("Processing metric: '{name}'");
        match registry.lookup(name) {
            Some(entry) => slots.push(ResolvedSlot {
                name: name.clone(),
                metric: Some(entry.metric().clone()),
            }),
            None => {
                error!("Error: No update function found for metric '{name}'");
                return Err(MonitorError::UnknownMetric(name.clone()));
            }
        }
    }

    Ok(ResolvedSelection { slots })
}
