// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Read-only table of the metrics the agent knows how to sample.
//!
//! The registry is built once at startup through [`MetricRegistryBuilder`] and
//! never mutated afterwards. Entries keep their registration order; lookups
//! are exact and case-sensitive, and the first entry with a given name wins.

/// A metric that can refresh its own value.
///
/// `update` is called once per pass of the update loop. It takes no arguments
/// and reports nothing back: an implementation that fails to sample keeps its
/// previous value and logs the failure itself.
pub trait Updatable {
    fn update(&mut self);
}

/// Name and prototype of one registered metric.
#[derive(Debug, Clone)]
pub struct MetricDescriptor<M> {
    name: String,
    metric: M,
}

impl<M> MetricDescriptor<M> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn metric(&self) -> &M {
        &self.metric
    }
}

#[derive(Debug, Clone)]
pub struct MetricRegistry<M> {
    entries: Vec<MetricDescriptor<M>>,
}

impl<M> MetricRegistry<M> {
    pub fn builder() -> MetricRegistryBuilder<M> {
        MetricRegistryBuilder {
            entries: Vec::new(),
        }
    }

    /// First entry registered under `name`.
    pub fn lookup(&self, name: &str) -> Option<&MetricDescriptor<M>> {
        self.entries.iter().find(|entry| entry.name == name)
    }

    /// Registered names, in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|entry| entry.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

pub struct MetricRegistryBuilder<M> {
    entries: Vec<MetricDescriptor<M>>,
}

impl<M> MetricRegistryBuilder<M> {
    #[must_use]
    pub fn register(mut self, name: impl Into<String>, metric: M) -> Self {
        self.entries.push(MetricDescriptor {
            name: name.into(),
            metric,
        });
        self
    }

    pub fn build(self) -> MetricRegistry<M> {
        MetricRegistry {
            entries: self.entries,
        }
    }
}
