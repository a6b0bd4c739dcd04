// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Runtime metric selection for the metrics monitor.
//!
//! An operator writes a comma-separated list of metric names to a named pipe.
//! The names are resolved against a fixed [`MetricRegistry`] and the resolved
//! metrics are refreshed by an [`UpdateScheduler`] once per interval, while a
//! single-line status marker tracks where the agent is in its lifecycle.
//!
//! # Example
//!
//! ```rust,ignore
//! use monitor_core::{Agent, MetricRegistry, MonitorConfig};
//! use tokio_util::sync::CancellationToken;
//!
//! let registry = MetricRegistry::builder()
//!     .register("cpu", my_cpu_metric)
//!     .build();
//! let mut agent = Agent::new(MonitorConfig::from_env()?, registry);
//! agent.run(CancellationToken::new()).await?;
//! ```

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]

pub mod agent;
pub mod config;
pub mod control;
pub mod error;
pub mod registry;
pub mod resolver;
pub mod scheduler;
pub mod status;

pub use agent::{Agent, SessionOutcome};
pub use config::MonitorConfig;
pub use control::{ControlChannel, SelectionRequest, SessionPayload};
pub use error::MonitorError;
pub use registry::{MetricDescriptor, MetricRegistry, Updatable};
pub use resolver::{resolve, ResolvedSelection};
pub use scheduler::{SchedulerState, UpdateScheduler};
pub use status::{AgentStatus, StatusReporter};
