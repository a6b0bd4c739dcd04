// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

mod companions;
mod exposition;

use std::process::ExitCode;

use tokio::signal::unix::{signal, SignalKind};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};
use tracing_subscriber::filter::ParseError;
use tracing_subscriber::EnvFilter;

use monitor_collector::system_registry;
use monitor_core::config::DEFAULT_LOG_LEVEL;
use monitor_core::{Agent, AgentStatus, MonitorConfig, SessionOutcome, StatusReporter};

use crate::exposition::{ExpositionServer, METRICS_ENDPOINT_PATH};

#[tokio::main(flavor = "current_thread")]
pub async fn main() -> ExitCode {
    let config = MonitorConfig::from_env();
    let log_level = match &config {
        Ok(config) => config.log_level.as_str(),
        Err(_) => DEFAULT_LOG_LEVEL,
    };

    let filter = match log_filter(log_level) {
        Ok(filter) => filter,
        Err(e) => {
            eprintln!("Could not parse log level '{log_level}': {e}");
            return ExitCode::FAILURE;
        }
    };

    let subscriber = tracing_subscriber::fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_level(true)
        .with_thread_names(false)
        .with_thread_ids(false)
        .with_line_number(false)
        .with_file(false)
        .with_target(true)
        .without_time()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Setting default subscriber failed: {e}");
        return ExitCode::FAILURE;
    }

    debug!("Logging subsystem enabled");

    let config = match config {
        Ok(config) => config,
        Err(e) => {
            error!("{e}");
            return ExitCode::FAILURE;
        }
    };
    let status = StatusReporter::new(config.status_path.clone());

    if config.launch_companions {
        let launched = companions::launch_companions();
        debug!("Launched {launched} companion server(s)");
    }

    let prometheus = prometheus::Registry::new();
    let registry = match system_registry(&prometheus) {
        Ok(registry) => registry,
        Err(e) => {
            error!("Failed to set up system metrics: {e}");
            return ExitCode::FAILURE;
        }
    };

    let exposition =
        ExpositionServer::bind(&config.metrics_addr(), prometheus).and_then(|server| {
            if let Ok(addr) = server.local_addr() {
                info!("Serving metrics on http://{addr}{METRICS_ENDPOINT_PATH}");
            }
            server.spawn()
        });
    if let Err(e) = exposition {
        error!("{e}");
        status.report(&AgentStatus::ExpositionFailed(e.to_string()));
        return ExitCode::FAILURE;
    }

    let mut agent = Agent::new(config, registry);
    agent.list_known_metrics();

    let cancel = CancellationToken::new();
    tokio::spawn(cancel_on_signal(cancel.clone()));

    match agent.run(cancel).await {
        Ok(SessionOutcome::Monitored { iterations }) => {
            info!("Monitoring stopped after {iterations} update(s)");
            ExitCode::SUCCESS
        }
        Ok(outcome) => {
            debug!("Control session finished: {outcome:?}");
            ExitCode::SUCCESS
        }
        Err(e) if e.is_startup_fatal() => {
            error!("Agent failed to start: {e}");
            ExitCode::FAILURE
        }
        Err(e) => {
            error!("Monitoring session failed: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Log filter for the validated `MONITOR_LOG_LEVEL`, with hyper silenced.
fn log_filter(log_level: &str) -> Result<EnvFilter, ParseError> {
    EnvFilter::try_new(format!("hyper=off,{log_level}"))
}

async fn cancel_on_signal(cancel: CancellationToken) {
    let mut terminate = match signal(SignalKind::terminate()) {
        Ok(terminate) => terminate,
        Err(e) => {
            error!("Failed to listen for SIGTERM: {e}");
            return;
        }
    };

    tokio::select! {
        res = tokio::signal::ctrl_c() => {
            if let Err(e) = res {
                error!("Failed to listen for ctrl-c: {e}");
                return;
            }
            info!("Received ctrl-c, shutting down");
        }
        _ = terminate.recv() => info!("Received SIGTERM, shutting down"),
    }
    cancel.cancel();
}

#[cfg(test)]
mod tests {
    use super::*;
    use monitor_core::config::VALID_LOG_LEVELS;

    #[test]
    fn test_log_filter_accepts_every_valid_level() {
        for level in VALID_LOG_LEVELS {
            assert!(log_filter(level).is_ok(), "{level}");
        }
        assert!(log_filter(DEFAULT_LOG_LEVEL).is_ok());
    }
}
