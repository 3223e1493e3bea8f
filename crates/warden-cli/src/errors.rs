//! Error types for the CLI runtime.

use std::io;
use std::sync::Arc;

use thiserror::Error;

use crate::lifecycle::LifecycleError;
use crate::logs::LogQueryError;
use crate::telemetry::TelemetryError;

#[derive(Debug, Error)]
pub(crate) enum AppError {
    #[error("failed to load configuration: {0}")]
    LoadConfiguration(Arc<ortho_config::OrthoError>),
    #[error(transparent)]
    Telemetry(#[from] TelemetryError),
    #[error("service lifecycle command failed: {0}")]
    Lifecycle(#[from] LifecycleError),
    #[error("log query failed: {0}")]
    LogQuery(#[from] LogQueryError),
    #[error("failed to write log output: {0}")]
    WriteOutput(io::Error),
}
