//! Error types for service lifecycle operations.

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use warden_config::StatePathsError;

use super::collaborators::CollaboratorError;
use super::store::StoreError;

/// Errors raised while executing lifecycle commands.
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error(
        "no service command configured for '{name}'; set service_command in the configuration"
    )]
    MissingServiceCommand { name: String },
    #[error("required toolchain '{program}' is not available ({source}); install it and retry")]
    ToolchainMissing {
        program: String,
        #[source]
        source: io::Error,
    },
    #[error(
        "toolchain '{program}' version {found} is older than the required {required}; upgrade it and retry"
    )]
    ToolchainTooOld {
        program: String,
        found: String,
        required: String,
    },
    #[error("could not read a version from '{program} --version' output: {output:?}")]
    ToolchainVersion { program: String, output: String },
    #[error("another controller is starting the service (lock held on {path:?})")]
    StartInProgress { path: PathBuf },
    #[error("failed to acquire start lock {path:?}: {source}")]
    Lock {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Collaborator(#[from] CollaboratorError),
    #[error("failed to prepare log file {path:?}: {source}")]
    OpenLog {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to spawn service '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },
    #[error("service pid {pid} exited during startup; inspect {log:?} or run 'warden log'")]
    NotAlive { pid: u32, log: PathBuf },
    #[error("service pid {pid} is still running after {timeout:?}")]
    StopTimeout { pid: u32, timeout: Duration },
    #[error("failed to signal service pid {pid}: {source}")]
    SignalFailed {
        pid: u32,
        #[source]
        source: io::Error,
    },
    #[error("failed to monitor service pid {pid}: {source}")]
    MonitorChild {
        pid: u32,
        #[source]
        source: io::Error,
    },
    #[error("invalid pid {pid}: {reason}")]
    InvalidPid { pid: u32, reason: &'static str },
    #[error("interrupted; the handle record was left consistent")]
    Interrupted,
    #[error("failed to install interrupt handlers: {0}")]
    InstallSignals(#[source] io::Error),
    #[cfg(not(unix))]
    #[error("platform does not support service lifecycle signalling")]
    UnsupportedPlatform,
    #[error(transparent)]
    Paths(#[from] StatePathsError),
    #[error("failed to write lifecycle output: {0}")]
    Io(#[source] io::Error),
}
