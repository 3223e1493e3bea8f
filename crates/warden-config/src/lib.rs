//! Shared configuration for the Warden process supervisor.
//!
//! Configuration is layered by `ortho_config`: built-in defaults, then an
//! optional TOML file (`--config-path` or `WARDEN_CONFIG_PATH`), then
//! `WARDEN_*` environment variables, then command-line flags. The resolved
//! [`Config`] describes the supervised service, its external collaborators,
//! the location of the persisted state, and the controller's own telemetry.

use std::path::{Path, PathBuf};
use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};

mod defaults;
mod directives;
mod logging;
mod paths;

pub use defaults::{
    DEFAULT_KILL_TIMEOUT_MS, DEFAULT_LOG_FILTER, DEFAULT_SERVICE_ENDPOINT, DEFAULT_SERVICE_NAME,
    DEFAULT_STARTUP_GRACE_MS, DEFAULT_STATE_DIR, DEFAULT_STOP_TIMEOUT_MS, default_log_file,
    default_log_filter, default_log_format, default_pid_file,
};
pub use directives::{AssetJob, AssetJobParseError, EnvAssignment, EnvAssignmentParseError};
pub use logging::{LogFormat, LogFormatParseError};
pub use paths::{StatePaths, StatePathsError};

/// Resolved supervisor configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(prefix = "WARDEN")]
pub struct Config {
    /// Display name used in operator-facing messages.
    #[serde(default = "defaults::default_service_name")]
    #[ortho_config(default = defaults::default_service_name())]
    pub service_name: String,
    /// Program and arguments that run the supervised service.
    #[serde(default)]
    #[ortho_config(merge_strategy = "replace")]
    pub service_command: Vec<String>,
    /// Endpoint reported once the service is running.
    #[serde(default = "defaults::default_service_endpoint")]
    #[ortho_config(default = defaults::default_service_endpoint())]
    pub service_endpoint: String,
    /// Extra environment applied to the service process.
    #[serde(default)]
    pub service_env: Vec<EnvAssignment>,
    /// Location of the persisted handle record.
    #[serde(default = "defaults::default_pid_file")]
    #[ortho_config(default = defaults::default_pid_file())]
    pub pid_file: PathBuf,
    /// Location of the captured service output.
    #[serde(default = "defaults::default_log_file")]
    #[ortho_config(default = defaults::default_log_file())]
    pub log_file: PathBuf,
    /// Build executor invoked before each start; skipped when empty.
    #[serde(default)]
    #[ortho_config(merge_strategy = "replace")]
    pub build_command: Vec<String>,
    /// Static asset compiler binary; asset jobs are skipped when unset.
    #[serde(default)]
    pub asset_compiler: Option<PathBuf>,
    /// Arguments appended to every asset compiler invocation.
    #[serde(default = "defaults::default_asset_compiler_args")]
    #[ortho_config(
        default = defaults::default_asset_compiler_args(),
        merge_strategy = "replace"
    )]
    pub asset_compiler_args: Vec<String>,
    /// Asset compiler invocations, run in order before the build.
    #[serde(default)]
    pub asset_jobs: Vec<AssetJob>,
    /// Toolchain program whose presence and version gate `start`.
    #[serde(default)]
    pub toolchain: Option<String>,
    /// Minimum `major.minor` toolchain version.
    #[serde(default)]
    pub toolchain_min_version: Option<String>,
    /// Grace interval before the freshly spawned service is re-probed.
    #[serde(default = "default_startup_grace_ms")]
    #[ortho_config(default = DEFAULT_STARTUP_GRACE_MS)]
    pub startup_grace_ms: u64,
    /// Time allowed for a graceful stop.
    #[serde(default = "default_stop_timeout_ms")]
    #[ortho_config(default = DEFAULT_STOP_TIMEOUT_MS)]
    pub stop_timeout_ms: u64,
    /// Time allowed for the service to vanish after a forceful stop.
    #[serde(default = "default_kill_timeout_ms")]
    #[ortho_config(default = DEFAULT_KILL_TIMEOUT_MS)]
    pub kill_timeout_ms: u64,
    /// `tracing` filter directive for controller diagnostics.
    #[serde(default = "defaults::default_log_filter_string")]
    #[ortho_config(default = defaults::default_log_filter_string())]
    pub log_filter: String,
    /// Output format for controller diagnostics.
    #[serde(default = "defaults::default_log_format")]
    #[ortho_config(default = defaults::default_log_format())]
    pub log_format: LogFormat,
}

const fn default_startup_grace_ms() -> u64 {
    DEFAULT_STARTUP_GRACE_MS
}

const fn default_stop_timeout_ms() -> u64 {
    DEFAULT_STOP_TIMEOUT_MS
}

const fn default_kill_timeout_ms() -> u64 {
    DEFAULT_KILL_TIMEOUT_MS
}

impl Default for Config {
    fn default() -> Self {
        Self {
            service_name: defaults::default_service_name(),
            service_command: Vec::new(),
            service_endpoint: defaults::default_service_endpoint(),
            service_env: Vec::new(),
            pid_file: defaults::default_pid_file(),
            log_file: defaults::default_log_file(),
            build_command: Vec::new(),
            asset_compiler: None,
            asset_compiler_args: defaults::default_asset_compiler_args(),
            asset_jobs: Vec::new(),
            toolchain: None,
            toolchain_min_version: None,
            startup_grace_ms: DEFAULT_STARTUP_GRACE_MS,
            stop_timeout_ms: DEFAULT_STOP_TIMEOUT_MS,
            kill_timeout_ms: DEFAULT_KILL_TIMEOUT_MS,
            log_filter: defaults::default_log_filter_string(),
            log_format: defaults::default_log_format(),
        }
    }
}

impl Config {
    /// Display name of the supervised service.
    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    /// Program and arguments of the supervised service.
    pub fn service_command(&self) -> &[String] {
        &self.service_command
    }

    /// Endpoint reported for the running service.
    pub fn service_endpoint(&self) -> &str {
        &self.service_endpoint
    }

    /// Environment applied to the service process.
    pub fn service_env(&self) -> &[EnvAssignment] {
        &self.service_env
    }

    /// Location of the persisted handle record.
    pub fn pid_file(&self) -> &Path {
        &self.pid_file
    }

    /// Location of the captured service output.
    pub fn log_file(&self) -> &Path {
        &self.log_file
    }

    /// Build executor argv; empty when no build step is configured.
    pub fn build_command(&self) -> &[String] {
        &self.build_command
    }

    /// Static asset compiler binary, if configured.
    pub fn asset_compiler(&self) -> Option<&Path> {
        self.asset_compiler.as_deref()
    }

    /// Arguments appended to every asset compiler invocation.
    pub fn asset_compiler_args(&self) -> &[String] {
        &self.asset_compiler_args
    }

    /// Asset compiler invocations.
    pub fn asset_jobs(&self) -> &[AssetJob] {
        &self.asset_jobs
    }

    /// Toolchain program gating `start`, if configured.
    pub fn toolchain(&self) -> Option<&str> {
        self.toolchain.as_deref()
    }

    /// Minimum toolchain version, if configured.
    pub fn toolchain_min_version(&self) -> Option<&str> {
        self.toolchain_min_version.as_deref()
    }

    /// Grace interval between spawn and the readiness re-probe.
    pub const fn startup_grace(&self) -> Duration {
        Duration::from_millis(self.startup_grace_ms)
    }

    /// Graceful stop timeout.
    pub const fn stop_timeout(&self) -> Duration {
        Duration::from_millis(self.stop_timeout_ms)
    }

    /// Forceful stop timeout.
    pub const fn kill_timeout(&self) -> Duration {
        Duration::from_millis(self.kill_timeout_ms)
    }

    /// Log filter expression for controller diagnostics.
    pub fn log_filter(&self) -> &str {
        &self.log_filter
    }

    /// Diagnostic output format.
    pub const fn log_format(&self) -> LogFormat {
        self.log_format
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_timeouts_match_documented_values() {
        let config = Config::default();
        assert_eq!(config.startup_grace(), Duration::from_secs(3));
        assert_eq!(config.stop_timeout(), Duration::from_secs(10));
        assert_eq!(config.kill_timeout(), Duration::from_secs(5));
    }

    #[test]
    fn default_state_lives_under_state_dir() {
        let config = Config::default();
        assert!(config.pid_file().starts_with(DEFAULT_STATE_DIR));
        assert!(config.log_file().starts_with(DEFAULT_STATE_DIR));
        assert!(config.service_command().is_empty());
        assert_eq!(config.log_format(), LogFormat::Compact);
    }
}
