use std::path::PathBuf;

/// Default directory holding the handle record and captured output.
pub const DEFAULT_STATE_DIR: &str = ".warden";

/// Default log filter expression used by the binary.
///
/// The controller writes its results to stdout, so diagnostics stay quiet
/// unless an operator asks for them.
pub const DEFAULT_LOG_FILTER: &str = "warn";

/// Endpoint reported for the supervised service when none is configured.
pub const DEFAULT_SERVICE_ENDPOINT: &str = "http://localhost:5290";

/// Name used in operator-facing messages when none is configured.
pub const DEFAULT_SERVICE_NAME: &str = "service";

/// Grace interval between spawning the service and re-probing it.
pub const DEFAULT_STARTUP_GRACE_MS: u64 = 3_000;

/// Time allowed for the service to honour the graceful termination signal.
pub const DEFAULT_STOP_TIMEOUT_MS: u64 = 10_000;

/// Time allowed for the service to disappear after the forceful signal.
pub const DEFAULT_KILL_TIMEOUT_MS: u64 = 5_000;

/// Default log filter expression used by the binary.
pub fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}

/// Owned log filter value used where allocation is required (e.g. serde).
pub fn default_log_filter_string() -> String {
    DEFAULT_LOG_FILTER.to_owned()
}

/// Default logging format for the binary.
pub fn default_log_format() -> crate::logging::LogFormat {
    crate::logging::LogFormat::Compact
}

/// Default service display name.
pub fn default_service_name() -> String {
    DEFAULT_SERVICE_NAME.to_owned()
}

/// Default service endpoint.
pub fn default_service_endpoint() -> String {
    DEFAULT_SERVICE_ENDPOINT.to_owned()
}

/// Default location of the persisted handle record.
pub fn default_pid_file() -> PathBuf {
    PathBuf::from(DEFAULT_STATE_DIR).join("service.pid")
}

/// Default location of the captured service output.
pub fn default_log_file() -> PathBuf {
    PathBuf::from(DEFAULT_STATE_DIR).join("service.log")
}

/// Arguments appended to every asset compiler invocation by default.
pub fn default_asset_compiler_args() -> Vec<String> {
    vec![String::from("--minify")]
}
