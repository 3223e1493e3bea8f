//! Derives the state file paths shared by every controller invocation.
//!
//! The handle record, its start lock, and the captured output all live at
//! locations derived from the configuration so that independent invocations
//! agree on where to look.

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::Config;

/// Canonical paths for the supervisor's persisted state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatePaths {
    pid_path: PathBuf,
    lock_path: PathBuf,
    log_path: PathBuf,
}

impl StatePaths {
    /// Derives state paths from the configuration, creating parent
    /// directories so the files can be written.
    pub fn from_config(config: &Config) -> Result<Self, StatePathsError> {
        let paths = Self::from_config_readonly(config)?;
        for path in [&paths.pid_path, &paths.log_path] {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent).map_err(|source| StatePathsError::StateDirectory {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }
        Ok(paths)
    }

    /// Derives state paths without touching the filesystem.
    ///
    /// Used by read-only commands (`status`, `stop`, `log`) which must not
    /// create directories as a side effect.
    pub fn from_config_readonly(config: &Config) -> Result<Self, StatePathsError> {
        let pid_path = config.pid_file().to_path_buf();
        if pid_path.file_name().is_none() {
            return Err(StatePathsError::MissingFileName { path: pid_path });
        }
        let log_path = config.log_file().to_path_buf();
        if log_path.file_name().is_none() {
            return Err(StatePathsError::MissingFileName { path: log_path });
        }
        Ok(Self {
            lock_path: lock_path_for(&pid_path),
            pid_path,
            log_path,
        })
    }

    /// Path to the persisted handle record.
    pub fn pid_path(&self) -> &Path {
        self.pid_path.as_path()
    }

    /// Path to the advisory lock guarding start transitions.
    pub fn lock_path(&self) -> &Path {
        self.lock_path.as_path()
    }

    /// Path to the captured service output.
    pub fn log_path(&self) -> &Path {
        self.log_path.as_path()
    }
}

fn lock_path_for(pid_path: &Path) -> PathBuf {
    let mut name = pid_path
        .file_name()
        .map(OsString::from)
        .unwrap_or_default();
    name.push(".lock");
    pid_path.with_file_name(name)
}

/// Errors raised while deriving state paths.
#[derive(Debug, Error)]
pub enum StatePathsError {
    /// A configured state file path did not name a file.
    #[error("state path '{}' does not name a file", path.display())]
    MissingFileName { path: PathBuf },
    /// Creating a state directory failed.
    #[error("failed to prepare state directory '{}': {source}", path.display())]
    StateDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn derives_lock_path_next_to_pid_file() {
        let config = Config {
            pid_file: PathBuf::from("state/app.pid"),
            ..Config::default()
        };
        let paths = StatePaths::from_config_readonly(&config).expect("paths");
        assert_eq!(paths.pid_path(), Path::new("state/app.pid"));
        assert_eq!(paths.lock_path(), Path::new("state/app.pid.lock"));
    }

    #[test]
    fn creates_missing_state_directories() {
        let dir = TempDir::new().expect("temp dir");
        let config = Config {
            pid_file: dir.path().join("run/app.pid"),
            log_file: dir.path().join("logs/app.log"),
            ..Config::default()
        };
        let paths = StatePaths::from_config(&config).expect("paths");
        assert!(dir.path().join("run").is_dir());
        assert!(dir.path().join("logs").is_dir());
        assert!(!paths.pid_path().exists());
    }

    #[test]
    fn readonly_derivation_leaves_filesystem_untouched() {
        let dir = TempDir::new().expect("temp dir");
        let config = Config {
            pid_file: dir.path().join("run/app.pid"),
            ..Config::default()
        };
        StatePaths::from_config_readonly(&config).expect("paths");
        assert!(!dir.path().join("run").exists());
    }

    #[test]
    fn rejects_paths_without_file_name() {
        let config = Config {
            pid_file: PathBuf::from("/"),
            ..Config::default()
        };
        let error = StatePaths::from_config_readonly(&config).expect_err("no file name");
        assert!(matches!(error, StatePathsError::MissingFileName { .. }));
    }
}
