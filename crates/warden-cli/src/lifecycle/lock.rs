//! Advisory lock held for the duration of a start transition.
//!
//! Two concurrent `warden start` invocations would otherwise both observe an
//! empty handle record and each launch a service. The lock lives beside the
//! pid file as `<pid file>.lock`.

use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use fs2::FileExt;
use tracing::{debug, warn};

use super::LIFECYCLE_TARGET;
use super::error::LifecycleError;

/// Exclusive advisory lock serialising `start` transitions.
///
/// The lock file itself is left in place; only the advisory lock on it is
/// meaningful, and it is released on drop or when the holder exits.
#[derive(Debug)]
pub(crate) struct StartLock {
    file: File,
    path: PathBuf,
}

impl StartLock {
    /// Takes the lock without blocking.
    pub(crate) fn acquire(path: &Path) -> Result<Self, LifecycleError> {
        let mut options = OpenOptions::new();
        options.create(true).write(true).truncate(false);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        let file = options.open(path).map_err(|source| LifecycleError::Lock {
            path: path.to_path_buf(),
            source,
        })?;
        match file.try_lock_exclusive() {
            Ok(()) => {
                debug!(target: LIFECYCLE_TARGET, file = %path.display(), "acquired start lock");
                Ok(Self {
                    file,
                    path: path.to_path_buf(),
                })
            }
            Err(error) if is_contended(&error) => Err(LifecycleError::StartInProgress {
                path: path.to_path_buf(),
            }),
            Err(source) => Err(LifecycleError::Lock {
                path: path.to_path_buf(),
                source,
            }),
        }
    }
}

impl Drop for StartLock {
    fn drop(&mut self) {
        if let Err(error) = FileExt::unlock(&self.file) {
            warn!(
                target: LIFECYCLE_TARGET,
                file = %self.path.display(),
                error = %error,
                "failed to release start lock"
            );
        }
    }
}

fn is_contended(error: &io::Error) -> bool {
    error.kind() == io::ErrorKind::WouldBlock
        || error.raw_os_error() == fs2::lock_contended_error().raw_os_error()
}
