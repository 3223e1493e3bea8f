//! Persistence of the service handle record.
//!
//! The record is a single decimal pid followed by a newline. Anything that
//! cannot be read back as a usable pid is treated as absent and deleted, so
//! corrupted state never surfaces as a command failure.

use std::fs;
use std::io;
use std::path::PathBuf;

use thiserror::Error;
use tracing::{debug, warn};

use super::LIFECYCLE_TARGET;
use super::files::atomic_write;
use super::probe::LivenessProbe;

/// Identifies a previously spawned service process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceHandle {
    pid: u32,
}

impl ServiceHandle {
    /// Wraps `pid`, rejecting values no process can carry.
    pub fn new(pid: u32) -> Option<Self> {
        (pid != 0 && i32::try_from(pid).is_ok()).then_some(Self { pid })
    }

    pub const fn pid(self) -> u32 {
        self.pid
    }

    /// Parses a stored record, tolerating surrounding whitespace.
    pub fn parse_record(record: &str) -> Option<Self> {
        record.trim().parse::<u32>().ok().and_then(Self::new)
    }

    fn to_record(self) -> String {
        format!("{}\n", self.pid)
    }
}

/// Errors raised while persisting the handle record.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to write handle record {path:?}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to remove handle record {path:?}: {source}")]
    Remove {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Durable storage for at most one [`ServiceHandle`].
pub trait HandleStore {
    /// Reads the record; malformed or unreadable records yield `None`.
    fn load(&self) -> Result<Option<ServiceHandle>, StoreError>;

    /// Atomically replaces the record.
    fn save(&self, handle: ServiceHandle) -> Result<(), StoreError>;

    /// Removes the record; removing an absent record succeeds.
    fn clear(&self) -> Result<(), StoreError>;

    /// Loads the record and drops it when its process is no longer alive.
    ///
    /// Every lifecycle command passes through here before acting on the
    /// record, which keeps dead handles from lingering after a crash.
    fn load_validated(
        &self,
        probe: &dyn LivenessProbe,
    ) -> Result<Option<ServiceHandle>, StoreError> {
        let Some(handle) = self.load()? else {
            return Ok(None);
        };
        if probe.is_alive(handle.pid()) {
            return Ok(Some(handle));
        }
        debug!(
            target: LIFECYCLE_TARGET,
            pid = handle.pid(),
            "recorded service is not alive; clearing stale handle"
        );
        self.clear()?;
        Ok(None)
    }
}

/// Handle store backed by a pid file.
#[derive(Debug, Clone)]
pub struct FileHandleStore {
    path: PathBuf,
}

impl FileHandleStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[cfg(test)]
    pub(crate) fn path(&self) -> &std::path::Path {
        &self.path
    }

    fn discard(&self, reason: &str) {
        warn!(
            target: LIFECYCLE_TARGET,
            file = %self.path.display(),
            reason,
            "discarding unusable handle record"
        );
        if let Err(error) = self.clear() {
            warn!(
                target: LIFECYCLE_TARGET,
                error = %error,
                "failed to remove unusable handle record"
            );
        }
    }
}

impl HandleStore for FileHandleStore {
    fn load(&self) -> Result<Option<ServiceHandle>, StoreError> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(error) => {
                self.discard(&error.to_string());
                return Ok(None);
            }
        };
        let handle = std::str::from_utf8(&bytes)
            .ok()
            .and_then(ServiceHandle::parse_record);
        if handle.is_none() {
            self.discard("record does not hold a valid pid");
        }
        Ok(handle)
    }

    fn save(&self, handle: ServiceHandle) -> Result<(), StoreError> {
        atomic_write(&self.path, handle.to_record().as_bytes()).map_err(|source| {
            StoreError::Write {
                path: self.path.clone(),
                source,
            }
        })?;
        debug!(
            target: LIFECYCLE_TARGET,
            pid = handle.pid(),
            file = %self.path.display(),
            "handle record written"
        );
        Ok(())
    }

    fn clear(&self) -> Result<(), StoreError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StoreError::Remove {
                path: self.path.clone(),
                source,
            }),
        }
    }
}

#[cfg(test)]
pub(crate) use memory::MemoryHandleStore;
