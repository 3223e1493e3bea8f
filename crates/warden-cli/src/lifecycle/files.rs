//! Crash-safe replacement of the handle record.
//!
//! `status` and `stop` may read the pid file while `start` is rewriting it,
//! so the record is never truncated in place.

use std::io::{self, Write};
use std::path::Path;

use tempfile::{Builder, NamedTempFile};

/// Prefix used when the record path has no usable file name.
const FALLBACK_PREFIX: &str = "warden-record";

/// Swaps `contents` into `path` by renaming a synced sibling file over it.
///
/// A reader observes either the previous record or the new one. The sibling
/// is removed automatically if any step before the rename fails.
pub(super) fn atomic_write(path: &Path, contents: &[u8]) -> io::Result<()> {
    let mut staged = stage_beside(path)?;
    staged.write_all(contents)?;
    staged.as_file().sync_all()?;
    staged.persist(path).map_err(|error| error.error)?;
    Ok(())
}

/// Creates an owner-only temporary file in the record's directory so the
/// final rename never crosses a filesystem boundary.
fn stage_beside(path: &Path) -> io::Result<NamedTempFile> {
    let directory = path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let prefix = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or(FALLBACK_PREFIX);

    let mut builder = Builder::new();
    builder.prefix(prefix).suffix(".tmp");
    #[cfg(unix)]
    {
        use std::fs::Permissions;
        use std::os::unix::fs::PermissionsExt;
        builder.permissions(Permissions::from_mode(0o600));
    }
    builder.tempfile_in(directory)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn record_is_replaced_without_leftovers() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("service.pid");
        fs::write(&path, "1\n").expect("seed record");

        atomic_write(&path, b"4242\n").expect("atomic write");

        assert_eq!(fs::read_to_string(&path).expect("read back"), "4242\n");
        let leftovers = fs::read_dir(dir.path()).expect("list dir").count();
        assert_eq!(leftovers, 1, "staged file must not linger");
    }

    #[test]
    fn missing_directory_fails_without_creating_it() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("absent").join("service.pid");

        assert!(atomic_write(&path, b"1\n").is_err());
        assert!(!dir.path().join("absent").exists());
    }

    #[cfg(unix)]
    #[test]
    fn record_is_private_to_the_owner() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("service.pid");

        atomic_write(&path, b"4242\n").expect("atomic write");

        let mode = fs::metadata(&path).expect("metadata").permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
