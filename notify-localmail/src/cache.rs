//! Local cache copy of the system mailbox

use std::io::ErrorKind;
use std::path::Path;
use std::time::SystemTime;
use tracing::debug;

use crate::error::{NotifyError, Result};
use crate::mbox;

fn modified(path: &Path) -> std::io::Result<SystemTime> {
    std::fs::metadata(path)?.modified()
}

/// Whether the system mailbox changed after the cache was last written
///
/// A missing cache is reported as [`NotifyError::MissingCache`].
pub fn needs_refresh(mailbox: &Path, cache: &Path) -> Result<bool> {
    let cache_mtime = modified(cache).map_err(|e| match e.kind() {
        ErrorKind::NotFound => NotifyError::MissingCache {
            path: cache.to_path_buf(),
        },
        _ => e.into(),
    })?;

    let mailbox_mtime = modified(mailbox).map_err(|e| {
        NotifyError::Io(std::io::Error::new(
            e.kind(),
            format!("{}: {}", mailbox.display(), e),
        ))
    })?;

    Ok(cache_mtime < mailbox_mtime)
}

/// Overwrite the cache with the current content of the system mailbox
pub fn refresh(mailbox: &Path, cache: &Path) -> Result<u64> {
    let bytes = std::fs::copy(mailbox, cache)?;
    debug!("Copied {} bytes from {} to {}", bytes, mailbox.display(), cache.display());
    Ok(bytes)
}

/// Delete a dot-lock left behind by an earlier run
///
/// Safe only while the instance guard is held.
pub fn remove_stale_lock(cache: &Path) -> Result<bool> {
    let lock = mbox::lock_path(cache);
    if !lock.is_file() {
        return Ok(false);
    }

    debug!("Removing stale lock");
    std::fs::remove_file(&lock)?;
    Ok(true)
}
