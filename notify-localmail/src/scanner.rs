//! Unread mail scanner
//!
//! Walks the cached mailbox, counts messages that are neither read nor
//! deleted and marks them read so the next run does not report them again.

use std::path::Path;
use tracing::{debug, error};

use crate::error::{NotifyError, Result};
use crate::mbox::{Mbox, MboxLock, FLAG_DELETED, FLAG_READ};

/// Outcome of a scan
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanResult {
    /// Subject of the last new message seen
    pub subject: Option<String>,
    /// Number of new, non-deleted messages
    pub count: usize,
}

/// Mark every unread, non-deleted message as read
///
/// Messages that already carry `R` or `D` are left untouched.
pub fn scan(mbox: &mut Mbox) -> Result<ScanResult> {
    let mut result = ScanResult::default();

    for key in mbox.keys() {
        let Some(mut msg) = mbox.get_message(key) else {
            continue;
        };

        let flags = msg.flags();
        if flags.contains(FLAG_READ) || flags.contains(FLAG_DELETED) {
            continue;
        }

        result.count += 1;
        result.subject = msg.subject();
        debug!("New message {}: {:?}", key, result.subject);

        msg.add_flag(FLAG_READ);
        mbox.update(key, msg)?;
    }

    Ok(result)
}

/// Scan the cache under its dot-lock and persist the new flags
///
/// The lock is released before any error is returned.
pub fn scan_cache(path: &Path) -> Result<ScanResult> {
    let _lock = MboxLock::acquire(path)?;

    let outcome = Mbox::open(path).and_then(|mut mbox| {
        let result = scan(&mut mbox)?;
        mbox.flush()?;
        Ok(result)
    });

    outcome.map_err(|e| {
        error!("Failed to parse message: {}", e);
        match e {
            NotifyError::Io(io) => NotifyError::MailboxParse(io.to_string()),
            other => other,
        }
    })
}
