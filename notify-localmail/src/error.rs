//! Error types for notify-localmail

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for notify-localmail operations
pub type Result<T> = std::result::Result<T, NotifyError>;

/// Errors that abort a run with a non-zero exit status
#[derive(Error, Debug)]
pub enum NotifyError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The cache copy does not exist yet (first run)
    #[error("Cache file {} does not exist; create it to start tracking mail", .path.display())]
    MissingCache { path: PathBuf },

    /// The cached mailbox could not be parsed or rewritten
    #[error("Mailbox parse error: {0}")]
    MailboxParse(String),

    /// Another process holds the dot-lock of the mailbox
    #[error("Mailbox is locked: {}", .0.display())]
    MailboxLocked(PathBuf),

    /// Notification bus error
    #[error("Notification error: {0}")]
    Notification(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<zbus::Error> for NotifyError {
    fn from(e: zbus::Error) -> Self {
        NotifyError::Notification(e.to_string())
    }
}
