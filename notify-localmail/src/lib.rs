//! notify-localmail: desktop notification for new local mail
//!
//! A single-shot checker meant to be started by a timer. Each run compares
//! the system mailbox with a private cache copy, marks unread messages as
//! read in that copy and announces them through the desktop notification
//! service.
//!
//! # Example
//!
//! ```no_run
//! use notify_localmail::{check, Config, DbusNotifier};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::resolve()?;
//!     let outcome = check::run(&config, &DbusNotifier::new())?;
//!     println!("{:?}", outcome);
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! - [`config`]: Paths and settings resolved at startup
//! - [`guard`]: Single-instance lock
//! - [`cache`]: Staleness check and cache refresh
//! - [`mbox`]: Flag-aware mbox store
//! - [`scanner`]: Unread message scanner
//! - [`notifier`]: Desktop notifications
//! - [`logging`]: `LEVEL: message` log output

pub mod cache;
pub mod check;
pub mod config;
pub mod error;
pub mod guard;
pub mod logging;
pub mod mbox;
pub mod notifier;
pub mod scanner;

pub use check::RunOutcome;
pub use config::Config;
pub use error::{NotifyError, Result};
pub use notifier::{DbusNotifier, Notification, Notifier};
