//! One check of the local mailbox

use tracing::debug;

use crate::cache;
use crate::config::Config;
use crate::error::Result;
use crate::guard::InstanceGuard;
use crate::notifier::{Notification, Notifier};
use crate::scanner;

/// How a run ended when nothing went wrong
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Another instance holds the guard
    AlreadyRunning,
    /// The system mailbox is not newer than the cache
    UpToDate,
    /// The mailbox changed but holds no unread messages
    NoNewMail,
    /// A notification was sent
    Notified { count: usize, body: String },
}

/// Check for new mail and notify about it
pub fn run(config: &Config, notifier: &dyn Notifier) -> Result<RunOutcome> {
    let Some(_guard) = InstanceGuard::acquire(config.instance_port)? else {
        return Ok(RunOutcome::AlreadyRunning);
    };

    check_mailbox(config, notifier)
}

/// Everything after the instance guard; the caller must hold it
pub fn check_mailbox(config: &Config, notifier: &dyn Notifier) -> Result<RunOutcome> {
    if !cache::needs_refresh(&config.mailbox_path, &config.cache_path)? {
        debug!("No new mail");
        return Ok(RunOutcome::UpToDate);
    }

    cache::refresh(&config.mailbox_path, &config.cache_path)?;
    cache::remove_stale_lock(&config.cache_path)?;

    let scan = scanner::scan_cache(&config.cache_path)?;

    let Some(notification) = Notification::for_scan(&scan, &config.notification) else {
        debug!("No new mail");
        return Ok(RunOutcome::NoNewMail);
    };

    notifier.notify(&notification)?;

    Ok(RunOutcome::Notified {
        count: scan.count,
        body: notification.body,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::NotifyError;
    use crate::notifier::MockNotifier;
    use std::fs::File;
    use std::net::{Ipv4Addr, TcpListener};
    use std::path::Path;
    use std::time::{Duration, SystemTime};
    use tempfile::TempDir;

    const TWO_NEW: &str = "From a@example.com Mon Jan  1 10:00:00 2024\n\
Subject: Hello\n\
\n\
one\n\
\n\
From b@example.com Mon Jan  1 11:00:00 2024\n\
Subject: Paid\n\
Status: RO\n\
\n\
two\n\
\n\
From c@example.com Mon Jan  1 12:00:00 2024\n\
Subject: Re: Invoice\n\
\n\
three\n";

    fn set_mtime(path: &Path, time: SystemTime) {
        File::options()
            .write(true)
            .open(path)
            .unwrap()
            .set_modified(time)
            .unwrap();
    }

    /// Mailbox with `content` and a cache that is one minute older
    fn setup(content: &str) -> (TempDir, Config) {
        let dir = TempDir::new().unwrap();
        let config = Config::for_paths(dir.path().join("spool"), dir.path().join("mail"));
        std::fs::write(&config.mailbox_path, content).unwrap();
        std::fs::write(&config.cache_path, "").unwrap();

        let now = SystemTime::now();
        set_mtime(&config.mailbox_path, now);
        set_mtime(&config.cache_path, now - Duration::from_secs(60));
        (dir, config)
    }

    #[test]
    fn test_two_new_mails() {
        let (_dir, config) = setup(TWO_NEW);
        let mut notifier = MockNotifier::new();
        notifier
            .expect_notify()
            .withf(|n| n.body == "2 new mails" && n.icon == "mail-unread")
            .times(1)
            .returning(|_| Ok(7));

        let outcome = check_mailbox(&config, &notifier).unwrap();
        assert_eq!(
            outcome,
            RunOutcome::Notified {
                count: 2,
                body: "2 new mails".to_string()
            }
        );
    }

    #[test]
    fn test_up_to_date_leaves_cache_alone() {
        let (_dir, config) = setup(TWO_NEW);
        set_mtime(&config.cache_path, SystemTime::now() + Duration::from_secs(60));

        let mut notifier = MockNotifier::new();
        notifier.expect_notify().never();

        assert_eq!(check_mailbox(&config, &notifier).unwrap(), RunOutcome::UpToDate);
        assert_eq!(std::fs::read_to_string(&config.cache_path).unwrap(), "");
    }

    #[test]
    fn test_nothing_unread() {
        let (_dir, config) =
            setup("From a Mon Jan  1 10:00:00 2024\nSubject: Seen\nStatus: R\n\nbody\n");
        let mut notifier = MockNotifier::new();
        notifier.expect_notify().never();

        assert_eq!(check_mailbox(&config, &notifier).unwrap(), RunOutcome::NoNewMail);
    }

    #[test]
    fn test_notifier_error_propagates() {
        let (_dir, config) = setup(TWO_NEW);
        let mut notifier = MockNotifier::new();
        notifier
            .expect_notify()
            .times(1)
            .returning(|_| Err(NotifyError::Notification("no bus".to_string())));

        assert!(matches!(
            check_mailbox(&config, &notifier),
            Err(NotifyError::Notification(_))
        ));
    }

    #[test]
    fn test_run_skips_when_guard_is_held() {
        let (_dir, mut config) = setup(TWO_NEW);
        let holder = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).unwrap();
        config.instance_port = holder.local_addr().unwrap().port();

        let mut notifier = MockNotifier::new();
        notifier.expect_notify().never();

        assert_eq!(run(&config, &notifier).unwrap(), RunOutcome::AlreadyRunning);
        assert_eq!(std::fs::read_to_string(&config.cache_path).unwrap(), "");
    }
}
