//! notify-localmail: announce new mail in the local system mailbox

use notify_localmail::{check, logging, Config, DbusNotifier, RunOutcome};
use tracing::{debug, info};

fn main() -> anyhow::Result<()> {
    let config = Config::resolve()?;

    // Initialize logging
    logging::init(&config.logging.level);

    debug!("Mailbox: {}", config.mailbox_path.display());
    debug!("Cache: {}", config.cache_path.display());

    match check::run(&config, &DbusNotifier::new())? {
        RunOutcome::Notified { count, .. } => info!("Notified about {} new mail(s)", count),
        outcome => debug!("Finished: {:?}", outcome),
    }

    Ok(())
}
