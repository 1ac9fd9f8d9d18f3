//! Desktop notifications
//!
//! Notifications go to the freedesktop notification service on the session
//! bus. See <https://specifications.freedesktop.org/notification-spec/latest/protocol.html>.

use std::collections::HashMap;
use tracing::info;
use zbus::zvariant::Value;

use crate::config::NotificationConfig;
use crate::error::Result;
use crate::scanner::ScanResult;

pub const BUS_NAME: &str = "org.freedesktop.Notifications";
pub const OBJECT_PATH: &str = "/org/freedesktop/Notifications";

/// Arguments of a `Notify` call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub app_name: String,
    /// 0 never replaces an earlier notification
    pub replaces_id: u32,
    pub icon: String,
    pub summary: String,
    pub body: String,
    pub actions: Vec<String>,
    pub hints: HashMap<String, String>,
    pub expire_timeout: i32,
}

impl Notification {
    /// Notification announcing the result of a scan, if there is anything new
    ///
    /// A single message is announced by its subject, several by their count.
    pub fn for_scan(scan: &ScanResult, config: &NotificationConfig) -> Option<Self> {
        let body = match scan.count {
            0 => return None,
            1 => scan.subject.clone().unwrap_or_default(),
            n => format!("{} new mails", n),
        };

        Some(Self {
            app_name: config.app_name.clone(),
            replaces_id: 0,
            icon: config.icon.clone(),
            summary: config.summary.clone(),
            body,
            actions: Vec::new(),
            hints: HashMap::new(),
            expire_timeout: 0,
        })
    }
}

/// Something that can display a notification
#[cfg_attr(test, mockall::automock)]
pub trait Notifier {
    /// Show `notification`, returning the id assigned by the server
    fn notify(&self, notification: &Notification) -> Result<u32>;
}

/// Sends notifications over the D-Bus session bus
#[derive(Debug, Default)]
pub struct DbusNotifier;

impl DbusNotifier {
    pub fn new() -> Self {
        Self
    }
}

impl Notifier for DbusNotifier {
    fn notify(&self, n: &Notification) -> Result<u32> {
        let connection = zbus::blocking::Connection::session()?;

        let actions: Vec<&str> = n.actions.iter().map(String::as_str).collect();
        let hints: HashMap<&str, Value<'_>> = n
            .hints
            .iter()
            .map(|(k, v)| (k.as_str(), Value::from(v.as_str())))
            .collect();

        let reply = connection.call_method(
            Some(BUS_NAME),
            OBJECT_PATH,
            Some(BUS_NAME),
            "Notify",
            &(
                n.app_name.as_str(),
                n.replaces_id,
                n.icon.as_str(),
                n.summary.as_str(),
                n.body.as_str(),
                actions,
                hints,
                n.expire_timeout,
            ),
        )?;

        let id: u32 = reply.body().deserialize()?;
        info!("Sent notification {}: {}", id, n.body);
        Ok(id)
    }
}
