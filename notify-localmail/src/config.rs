//! Configuration for notify-localmail
//!
//! Everything is resolved once at startup into absolute paths and handed to
//! each step explicitly. Defaults follow the system conventions (mail spool
//! under `/var/mail`, cache under the XDG data directory) and can be
//! overridden by an optional TOML file.
//!
//! # Example Configuration
//!
//! ```toml
//! mailbox_path = "/var/spool/mail/alice"
//! instance_port = 15152
//!
//! [notification]
//! icon = "mail-message-new"
//!
//! [logging]
//! level = "debug"
//! ```

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::error::{NotifyError, Result};

/// Directory name used under the XDG data and config directories
pub const APP_DIR: &str = "notify-on-localmail";

/// System mail spool
pub const MAIL_SPOOL: &str = "/var/mail";

/// Main configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// System mailbox of the current user (read only)
    pub mailbox_path: PathBuf,
    /// Private copy of the mailbox carrying our read flags
    pub cache_path: PathBuf,
    /// Local TCP port used as the single-instance lock
    pub instance_port: u16,
    /// Notification appearance
    pub notification: NotificationConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Fixed fields of the desktop notification
#[derive(Debug, Clone)]
pub struct NotificationConfig {
    pub app_name: String,
    pub icon: String,
    pub summary: String,
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Default level when RUST_LOG is not set
    pub level: String,
}

/// On-disk overrides; every field is optional
#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    mailbox_path: Option<PathBuf>,
    cache_path: Option<PathBuf>,
    instance_port: Option<u16>,
    #[serde(default)]
    notification: NotificationOverrides,
    #[serde(default)]
    logging: LoggingOverrides,
}

#[derive(Debug, Default, Deserialize)]
struct NotificationOverrides {
    app_name: Option<String>,
    icon: Option<String>,
    summary: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingOverrides {
    level: Option<String>,
}

fn default_instance_port() -> u16 {
    15151
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            app_name: "notify on local mail".to_string(),
            icon: "mail-unread".to_string(),
            summary: "New local mail".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Config {
    /// Build a configuration for explicit mailbox and cache paths
    pub fn for_paths(mailbox_path: impl Into<PathBuf>, cache_path: impl Into<PathBuf>) -> Self {
        Self {
            mailbox_path: mailbox_path.into(),
            cache_path: cache_path.into(),
            instance_port: default_instance_port(),
            notification: NotificationConfig::default(),
            logging: LoggingConfig::default(),
        }
    }

    /// Resolve the configuration of the current user
    ///
    /// Applies `<config dir>/notify-on-localmail/config.toml` when present and
    /// creates the data directory holding the cache.
    pub fn resolve() -> Result<Self> {
        let user = current_user()
            .ok_or_else(|| NotifyError::Config("Cannot determine the current user".to_string()))?;
        let data_dir = dirs::data_dir()
            .ok_or_else(|| NotifyError::Config("Cannot determine the XDG data directory".to_string()))?;

        let mut config = Self::defaults_for(&user, &data_dir);

        if let Some(config_dir) = dirs::config_dir() {
            let path = config_dir.join(APP_DIR).join("config.toml");
            if path.exists() {
                config.apply_file(&path)?;
            }
        }

        config.validate()?;

        if let Some(parent) = config.cache_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                NotifyError::Config(format!("Failed to create {}: {}", parent.display(), e))
            })?;
        }

        Ok(config)
    }

    /// Default layout for `user` with the given XDG data directory
    pub fn defaults_for(user: &str, data_dir: &Path) -> Self {
        Self::for_paths(
            Path::new(MAIL_SPOOL).join(user),
            data_dir.join(APP_DIR).join("mail"),
        )
    }

    /// Overlay values from a TOML file
    pub fn apply_file(&mut self, path: &Path) -> Result<()> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| NotifyError::Config(format!("Failed to read config file: {}", e)))?;
        self.apply_toml(&content)
    }

    fn apply_toml(&mut self, content: &str) -> Result<()> {
        let file: ConfigFile = toml::from_str(content)
            .map_err(|e| NotifyError::Config(format!("Failed to parse config: {}", e)))?;

        if let Some(p) = file.mailbox_path {
            self.mailbox_path = p;
        }
        if let Some(p) = file.cache_path {
            self.cache_path = p;
        }
        if let Some(port) = file.instance_port {
            self.instance_port = port;
        }
        if let Some(v) = file.notification.app_name {
            self.notification.app_name = v;
        }
        if let Some(v) = file.notification.icon {
            self.notification.icon = v;
        }
        if let Some(v) = file.notification.summary {
            self.notification.summary = v;
        }
        if let Some(v) = file.logging.level {
            self.logging.level = v;
        }
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.instance_port == 0 {
            return Err(NotifyError::Config("instance_port must not be 0".to_string()));
        }
        if !self.mailbox_path.is_absolute() || !self.cache_path.is_absolute() {
            return Err(NotifyError::Config("Mailbox and cache paths must be absolute".to_string()));
        }
        if self.mailbox_path == self.cache_path {
            return Err(NotifyError::Config(
                "Cache path must differ from the system mailbox".to_string(),
            ));
        }
        Ok(())
    }
}

/// Login name of the current user, looked up the way `getpass` does
///
/// The environment wins; the passwd entry of the real uid is the fallback.
fn current_user() -> Option<String> {
    user_from_env(|var| std::env::var(var).ok()).or_else(|| {
        nix::unistd::User::from_uid(nix::unistd::getuid())
            .ok()
            .flatten()
            .map(|user| user.name)
    })
}

fn user_from_env<F>(lookup: F) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    ["LOGNAME", "USER", "LNAME", "USERNAME"]
        .iter()
        .filter_map(|var| lookup(var))
        .find(|name| !name.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_for_user() {
        let config = Config::defaults_for("alice", Path::new("/home/alice/.local/share"));
        assert_eq!(config.mailbox_path, PathBuf::from("/var/mail/alice"));
        assert_eq!(
            config.cache_path,
            PathBuf::from("/home/alice/.local/share/notify-on-localmail/mail")
        );
        assert_eq!(config.instance_port, 15151);
        assert_eq!(config.notification.app_name, "notify on local mail");
        assert_eq!(config.notification.icon, "mail-unread");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_user_from_env_order() {
        let env = |var: &str| match var {
            "USER" => Some("from-user".to_string()),
            "USERNAME" => Some("from-username".to_string()),
            "LOGNAME" => Some(String::new()),
            _ => None,
        };
        assert_eq!(user_from_env(env).as_deref(), Some("from-user"));
        assert_eq!(user_from_env(|_| None), None);
    }

    #[test]
    fn test_current_user_falls_back_to_passwd() {
        let expected = nix::unistd::User::from_uid(nix::unistd::getuid())
            .unwrap()
            .map(|user| user.name);
        if let Some(name) = expected {
            assert!(current_user().is_some());
            if user_from_env(|var| std::env::var(var).ok()).is_none() {
                assert_eq!(current_user(), Some(name));
            }
        }
    }

    #[test]
    fn test_partial_override() {
        let mut config = Config::defaults_for("bob", Path::new("/data"));
        config
            .apply_toml(
                r#"
instance_port = 20000

[notification]
icon = "mail-message-new"
"#,
            )
            .unwrap();

        assert_eq!(config.instance_port, 20000);
        assert_eq!(config.notification.icon, "mail-message-new");
        assert_eq!(config.notification.summary, "New local mail");
        assert_eq!(config.mailbox_path, PathBuf::from("/var/mail/bob"));
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_invalid_toml() {
        let mut config = Config::defaults_for("bob", Path::new("/data"));
        let err = config.apply_toml("instance_port = \"many\"").unwrap_err();
        assert!(matches!(err, NotifyError::Config(_)));
    }

    #[test]
    fn test_validate_rejects_same_paths() {
        let config = Config::for_paths("/var/mail/bob", "/var/mail/bob");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_port_zero() {
        let mut config = Config::defaults_for("bob", Path::new("/data"));
        config.instance_port = 0;
        assert!(config.validate().is_err());
    }
}
