//! User-facing notices for tvdb-indexer
//!
//! Used by the fallback controller to report:
//! - A switch to the TVDB mirror
//! - The time left before moving back to thetvdb.com
//! - The return to thetvdb.com

use notify_rust::Notification;
use tracing::{debug, warn};

use crate::config::NotificationConfig;

const APP_NAME: &str = "tvdb-indexer";

/// Fire-and-forget notification capability. Delivery failures never reach the caller.
pub trait NotificationSink: Send + Sync {
    fn notify(&self, title: &str, message: &str);
}

/// Desktop notifications through the platform notification daemon.
#[derive(Debug, Default)]
pub struct DesktopNotifier;

impl NotificationSink for DesktopNotifier {
    fn notify(&self, title: &str, message: &str) {
        debug!(summary = %title, body = %message, "Sending notification");

        let result = Notification::new()
            .appname(APP_NAME)
            .summary(title)
            .body(message)
            .timeout(5000)
            .show();

        if let Err(e) = result {
            warn!("Failed to send notification: {}", e);
        }
    }
}

/// Writes notices to the log, for headless use.
#[derive(Debug, Default)]
pub struct LogNotifier;

impl NotificationSink for LogNotifier {
    fn notify(&self, title: &str, message: &str) {
        warn!(title = %title, "{}", message);
    }
}

/// The sink picked by `[notifications]` in the config.
#[derive(Debug)]
pub enum Notifier {
    Desktop(DesktopNotifier),
    Log(LogNotifier),
}

impl Notifier {
    pub fn from_config(config: &NotificationConfig) -> Self {
        if config.desktop {
            Notifier::Desktop(DesktopNotifier)
        } else {
            Notifier::Log(LogNotifier)
        }
    }
}

impl NotificationSink for Notifier {
    fn notify(&self, title: &str, message: &str) {
        match self {
            Notifier::Desktop(sink) => sink.notify(title, message),
            Notifier::Log(sink) => sink.notify(title, message),
        }
    }
}
