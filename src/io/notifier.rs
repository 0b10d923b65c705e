//! Transient check-in notifications (toasts)

use crate::domain::types::Notification;
use std::time::Duration;
use tracing::info;

pub trait Notifier: Send + Sync {
    fn notify(&self, notification: &Notification, duration: Duration);
}

/// Emits notifications as structured log events
#[derive(Debug, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, notification: &Notification, duration: Duration) {
        info!(
            guest = %notification.name,
            at = %notification.checked_in_at.format("%Y-%m-%d %H:%M:%S"),
            duration_ms = %duration.as_millis(),
            "{}",
            notification.text
        );
    }
}
