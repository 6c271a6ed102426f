use crate::error::SinkError;
use crate::models::{AlertEvent, AlertResolved};
use notify_rust::{Notification, Timeout};
#[cfg(all(unix, not(target_os = "macos")))]
use notify_rust::Urgency;

/// 告警输出，尽力投递，不重试
pub trait NotificationSink: Send {
    fn name(&self) -> &'static str;

    fn notify(&mut self, event: &AlertEvent) -> Result<(), SinkError>;

    /// 已告警进程恢复正常
    fn resolve(&mut self, _resolved: &AlertResolved) -> Result<(), SinkError> {
        Ok(())
    }
}

/// 桌面通知（freedesktop / macOS 通知中心）
pub struct DesktopNotifier {
    appname: String,
}

impl DesktopNotifier {
    pub fn new() -> Self {
        Self {
            appname: "CPU Watchdog".to_string(),
        }
    }
}

impl Default for DesktopNotifier {
    fn default() -> Self {
        Self::new()
    }
}

impl NotificationSink for DesktopNotifier {
    fn name(&self) -> &'static str {
        "desktop"
    }

    fn notify(&mut self, event: &AlertEvent) -> Result<(), SinkError> {
        let mut notification = Notification::new();
        notification
            .summary(event.summary())
            .body(&event.body())
            .appname(&self.appname)
            .icon("dialog-warning")
            .timeout(Timeout::Never);
        #[cfg(all(unix, not(target_os = "macos")))]
        notification.urgency(Urgency::Critical);

        notification
            .show()
            .map(|_| ())
            .map_err(|e| SinkError::Notification(e.to_string()))
    }
}

/// 仅写日志，用于无桌面环境
#[derive(Default)]
pub struct LogNotifier;

impl NotificationSink for LogNotifier {
    fn name(&self) -> &'static str {
        "log"
    }

    fn notify(&mut self, event: &AlertEvent) -> Result<(), SinkError> {
        log::warn!("⚠️  {}: {}", event.summary(), event.body());
        Ok(())
    }

    fn resolve(&mut self, resolved: &AlertResolved) -> Result<(), SinkError> {
        log::info!(
            "✅ {} (PID {}) is back below the CPU threshold",
            resolved.name,
            resolved.pid
        );
        Ok(())
    }
}
