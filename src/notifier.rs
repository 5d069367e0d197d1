//! Desktop implementations of the alert seams.

use std::io::Write;

use execsync_core::config::NotificationSettings;
use execsync_core::notify::{NotificationDispatcher, Permission, SoundPlayer, SystemNotifier};

const APP_NAME: &str = "Executive Sync";

/// Native notifications through the host's notification daemon.
pub struct DesktopNotifier {
    enabled: bool,
}

impl SystemNotifier for DesktopNotifier {
    fn request_permission(&self) -> Permission {
        // Desktop daemons do not ask; the config switch stands in for consent.
        if self.enabled {
            Permission::Granted
        } else {
            Permission::Denied
        }
    }

    fn show(&self, title: &str, body: &str) -> Result<(), String> {
        notify_rust::Notification::new()
            .appname(APP_NAME)
            .summary(title)
            .body(body)
            .show()
            .map(|_| ())
            .map_err(|e| e.to_string())
    }
}

/// Rings the terminal bell.
pub struct TerminalBell {
    enabled: bool,
}

impl SoundPlayer for TerminalBell {
    fn play(&self) -> Result<(), String> {
        if !self.enabled {
            return Ok(());
        }
        let mut stdout = std::io::stdout();
        stdout
            .write_all(b"\x07")
            .and_then(|_| stdout.flush())
            .map_err(|e| e.to_string())
    }
}

pub fn dispatcher(office_id: &str, settings: &NotificationSettings) -> NotificationDispatcher {
    NotificationDispatcher::new(
        office_id,
        Box::new(TerminalBell {
            enabled: settings.sound,
        }),
        Box::new(DesktopNotifier {
            enabled: settings.desktop,
        }),
    )
}
