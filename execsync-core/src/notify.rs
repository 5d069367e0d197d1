//! Alerts for appointments added while the viewer is watching.
//!
//! Only `added` changes after a subscription's first delivery count as new
//! arrivals; the initial load, edits and deletions never alert.

use std::sync::{Mutex, MutexGuard};
use std::time::Instant;

use crate::appointment::Appointment;
use crate::backend::ChangeKind;
use crate::banner::BannerSlot;
use crate::constants::{INCOMING_BANNER_TTL, NOTIFICATION_TITLE};
use crate::store::StoreUpdate;

/// Plays the alert sound from the start.
pub trait SoundPlayer: Send + Sync {
    fn play(&self) -> Result<(), String>;
}

/// Host permission for system notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    Granted,
    Denied,
    /// The user has not decided yet.
    Default,
}

/// Native notification surface of the host.
pub trait SystemNotifier: Send + Sync {
    /// Ask once for permission to show notifications.
    fn request_permission(&self) -> Permission;

    fn show(&self, title: &str, body: &str) -> Result<(), String>;
}

pub struct NotificationDispatcher {
    office_id: String,
    sound: Box<dyn SoundPlayer>,
    notifier: Box<dyn SystemNotifier>,
    permission: Permission,
    banner: Mutex<BannerSlot>,
}

impl NotificationDispatcher {
    /// Permission is requested here and never again.
    pub fn new(
        office_id: &str,
        sound: Box<dyn SoundPlayer>,
        notifier: Box<dyn SystemNotifier>,
    ) -> Self {
        let permission = notifier.request_permission();
        tracing::debug!(?permission, "notification permission");

        NotificationDispatcher {
            office_id: office_id.to_string(),
            sound,
            notifier,
            permission,
            banner: Mutex::new(BannerSlot::new(INCOMING_BANNER_TTL)),
        }
    }

    pub fn permission(&self) -> Permission {
        self.permission
    }

    /// React to a store update. Returns how many arrivals were announced.
    pub fn handle(&self, update: &StoreUpdate) -> usize {
        self.handle_at(update, Instant::now())
    }

    pub fn handle_at(&self, update: &StoreUpdate, now: Instant) -> usize {
        if update.initial {
            return 0;
        }

        let arrivals: Vec<&Appointment> = update
            .changes
            .iter()
            .filter(|c| c.kind == ChangeKind::Added && c.appointment.office_id == self.office_id)
            .map(|c| &c.appointment)
            .collect();

        for appointment in &arrivals {
            self.announce(appointment, now);
        }
        arrivals.len()
    }

    /// Incoming-appointment banner visible at `now`.
    pub fn banner(&self, now: Instant) -> Option<String> {
        self.banner_slot().visible(now).map(str::to_string)
    }

    fn announce(&self, appointment: &Appointment, now: Instant) {
        if let Err(e) = self.sound.play() {
            // Blocked or missing audio is not worth surfacing.
            tracing::debug!(error = %e, "alert sound not played");
        }

        self.banner_slot().show(appointment.to_string(), now);

        if self.permission == Permission::Granted {
            let body = format!("{} at {}", appointment.title, appointment.time_label());
            if let Err(e) = self.notifier.show(NOTIFICATION_TITLE, &body) {
                tracing::warn!(error = %e, "system notification failed");
            }
        }

        tracing::info!(id = %appointment.id, title = %appointment.title, "new appointment announced");
    }

    fn banner_slot(&self) -> MutexGuard<'_, BannerSlot> {
        self.banner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
