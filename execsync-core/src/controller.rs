//! Session state machine behind the interactive front-end.
//!
//! One top-level view at a time, plus an add-form flag that is independent of
//! it. The controller never talks to a subscription directly: the owner feeds
//! it `StoreUpdate`s and calls `save` or `confirm_delete` with the store.

use std::time::Instant;

use chrono::NaiveDate;

use crate::appointment::{Appointment, NewAppointment};
use crate::banner::BannerSlot;
use crate::calendar::{CalendarView, Month};
use crate::constants::SUCCESS_BANNER_TTL;
use crate::error::ExecSyncResult;
use crate::store::{AppointmentStore, StoreUpdate};

pub const SAVED_MESSAGE: &str = "Appointment saved";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Calendar,
    Day,
    Summary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    SelectDate(NaiveDate),
    Back,
    ShowFreeDays,
    PreviousMonth,
    NextMonth,
    OpenAddForm,
    CancelAdd,
}

/// Result of a save attempt that did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    Saved(String),
    /// The draft had no title. Nothing was written and the form stays open.
    Ignored,
}

#[derive(Debug)]
pub struct ViewController {
    view: View,
    selected_date: NaiveDate,
    displayed_month: Month,
    adding: bool,
    draft: NewAppointment,
    pending_delete: Option<String>,
    appointments: Vec<Appointment>,
    loading: bool,
    success: BannerSlot,
}

impl ViewController {
    /// Calendar view on today's month, still waiting for the first snapshot.
    pub fn new(today: NaiveDate) -> Self {
        ViewController {
            view: View::Calendar,
            selected_date: today,
            displayed_month: Month::of(today),
            adding: false,
            draft: NewAppointment::for_date(today),
            pending_delete: None,
            appointments: Vec::new(),
            loading: true,
            success: BannerSlot::new(SUCCESS_BANNER_TTL),
        }
    }

    pub fn view(&self) -> View {
        self.view
    }

    pub fn selected_date(&self) -> NaiveDate {
        self.selected_date
    }

    pub fn displayed_month(&self) -> Month {
        self.displayed_month
    }

    pub fn is_adding(&self) -> bool {
        self.adding
    }

    pub fn draft(&self) -> &NewAppointment {
        &self.draft
    }

    pub fn draft_mut(&mut self) -> &mut NewAppointment {
        &mut self.draft
    }

    pub fn pending_delete(&self) -> Option<&str> {
        self.pending_delete.as_deref()
    }

    pub fn appointments(&self) -> &[Appointment] {
        &self.appointments
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn calendar(&self) -> CalendarView<'_> {
        CalendarView::new(&self.appointments)
    }

    /// Appointments of the selected day, earliest first.
    pub fn day_appointments(&self) -> Vec<&Appointment> {
        self.calendar().appointments_for_day(self.selected_date)
    }

    pub fn free_days(&self) -> Vec<NaiveDate> {
        self.calendar().free_days_in_month(self.displayed_month)
    }

    /// Apply a navigation action. Returns false when the action does not
    /// apply to the current state, which is then left untouched.
    pub fn apply(&mut self, action: Action) -> bool {
        let applied = match (self.view, action) {
            (View::Calendar | View::Summary, Action::SelectDate(date)) => {
                self.selected_date = date;
                self.displayed_month = Month::of(date);
                self.view = View::Day;
                true
            }
            (View::Day | View::Summary, Action::Back) => {
                self.view = View::Calendar;
                true
            }
            (View::Calendar, Action::ShowFreeDays) => {
                self.view = View::Summary;
                true
            }
            (View::Calendar | View::Summary, Action::PreviousMonth) => {
                self.displayed_month = self.displayed_month.previous();
                true
            }
            (View::Calendar | View::Summary, Action::NextMonth) => {
                self.displayed_month = self.displayed_month.next();
                true
            }
            (_, Action::OpenAddForm) if !self.adding => {
                // An untouched draft follows the selected day.
                if !self.draft.has_title() {
                    self.draft.date = self.selected_date;
                }
                self.adding = true;
                true
            }
            (_, Action::CancelAdd) if self.adding => {
                self.adding = false;
                true
            }
            _ => false,
        };

        if !applied {
            tracing::debug!(view = ?self.view, ?action, "action ignored");
        }
        applied
    }

    /// Replace the appointment list with a fresh delivery.
    pub fn apply_update(&mut self, update: StoreUpdate) {
        self.appointments = update.appointments;
        self.loading = false;

        let gone = self
            .pending_delete
            .as_deref()
            .is_some_and(|id| self.calendar().find(id).is_none());
        if gone {
            self.pending_delete = None;
        }
    }

    /// The subscription failed: stop waiting but keep the list as it was.
    pub fn subscription_failed(&mut self) {
        self.loading = false;
    }

    pub async fn save(&mut self, store: &AppointmentStore) -> ExecSyncResult<SaveOutcome> {
        self.save_at(store, Instant::now()).await
    }

    /// Save the draft. On failure the form stays open with the draft intact
    /// and the error is returned for the caller to show.
    pub async fn save_at(
        &mut self,
        store: &AppointmentStore,
        now: Instant,
    ) -> ExecSyncResult<SaveOutcome> {
        if !self.draft.has_title() {
            return Ok(SaveOutcome::Ignored);
        }

        match store.create(&self.draft).await? {
            Some(id) => {
                self.draft = NewAppointment::for_date(self.selected_date);
                self.adding = false;
                self.success.show(SAVED_MESSAGE, now);
                Ok(SaveOutcome::Saved(id))
            }
            None => Ok(SaveOutcome::Ignored),
        }
    }

    /// First step of a delete. Returns false for an unknown id.
    pub fn request_delete(&mut self, id: &str) -> bool {
        if self.calendar().find(id).is_none() {
            return false;
        }
        self.pending_delete = Some(id.to_string());
        true
    }

    pub fn cancel_delete(&mut self) {
        self.pending_delete = None;
    }

    /// Delete the confirmed appointment. A failed delete is logged by the
    /// store and otherwise ignored. Returns false when nothing was pending.
    pub async fn confirm_delete(&mut self, store: &AppointmentStore) -> bool {
        let Some(id) = self.pending_delete.take() else {
            return false;
        };
        let _ = store.remove(&id).await;
        true
    }

    pub fn success_banner(&self, now: Instant) -> Option<&str> {
        self.success.visible(now)
    }

    pub fn expire_banners(&mut self, now: Instant) {
        self.success.expire(now);
    }
}
