use anyhow::Result;
use chrono::{NaiveDate, Utc};
use chrono_tz::Tz;
use execsync_core::Appointment;
use execsync_core::backend::Identity;
use execsync_core::config::ExecSyncConfig;
use execsync_core::context::ServiceContext;
use execsync_core::store::AppointmentStore;

use crate::utils::tui;

/// Everything a command needs: settings, a signed-in store and today's date.
pub struct Session {
    pub config: ExecSyncConfig,
    pub store: AppointmentStore,
    /// None when sign-in failed. The session then runs with an empty list.
    pub identity: Option<Identity>,
    pub today: NaiveDate,
}

impl Session {
    pub async fn start() -> Result<Self> {
        let config = ExecSyncConfig::load()?;
        let today = today(&config)?;
        let store = AppointmentStore::new(ServiceContext::init(&config)?);

        // The store logs why sign-in failed.
        let identity = tui::with_spinner("Signing in", store.authenticate()).await.ok();
        match &identity {
            Some(identity) => tracing::debug!(uid = %identity.uid, "session signed in"),
            None => tracing::warn!("continuing without a signed-in identity"),
        }

        Ok(Session {
            config,
            store,
            identity,
            today,
        })
    }

    pub fn office_id(&self) -> &str {
        &self.config.office_id
    }

    /// The office's current appointments, or none without a signed-in identity.
    pub async fn appointments(&self) -> Result<Vec<Appointment>> {
        match &self.identity {
            Some(identity) => Ok(self.store.fetch(identity).await?),
            None => Ok(Vec::new()),
        }
    }

    pub fn display_date(&self, date: NaiveDate) -> String {
        execsync_core::date::display_date(date, &self.config.date_format)
    }

    /// Sign out. Subscriptions must be dropped before this.
    pub async fn finish(self) -> Result<()> {
        self.store.context().clone().dispose().await?;
        Ok(())
    }
}

/// Today's date in the configured zone, or the host zone, or UTC.
fn today(config: &ExecSyncConfig) -> Result<NaiveDate> {
    let tz = match config.timezone()? {
        Some(tz) => tz,
        None => host_timezone(),
    };
    Ok(Utc::now().with_timezone(&tz).date_naive())
}

fn host_timezone() -> Tz {
    iana_time_zone::get_timezone()
        .ok()
        .and_then(|name| name.parse::<Tz>().ok())
        .unwrap_or(Tz::UTC)
}
