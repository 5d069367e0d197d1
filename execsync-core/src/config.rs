//! Configuration at ~/.config/execsync/config.toml
//!
//! Every key is optional. `EXECSYNC_*` environment variables override the
//! file, with `__` separating nested keys (`EXECSYNC_NOTIFICATIONS__SOUND`).

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono_tz::Tz;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_APP_ID, DEFAULT_DATE_FORMAT, DEFAULT_OFFICE_ID, DEFAULT_POLL_INTERVAL,
    DEFAULT_USERNAME,
};
use crate::error::{ExecSyncError, ExecSyncResult};

static DEFAULT_DATA_DIR: &str = "~/execsync";

const MIN_POLL_INTERVAL: Duration = Duration::from_millis(10);

fn default_app_id() -> String {
    DEFAULT_APP_ID.to_string()
}

fn default_office_id() -> String {
    DEFAULT_OFFICE_ID.to_string()
}

fn default_username() -> String {
    DEFAULT_USERNAME.to_string()
}

fn default_data_dir() -> PathBuf {
    PathBuf::from(DEFAULT_DATA_DIR)
}

fn default_poll_interval() -> Duration {
    DEFAULT_POLL_INTERVAL
}

fn default_date_format() -> String {
    DEFAULT_DATE_FORMAT.to_string()
}

fn enabled() -> bool {
    true
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ExecSyncConfig {
    #[serde(default = "default_app_id")]
    pub app_id: String,

    /// The office whose appointments are shown. Not derived from sign-in.
    #[serde(default = "default_office_id")]
    pub office_id: String,

    /// Recorded as the creator of new appointments.
    #[serde(default = "default_username")]
    pub username: String,

    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Pre-provisioned sign-in token. Anonymous sign-in when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_token: Option<String>,

    /// IANA zone deciding what "today" is. Host zone when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,

    #[serde(default = "default_poll_interval", with = "duration_str")]
    pub poll_interval: Duration,

    #[serde(default = "default_date_format")]
    pub date_format: String,

    #[serde(default)]
    pub notifications: NotificationSettings,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct NotificationSettings {
    #[serde(default = "enabled")]
    pub desktop: bool,

    #[serde(default = "enabled")]
    pub sound: bool,
}

impl Default for NotificationSettings {
    fn default() -> Self {
        NotificationSettings {
            desktop: true,
            sound: true,
        }
    }
}

impl ExecSyncConfig {
    pub fn config_path() -> ExecSyncResult<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| ExecSyncError::Config("Could not determine config directory".into()))?
            .join("execsync");

        Ok(config_dir.join("config.toml"))
    }

    /// Load the user config, creating a commented template on first run.
    pub fn load() -> ExecSyncResult<Self> {
        let config_path = Self::config_path()?;

        if !config_path.exists() {
            Self::create_default_config(&config_path)?;
        }

        Self::load_from(&config_path)
    }

    pub fn load_from(path: &Path) -> ExecSyncResult<Self> {
        let config: ExecSyncConfig = Config::builder()
            .add_source(File::from(path.to_path_buf()).required(false))
            .add_source(
                Environment::with_prefix("EXECSYNC")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()
            .map_err(|e| ExecSyncError::Config(e.to_string()))?
            .try_deserialize()
            .map_err(|e| ExecSyncError::Config(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> ExecSyncResult<()> {
        if self.app_id.trim().is_empty() {
            return Err(ExecSyncError::Config("app_id must not be empty".into()));
        }
        if self.office_id.trim().is_empty() {
            return Err(ExecSyncError::Config("office_id must not be empty".into()));
        }
        if self.poll_interval < MIN_POLL_INTERVAL {
            return Err(ExecSyncError::Config(format!(
                "poll_interval must be at least {}ms",
                MIN_POLL_INTERVAL.as_millis()
            )));
        }
        self.timezone()?;
        Ok(())
    }

    /// Data directory with `~` expanded.
    pub fn data_path(&self) -> PathBuf {
        let full_path_str = shellexpand::tilde(&self.data_dir.to_string_lossy()).into_owned();

        PathBuf::from(full_path_str)
    }

    /// The configured zone, if any.
    pub fn timezone(&self) -> ExecSyncResult<Option<Tz>> {
        self.timezone
            .as_deref()
            .map(|name| {
                name.parse::<Tz>()
                    .map_err(|_| ExecSyncError::Config(format!("Unknown timezone '{}'", name)))
            })
            .transpose()
    }

    /// Effective settings as TOML, with the auth token masked.
    pub fn to_toml(&self) -> ExecSyncResult<String> {
        let mut shown = self.clone();
        if shown.auth_token.is_some() {
            shown.auth_token = Some("********".into());
        }
        toml::to_string_pretty(&shown).map_err(|e| ExecSyncError::Serialization(e.to_string()))
    }

    /// Create a default config file with all options commented out.
    pub fn create_default_config(path: &Path) -> ExecSyncResult<()> {
        let contents = format!(
            "\
# Executive Sync configuration

# Application id scoping the shared appointment collection:
# app_id = \"{app_id}\"

# Office whose appointments are tracked:
# office_id = \"{office_id}\"

# Name recorded on appointments you create:
# username = \"{username}\"

# Where appointment data is stored:
# data_dir = \"{data_dir}\"

# Sign in with a pre-provisioned token instead of anonymously:
# auth_token = \"...\"

# Zone used to decide today's date (defaults to the system zone):
# timezone = \"Asia/Bangkok\"

# How often to check for appointments added elsewhere:
# poll_interval = \"1s\"

# chrono format for long dates:
# date_format = \"{date_format}\"

# [notifications]
# desktop = true
# sound = true
",
            app_id = DEFAULT_APP_ID,
            office_id = DEFAULT_OFFICE_ID,
            username = DEFAULT_USERNAME,
            data_dir = DEFAULT_DATA_DIR,
            date_format = DEFAULT_DATE_FORMAT,
        );

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                ExecSyncError::Config(format!("Could not create config directory: {e}"))
            })?;
        }

        std::fs::write(path, contents)
            .map_err(|e| ExecSyncError::Config(format!("Could not write config file: {e}")))?;

        Ok(())
    }
}

/// Durations written the human way, e.g. `"1s"` or `"500ms"`.
mod duration_str {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&humantime::format_duration(*duration).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let s = String::deserialize(deserializer)?;
        humantime::parse_duration(&s).map_err(serde::de::Error::custom)
    }
}
