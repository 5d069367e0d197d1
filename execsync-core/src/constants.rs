//! Fixed identifiers and timings.

use std::time::Duration;

/// Application identifier scoping the shared collection path. Kept stable
/// across deployments so stored permissions keep matching.
pub const DEFAULT_APP_ID: &str = "executive-sync";

/// The single office this deployment tracks.
pub const DEFAULT_OFFICE_ID: &str = "exec-office";

/// Name recorded as `createdBy` on new appointments.
pub const DEFAULT_USERNAME: &str = "Secretary";

/// Collection holding appointment documents.
pub const APPOINTMENTS_COLLECTION: &str = "appointments";

/// How long the "saved" banner stays up.
pub const SUCCESS_BANNER_TTL: Duration = Duration::from_secs(2);

/// How long the incoming-appointment banner stays up.
pub const INCOMING_BANNER_TTL: Duration = Duration::from_secs(5);

/// Title of the desktop notification raised for a new appointment.
pub const NOTIFICATION_TITLE: &str = "New appointment";

/// Time pre-filled in the add form.
pub const DEFAULT_APPOINTMENT_TIME: &str = "09:00";

/// How often a file-backed live query checks for writes from other processes.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Default chrono format for human-readable dates.
pub const DEFAULT_DATE_FORMAT: &str = "%A, %-d %B %Y";
