//! Appointment records and the add-form draft.
//!
//! Remote documents are untyped. `Appointment::from_document` is the only way
//! a stored document becomes an `Appointment`: every field is checked before
//! the record reaches the calendar.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::backend::{Document, Fields};
use crate::constants::DEFAULT_APPOINTMENT_TIME;
use crate::date::{date_key, parse_date_key, parse_time, time_label};
use crate::error::{ExecSyncError, ExecSyncResult};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppointmentKind {
    #[default]
    Work,
    Personal,
}

impl AppointmentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentKind::Work => "work",
            AppointmentKind::Personal => "personal",
        }
    }

    /// Label shown next to the appointment.
    pub fn label(&self) -> &'static str {
        match self {
            AppointmentKind::Work => "Work",
            AppointmentKind::Personal => "Personal",
        }
    }
}

impl FromStr for AppointmentKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "work" => Ok(AppointmentKind::Work),
            "personal" => Ok(AppointmentKind::Personal),
            other => Err(format!(
                "Unknown appointment type '{}'. Expected work or personal",
                other
            )),
        }
    }
}

impl fmt::Display for AppointmentKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A stored appointment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Appointment {
    /// Assigned by the document store, never by the client.
    pub id: String,
    pub office_id: String,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub title: String,
    pub kind: AppointmentKind,
    pub note: Option<String>,
    pub dress_code: Option<String>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

/// Wire shape of an appointment document.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AppointmentFields {
    office_id: String,
    date: String,
    time: String,
    title: String,
    #[serde(rename = "type")]
    kind: AppointmentKind,
    #[serde(default)]
    note: String,
    #[serde(default)]
    dress_code: String,
    #[serde(default)]
    created_by: String,
    created_at: DateTime<Utc>,
}

impl Appointment {
    /// Validate and convert a stored document.
    pub fn from_document(document: &Document) -> ExecSyncResult<Self> {
        let id = document.id.as_str();
        let fields: AppointmentFields =
            serde_json::from_value(serde_json::Value::Object(document.fields.clone()))
                .map_err(|e| ExecSyncError::decode(id, e.to_string()))?;

        let date = parse_date_key(&fields.date).map_err(|e| ExecSyncError::decode(id, e))?;
        let time = parse_time(&fields.time).map_err(|e| ExecSyncError::decode(id, e))?;

        let title = fields.title.trim();
        if title.is_empty() {
            return Err(ExecSyncError::decode(id, "title is empty"));
        }

        Ok(Appointment {
            id: document.id.clone(),
            office_id: fields.office_id,
            date,
            time,
            title: title.to_string(),
            kind: fields.kind,
            note: non_empty(fields.note),
            dress_code: non_empty(fields.dress_code),
            created_by: fields.created_by,
            created_at: fields.created_at,
        })
    }

    pub fn date_key(&self) -> String {
        date_key(self.date)
    }

    pub fn time_label(&self) -> String {
        time_label(self.time)
    }
}

impl fmt::Display for Appointment {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} ({})", self.title, self.time_label())
    }
}

/// The add-appointment form contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAppointment {
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub title: String,
    pub kind: AppointmentKind,
    pub note: String,
    pub dress_code: String,
}

impl NewAppointment {
    /// Empty draft for `date` with the default time pre-filled.
    pub fn for_date(date: NaiveDate) -> Self {
        NewAppointment {
            date,
            time: default_time(),
            title: String::new(),
            kind: AppointmentKind::default(),
            note: String::new(),
            dress_code: String::new(),
        }
    }

    pub fn has_title(&self) -> bool {
        !self.title.trim().is_empty()
    }

    /// Document body for this draft. The id is left to the store.
    pub fn to_fields(
        &self,
        office_id: &str,
        created_by: &str,
        created_at: DateTime<Utc>,
    ) -> ExecSyncResult<Fields> {
        let fields = AppointmentFields {
            office_id: office_id.to_string(),
            date: date_key(self.date),
            time: time_label(self.time),
            title: self.title.trim().to_string(),
            kind: self.kind,
            note: self.note.trim().to_string(),
            dress_code: self.dress_code.trim().to_string(),
            created_by: created_by.to_string(),
            created_at,
        };

        match serde_json::to_value(fields) {
            Ok(serde_json::Value::Object(map)) => Ok(map),
            Ok(_) => Err(ExecSyncError::Serialization(
                "appointment did not serialize to an object".into(),
            )),
            Err(e) => Err(ExecSyncError::Serialization(e.to_string())),
        }
    }
}

fn default_time() -> NaiveTime {
    parse_time(DEFAULT_APPOINTMENT_TIME).unwrap_or(NaiveTime::MIN)
}

fn non_empty(s: String) -> Option<String> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn document(fields: serde_json::Value) -> Document {
        let serde_json::Value::Object(fields) = fields else {
            panic!("fields must be an object");
        };
        Document {
            id: "doc-1".to_string(),
            fields,
        }
    }

    fn valid_fields() -> serde_json::Value {
        json!({
            "officeId": "exec-office",
            "date": "2025-06-10",
            "time": "09:00",
            "title": "Budget review",
            "type": "work",
            "note": "",
            "dressCode": "Formal",
            "createdBy": "Secretary",
            "createdAt": "2025-06-01T08:30:00Z"
        })
    }

    #[test]
    fn decodes_valid_document() {
        let appointment = Appointment::from_document(&document(valid_fields())).unwrap();

        assert_eq!(appointment.id, "doc-1");
        assert_eq!(appointment.date_key(), "2025-06-10");
        assert_eq!(appointment.time_label(), "09:00");
        assert_eq!(appointment.kind, AppointmentKind::Work);
        assert_eq!(appointment.note, None);
        assert_eq!(appointment.dress_code.as_deref(), Some("Formal"));
        assert_eq!(
            appointment.created_at,
            Utc.with_ymd_and_hms(2025, 6, 1, 8, 30, 0).unwrap()
        );
        assert_eq!(appointment.to_string(), "Budget review (09:00)");
    }

    #[test]
    fn optional_fields_may_be_missing() {
        let mut fields = valid_fields();
        let map = fields.as_object_mut().unwrap();
        map.remove("note");
        map.remove("dressCode");
        map.remove("createdBy");

        let appointment = Appointment::from_document(&document(fields)).unwrap();
        assert_eq!(appointment.note, None);
        assert_eq!(appointment.created_by, "");
    }

    #[test]
    fn rejects_malformed_documents() {
        let cases = [
            ("date", json!("2025-6-10")),
            ("time", json!("9am")),
            ("title", json!("   ")),
            ("type", json!("holiday")),
            ("officeId", json!(42)),
        ];

        for (field, value) in cases {
            let mut fields = valid_fields();
            fields[field] = value;
            let err = Appointment::from_document(&document(fields)).unwrap_err();
            assert!(
                matches!(err, ExecSyncError::Decode { ref id, .. } if id == "doc-1"),
                "{} should be rejected",
                field
            );
        }
    }

    #[test]
    fn draft_round_trips_through_fields() {
        let date = NaiveDate::from_ymd_opt(2025, 6, 10).unwrap();
        let mut draft = NewAppointment::for_date(date);
        assert_eq!(time_label(draft.time), DEFAULT_APPOINTMENT_TIME);
        assert!(!draft.has_title());

        draft.title = "  Dinner with partners ".to_string();
        draft.kind = AppointmentKind::Personal;
        draft.note = "Table for four".to_string();

        let created_at = Utc.with_ymd_and_hms(2025, 6, 2, 10, 0, 0).unwrap();
        let fields = draft.to_fields("exec-office", "Secretary", created_at).unwrap();
        assert!(!fields.contains_key("id"));
        assert_eq!(fields["type"], json!("personal"));
        assert_eq!(fields["date"], json!("2025-06-10"));

        let stored = Appointment::from_document(&Document {
            id: "new".to_string(),
            fields,
        })
        .unwrap();
        assert_eq!(stored.title, "Dinner with partners");
        assert_eq!(stored.note.as_deref(), Some("Table for four"));
        assert_eq!(stored.created_at, created_at);
    }

    #[test]
    fn kind_parses_case_insensitively() {
        assert_eq!("Work".parse::<AppointmentKind>().unwrap(), AppointmentKind::Work);
        assert_eq!(
            "personal".parse::<AppointmentKind>().unwrap(),
            AppointmentKind::Personal
        );
        assert!("other".parse::<AppointmentKind>().is_err());
    }
}
