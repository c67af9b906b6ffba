//! Wire boundary for the persistence collaborator
//!
//! Everything that arrives from the API passes through here before the
//! scope resolver or the aggregation engine sees it:
//!
//! - list bodies may be bare arrays or `{ "<resource>": [...] }` envelopes
//! - timestamps may be ISO strings or `{ "_seconds": n }` wrappers
//! - the stored `currentStage` is never trusted; it is re-derived from the
//!   outcome fields

use crate::error::IngestError;
use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use leadflow_model::{
    Appointment, AppointmentStatus, AppointmentStep, Contact, Event, EventId, GroupId,
    MeetingPart, MeetingParts, Outcome, PhoneNumber, Progress, Prospect, ProspectProduct,
    SalesOutcome, Stage, UnsuccessfulReason, UserId,
};
use leadflow_workflow::{CreateProspect, ProspectUpdate};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Timestamp as the backend may send it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Timestamp {
    /// `{ "_seconds": 1700000000, "_nanoseconds": 0 }`
    Epoch {
        /// Seconds since the Unix epoch
        #[serde(rename = "_seconds")]
        seconds: i64,
        /// Sub-second part
        #[serde(rename = "_nanoseconds", default)]
        nanoseconds: u32,
    },
    /// RFC 3339 text
    Iso(String),
}

impl Timestamp {
    /// Normalize to UTC
    ///
    /// # Errors
    /// `IngestError::BadTimestamp` when the value is out of range or not RFC 3339
    pub fn normalize(&self) -> Result<DateTime<Utc>, IngestError> {
        match self {
            Self::Epoch {
                seconds,
                nanoseconds,
            } => Utc
                .timestamp_opt(*seconds, *nanoseconds)
                .single()
                .ok_or_else(|| IngestError::BadTimestamp(seconds.to_string())),
            Self::Iso(text) => DateTime::parse_from_rfc3339(text)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|_| IngestError::BadTimestamp(text.clone())),
        }
    }
}

fn normalize_opt(ts: Option<&Timestamp>) -> Result<Option<DateTime<Utc>>, IngestError> {
    ts.map(Timestamp::normalize).transpose()
}

/// Strip a list envelope
///
/// # Errors
/// `IngestError::UnexpectedShape` when `body` is neither form
pub fn unwrap_list(body: Value, key: &'static str) -> Result<Vec<Value>, IngestError> {
    match body {
        Value::Array(items) => Ok(items),
        Value::Object(mut map) => match map.remove(key) {
            Some(Value::Array(items)) => Ok(items),
            _ => Err(IngestError::UnexpectedShape { key }),
        },
        _ => Err(IngestError::UnexpectedShape { key }),
    }
}

/// Prospect as stored by the backend
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProspectRecord {
    /// Backend id; absent on create
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Owning user id
    pub uid: String,
    /// Owner's group at creation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,
    /// Contact name
    pub name: String,
    /// Full phone number including the country prefix
    pub phone: String,
    /// Optional email
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Stored stage; only trusted for the prospect-versus-later split
    pub current_stage: Option<Stage>,
    /// `YYYY-MM-DD` or ISO timestamp
    pub appointment_date: Option<String>,
    /// `HH:MM` or `HH:MM:SS`
    pub appointment_start_time: Option<String>,
    /// `HH:MM` or `HH:MM:SS`
    pub appointment_end_time: Option<String>,
    /// Free-text location
    pub appointment_location: Option<String>,
    /// Appointment status
    pub appointment_status: Option<AppointmentStatus>,
    /// Completed meeting parts
    pub meeting_parts: Vec<MeetingPart>,
    /// Outcome label; absent when undecided
    pub sales_outcome: Option<SalesOutcome>,
    /// Reason label, empty when cleared
    pub unsuccessful_reason: Option<String>,
    /// Product lines
    pub products: Vec<ProspectProduct>,
    /// Server-set creation time
    #[serde(skip_serializing)]
    pub created_at: Option<Timestamp>,
    /// Server-set update time
    #[serde(skip_serializing)]
    pub updated_at: Option<Timestamp>,
}

fn blank_to_none(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn parse_date(value: Option<&str>) -> Result<Option<NaiveDate>, IngestError> {
    blank_to_none(value)
        .map(|text| {
            // some records carry a full ISO datetime here
            let day = text.get(..10).unwrap_or(text);
            NaiveDate::parse_from_str(day, "%Y-%m-%d").map_err(|_| IngestError::BadValue {
                field: "appointmentDate",
                value: text.to_string(),
            })
        })
        .transpose()
}

fn parse_time(field: &'static str, value: Option<&str>) -> Result<Option<NaiveTime>, IngestError> {
    blank_to_none(value)
        .map(|text| {
            NaiveTime::parse_from_str(text, "%H:%M")
                .or_else(|_| NaiveTime::parse_from_str(text, "%H:%M:%S"))
                .map_err(|_| IngestError::BadValue {
                    field,
                    value: text.to_string(),
                })
        })
        .transpose()
}

impl ProspectRecord {
    /// Convert into the model
    ///
    /// # Errors
    /// `IngestError` for a missing id or owner, or unparseable dates
    pub fn into_prospect(self) -> Result<Prospect, IngestError> {
        let id = blank_to_none(self.id.as_deref()).ok_or(IngestError::MissingField("id"))?;
        if self.uid.trim().is_empty() {
            return Err(IngestError::MissingField("uid"));
        }

        let step = AppointmentStep {
            appointment: Appointment {
                date: parse_date(self.appointment_date.as_deref())?,
                start_time: parse_time(
                    "appointmentStartTime",
                    self.appointment_start_time.as_deref(),
                )?,
                end_time: parse_time("appointmentEndTime", self.appointment_end_time.as_deref())?,
                location: self.appointment_location.clone().unwrap_or_default(),
                status: self.appointment_status.unwrap_or_default(),
            },
            meeting_parts: self.meeting_parts.iter().copied().collect::<MeetingParts>(),
        };

        let reason = || {
            UnsuccessfulReason::from_label(self.unsuccessful_reason.as_deref().unwrap_or_default())
        };
        let outcome = self.sales_outcome.map(|kind| match kind {
            SalesOutcome::Successful => Outcome::Successful,
            SalesOutcome::Unsuccessful => Outcome::Unsuccessful(reason()),
            SalesOutcome::Kiv => Outcome::Kiv,
        });

        let progress = match outcome {
            Some(outcome) => Progress::SalesOutcome { step, outcome },
            None if self.current_stage == Some(Stage::Prospect)
                && step == AppointmentStep::default() =>
            {
                Progress::Prospect
            }
            None => Progress::Appointment(step),
        };

        let mut contact = Contact::new(self.name.trim(), PhoneNumber::from_stored(self.phone));
        contact.email = blank_to_none(self.email.as_deref()).map(str::to_string);

        Ok(Prospect {
            id: id.into(),
            uid: UserId::new(self.uid),
            group_id: blank_to_none(self.group_id.as_deref()).map(GroupId::from),
            contact,
            products: self.products.into(),
            progress,
            created_at: normalize_opt(self.created_at.as_ref())?,
            updated_at: normalize_opt(self.updated_at.as_ref())?,
        })
    }

    /// Payload for a create call; the backend assigns the id
    #[must_use]
    pub fn from_create(payload: &CreateProspect) -> Self {
        Self {
            uid: payload.uid.to_string(),
            group_id: payload.group_id.as_ref().map(ToString::to_string),
            name: payload.contact.name.clone(),
            phone: payload.contact.phone.to_string(),
            email: payload.contact.email.clone(),
            current_stage: Some(Stage::Prospect),
            appointment_status: Some(AppointmentStatus::NotDone),
            ..Self::default()
        }
    }

    /// Payload for an update call; the stage is derived from the outcome
    #[must_use]
    pub fn from_update(owner: &Prospect, update: &ProspectUpdate) -> Self {
        let appointment = &update.step.appointment;
        Self {
            id: Some(update.id.to_string()),
            uid: owner.uid.to_string(),
            group_id: owner.group_id.as_ref().map(ToString::to_string),
            name: update.contact.name.clone(),
            phone: update.contact.phone.to_string(),
            email: update.contact.email.clone(),
            current_stage: Some(update.stage()),
            appointment_date: appointment.date.map(|d| d.format("%Y-%m-%d").to_string()),
            appointment_start_time: appointment.start_time.map(|t| t.format("%H:%M").to_string()),
            appointment_end_time: appointment.end_time.map(|t| t.format("%H:%M").to_string()),
            appointment_location: Some(appointment.location.clone()),
            appointment_status: Some(appointment.status),
            meeting_parts: update.step.meeting_parts.iter().collect(),
            sales_outcome: update.outcome.as_ref().map(Outcome::kind),
            // cleared outcomes are written as an empty reason
            unsuccessful_reason: Some(
                update
                    .outcome
                    .as_ref()
                    .and_then(Outcome::reason)
                    .map(|r| r.label().to_string())
                    .unwrap_or_default(),
            ),
            products: update.products.clone(),
            created_at: None,
            updated_at: None,
        }
    }
}

/// Ingest one prospect body
///
/// # Errors
/// See [`ProspectRecord::into_prospect`]
pub fn prospect(body: Value) -> Result<Prospect, IngestError> {
    serde_json::from_value::<ProspectRecord>(body)?.into_prospect()
}

/// Ingest a prospect list body
///
/// Malformed records are skipped with a warning so one bad row does not
/// blank the whole view.
///
/// # Errors
/// `IngestError::UnexpectedShape` when the body is not a list
pub fn prospects(body: Value) -> Result<Vec<Prospect>, IngestError> {
    let items = unwrap_list(body, "prospects")?;
    Ok(items
        .into_iter()
        .filter_map(|item| match prospect(item) {
            Ok(p) => Some(p),
            Err(e) => {
                tracing::warn!(error = %e, "skipping malformed prospect record");
                None
            }
        })
        .collect())
}

/// Event as stored by the backend
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventRecord {
    id: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    description: String,
    created_by: String,
    #[serde(default)]
    target_group_ids: Vec<String>,
    #[serde(default)]
    starts_at: Option<Timestamp>,
}

/// Ingest an event list body; malformed records are skipped
///
/// # Errors
/// `IngestError::UnexpectedShape` when the body is not a list
pub fn events(body: Value) -> Result<Vec<Event>, IngestError> {
    let items = unwrap_list(body, "events")?;
    Ok(items
        .into_iter()
        .filter_map(|item| match event(item) {
            Ok(e) => Some(e),
            Err(e) => {
                tracing::warn!(error = %e, "skipping malformed event record");
                None
            }
        })
        .collect())
}

fn event(body: Value) -> Result<Event, IngestError> {
    let record: EventRecord = serde_json::from_value(body)?;
    Ok(Event {
        id: EventId::new(record.id),
        title: record.title,
        description: record.description,
        created_by: UserId::new(record.created_by),
        target_group_ids: record.target_group_ids.into_iter().map(GroupId::from).collect(),
        starts_at: normalize_opt(record.starts_at.as_ref())?,
    })
}

/// Ingest a list of records that already match the model shape
///
/// # Errors
/// `IngestError` when the envelope or any record is malformed
pub fn records<T>(body: Value, key: &'static str) -> Result<Vec<T>, IngestError>
where
    T: serde::de::DeserializeOwned,
{
    unwrap_list(body, key)?
        .into_iter()
        .map(|item| serde_json::from_value(item).map_err(IngestError::from))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rust_decimal::Decimal;
    use serde_json::json;

    #[test]
    fn epoch_and_iso_normalize_to_same_instant() {
        let epoch: Timestamp =
            serde_json::from_value(json!({"_seconds": 1_700_000_000, "_nanoseconds": 0}))
                .unwrap();
        let iso: Timestamp = serde_json::from_value(json!("2023-11-14T22:13:20Z")).unwrap();
        assert_eq!(epoch.normalize().unwrap(), iso.normalize().unwrap());
        assert!(Timestamp::Iso("yesterday".into()).normalize().is_err());
    }

    #[test]
    fn envelope_and_bare_array() {
        assert_eq!(unwrap_list(json!([1, 2]), "prospects").unwrap().len(), 2);
        assert_eq!(
            unwrap_list(json!({"prospects": [1]}), "prospects").unwrap().len(),
            1
        );
        assert!(unwrap_list(json!({"items": []}), "prospects").is_err());
        assert!(unwrap_list(json!("nope"), "prospects").is_err());
    }

    #[test]
    fn stored_stage_is_rederived_from_outcome() {
        // stored as sales_outcome but no outcome: comes back as appointment
        let p = prospect(json!({
            "id": "p1", "uid": "a1", "name": "Ali", "phone": "+601",
            "currentStage": "sales_outcome",
            "appointmentStatus": "completed",
        }))
        .unwrap();
        assert_eq!(p.current_stage(), Stage::Appointment);

        let p = prospect(json!({
            "id": "p2", "uid": "a1", "name": "Ali", "phone": "+601",
            "currentStage": "appointment",
            "salesOutcome": "unsuccessful",
            "unsuccessfulReason": "Needs more time",
            "createdAt": {"_seconds": 1_700_000_000},
        }))
        .unwrap();
        assert_eq!(p.current_stage(), Stage::SalesOutcome);
        assert_eq!(p.unsuccessful_reason(), "Needs more time");
        assert!(p.created_at.is_some());
    }

    #[test]
    fn fresh_record_stays_in_prospect_stage() {
        let p = prospect(json!({
            "id": "p1", "uid": "a1", "name": "Ali", "phone": "+601",
            "currentStage": "prospect", "appointmentStatus": "not_done",
            "appointmentDate": "",
        }))
        .unwrap();
        assert_eq!(p.current_stage(), Stage::Prospect);
    }

    #[test]
    fn appointment_fields_parse() {
        let p = prospect(json!({
            "id": "p1", "uid": "a1", "name": "Ali", "phone": "+601",
            "appointmentDate": "2026-10-17T00:00:00.000Z",
            "appointmentStartTime": "14:30",
            "appointmentEndTime": "15:00:00",
            "meetingParts": ["social", "fact_find"],
            "products": [{"productName": "Medical Card", "aceAmount": 1200}],
        }))
        .unwrap();
        let step = p.progress.step().unwrap();
        assert_eq!(step.appointment.date, NaiveDate::from_ymd_opt(2026, 10, 17));
        assert_eq!(step.appointment.end_time, NaiveTime::from_hms_opt(15, 0, 0));
        assert_eq!(step.meeting_parts.len(), 2);
        assert_eq!(p.products.total(), Decimal::from(1200));
    }

    #[test]
    fn list_skips_bad_rows() {
        let list = prospects(json!({"prospects": [
            {"id": "p1", "uid": "a1", "name": "Ali", "phone": "+601"},
            {"uid": "a1", "name": "No Id", "phone": "+602"},
        ]}))
        .unwrap();
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn events_normalize_start() {
        let list = events(json!([{
            "id": "e1", "title": "Kickoff", "createdBy": "admin",
            "targetGroupIds": ["g1"],
            "startsAt": {"_seconds": 1_700_000_000},
        }]))
        .unwrap();
        assert_eq!(list[0].target_group_ids, vec![GroupId::from("g1")]);
        assert!(list[0].starts_at.is_some());
    }

    #[test]
    fn update_payload_writes_derived_stage_and_clears_reason() {
        let owner = Prospect::new(
            "p1".into(),
            "a1".into(),
            Contact::new("Ali", PhoneNumber::from_stored("+601")),
        );
        let update = ProspectUpdate {
            id: "p1".into(),
            contact: owner.contact.clone(),
            step: AppointmentStep::default(),
            outcome: None,
            products: vec![],
        };
        let record = ProspectRecord::from_update(&owner, &update);
        assert_eq!(record.current_stage, Some(Stage::Appointment));
        assert_eq!(record.sales_outcome, None);
        assert_eq!(record.unsuccessful_reason.as_deref(), Some(""));

        let body = serde_json::to_value(&record).unwrap();
        assert_eq!(body["currentStage"], json!("appointment"));
    }

    #[test]
    fn update_payload_sends_amounts_as_numbers() {
        let owner = Prospect::new(
            "p1".into(),
            "a1".into(),
            Contact::new("Ali", PhoneNumber::from_stored("+601")),
        );
        let update = ProspectUpdate {
            id: "p1".into(),
            contact: owner.contact.clone(),
            step: AppointmentStep::default(),
            outcome: Some(Outcome::Successful),
            products: vec![ProspectProduct::new("Takaful Term80", Decimal::from(5000))],
        };
        let body = serde_json::to_value(ProspectRecord::from_update(&owner, &update)).unwrap();
        assert!(body["products"][0]["aceAmount"].is_number());
        assert_eq!(body["products"][0]["aceAmount"].as_f64(), Some(5000.0));

        let back = prospect(body).unwrap();
        assert_eq!(back.products.total(), Decimal::from(5000));
    }
}
