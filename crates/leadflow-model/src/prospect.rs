//! Prospect records
//!
//! A prospect's stage is never stored. It is read off [`Progress`], a tagged
//! union in which a sales-outcome stage without an outcome cannot be built.

use crate::error::ModelError;
use crate::ids::{GroupId, ProspectId, UserId};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Workflow stage, derived from [`Progress`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Basic info captured
    Prospect,
    /// Appointment / sales meeting in progress
    Appointment,
    /// Outcome decided
    SalesOutcome,
}

impl Stage {
    /// Wire label
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Prospect => "prospect",
            Stage::Appointment => "appointment",
            Stage::SalesOutcome => "sales_outcome",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Phone number stored with its country prefix (e.g. `+60123456789`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PhoneNumber(String);

impl PhoneNumber {
    /// Country prefix applied when none is configured
    pub const DEFAULT_PREFIX: &'static str = "+60";

    /// Build from the local suffix using [`Self::DEFAULT_PREFIX`]
    ///
    /// # Errors
    /// `ModelError::InvalidPhone` when the suffix is empty or not all digits
    pub fn from_suffix(suffix: &str) -> Result<Self, ModelError> {
        Self::with_prefix(Self::DEFAULT_PREFIX, suffix)
    }

    /// Build from a local suffix and an explicit prefix
    ///
    /// # Errors
    /// `ModelError::InvalidPhone` when the suffix is empty or not all digits
    pub fn with_prefix(prefix: &str, suffix: &str) -> Result<Self, ModelError> {
        let suffix = suffix.trim();
        if suffix.is_empty() || !suffix.chars().all(|c| c.is_ascii_digit()) {
            return Err(ModelError::InvalidPhone(suffix.to_string()));
        }
        Ok(Self(format!("{prefix}{suffix}")))
    }

    /// Normalize user input that may or may not already carry the prefix
    ///
    /// `"+60123"`, `"60123"` and `"123"` all normalize to `"+60123"`.
    ///
    /// # Errors
    /// `ModelError::InvalidPhone` when the remaining suffix is invalid
    pub fn normalize(prefix: &str, raw: &str) -> Result<Self, ModelError> {
        let raw = raw.trim();
        let bare_prefix = prefix.trim_start_matches('+');
        let suffix = raw
            .strip_prefix(prefix)
            .or_else(|| raw.strip_prefix(bare_prefix).filter(|_| !bare_prefix.is_empty()))
            .unwrap_or(raw);
        Self::with_prefix(prefix, suffix)
    }

    /// Wrap a value read back from storage without validating it
    #[inline]
    #[must_use]
    pub fn from_stored(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Full stored string
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Local part after `prefix` (the whole value if the prefix is missing)
    #[must_use]
    pub fn suffix<'a>(&'a self, prefix: &str) -> &'a str {
        self.0.strip_prefix(prefix).unwrap_or(&self.0)
    }

    /// True when no digits follow `prefix`
    #[must_use]
    pub fn is_blank(&self, prefix: &str) -> bool {
        !self.0.chars().any(|c| c.is_ascii_digit()) || self.suffix(prefix).trim().is_empty()
    }
}

impl fmt::Display for PhoneNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Contact details captured in the basic-info step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    /// Display name; letters and spaces only
    pub name: String,
    /// Full number including the country prefix
    pub phone: PhoneNumber,
    /// Optional email address
    pub email: Option<String>,
}

impl Contact {
    /// Contact without an email address
    #[inline]
    #[must_use]
    pub fn new(name: impl Into<String>, phone: PhoneNumber) -> Self {
        Self {
            name: name.into(),
            phone,
            email: None,
        }
    }

    /// With email
    #[inline]
    #[must_use]
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }
}

/// Appointment status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    /// No appointment yet
    #[default]
    NotDone,
    /// Booked
    Scheduled,
    /// Booked again after a change
    Rescheduled,
    /// Took place; unlocks the sales meeting
    Completed,
    /// Keep in view
    Kiv,
    /// Prospect declined to meet
    Declined,
}

impl AppointmentStatus {
    /// Counted as a pending appointment in the funnel
    #[inline]
    #[must_use]
    pub fn is_booked(&self) -> bool {
        matches!(self, Self::Scheduled | Self::Rescheduled)
    }

    /// Wire label
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotDone => "not_done",
            Self::Scheduled => "scheduled",
            Self::Rescheduled => "rescheduled",
            Self::Completed => "completed",
            Self::Kiv => "kiv",
            Self::Declined => "declined",
        }
    }
}

/// Appointment sub-record
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Appointment {
    /// Appointment day
    pub date: Option<NaiveDate>,
    /// Start time
    pub start_time: Option<NaiveTime>,
    /// End time, never before the start time
    pub end_time: Option<NaiveTime>,
    /// Free-text location
    pub location: String,
    /// Current status
    pub status: AppointmentStatus,
}

/// One of the three fixed sales-meeting sub-tasks
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MeetingPart {
    /// Rapport building
    Social,
    /// Needs analysis
    FactFind,
    /// Product presentation
    Presentation,
}

impl MeetingPart {
    /// Every part, in meeting order
    pub const ALL: [MeetingPart; 3] = [Self::Social, Self::FactFind, Self::Presentation];
}

/// Completed meeting parts
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MeetingParts(BTreeSet<MeetingPart>);

impl MeetingParts {
    /// Flip membership of `part`; returns whether it is now done
    pub fn toggle(&mut self, part: MeetingPart) -> bool {
        if self.0.remove(&part) {
            false
        } else {
            self.0.insert(part);
            true
        }
    }

    /// Whether `part` is done
    #[inline]
    #[must_use]
    pub fn contains(&self, part: MeetingPart) -> bool {
        self.0.contains(&part)
    }

    /// All three parts done
    #[inline]
    #[must_use]
    pub fn is_complete(&self) -> bool {
        MeetingPart::ALL.iter().all(|p| self.0.contains(p))
    }

    /// Number of parts done
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// No parts done
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate done parts
    pub fn iter(&self) -> impl Iterator<Item = MeetingPart> + '_ {
        self.0.iter().copied()
    }
}

impl FromIterator<MeetingPart> for MeetingParts {
    fn from_iter<I: IntoIterator<Item = MeetingPart>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Appointment data plus meeting progress
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AppointmentStep {
    /// Appointment details
    pub appointment: Appointment,
    /// Completed meeting parts
    pub meeting_parts: MeetingParts,
}

/// Outcome label as stored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SalesOutcome {
    /// Closed
    Successful,
    /// Lost; carries a reason
    Unsuccessful,
    /// Keep in view
    Kiv,
}

impl SalesOutcome {
    /// Wire label
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Successful => "successful",
            Self::Unsuccessful => "unsuccessful",
            Self::Kiv => "kiv",
        }
    }
}

/// Why a sale did not close
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum UnsuccessfulReason {
    /// "Unable to afford"
    UnableToAfford,
    /// "Unable to decide"
    UnableToDecide,
    /// "Health or occupation"
    HealthOrOccupation,
    /// "Needs more time"
    NeedsMoreTime,
    /// Free-text reason
    Other(String),
}

impl UnsuccessfulReason {
    /// The fixed choices, without `Other`
    pub const FIXED: [UnsuccessfulReason; 4] = [
        Self::UnableToAfford,
        Self::UnableToDecide,
        Self::HealthOrOccupation,
        Self::NeedsMoreTime,
    ];

    /// Display/storage label
    #[must_use]
    pub fn label(&self) -> &str {
        match self {
            Self::UnableToAfford => "Unable to afford",
            Self::UnableToDecide => "Unable to decide",
            Self::HealthOrOccupation => "Due to Health / Occupation",
            Self::NeedsMoreTime => "Needs more time",
            Self::Other(text) => text,
        }
    }

    /// Parse a stored label; unknown text becomes `Other`
    #[must_use]
    pub fn from_label(label: &str) -> Self {
        Self::FIXED
            .into_iter()
            .find(|r| r.label() == label)
            .unwrap_or_else(|| Self::Other(label.to_string()))
    }

    /// A reason with no text carries no information
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.label().trim().is_empty()
    }
}

impl From<String> for UnsuccessfulReason {
    fn from(label: String) -> Self {
        Self::from_label(&label)
    }
}

impl From<UnsuccessfulReason> for String {
    fn from(reason: UnsuccessfulReason) -> Self {
        reason.label().to_string()
    }
}

/// A decided outcome
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "salesOutcome", content = "unsuccessfulReason", rename_all = "snake_case")]
pub enum Outcome {
    /// Sale closed; counts toward closed FYC
    Successful,
    /// Sale lost for the given reason
    Unsuccessful(UnsuccessfulReason),
    /// Keep in view; counts toward proposed FYC
    Kiv,
}

impl Outcome {
    /// Stored label
    #[inline]
    #[must_use]
    pub fn kind(&self) -> SalesOutcome {
        match self {
            Outcome::Successful => SalesOutcome::Successful,
            Outcome::Unsuccessful(_) => SalesOutcome::Unsuccessful,
            Outcome::Kiv => SalesOutcome::Kiv,
        }
    }

    /// Reason, for unsuccessful outcomes only
    #[inline]
    #[must_use]
    pub fn reason(&self) -> Option<&UnsuccessfulReason> {
        match self {
            Outcome::Unsuccessful(reason) => Some(reason),
            _ => None,
        }
    }
}

/// Where a prospect is in the workflow
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "stage", rename_all = "snake_case")]
pub enum Progress {
    /// Only basic info exists
    #[default]
    Prospect,
    /// Appointment / meeting data, no outcome
    Appointment(AppointmentStep),
    /// Outcome decided
    SalesOutcome {
        /// Appointment and meeting data
        step: AppointmentStep,
        /// The decision
        outcome: Outcome,
    },
}

impl Progress {
    /// Derived stage
    #[inline]
    #[must_use]
    pub fn stage(&self) -> Stage {
        match self {
            Progress::Prospect => Stage::Prospect,
            Progress::Appointment(_) => Stage::Appointment,
            Progress::SalesOutcome { .. } => Stage::SalesOutcome,
        }
    }

    /// Appointment step, if one has been started
    #[inline]
    #[must_use]
    pub fn step(&self) -> Option<&AppointmentStep> {
        match self {
            Progress::Prospect => None,
            Progress::Appointment(step) | Progress::SalesOutcome { step, .. } => Some(step),
        }
    }

    /// Mutable appointment step, promoting `Prospect` to `Appointment`
    pub fn step_mut(&mut self) -> &mut AppointmentStep {
        if matches!(self, Progress::Prospect) {
            *self = Progress::Appointment(AppointmentStep::default());
        }
        match self {
            Progress::Appointment(step) | Progress::SalesOutcome { step, .. } => step,
            Progress::Prospect => unreachable!("promoted above"),
        }
    }

    /// Decided outcome
    #[inline]
    #[must_use]
    pub fn outcome(&self) -> Option<&Outcome> {
        match self {
            Progress::SalesOutcome { outcome, .. } => Some(outcome),
            _ => None,
        }
    }
}

/// Product line item
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProspectProduct {
    /// Catalog product name
    pub product_name: String,
    /// Annual contribution; written as a JSON number, read from a number or a string
    #[serde(
        rename = "aceAmount",
        serialize_with = "rust_decimal::serde::float::serialize"
    )]
    pub amount: Decimal,
}

impl ProspectProduct {
    /// New line
    #[inline]
    #[must_use]
    pub fn new(product_name: impl Into<String>, amount: Decimal) -> Self {
        Self {
            product_name: product_name.into(),
            amount,
        }
    }

    /// Row with nothing filled in
    #[inline]
    #[must_use]
    pub fn blank() -> Self {
        Self::default()
    }

    /// Product name missing
    #[inline]
    #[must_use]
    pub fn is_unnamed(&self) -> bool {
        self.product_name.trim().is_empty()
    }
}

/// Product lines of a prospect
///
/// Stored lists may be empty; the editing surface always shows at least one row.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductLines(Vec<ProspectProduct>);

impl ProductLines {
    /// Sum of every line's amount
    #[must_use]
    pub fn total(&self) -> Decimal {
        self.0.iter().map(|p| p.amount).sum()
    }

    /// Lines as a slice
    #[inline]
    #[must_use]
    pub fn as_slice(&self) -> &[ProspectProduct] {
        &self.0
    }

    /// Mutable access to the lines
    #[inline]
    pub fn as_mut_vec(&mut self) -> &mut Vec<ProspectProduct> {
        &mut self.0
    }

    /// Number of lines
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// No lines
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<ProspectProduct>> for ProductLines {
    fn from(lines: Vec<ProspectProduct>) -> Self {
        Self(lines)
    }
}

/// The central workflow entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prospect {
    /// Backend id
    pub id: ProspectId,
    /// Owner
    pub uid: UserId,
    /// Owner's group at creation
    pub group_id: Option<GroupId>,
    /// Contact details
    pub contact: Contact,
    /// Product lines
    pub products: ProductLines,
    /// Workflow progress; the stage is derived from it
    pub progress: Progress,
    /// Creation time
    pub created_at: Option<DateTime<Utc>>,
    /// Last update time
    pub updated_at: Option<DateTime<Utc>>,
}

impl Prospect {
    /// Freshly created prospect in the `prospect` stage
    #[must_use]
    pub fn new(id: ProspectId, uid: UserId, contact: Contact) -> Self {
        Self {
            id,
            uid,
            group_id: None,
            contact,
            products: ProductLines::default(),
            progress: Progress::Prospect,
            created_at: None,
            updated_at: None,
        }
    }

    /// With group
    #[inline]
    #[must_use]
    pub fn with_group(mut self, group_id: GroupId) -> Self {
        self.group_id = Some(group_id);
        self
    }

    /// With progress
    #[inline]
    #[must_use]
    pub fn with_progress(mut self, progress: Progress) -> Self {
        self.progress = progress;
        self
    }

    /// With products
    #[inline]
    #[must_use]
    pub fn with_products(mut self, products: Vec<ProspectProduct>) -> Self {
        self.products = ProductLines::from(products);
        self
    }

    /// Derived stage
    #[inline]
    #[must_use]
    pub fn current_stage(&self) -> Stage {
        self.progress.stage()
    }

    /// Appointment status; `NotDone` before an appointment exists
    #[must_use]
    pub fn appointment_status(&self) -> AppointmentStatus {
        self.progress
            .step()
            .map(|s| s.appointment.status)
            .unwrap_or_default()
    }

    /// Stored outcome label
    #[inline]
    #[must_use]
    pub fn sales_outcome(&self) -> Option<SalesOutcome> {
        self.progress.outcome().map(Outcome::kind)
    }

    /// Unsuccessful reason label, empty when there is none
    #[must_use]
    pub fn unsuccessful_reason(&self) -> &str {
        self.progress
            .outcome()
            .and_then(Outcome::reason)
            .map_or("", UnsuccessfulReason::label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn phone_from_suffix_prefixes_country_code() {
        let phone = PhoneNumber::from_suffix("123456789").unwrap();
        assert_eq!(phone.as_str(), "+60123456789");
        assert_eq!(phone.suffix("+60"), "123456789");
    }

    #[test]
    fn phone_rejects_non_digits() {
        assert!(PhoneNumber::from_suffix("12-345").is_err());
        assert!(PhoneNumber::from_suffix("").is_err());
        assert!(PhoneNumber::from_suffix("12a").is_err());
    }

    #[test]
    fn phone_normalize_strips_existing_prefix() {
        for raw in ["+60123", "60123", "123", " 123 "] {
            let phone = PhoneNumber::normalize("+60", raw).unwrap();
            assert_eq!(phone.as_str(), "+60123");
        }
    }

    #[test]
    fn blank_stored_phone() {
        assert!(PhoneNumber::from_stored("+60").is_blank("+60"));
        assert!(PhoneNumber::from_stored("").is_blank("+60"));
        assert!(!PhoneNumber::from_stored("+60123").is_blank("+60"));
    }

    #[test]
    fn blank_phone_uses_given_prefix() {
        assert!(PhoneNumber::from_stored("+65").is_blank("+65"));
        assert!(!PhoneNumber::from_stored("+65").is_blank("+60"));
        assert!(!PhoneNumber::from_stored("+6598765432").is_blank("+65"));
    }

    #[test]
    fn meeting_parts_toggle_and_complete() {
        let mut parts = MeetingParts::default();
        assert!(parts.toggle(MeetingPart::Social));
        assert!(parts.toggle(MeetingPart::FactFind));
        assert!(!parts.is_complete());
        assert!(parts.toggle(MeetingPart::Presentation));
        assert!(parts.is_complete());

        assert!(!parts.toggle(MeetingPart::Social));
        assert!(!parts.is_complete());
        assert_eq!(parts.len(), 2);
    }

    #[test]
    fn unsuccessful_reason_labels_round_trip() {
        for reason in UnsuccessfulReason::FIXED {
            assert_eq!(UnsuccessfulReason::from_label(reason.label()), reason);
        }
        assert_eq!(
            UnsuccessfulReason::from_label("Moved abroad"),
            UnsuccessfulReason::Other("Moved abroad".to_string())
        );
    }

    #[test]
    fn step_mut_promotes_prospect() {
        let mut progress = Progress::Prospect;
        progress.step_mut().appointment.status = AppointmentStatus::Scheduled;
        assert_eq!(progress.stage(), Stage::Appointment);
        assert_eq!(
            progress.step().unwrap().appointment.status,
            AppointmentStatus::Scheduled
        );
    }

    #[test]
    fn unsuccessful_reason_empty_without_outcome() {
        let prospect = Prospect::new(
            "p".into(),
            "u".into(),
            Contact::new("A", PhoneNumber::from_suffix("1").unwrap()),
        );
        assert_eq!(prospect.unsuccessful_reason(), "");
        assert_eq!(prospect.appointment_status(), AppointmentStatus::NotDone);
    }

    #[test]
    fn product_total_and_unnamed() {
        let lines = ProductLines::from(vec![
            ProspectProduct::new("Medical Card", Decimal::from(120)),
            ProspectProduct::new(" ", Decimal::from(30)),
        ]);
        assert_eq!(lines.total(), Decimal::from(150));
        assert!(lines.as_slice()[1].is_unnamed());
    }

    #[test]
    fn product_amount_is_a_json_number() {
        let line = ProspectProduct::new("Takaful Term80", Decimal::new(500_050, 2));
        let value = serde_json::to_value(&line).unwrap();
        assert!(value["aceAmount"].is_number());
        assert_eq!(value["aceAmount"].as_f64(), Some(5000.5));

        let from_string: ProspectProduct =
            serde_json::from_value(serde_json::json!({"productName": "X", "aceAmount": "120"}))
                .unwrap();
        assert_eq!(from_string.amount, Decimal::from(120));
        let from_number: ProspectProduct =
            serde_json::from_value(serde_json::json!({"productName": "X", "aceAmount": 120}))
                .unwrap();
        assert_eq!(from_number.amount, Decimal::from(120));
    }
}
