//! Buffered editor for a single prospect
//!
//! Every mutating method first checks the permission guard, then the step
//! gate, then validates. A method that returns `Err` leaves the draft exactly
//! as it was. Nothing reaches persistence until [`ProspectEditor::prepare_save`]
//! hands the caller a [`ProspectUpdate`].

use crate::clock::{Clock, SystemClock};
use crate::error::{Field, Step, ValidationErrors, WorkflowError};
use crate::state_machine::{can_edit, derived_stage, validate_transition};
use crate::validate::{
    validate_email, validate_name, validate_outcome, validate_phone, validate_start_time,
};
use chrono::{NaiveDate, NaiveTime};
use leadflow_model::{
    AppointmentStatus, AppointmentStep, Contact, MeetingPart, Outcome, PhoneNumber, Progress,
    Prospect, ProspectId, ProspectProduct, Stage, User, DEFAULT_PRODUCT_CATALOG,
};
use std::sync::Arc;

/// Basic-info changes; `None` leaves a field untouched
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BasicInfoUpdate {
    /// Contact name
    pub name: Option<String>,
    /// Digits typed after the fixed prefix
    pub phone_suffix: Option<String>,
    /// `Some("")` clears the email
    pub email: Option<String>,
}

/// Appointment form values
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppointmentInput {
    /// Appointment day
    pub date: Option<NaiveDate>,
    /// Start time; must not be in the past when `date` is today
    pub start_time: Option<NaiveTime>,
    /// End time; pulled forward to the start time when earlier
    pub end_time: Option<NaiveTime>,
    /// Free-text location
    pub location: String,
    /// Appointment status
    pub status: AppointmentStatus,
}

/// Payload committed by a save
///
/// There is deliberately no stage field: the stored stage is always
/// [`ProspectUpdate::stage`], derived from outcome presence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProspectUpdate {
    /// Record being saved
    pub id: ProspectId,
    /// Validated contact details
    pub contact: Contact,
    /// Appointment and meeting progress
    pub step: AppointmentStep,
    /// Recorded outcome, `None` when undecided or undone
    pub outcome: Option<Outcome>,
    /// Product lines with blank rows stripped
    pub products: Vec<ProspectProduct>,
}

impl ProspectUpdate {
    /// Stage written to storage
    #[inline]
    #[must_use]
    pub fn stage(&self) -> Stage {
        derived_stage(self.outcome.is_some())
    }
}

/// Raw basic-info text as typed, kept so invalid input can be re-validated
#[derive(Debug, Clone, Default)]
struct BasicInfoInput {
    name: String,
    phone_suffix: String,
    email: String,
}

impl BasicInfoInput {
    fn from_contact(contact: &Contact, prefix: &str) -> Self {
        Self {
            name: contact.name.clone(),
            phone_suffix: contact.phone.suffix(prefix).to_string(),
            email: contact.email.clone().unwrap_or_default(),
        }
    }
}

/// Client-held state machine for one prospect
#[derive(Debug, Clone)]
pub struct ProspectEditor {
    actor: User,
    committed: Prospect,
    draft: Prospect,
    input: BasicInfoInput,
    errors: ValidationErrors,
    phone_prefix: String,
    catalog: Vec<String>,
    clock: Arc<dyn Clock>,
}

impl ProspectEditor {
    /// Open `prospect` for `actor`
    #[must_use]
    pub fn open(actor: User, prospect: Prospect) -> Self {
        let prefix = PhoneNumber::DEFAULT_PREFIX.to_string();
        let mut draft = prospect.clone();
        if draft.products.is_empty() {
            draft.products.as_mut_vec().push(ProspectProduct::blank());
        }
        Self {
            input: BasicInfoInput::from_contact(&prospect.contact, &prefix),
            actor,
            committed: prospect,
            draft,
            errors: ValidationErrors::new(),
            phone_prefix: prefix,
            catalog: DEFAULT_PRODUCT_CATALOG.iter().map(ToString::to_string).collect(),
            clock: Arc::new(SystemClock),
        }
    }

    /// With clock
    #[inline]
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// With phone prefix
    #[must_use]
    pub fn with_phone_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.phone_prefix = prefix.into();
        self.input = BasicInfoInput::from_contact(&self.committed.contact, &self.phone_prefix);
        self
    }

    /// With the product names offered by the outcome step
    #[must_use]
    pub fn with_catalog<I, S>(mut self, catalog: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.catalog = catalog.into_iter().map(Into::into).collect();
        self
    }

    /// Offered product names; free text is accepted as well
    #[inline]
    #[must_use]
    pub fn catalog(&self) -> &[String] {
        &self.catalog
    }

    /// Country prefix prepended to phone suffixes
    #[inline]
    #[must_use]
    pub fn phone_prefix(&self) -> &str {
        &self.phone_prefix
    }

    /// Acting user
    #[inline]
    #[must_use]
    pub fn actor(&self) -> &User {
        &self.actor
    }

    /// Working copy
    #[inline]
    #[must_use]
    pub fn draft(&self) -> &Prospect {
        &self.draft
    }

    /// Last saved state
    #[inline]
    #[must_use]
    pub fn committed(&self) -> &Prospect {
        &self.committed
    }

    /// Outstanding field errors
    #[inline]
    #[must_use]
    pub fn errors(&self) -> &ValidationErrors {
        &self.errors
    }

    /// Owner or admin; otherwise the record is view only
    #[inline]
    #[must_use]
    pub fn can_edit(&self) -> bool {
        can_edit(&self.actor, &self.committed)
    }

    /// Unsaved changes exist
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        let mut draft = self.draft.clone();
        strip_blank_rows(draft.products.as_mut_vec());
        draft != self.committed
    }

    /// Step 1 done: id exists, name and phone present, no basic-info errors
    #[must_use]
    pub fn basic_info_complete(&self) -> bool {
        !self.draft.id.is_empty()
            && !self.draft.contact.name.trim().is_empty()
            && !self.draft.contact.phone.is_blank(&self.phone_prefix)
            && Field::BASIC_INFO.iter().all(|f| !self.errors.has(*f))
    }

    /// Appointment step open
    #[inline]
    #[must_use]
    pub fn appointment_unlocked(&self) -> bool {
        self.basic_info_complete()
    }

    /// Sales meeting open: appointment marked completed
    #[must_use]
    pub fn meeting_unlocked(&self) -> bool {
        self.appointment_unlocked()
            && self.draft.appointment_status() == AppointmentStatus::Completed
    }

    /// Sales outcome open: meeting unlocked and all three parts done
    #[must_use]
    pub fn outcome_unlocked(&self) -> bool {
        self.meeting_unlocked()
            && self
                .draft
                .progress
                .step()
                .is_some_and(|s| s.meeting_parts.is_complete())
    }

    /// An outcome is recorded in the draft
    #[inline]
    #[must_use]
    pub fn outcome_decided(&self) -> bool {
        self.draft.progress.outcome().is_some()
    }

    /// Current stage of the draft
    #[inline]
    #[must_use]
    pub fn stage(&self) -> Stage {
        self.draft.current_stage()
    }

    // -- basic info ---------------------------------------------------------

    /// Buffer basic-info changes, validating each provided field
    ///
    /// Valid fields are applied even when another field fails.
    ///
    /// # Errors
    /// `PermissionDenied`, or `Validation` listing the rejected fields
    pub fn edit_basic_info(&mut self, update: BasicInfoUpdate) -> Result<(), WorkflowError> {
        self.guard()?;
        let mut rejected = ValidationErrors::new();
        if let Some(name) = update.name {
            self.input.name = name;
            self.record(Field::Name, &mut rejected);
        }
        if let Some(suffix) = update.phone_suffix {
            self.input.phone_suffix = suffix;
            self.record(Field::Phone, &mut rejected);
        }
        if let Some(email) = update.email {
            self.input.email = email;
            self.record(Field::Email, &mut rejected);
        }
        rejected.into_result().map_err(WorkflowError::from)
    }

    /// Re-run validation for one basic-info field (blur)
    ///
    /// # Errors
    /// `PermissionDenied`, or `Validation` for the field
    pub fn validate_field(&mut self, field: Field) -> Result<(), WorkflowError> {
        self.guard()?;
        let mut rejected = ValidationErrors::new();
        self.record(field, &mut rejected);
        rejected.into_result().map_err(WorkflowError::from)
    }

    fn record(&mut self, field: Field, rejected: &mut ValidationErrors) {
        let result = match field {
            Field::Name => validate_name(&self.input.name).map(|()| {
                self.draft.contact.name = self.input.name.trim().to_string();
            }),
            Field::Phone => validate_phone(&self.phone_prefix, &self.input.phone_suffix).map(
                |phone| {
                    self.draft.contact.phone = phone;
                },
            ),
            Field::Email => validate_email(&self.input.email).map(|()| {
                let email = self.input.email.trim();
                self.draft.contact.email = (!email.is_empty()).then(|| email.to_string());
            }),
            _ => Ok(()),
        };
        match result {
            Ok(()) => self.errors.clear(field),
            Err(message) => {
                self.errors.insert(field, message.clone());
                rejected.insert(field, message);
            }
        }
    }

    // -- appointment --------------------------------------------------------

    /// Set appointment details
    ///
    /// A start time earlier than the end time bumps the end time forward.
    /// Marking the status `Completed` unlocks the sales meeting.
    ///
    /// # Errors
    /// - `PermissionDenied`
    /// - `StepLocked(Appointment)` before basic info is complete
    /// - `OutcomeAlreadyDecided` when leaving `Completed` with an outcome recorded
    /// - `Validation(StartTime)` for a past start time today
    pub fn set_appointment(&mut self, input: AppointmentInput) -> Result<(), WorkflowError> {
        self.guard()?;
        if !self.appointment_unlocked() {
            return Err(WorkflowError::StepLocked(Step::Appointment));
        }
        if self.outcome_decided() && input.status != AppointmentStatus::Completed {
            return Err(WorkflowError::OutcomeAlreadyDecided);
        }
        if let Err(message) = validate_start_time(input.date, input.start_time, self.clock.now()) {
            self.errors.insert(Field::StartTime, message.clone());
            return Err(ValidationErrors::single(Field::StartTime, message).into());
        }
        self.errors.clear(Field::StartTime);

        let end_time = match (input.start_time, input.end_time) {
            (Some(start), Some(end)) if end < start => Some(start),
            (Some(start), None) => Some(start),
            (_, end) => end,
        };

        self.enter_appointment()?;
        let appointment = &mut self.draft.progress.step_mut().appointment;
        appointment.date = input.date;
        appointment.start_time = input.start_time;
        appointment.end_time = end_time;
        appointment.location = input.location;
        appointment.status = input.status;
        tracing::debug!(prospect_id = %self.draft.id, status = input.status.as_str(), "appointment buffered");
        Ok(())
    }

    /// Change only the appointment status
    ///
    /// # Errors
    /// Same as [`Self::set_appointment`]
    pub fn set_appointment_status(&mut self, status: AppointmentStatus) -> Result<(), WorkflowError> {
        let current = self
            .draft
            .progress
            .step()
            .map(|s| s.appointment.clone())
            .unwrap_or_default();
        self.set_appointment(AppointmentInput {
            date: current.date,
            start_time: current.start_time,
            end_time: current.end_time,
            location: current.location,
            status,
        })
    }

    fn enter_appointment(&mut self) -> Result<(), WorkflowError> {
        if self.stage() == Stage::Prospect {
            validate_transition(Stage::Prospect, Stage::Appointment)?;
            self.draft.progress = Progress::Appointment(AppointmentStep::default());
        }
        Ok(())
    }

    // -- sales meeting ------------------------------------------------------

    /// Toggle a meeting part; returns whether the part is now done
    ///
    /// # Errors
    /// - `PermissionDenied`
    /// - `StepLocked(SalesMeeting)` until the appointment is completed
    /// - `OutcomeAlreadyDecided` once an outcome is recorded
    pub fn toggle_meeting_part(&mut self, part: MeetingPart) -> Result<bool, WorkflowError> {
        self.guard()?;
        if !self.meeting_unlocked() {
            return Err(WorkflowError::StepLocked(Step::SalesMeeting));
        }
        if self.outcome_decided() {
            return Err(WorkflowError::OutcomeAlreadyDecided);
        }
        Ok(self.draft.progress.step_mut().meeting_parts.toggle(part))
    }

    // -- products -----------------------------------------------------------

    /// Append a blank product row
    ///
    /// # Errors
    /// `PermissionDenied` or `OutcomeAlreadyDecided`
    pub fn add_product(&mut self) -> Result<usize, WorkflowError> {
        self.guard_products()?;
        let rows = self.draft.products.as_mut_vec();
        rows.push(ProspectProduct::blank());
        Ok(rows.len() - 1)
    }

    /// Replace the row at `index`
    ///
    /// # Errors
    /// `PermissionDenied`, `OutcomeAlreadyDecided` or `NoSuchProductLine`
    pub fn update_product(
        &mut self,
        index: usize,
        product: ProspectProduct,
    ) -> Result<(), WorkflowError> {
        self.guard_products()?;
        let row = self
            .draft
            .products
            .as_mut_vec()
            .get_mut(index)
            .ok_or(WorkflowError::NoSuchProductLine(index))?;
        *row = product;
        Ok(())
    }

    /// Remove the row at `index`; removing the last row leaves one blank row
    ///
    /// # Errors
    /// `PermissionDenied`, `OutcomeAlreadyDecided` or `NoSuchProductLine`
    pub fn remove_product(&mut self, index: usize) -> Result<(), WorkflowError> {
        self.guard_products()?;
        let rows = self.draft.products.as_mut_vec();
        if index >= rows.len() {
            return Err(WorkflowError::NoSuchProductLine(index));
        }
        rows.remove(index);
        if rows.is_empty() {
            rows.push(ProspectProduct::blank());
        }
        Ok(())
    }

    fn guard_products(&self) -> Result<(), WorkflowError> {
        self.guard()?;
        if self.outcome_decided() {
            return Err(WorkflowError::OutcomeAlreadyDecided);
        }
        Ok(())
    }

    // -- outcome ------------------------------------------------------------

    /// Record the sales outcome with its product lines
    ///
    /// An empty `products` list collapses to one blank row.
    ///
    /// # Errors
    /// - `PermissionDenied`
    /// - `StepLocked(SalesOutcome)` until the meeting is complete
    /// - `OutcomeAlreadyDecided`
    /// - `Validation` for a non-positive total, an unnamed line or a missing reason
    pub fn record_outcome(
        &mut self,
        outcome: Outcome,
        products: Vec<ProspectProduct>,
    ) -> Result<(), WorkflowError> {
        self.guard()?;
        if !self.outcome_unlocked() {
            return Err(WorkflowError::StepLocked(Step::SalesOutcome));
        }
        if self.outcome_decided() {
            return Err(WorkflowError::OutcomeAlreadyDecided);
        }
        let products = if products.is_empty() {
            vec![ProspectProduct::blank()]
        } else {
            products
        };
        validate_outcome(&outcome, &products)?;
        validate_transition(self.stage(), Stage::SalesOutcome)?;

        let step = self.draft.progress.step().cloned().unwrap_or_default();
        tracing::debug!(prospect_id = %self.draft.id, outcome = outcome.kind().as_str(), "outcome recorded");
        self.draft.products = products.into();
        self.draft.progress = Progress::SalesOutcome { step, outcome };
        Ok(())
    }

    /// Return outcome-stage data to the appointment stage
    ///
    /// Clears the outcome and its reason; product lines are kept.
    ///
    /// # Errors
    /// `PermissionDenied` or `NoOutcomeToUndo`
    pub fn undo_outcome(&mut self) -> Result<(), WorkflowError> {
        self.guard()?;
        let Progress::SalesOutcome { step, .. } = &self.draft.progress else {
            return Err(WorkflowError::NoOutcomeToUndo);
        };
        validate_transition(Stage::SalesOutcome, Stage::Appointment)?;
        self.draft.progress = Progress::Appointment(step.clone());
        tracing::debug!(prospect_id = %self.draft.id, "outcome undone");
        Ok(())
    }

    // -- save ---------------------------------------------------------------

    /// Build the update to persist
    ///
    /// Blank product rows are dropped from the payload. The draft is left
    /// untouched so a failed round-trip can be retried.
    ///
    /// # Errors
    /// `PermissionDenied`, or `Validation` while any field error is outstanding
    pub fn prepare_save(&self) -> Result<ProspectUpdate, WorkflowError> {
        self.guard()?;
        if !self.errors.is_empty() {
            return Err(WorkflowError::Validation(self.errors.clone()));
        }
        let mut products = self.draft.products.as_slice().to_vec();
        strip_blank_rows(&mut products);
        Ok(ProspectUpdate {
            id: self.draft.id.clone(),
            contact: self.draft.contact.clone(),
            step: self.draft.progress.step().cloned().unwrap_or_default(),
            outcome: self.draft.progress.outcome().cloned(),
            products,
        })
    }

    /// Adopt the draft as committed after a successful save
    ///
    /// The stage is re-derived from the saved payload: a record without an
    /// outcome is in the appointment stage from now on.
    pub fn mark_saved(&mut self, saved: &ProspectUpdate) {
        self.draft.progress = match &saved.outcome {
            Some(outcome) => Progress::SalesOutcome {
                step: saved.step.clone(),
                outcome: outcome.clone(),
            },
            None => Progress::Appointment(saved.step.clone()),
        };
        let mut committed = self.draft.clone();
        committed.products = saved.products.clone().into();
        self.committed = committed;
        tracing::info!(prospect_id = %saved.id, stage = %saved.stage(), "prospect saved");
    }

    /// Throw away buffered edits
    pub fn discard(&mut self) {
        *self = Self {
            actor: self.actor.clone(),
            clock: Arc::clone(&self.clock),
            phone_prefix: self.phone_prefix.clone(),
            ..Self::open(self.actor.clone(), self.committed.clone())
        };
        self.input = BasicInfoInput::from_contact(&self.committed.contact, &self.phone_prefix);
    }

    fn guard(&self) -> Result<(), WorkflowError> {
        if self.can_edit() {
            Ok(())
        } else {
            Err(WorkflowError::PermissionDenied)
        }
    }
}

fn strip_blank_rows(rows: &mut Vec<ProspectProduct>) {
    rows.retain(|p| !(p.is_unnamed() && p.amount.is_zero()));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use chrono::NaiveDateTime;
    use leadflow_model::{Role, SalesOutcome, UnsuccessfulReason};
    use pretty_assertions::assert_eq;
    use rust_decimal::Decimal;

    fn now() -> NaiveDateTime {
        NaiveDateTime::parse_from_str("2026-10-16 10:00", "%Y-%m-%d %H:%M").unwrap()
    }

    fn owner() -> User {
        User::new("agent-a", "Agent A", Role::Agent)
    }

    fn prospect() -> Prospect {
        Prospect::new(
            "p-1".into(),
            "agent-a".into(),
            Contact::new("Ali Baba", PhoneNumber::from_suffix("123456789").unwrap()),
        )
    }

    fn editor() -> ProspectEditor {
        ProspectEditor::open(owner(), prospect()).with_clock(Arc::new(FixedClock(now())))
    }

    fn completed_meeting() -> ProspectEditor {
        let mut editor = editor();
        editor
            .set_appointment_status(AppointmentStatus::Completed)
            .unwrap();
        for part in MeetingPart::ALL {
            editor.toggle_meeting_part(part).unwrap();
        }
        editor
    }

    #[test]
    fn new_editor_has_one_blank_product_row() {
        let editor = editor();
        assert_eq!(editor.draft().products.len(), 1);
        assert!(!editor.is_dirty());
    }

    #[test]
    fn non_owner_is_view_only() {
        let other = User::new("agent-b", "Agent B", Role::Agent);
        let mut editor = ProspectEditor::open(other, prospect());
        assert!(!editor.can_edit());
        assert_eq!(
            editor.set_appointment_status(AppointmentStatus::Scheduled),
            Err(WorkflowError::PermissionDenied)
        );
        assert_eq!(editor.undo_outcome(), Err(WorkflowError::PermissionDenied));
        assert_eq!(editor.prepare_save(), Err(WorkflowError::PermissionDenied));
    }

    #[test]
    fn admin_may_edit_any_prospect() {
        let admin = User::new("root", "Root", Role::Admin);
        let editor = ProspectEditor::open(admin, prospect());
        assert!(editor.can_edit());
    }

    #[test]
    fn invalid_basic_info_locks_appointment() {
        let mut editor = editor();
        let err = editor
            .edit_basic_info(BasicInfoUpdate {
                name: Some("Ali 2".to_string()),
                ..BasicInfoUpdate::default()
            })
            .unwrap_err();
        assert!(err.validation().unwrap().has(Field::Name));
        assert!(!editor.appointment_unlocked());
        assert_eq!(
            editor.set_appointment_status(AppointmentStatus::Scheduled),
            Err(WorkflowError::StepLocked(Step::Appointment))
        );

        editor
            .edit_basic_info(BasicInfoUpdate {
                name: Some("Ali Bin Abu".to_string()),
                ..BasicInfoUpdate::default()
            })
            .unwrap();
        assert!(editor.appointment_unlocked());
        assert_eq!(editor.draft().contact.name, "Ali Bin Abu");
    }

    #[test]
    fn blur_revalidates_phone() {
        let mut editor = editor();
        let _ = editor.edit_basic_info(BasicInfoUpdate {
            phone_suffix: Some("12x".to_string()),
            ..BasicInfoUpdate::default()
        });
        assert!(editor.errors().has(Field::Phone));
        assert!(editor.validate_field(Field::Phone).is_err());
        // draft keeps the last valid number
        assert_eq!(editor.draft().contact.phone.as_str(), "+60123456789");
    }

    #[test]
    fn bare_configured_prefix_keeps_appointment_locked() {
        let bare = Prospect::new(
            "p-1".into(),
            "agent-a".into(),
            Contact::new("Ali Baba", PhoneNumber::from_stored("+65")),
        );
        let mut editor = ProspectEditor::open(owner(), bare)
            .with_phone_prefix("+65")
            .with_clock(Arc::new(FixedClock(now())));
        assert!(!editor.basic_info_complete());
        assert_eq!(
            editor.set_appointment_status(AppointmentStatus::Scheduled),
            Err(WorkflowError::StepLocked(Step::Appointment))
        );

        editor
            .edit_basic_info(BasicInfoUpdate {
                phone_suffix: Some("98765432".to_string()),
                ..BasicInfoUpdate::default()
            })
            .unwrap();
        assert_eq!(editor.draft().contact.phone.as_str(), "+6598765432");
        assert!(editor.appointment_unlocked());
    }

    #[test]
    fn catalog_defaults_and_overrides() {
        let editor = editor();
        assert!(editor.catalog().iter().any(|p| p == "Takaful Term80"));

        let editor = editor.with_catalog(["Hibah Plan", "Medical Card"]);
        assert_eq!(editor.catalog(), ["Hibah Plan".to_string(), "Medical Card".to_string()]);
    }

    #[test]
    fn start_time_in_past_today_is_rejected() {
        let mut editor = editor();
        let err = editor
            .set_appointment(AppointmentInput {
                date: Some(now().date()),
                start_time: NaiveTime::from_hms_opt(9, 0, 0),
                end_time: NaiveTime::from_hms_opt(11, 0, 0),
                location: "Cafe".to_string(),
                status: AppointmentStatus::Scheduled,
            })
            .unwrap_err();
        assert!(err.validation().unwrap().has(Field::StartTime));
        assert_eq!(editor.stage(), Stage::Prospect);
    }

    #[test]
    fn later_start_bumps_end_time() {
        let mut editor = editor();
        editor
            .set_appointment(AppointmentInput {
                date: now().date().succ_opt(),
                start_time: NaiveTime::from_hms_opt(15, 0, 0),
                end_time: NaiveTime::from_hms_opt(14, 0, 0),
                location: "Office".to_string(),
                status: AppointmentStatus::Scheduled,
            })
            .unwrap();
        let appt = &editor.draft().progress.step().unwrap().appointment;
        assert_eq!(appt.end_time, NaiveTime::from_hms_opt(15, 0, 0));
        assert_eq!(editor.stage(), Stage::Appointment);
    }

    #[test]
    fn meeting_parts_require_completed_appointment() {
        let mut editor = editor();
        editor
            .set_appointment_status(AppointmentStatus::Scheduled)
            .unwrap();
        assert_eq!(
            editor.toggle_meeting_part(MeetingPart::Social),
            Err(WorkflowError::StepLocked(Step::SalesMeeting))
        );
    }

    #[test]
    fn outcome_unlocks_only_with_all_parts() {
        let mut editor = editor();
        editor
            .set_appointment_status(AppointmentStatus::Completed)
            .unwrap();
        editor.toggle_meeting_part(MeetingPart::Social).unwrap();
        editor.toggle_meeting_part(MeetingPart::FactFind).unwrap();
        assert!(!editor.outcome_unlocked());
        assert_eq!(
            editor.record_outcome(Outcome::Kiv, vec![]),
            Err(WorkflowError::StepLocked(Step::SalesOutcome))
        );
        editor.toggle_meeting_part(MeetingPart::Presentation).unwrap();
        assert!(editor.outcome_unlocked());
    }

    #[test]
    fn successful_outcome_with_zero_total_changes_nothing() {
        let mut editor = completed_meeting();
        let before = editor.draft().clone();
        let err = editor
            .record_outcome(
                Outcome::Successful,
                vec![ProspectProduct::new("Medical Card", Decimal::ZERO)],
            )
            .unwrap_err();
        assert!(err.validation().unwrap().has(Field::TotalAmount));
        assert_eq!(editor.draft(), &before);
    }

    #[test]
    fn record_then_undo_outcome() {
        let mut editor = completed_meeting();
        editor
            .record_outcome(
                Outcome::Unsuccessful(UnsuccessfulReason::UnableToAfford),
                vec![],
            )
            .unwrap();
        assert_eq!(editor.stage(), Stage::SalesOutcome);
        assert_eq!(editor.draft().unsuccessful_reason(), "Unable to afford");
        assert_eq!(
            editor.record_outcome(Outcome::Kiv, vec![]),
            Err(WorkflowError::OutcomeAlreadyDecided)
        );
        assert_eq!(
            editor.toggle_meeting_part(MeetingPart::Social),
            Err(WorkflowError::OutcomeAlreadyDecided)
        );

        editor.undo_outcome().unwrap();
        assert_eq!(editor.stage(), Stage::Appointment);
        assert_eq!(editor.draft().sales_outcome(), None);
        assert_eq!(editor.draft().unsuccessful_reason(), "");
        assert_eq!(editor.undo_outcome(), Err(WorkflowError::NoOutcomeToUndo));

        editor.record_outcome(Outcome::Kiv, vec![]).unwrap();
        assert_eq!(editor.draft().sales_outcome(), Some(SalesOutcome::Kiv));
    }

    #[test]
    fn removing_last_product_leaves_blank_row() {
        let mut editor = editor();
        editor
            .update_product(0, ProspectProduct::new("Medical Card", Decimal::from(10)))
            .unwrap();
        editor.remove_product(0).unwrap();
        assert_eq!(editor.draft().products.len(), 1);
        assert!(editor.draft().products.as_slice()[0].is_unnamed());
        assert_eq!(
            editor.remove_product(5),
            Err(WorkflowError::NoSuchProductLine(5))
        );
    }

    #[test]
    fn save_derives_appointment_stage_without_outcome() {
        let mut editor = editor();
        editor
            .edit_basic_info(BasicInfoUpdate {
                email: Some("ali@example.com".to_string()),
                ..BasicInfoUpdate::default()
            })
            .unwrap();
        assert_eq!(editor.stage(), Stage::Prospect);
        assert!(editor.is_dirty());

        let update = editor.prepare_save().unwrap();
        assert_eq!(update.stage(), Stage::Appointment);
        assert!(update.products.is_empty());

        editor.mark_saved(&update);
        assert_eq!(editor.committed().current_stage(), Stage::Appointment);
        assert!(!editor.is_dirty());
    }

    #[test]
    fn save_blocked_by_outstanding_errors() {
        let mut editor = editor();
        let _ = editor.edit_basic_info(BasicInfoUpdate {
            email: Some("bad".to_string()),
            ..BasicInfoUpdate::default()
        });
        assert!(matches!(
            editor.prepare_save(),
            Err(WorkflowError::Validation(_))
        ));
    }

    #[test]
    fn discard_restores_committed() {
        let mut editor = editor();
        editor
            .set_appointment_status(AppointmentStatus::Scheduled)
            .unwrap();
        editor.discard();
        assert_eq!(editor.stage(), Stage::Prospect);
        assert!(!editor.is_dirty());
    }
}
