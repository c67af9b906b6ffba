//! Error types for the prospect workflow
//!
//! Provides error handling for:
//! - Field validation (create, basic info, appointment, outcome)
//! - Permission guards on mutating operations
//! - Step gating and illegal stage transitions

use leadflow_model::Stage;
use std::collections::BTreeMap;
use std::fmt;

/// Editable field that can carry a validation message
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Field {
    /// Contact name
    Name,
    /// Phone suffix
    Phone,
    /// Email address
    Email,
    /// Appointment day
    AppointmentDate,
    /// Appointment start time
    StartTime,
    /// Appointment end time
    EndTime,
    /// Product line names
    Products,
    /// Sum of product amounts
    TotalAmount,
    /// Reason for an unsuccessful outcome
    UnsuccessfulReason,
}

impl Field {
    /// Fields validated in the basic-info step
    pub const BASIC_INFO: [Field; 3] = [Field::Name, Field::Phone, Field::Email];
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Field::Name => "name",
            Field::Phone => "phone",
            Field::Email => "email",
            Field::AppointmentDate => "appointment date",
            Field::StartTime => "start time",
            Field::EndTime => "end time",
            Field::Products => "products",
            Field::TotalAmount => "total amount",
            Field::UnsuccessfulReason => "unsuccessful reason",
        };
        f.write_str(label)
    }
}

/// Per-field validation messages
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    fields: BTreeMap<Field, String>,
}

impl ValidationErrors {
    /// No errors
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Single-field error
    #[must_use]
    pub fn single(field: Field, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.insert(field, message);
        errors
    }

    /// Flag `field`
    pub fn insert(&mut self, field: Field, message: impl Into<String>) {
        self.fields.insert(field, message.into());
    }

    /// Clear `field`
    pub fn clear(&mut self, field: Field) {
        self.fields.remove(&field);
    }

    /// Message for `field`
    #[inline]
    #[must_use]
    pub fn get(&self, field: Field) -> Option<&str> {
        self.fields.get(&field).map(String::as_str)
    }

    /// Whether `field` is flagged
    #[inline]
    #[must_use]
    pub fn has(&self, field: Field) -> bool {
        self.fields.contains_key(&field)
    }

    /// No flagged fields
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Number of flagged fields
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Flagged fields in display order
    pub fn iter(&self) -> impl Iterator<Item = (Field, &str)> {
        self.fields.iter().map(|(f, m)| (*f, m.as_str()))
    }

    /// `Ok` when empty, otherwise the errors themselves
    ///
    /// # Errors
    /// Returns `self` when at least one field is flagged
    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, message) in &self.fields {
            if !first {
                f.write_str("; ")?;
            }
            write!(f, "{field}: {message}")?;
            first = false;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

/// Workflow steps that unlock in sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Step {
    /// Name, phone and email
    BasicInfo,
    /// Appointment details
    Appointment,
    /// The three meeting parts
    SalesMeeting,
    /// Outcome and product lines
    SalesOutcome,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Step::BasicInfo => "basic info",
            Step::Appointment => "appointment",
            Step::SalesMeeting => "sales meeting",
            Step::SalesOutcome => "sales outcome",
        };
        f.write_str(label)
    }
}

/// Main workflow error type
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WorkflowError {
    /// Actor is neither the owner nor an admin
    #[error("permission denied: view only")]
    PermissionDenied,

    /// One or more fields are invalid; nothing was changed
    #[error("validation failed: {0}")]
    Validation(ValidationErrors),

    /// The step is not unlocked yet
    #[error("{0} step is locked")]
    StepLocked(Step),

    /// An outcome is already recorded; undo it first
    #[error("sales outcome already decided")]
    OutcomeAlreadyDecided,

    /// Undo requested with no outcome recorded
    #[error("no sales outcome to undo")]
    NoOutcomeToUndo,

    /// Product line index out of range
    #[error("no product line at index {0}")]
    NoSuchProductLine(usize),

    /// Stage move outside the transition table
    #[error("illegal stage transition: {from} -> {to}")]
    IllegalTransition { from: Stage, to: Stage },
}

impl WorkflowError {
    /// Check if the caller should render the record read-only
    #[inline]
    #[must_use]
    pub fn is_permission(&self) -> bool {
        matches!(self, Self::PermissionDenied)
    }

    /// Validation messages, if this is a validation failure
    #[inline]
    #[must_use]
    pub fn validation(&self) -> Option<&ValidationErrors> {
        match self {
            Self::Validation(errors) => Some(errors),
            _ => None,
        }
    }
}

impl From<ValidationErrors> for WorkflowError {
    fn from(errors: ValidationErrors) -> Self {
        Self::Validation(errors)
    }
}
