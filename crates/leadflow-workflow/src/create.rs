//! `NEW -> PROSPECT`
//!
//! A new prospect has no id until the persistence collaborator assigns one.
//! [`create`] only validates and shapes the payload; nothing partial is ever
//! handed to persistence.

use crate::error::{Field, ValidationErrors, WorkflowError};
use crate::validate::{validate_email, validate_name, validate_phone};
use leadflow_model::{Contact, GroupId, PhoneNumber, Role, UserId, User};

/// Raw input from the create form
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewProspect {
    /// Contact name
    pub name: String,
    /// Local part of the number, without the country prefix
    pub phone_suffix: String,
    /// Optional email
    pub email: Option<String>,
}

impl NewProspect {
    /// Name and phone suffix
    #[inline]
    #[must_use]
    pub fn new(name: impl Into<String>, phone_suffix: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            phone_suffix: phone_suffix.into(),
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

/// Validated create payload, owned by the creating user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateProspect {
    /// Creating user, who becomes the owner
    pub uid: UserId,
    /// Creator's group
    pub group_id: Option<GroupId>,
    /// Validated contact details
    pub contact: Contact,
}

/// Roles allowed to create prospects
#[inline]
#[must_use]
pub fn can_create(actor: &User) -> bool {
    matches!(actor.role, Role::Admin | Role::GroupLeader | Role::Agent)
}

/// Validate a create form and assign ownership to `actor`
///
/// # Errors
/// - `WorkflowError::PermissionDenied` for trainers and master trainers
/// - `WorkflowError::Validation` with every invalid field flagged
pub fn create(
    actor: &User,
    draft: &NewProspect,
    phone_prefix: &str,
) -> Result<CreateProspect, WorkflowError> {
    if !can_create(actor) {
        return Err(WorkflowError::PermissionDenied);
    }

    let mut errors = ValidationErrors::new();
    if let Err(message) = validate_name(&draft.name) {
        errors.insert(Field::Name, message);
    }
    let phone = match validate_phone(phone_prefix, &draft.phone_suffix) {
        Ok(phone) => Some(phone),
        Err(message) => {
            errors.insert(Field::Phone, message);
            None
        }
    };
    let email = draft
        .email
        .as_deref()
        .map(str::trim)
        .filter(|e| !e.is_empty());
    if let Some(Err(message)) = email.map(validate_email) {
        errors.insert(Field::Email, message);
    }
    errors.into_result()?;

    let mut contact = Contact::new(
        draft.name.trim(),
        phone.unwrap_or_else(|| PhoneNumber::from_stored(String::new())),
    );
    contact.email = email.map(str::to_string);

    tracing::debug!(uid = %actor.id, "prospect create payload validated");
    Ok(CreateProspect {
        uid: actor.id.clone(),
        group_id: actor.group_id.clone(),
        contact,
    })
}
