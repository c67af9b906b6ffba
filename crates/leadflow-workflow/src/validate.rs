//! Field validators
//!
//! Each validator returns the message shown inline next to the field.

use crate::error::{Field, ValidationErrors};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use leadflow_model::{Outcome, PhoneNumber, ProspectProduct};
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;

/// `local@domain.tld` with no whitespace and a single `@`
static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$")
        .expect("email pattern `^[^\\s@]+@[^\\s@]+\\.[^\\s@]+$` must compile")
});

/// Name must be present and free of digits
///
/// # Errors
/// Message for the name field
pub fn validate_name(name: &str) -> Result<(), String> {
    let name = name.trim();
    if name.is_empty() {
        return Err("Name is required".to_string());
    }
    if name.chars().any(|c| c.is_ascii_digit()) {
        return Err("Name cannot contain numbers".to_string());
    }
    Ok(())
}

/// Phone suffix must be present and digits only; returns the stored number
///
/// # Errors
/// Message for the phone field
pub fn validate_phone(prefix: &str, suffix: &str) -> Result<PhoneNumber, String> {
    if suffix.trim().is_empty() {
        return Err("Phone number is required".to_string());
    }
    PhoneNumber::normalize(prefix, suffix)
        .map_err(|_| "Phone number can only contain digits".to_string())
}

/// Email is optional; when present it must look like an address
///
/// # Errors
/// Message for the email field
pub fn validate_email(email: &str) -> Result<(), String> {
    let email = email.trim();
    if email.is_empty() || EMAIL_RE.is_match(email) {
        Ok(())
    } else {
        Err("Invalid email address".to_string())
    }
}

/// Start time on today's date must not be in the past
///
/// # Errors
/// Message for the start-time field
pub fn validate_start_time(
    date: Option<NaiveDate>,
    start: Option<NaiveTime>,
    now: NaiveDateTime,
) -> Result<(), String> {
    match (date, start) {
        (Some(date), Some(start)) if date == now.date() && start < now.time() => {
            Err("Start time cannot be in the past".to_string())
        }
        _ => Ok(()),
    }
}

/// Outcome submission rules
///
/// - successful: positive total, every line named
/// - unsuccessful: non-blank reason
/// - kiv: nothing further
///
/// # Errors
/// All violated rules, keyed by field
pub fn validate_outcome(
    outcome: &Outcome,
    products: &[ProspectProduct],
) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();
    match outcome {
        Outcome::Successful => {
            let total: Decimal = products.iter().map(|p| p.amount).sum();
            if total <= Decimal::ZERO {
                errors.insert(Field::TotalAmount, "Total ACE amount must be greater than 0");
            }
            if products.is_empty() || products.iter().any(ProspectProduct::is_unnamed) {
                errors.insert(Field::Products, "Every product line needs a product name");
            }
        }
        Outcome::Unsuccessful(reason) => {
            if reason.is_blank() {
                errors.insert(Field::UnsuccessfulReason, "Please provide a reason");
            }
        }
        Outcome::Kiv => {}
    }
    errors.into_result()
}
