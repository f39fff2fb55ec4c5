//! Validation for contact fields
//!
//! Length limits follow the original deployment's security configuration;
//! the email pattern is the usual RFC 5322 practical subset.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::ContactFields;

pub const MAX_EMAIL_LENGTH: usize = 254;
pub const MAX_NAME_LENGTH: usize = 100;
pub const MAX_COMPANY_LENGTH: usize = 200;
pub const MAX_TITLE_LENGTH: usize = 200;
pub const MAX_ADDRESS_LENGTH: usize = 500;
pub const MIN_PHONE_DIGITS: usize = 7;
pub const MAX_PHONE_DIGITS: usize = 15;

lazy_static! {
    static ref EMAIL_RE: Regex = Regex::new(
        r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)+$"
    )
    .expect("email regex");
}

/// Severity of a validation finding.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValidationSeverity {
    Error,
    Warning,
}

/// A single validation finding on a field.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
    pub severity: ValidationSeverity,
}

impl ValidationError {
    fn error(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
            severity: ValidationSeverity::Error,
        }
    }

    fn warning(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
            severity: ValidationSeverity::Warning,
        }
    }
}

/// Validate contact fields and return all findings.
///
/// Errors block a write; warnings are surfaced to the user but do not.
pub fn validate_contact_fields(fields: &ContactFields) -> Vec<ValidationError> {
    let mut findings = Vec::new();

    if let Some(email) = fields.email.as_deref() {
        let email = email.trim();
        if email.len() > MAX_EMAIL_LENGTH {
            findings.push(ValidationError::error("email", "Email is too long"));
        } else if !email.is_empty() && (!EMAIL_RE.is_match(email) || email.contains("..")) {
            findings.push(ValidationError::error("email", "Invalid email format"));
        }
    }

    for (name, value, max) in [
        ("name", &fields.name, MAX_NAME_LENGTH),
        ("company", &fields.company, MAX_COMPANY_LENGTH),
        ("title", &fields.title, MAX_TITLE_LENGTH),
        ("address", &fields.address, MAX_ADDRESS_LENGTH),
    ] {
        if let Some(value) = value.as_deref() {
            if value.chars().count() > max {
                findings.push(ValidationError::error(
                    name,
                    format!("Exceeds {} characters", max),
                ));
            }
        }
    }

    for (name, value) in [("mobile", &fields.mobile), ("phone", &fields.phone)] {
        if let Some(value) = value.as_deref() {
            let digits = value.chars().filter(|c| c.is_ascii_digit()).count();
            if digits > 0 && !(MIN_PHONE_DIGITS..=MAX_PHONE_DIGITS).contains(&digits) {
                findings.push(ValidationError::warning(name, "Unusual phone number length"));
            }
        }
    }

    findings
}

/// True when no finding has `Error` severity.
pub fn is_persistable(fields: &ContactFields) -> bool {
    validate_contact_fields(fields)
        .iter()
        .all(|f| f.severity != ValidationSeverity::Error)
}
