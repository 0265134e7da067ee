//! Request validation for `POST /identify`.
//!
//! Rules:
//! - `email`, when present and not null, must be a string holding a valid
//!   address. It is trimmed and lowercased.
//!   An empty string is not a valid address.
//! - `phoneNumber`, when present and not null, must be a string. It is kept
//!   exactly as sent.
//! - At least one of the two must be a non-empty value.
//!
//! Email addresses are accepted when:
//! - There is exactly one `@`, with a non-empty local part before it
//! - The address contains no whitespace or control characters
//! - The domain has at least two labels separated by `.`
//! - No domain label is empty or starts/ends with `-`
//! - The whole address is at most 254 characters

use idr_types::Identifier;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::api::IdentifyRequest;

const MAX_EMAIL_LEN: usize = 254;

/// A single failed validation rule.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    fn new(field: &str, message: &str) -> Self {
        Self {
            field: field.to_string(),
            message: message.to_string(),
        }
    }
}

/// Validate and normalize an identify request into an [`Identifier`].
///
/// Collects every failed rule rather than stopping at the first.
pub fn validate_identify(request: &IdentifyRequest) -> Result<Identifier, Vec<FieldError>> {
    let mut errors = Vec::new();

    let email = match &request.email {
        None | Some(Value::Null) => None,
        Some(Value::String(raw)) => {
            let trimmed = raw.trim();
            if validate_email(trimmed) {
                Some(trimmed.to_lowercase())
            } else {
                errors.push(FieldError::new("email", "Invalid email format"));
                None
            }
        }
        Some(_) => {
            errors.push(FieldError::new("email", "Invalid email format"));
            None
        }
    };

    let phone_number = match &request.phone_number {
        None | Some(Value::Null) => None,
        Some(Value::String(raw)) => Some(raw.clone()),
        Some(_) => {
            errors.push(FieldError::new("phoneNumber", "Phone number must be a string"));
            None
        }
    };

    if !is_given(&request.email) && !is_given(&request.phone_number) {
        errors.push(FieldError::new(
            "body",
            "At least one of email or phoneNumber is required",
        ));
    }

    if errors.is_empty() {
        Ok(Identifier::new(email, phone_number))
    } else {
        Err(errors)
    }
}

/// Returns `true` if `email` looks like a deliverable address.
pub fn validate_email(email: &str) -> bool {
    if email.is_empty() || email.len() > MAX_EMAIL_LEN {
        return false;
    }
    if email.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return false;
    }

    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }

    let labels: Vec<&str> = domain.split('.').collect();
    if labels.len() < 2 {
        return false;
    }
    labels
        .iter()
        .all(|l| !l.is_empty() && !l.starts_with('-') && !l.ends_with('-'))
}

/// A raw field counts as given when it is anything but absent, null, or "".
fn is_given(value: &Option<Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::String(s)) => !s.is_empty(),
        Some(_) => true,
    }
}
