use serde::{Deserialize, Serialize};

/// An incoming `(email?, phoneNumber?)` pair to resolve.
///
/// Empty strings are treated as "not given", so `Some("")` never reaches a
/// store query or a stored record.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identifier {
    pub email: Option<String>,
    pub phone_number: Option<String>,
}

impl Identifier {
    pub fn new(email: Option<String>, phone_number: Option<String>) -> Self {
        Self {
            email: email.filter(|e| !e.is_empty()),
            phone_number: phone_number.filter(|p| !p.is_empty()),
        }
    }

    pub fn email(email: impl Into<String>) -> Self {
        Self::new(Some(email.into()), None)
    }

    pub fn phone_number(phone_number: impl Into<String>) -> Self {
        Self::new(None, Some(phone_number.into()))
    }

    pub fn both(email: impl Into<String>, phone_number: impl Into<String>) -> Self {
        Self::new(Some(email.into()), Some(phone_number.into()))
    }

    pub fn email_str(&self) -> Option<&str> {
        self.email.as_deref()
    }

    pub fn phone_str(&self) -> Option<&str> {
        self.phone_number.as_deref()
    }

    /// Returns `true` when neither field is given.
    pub fn is_empty(&self) -> bool {
        self.email.is_none() && self.phone_number.is_none()
    }
}
