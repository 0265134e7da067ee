//! Wire types for the HTTP API.

use idr_types::ConsolidatedContact;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Body of `POST /identify`.
///
/// Fields are kept as raw JSON so that type errors (a numeric phone number,
/// say) surface as field-level validation errors rather than a parse failure.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentifyRequest {
    #[serde(default)]
    pub email: Option<Value>,
    #[serde(default)]
    pub phone_number: Option<Value>,
}

/// Successful response of `POST /identify`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentifyResponse {
    pub contact: ConsolidatedContact,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

impl Default for HealthResponse {
    fn default() -> Self {
        Self {
            status: "ok".into(),
            version: env!("CARGO_PKG_VERSION").into(),
        }
    }
}
