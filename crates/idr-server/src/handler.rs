use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::response::Json;
use tracing::debug;

use crate::api::{HealthResponse, IdentifyRequest, IdentifyResponse};
use crate::error::{ServerError, ServerResult};
use crate::state::AppState;
use crate::validate::validate_identify;

/// Plain-text banner at `/`.
pub async fn root_handler() -> &'static str {
    "Identity reconciliation service is running"
}

/// Health check handler.
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::default())
}

/// `POST /identify`: resolve an email/phone pair to its consolidated contact.
pub async fn identify_handler(
    State(state): State<AppState>,
    body: Result<Json<IdentifyRequest>, JsonRejection>,
) -> ServerResult<Json<IdentifyResponse>> {
    let Json(request) = body.map_err(|e| ServerError::BadRequest(e.body_text()))?;
    let identifier = validate_identify(&request).map_err(ServerError::Validation)?;
    debug!(
        email = identifier.email_str().is_some(),
        phone = identifier.phone_str().is_some(),
        "identify request"
    );
    let contact = state.resolve(identifier).await?;
    Ok(Json(IdentifyResponse { contact }))
}
